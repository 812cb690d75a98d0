//! Line-oriented session transport.
//!
//! Reads commands from any async line source (stdin in production) and
//! drives a [`Workflow`]. Notifications are printed as they arrive by a
//! separate task, so prompts show up while the session keeps reading.
//!
//! ```text
//! image <submitter> <path> [caption...]
//! text <submitter> <reply...>
//! choose <submitter> <WxH>
//! open <short-id>
//! folder <short-id>
//! delete <short-id>
//! quit
//! ```
//!
//! A bad line prints the usage and the session carries on. When input ends,
//! the session waits for every queued image before returning.

use crate::imaging::SourceImage;
use crate::notify::Notification;
use crate::output;
use crate::types::SubmitterId;
use crate::workflow::Workflow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

/// How often the end-of-input drain checks for idle workers.
const DRAIN_POLL: Duration = Duration::from_millis(50);

pub const USAGE: &str = "\
commands:
  image <submitter> <path> [caption...]
  text <submitter> <reply...>
  choose <submitter> <WxH>
  open|folder|delete <short-id>
  quit";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Missing {0}")]
    MissingArgument(&'static str),
    #[error("Submitter must be a number, got '{0}'")]
    BadSubmitter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Image {
        submitter: SubmitterId,
        path: PathBuf,
        caption: Option<String>,
    },
    Text {
        submitter: SubmitterId,
        reply: String,
    },
    Choose {
        submitter: SubmitterId,
        size: String,
    },
    Open(String),
    Folder(String),
    Delete(String),
    Quit,
}

/// Split off the first whitespace-delimited word.
fn next_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(s.split_once(char::is_whitespace).unwrap_or((s, "")))
}

fn submitter_arg(rest: &str) -> Result<(SubmitterId, &str), SessionError> {
    let (word, rest) = next_word(rest).ok_or(SessionError::MissingArgument("submitter"))?;
    let submitter = word
        .parse()
        .map_err(|_| SessionError::BadSubmitter(word.to_string()))?;
    Ok((submitter, rest))
}

fn required<'a>(rest: &'a str, what: &'static str) -> Result<&'a str, SessionError> {
    let rest = rest.trim();
    if rest.is_empty() {
        Err(SessionError::MissingArgument(what))
    } else {
        Ok(rest)
    }
}

/// Parse one non-empty input line.
pub fn parse_command(line: &str) -> Result<SessionCommand, SessionError> {
    let (verb, rest) = next_word(line).ok_or(SessionError::MissingArgument("command"))?;
    match verb.to_lowercase().as_str() {
        "image" => {
            let (submitter, rest) = submitter_arg(rest)?;
            let (path, caption) = next_word(rest).ok_or(SessionError::MissingArgument("path"))?;
            let caption = caption.trim();
            Ok(SessionCommand::Image {
                submitter,
                path: PathBuf::from(path),
                caption: (!caption.is_empty()).then(|| caption.to_string()),
            })
        }
        "text" => {
            let (submitter, rest) = submitter_arg(rest)?;
            Ok(SessionCommand::Text {
                submitter,
                reply: required(rest, "reply")?.to_string(),
            })
        }
        "choose" => {
            let (submitter, rest) = submitter_arg(rest)?;
            Ok(SessionCommand::Choose {
                submitter,
                size: required(rest, "size")?.to_string(),
            })
        }
        "open" => Ok(SessionCommand::Open(required(rest, "short id")?.to_string())),
        "folder" => Ok(SessionCommand::Folder(required(rest, "short id")?.to_string())),
        "delete" => Ok(SessionCommand::Delete(required(rest, "short id")?.to_string())),
        "quit" | "exit" => Ok(SessionCommand::Quit),
        other => Err(SessionError::UnknownCommand(other.to_string())),
    }
}

/// Print every notification until the workflow side of the channel closes.
pub fn spawn_printer(mut rx: UnboundedReceiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            output::print_notification(&notification);
        }
    })
}

/// Read commands from `input` until `quit` or end of input, then wait for
/// the workflow to finish what was queued. Prompts still open at that point
/// can no longer be answered and end their items as failed.
pub async fn run<R>(workflow: Workflow, input: R) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command(line) {
            Ok(SessionCommand::Quit) => break,
            Ok(command) => execute(&workflow, command).await,
            Err(e) => println!("{e}\n{USAGE}"),
        }
    }
    debug!("session input closed, draining");
    workflow.drain(DRAIN_POLL).await;
    Ok(())
}

async fn execute(workflow: &Workflow, command: SessionCommand) {
    match command {
        SessionCommand::Image {
            submitter,
            path,
            caption,
        } => {
            let load_path = path.clone();
            match tokio::task::spawn_blocking(move || SourceImage::open(&load_path)).await {
                Ok(Ok(image)) => {
                    let item = workflow.submit(submitter, Arc::new(image), caption);
                    println!("[{submitter}] #{item} accepted {}", path.display());
                }
                Ok(Err(e)) => println!("[{submitter}] cannot load image: {e}"),
                Err(e) => println!("[{submitter}] cannot load image: {e}"),
            }
        }
        SessionCommand::Text { submitter, reply } => {
            if !workflow.reply_text(submitter, &reply) {
                println!("[{submitter}] nothing is waiting for a reply");
            }
        }
        SessionCommand::Choose { submitter, size } => {
            if !workflow.choose_size(submitter, &size) {
                println!("[{submitter}] nothing is waiting for a size");
            }
        }
        SessionCommand::Open(id) => report_control("opened", workflow.shelf().open(&id)),
        SessionCommand::Folder(id) => report_control("shown", workflow.shelf().open_folder(&id)),
        SessionCommand::Delete(id) => report_control("deleted", workflow.shelf().delete(&id)),
        SessionCommand::Quit => {}
    }
}

fn report_control(action: &str, result: Result<PathBuf, crate::notify::ControlError>) {
    match result {
        Ok(path) => println!("{action} {}", path.display()),
        Err(e) => println!("{e}"),
    }
}
