use clap::{Parser, Subcommand};
use print_finish::batch::{self, RenderOverrides};
use print_finish::config::{self, AppConfig, CONFIG_FILE_NAME};
use print_finish::cropper::{CommandCropper, Cropper, CropperBridge, DisabledCropper};
use print_finish::imaging::RustCompositor;
use print_finish::notify::ArtifactShelf;
use print_finish::types::{Material, SizeCandidate};
use print_finish::workflow::{Workflow, WorkflowDeps};
use print_finish::{caption, output, session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "print-finish")]
#[command(about = "Turn captioned photos into print-ready gallery-wrap files")]
#[command(long_about = "\
Turn captioned photos into print-ready gallery-wrap files

Each image comes with a free-text caption describing the order:

  #501 30x40 matte        number 501, 30x40 cm, matte canvas
  109 30х40 баннер        Cyrillic works too
  % 40x60                 open the manual crop tool first
  501 30x40 🚨            urgent: the printed number gets a ‼ marker

The finished file has a mirrored wrap border, a white margin with the order
number top and bottom, and a thin black cut outline. Files land in
<output>/<material>/ and are never overwritten.

Run 'print-finish gen-config' to generate a documented print-finish.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Output root (overrides the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Caption to use instead of each file's name
    #[arg(long)]
    caption: Option<String>,

    /// Print size in cm, e.g. 30x40
    #[arg(long)]
    size: Option<SizeCandidate>,

    /// Order number
    #[arg(long)]
    number: Option<String>,

    /// Material: canvas, matte_canvas, cotton, banner
    #[arg(long)]
    material: Option<Material>,
}

#[derive(Subcommand)]
enum Command {
    /// Show what a caption parses to
    Parse {
        /// Caption text
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Render files without prompting; ambiguous ones are skipped
    Render(RenderArgs),
    /// Interactive session reading commands from stdin
    Session,
    /// Print a stock print-finish.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Parse { text } => {
            output::print_intent(&caption::parse(&text.join(" ")));
        }
        Command::Render(args) => {
            let app = load_app_config(&cli.config, cli.output)?;
            init_thread_pool(&app.processing);
            let inputs = batch::collect_inputs(&args.inputs)?;
            let overrides = RenderOverrides {
                caption: args.caption,
                size: args.size,
                number: args.number,
                material: args.material,
            };
            let report = batch::render_all(
                &inputs,
                &overrides,
                &app.compositing,
                &app.output.root,
                &RustCompositor::new(),
            );
            output::print_render_report(&report);
        }
        Command::Session => {
            let app = load_app_config(&cli.config, cli.output)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_session(app))?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_app_config(
    path: &std::path::Path,
    output: Option<PathBuf>,
) -> Result<AppConfig, config::ConfigError> {
    let mut app = config::load_config(path)?;
    if let Some(root) = output {
        app.output.root = root;
    }
    Ok(app)
}

async fn run_session(app: AppConfig) -> Result<(), session::SessionError> {
    let cropper: Arc<dyn Cropper> = match &app.cropper.command {
        Some(program) => Arc::new(CommandCropper::new(program)),
        None => Arc::new(DisabledCropper),
    };
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let workflow = Workflow::new(
        WorkflowDeps {
            compositor: Arc::new(RustCompositor::new()),
            cropper: CropperBridge::new(cropper, app.cropper.poll_interval()),
            settings: app.compositing.clone(),
            output_root: app.output.root.clone(),
            shelf: Arc::new(ArtifactShelf::new()),
        },
        tx,
    );
    let printer = session::spawn_printer(rx);
    println!("{}", session::USAGE);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    session::run(workflow, stdin).await?;
    // Every worker has retired, so the printer ends once the channel is empty
    if let Err(e) = printer.await {
        tracing::warn!("notification printer stopped: {e}");
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
