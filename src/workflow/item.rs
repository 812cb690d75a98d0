//! Processing of a single queued image.

use super::prompts::PromptKind;
use super::{QueueItem, Shared, WorkflowError};
use crate::caption::{self, OrderIntent};
use crate::cropper::CropRequest;
use crate::imaging::{CompositingPreset, SourceImage};
use crate::notify::{ItemId, Notification};
use crate::types::{SizeCandidate, SubmitterId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How the print size gets decided.
enum Route {
    /// Size known; composite with the default crop.
    Direct(SizeCandidate),
    /// Hand to the crop tool, pre-filled with the best guess if any.
    Cropper(Option<SizeCandidate>),
}

pub(super) async fn process(shared: Arc<Shared>, item: QueueItem) -> Result<(), WorkflowError> {
    let QueueItem {
        id,
        submitter,
        image,
        caption,
    } = item;
    let mut intent = caption::parse(caption.as_deref().unwrap_or_default());
    debug!(submitter, item = id, ?intent, "caption parsed");

    if intent.sizes.is_empty() && !intent.cropper_requested {
        let announce = Notification::AwaitingText { submitter, item: id };
        let reply = ask(&shared, submitter, PromptKind::FreeText, announce).await?;
        intent = intent.with_reply(caption::parse(&reply));
        debug!(submitter, item = id, ?intent, "reply parsed");
    }

    let route = match (intent.cropper_requested, intent.sizes.as_slice()) {
        (true, sizes) => Route::Cropper(sizes.first().copied()),
        (false, []) => Route::Cropper(None),
        (false, [only]) => Route::Direct(*only),
        (false, many) => Route::Direct(choose_size(&shared, submitter, id, many).await?),
    };

    let (img_w, img_h) = image.dimensions();
    let settings = shared.deps.settings.clone();
    let (preset, material_guessed, missing_number) = match route {
        Route::Direct(size) => {
            let size = size.oriented_for(img_w, img_h);
            let preset = CompositingPreset {
                image,
                number: intent.display_number(),
                width_cm: size.width as f64,
                height_cm: size.height as f64,
                material: intent.material,
                crop: None,
                settings,
            };
            (preset, intent.material_guessed, intent.number.is_none())
        }
        Route::Cropper(guess) => {
            let guess = guess.map(|s| s.oriented_for(img_w, img_h));
            shared.notify(Notification::AwaitingCropper { submitter, item: id });
            let request = crop_request(&intent, image, guess);
            let Some(result) = shared.deps.cropper.run(request).await else {
                warn!(submitter, item = id, "closed in the crop tool, skipping");
                shared.notify(Notification::Skipped {
                    submitter,
                    item: id,
                    reason: "closed in the crop tool".into(),
                });
                return Ok(());
            };
            let missing_number = result.number.trim().is_empty();
            let preset = CompositingPreset {
                image: result.image,
                number: result.number,
                width_cm: result.width_cm,
                height_cm: result.height_cm,
                material: result.material,
                crop: Some(result.crop),
                settings,
            };
            // The operator picked the material explicitly
            (preset, false, missing_number)
        }
    };

    let compositor = shared.deps.compositor.clone();
    let root = shared.deps.output_root.clone();
    let artifact =
        tokio::task::spawn_blocking(move || compositor.composite(&preset, &root)).await??;

    let short_id = shared.deps.shelf.register(&artifact.path);
    info!(
        submitter,
        item = id,
        path = %artifact.path.display(),
        short_id = %short_id,
        "artifact ready"
    );
    shared.notify(Notification::ArtifactReady {
        submitter,
        item: id,
        path: artifact.path,
        short_id,
        material_guessed,
        missing_number,
    });
    Ok(())
}

fn crop_request(
    intent: &OrderIntent,
    image: Arc<SourceImage>,
    guess: Option<SizeCandidate>,
) -> CropRequest {
    CropRequest {
        image,
        number: intent.display_number(),
        width_cm: guess.map(|s| s.width as f64),
        height_cm: guess.map(|s| s.height as f64),
        material: intent.material,
    }
}

/// Open a prompt, announce it, and wait for the answer.
async fn ask(
    shared: &Shared,
    submitter: SubmitterId,
    kind: PromptKind,
    announce: Notification,
) -> Result<String, WorkflowError> {
    let pending = shared.prompts.open(submitter, kind);
    shared.notify(announce);
    pending
        .answer()
        .await
        .ok_or(WorkflowError::PromptAbandoned(submitter))
}

/// Ask until the submitter picks one of `candidates`.
async fn choose_size(
    shared: &Shared,
    submitter: SubmitterId,
    item: ItemId,
    candidates: &[SizeCandidate],
) -> Result<SizeCandidate, WorkflowError> {
    let labels: Vec<String> = candidates.iter().map(ToString::to_string).collect();
    loop {
        let announce = Notification::AwaitingSize {
            submitter,
            item,
            candidates: labels.clone(),
        };
        let answer = ask(shared, submitter, PromptKind::SizeChoice, announce).await?;
        match answer.parse::<SizeCandidate>() {
            Ok(size) if candidates.contains(&size) => return Ok(size),
            _ => debug!(submitter, item, %answer, "not one of the offered sizes, asking again"),
        }
    }
}
