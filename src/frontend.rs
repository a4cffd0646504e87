use tracing::debug;

use crate::content::{Content, MediaKind, Upload};
use crate::dispatch::{Variant, generate_content};
use crate::gemini_api::{ContentModel, Result};

/// Buttons the user can press once their inputs are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AnalyzeImage,
    AnalyzeVideo,
}

impl Action {
    pub fn kind(&self) -> MediaKind {
        match self {
            Action::AnalyzeImage => MediaKind::Image,
            Action::AnalyzeVideo => MediaKind::Video,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Action::AnalyzeImage => "Analyze Image with Prompt",
            Action::AnalyzeVideo => "Analyze Video with Prompt",
        }
    }

    fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => Action::AnalyzeImage,
            MediaKind::Video => Action::AnalyzeVideo,
        }
    }
}

/// What the user has entered so far
#[derive(Debug, Clone, Default)]
pub struct Form {
    pub prompt: Option<String>,
    pub image: Option<Upload>,
    pub video: Option<Upload>,
}

impl Form {
    pub fn new(prompt: Option<String>) -> Self {
        Self {
            prompt,
            ..Self::default()
        }
    }

    pub fn with_image(mut self, upload: Upload) -> Self {
        self.image = Some(upload);
        self
    }

    pub fn with_video(mut self, upload: Upload) -> Self {
        self.video = Some(upload);
        self
    }

    fn upload(&self, kind: MediaKind) -> Option<&Upload> {
        match kind {
            MediaKind::Image => self.image.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }

    /// Actions with both a prompt and the matching upload, in display order
    pub fn available_actions(&self, variant: Variant) -> Vec<Action> {
        if self.prompt.is_none() {
            return Vec::new();
        }
        variant
            .supported_kinds()
            .iter()
            .filter(|kind| self.upload(**kind).is_some())
            .map(|kind| Action::for_kind(*kind))
            .collect()
    }

    /// Request for `action`, or `None` while an input is missing
    pub fn payload(&self, action: Action) -> Option<Content> {
        let prompt = self.prompt.as_deref()?;
        let upload = self.upload(action.kind())?;
        Some(match action {
            Action::AnalyzeImage => Content::image(prompt, upload),
            Action::AnalyzeVideo => Content::video(prompt, upload),
        })
    }
}

/// One-line stand-in for the media preview
pub fn preview(upload: &Upload) -> String {
    let caption = match upload.kind {
        MediaKind::Image => "Uploaded Image Displayed Here!",
        MediaKind::Video => "Uploaded Video",
    };
    format!(
        "{}: {} ({} bytes, {})",
        caption,
        upload.file_name,
        upload.size(),
        upload.mime_type
    )
}

/// Handle one button press. Returns `None` when the action is not yet usable.
pub async fn run_action<M: ContentModel>(
    model: &M,
    variant: Variant,
    form: &Form,
    action: Action,
) -> Result<Option<String>> {
    let Some(payload) = form.payload(action) else {
        debug!("{} pressed without prompt or upload, ignoring", action.label());
        return Ok(None);
    };

    if let Some(mime_type) = payload.parts.iter().find_map(|p| p.mime_type()) {
        debug!("{}: sending {} payload", action.label(), mime_type);
    }

    generate_content(model, variant, action.kind(), &payload)
        .await
        .map(Some)
}
