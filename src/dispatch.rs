use std::fmt;
use tracing::{debug, info};

use crate::content::{Content, MediaKind};
use crate::gemini_api::{ContentModel, GeminiError, Result};

pub const VISION_MODEL: &str = "gemini-pro-vision";
pub const MULTIMODAL_MODEL: &str = "gemini-1.5-pro-preview-0409";

/// The two front-ends and the media kinds each one may dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Image prompts against the direct API
    Vision,
    /// Image and video prompts against a project-scoped backend
    Multimodal,
}

impl Variant {
    pub fn supported_kinds(&self) -> &'static [MediaKind] {
        match self {
            Variant::Vision => &[MediaKind::Image],
            Variant::Multimodal => &[MediaKind::Image, MediaKind::Video],
        }
    }

    pub fn supports(&self, kind: MediaKind) -> bool {
        self.supported_kinds().contains(&kind)
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Variant::Vision => VISION_MODEL,
            Variant::Multimodal => MULTIMODAL_MODEL,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Variant::Vision => "Gemini AI Text Generator",
            Variant::Multimodal => "Gemini AI Text Generator from Video/Images",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Vision => write!(f, "vision"),
            Variant::Multimodal => write!(f, "multimodal"),
        }
    }
}

/// Send one assembled payload to the model and return its text unchanged.
///
/// A kind outside the variant's set is refused before any request is made.
/// Vendor failures are returned as-is; there is no retry.
pub async fn generate_content<M: ContentModel>(
    model: &M,
    variant: Variant,
    kind: MediaKind,
    payload: &Content,
) -> Result<String> {
    if !variant.supports(kind) {
        return Err(GeminiError::UnsupportedKind { kind, variant });
    }

    debug!(
        "Dispatching {} request with {} parts to {}",
        kind,
        payload.parts.len(),
        model.model_name()
    );

    let response = model.generate_content(payload).await?;
    let text = response.text()?;

    info!("Received {} characters of generated text", text.len());
    Ok(text)
}
