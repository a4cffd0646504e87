pub mod cli;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod frontend;
pub mod gemini_api;

pub use config::Config;
pub use content::{Content, MediaKind, Part, Upload};
pub use dispatch::{MULTIMODAL_MODEL, VISION_MODEL, Variant, generate_content};
pub use frontend::{Action, Form};
pub use gemini_api::{
    ContentModel, GeminiClient, GeminiClientConfig, GeminiError, GenerateContentResponse,
    ModelInfo, ProjectSession,
};
