use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::content::{Content, MediaKind};
use crate::dispatch::Variant;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Gemini API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited by API. Retry after some time.")]
    RateLimited,

    #[error("Response was blocked: {0}")]
    Blocked(String),

    #[error("No text in response (finish reason: {0})")]
    NoText(String),

    #[error("Content Type {kind} not supported by the {variant} front-end! Exiting!")]
    UnsupportedKind { kind: MediaKind, variant: Variant },

    #[error("Unsupported {kind} file: {file_name}")]
    UnsupportedFileType { kind: MediaKind, file_name: String },

    #[error("PROJECT_ID must be set to initialize a project-scoped session")]
    MissingProjectId,

    #[error("Failed to obtain an access token: {0}")]
    Auth(String),

    #[error("{0} is not available on this backend")]
    Unsupported(&'static str),

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GeminiError>;

/// HTTP settings shared by both backends
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub timeout_secs: u64,
    /// Replaces the vendor endpoint root, e.g. to point at a local mock
    pub base_url: Option<String>,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: None,
        }
    }
}

/// Authenticated context bound to a cloud project and region.
///
/// A project-scoped [`GeminiClient`] can only be built from one of these.
#[derive(Clone)]
pub struct ProjectSession {
    project: String,
    location: String,
    access_token: String,
}

impl std::fmt::Debug for ProjectSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSession")
            .field("project", &self.project)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl ProjectSession {
    /// Bind to the configured project and region, minting a token through
    /// `gcloud` unless one is configured.
    pub fn init(config: &Config) -> Result<Self> {
        let project = config
            .project_id
            .clone()
            .ok_or(GeminiError::MissingProjectId)?;

        let access_token = match &config.access_token {
            Some(token) => token.clone(),
            None => fetch_gcloud_token()?,
        };

        info!(
            "Initialized project session for {} in {}",
            project, config.location
        );

        Ok(Self {
            project,
            location: config.location.clone(),
            access_token,
        })
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

fn fetch_gcloud_token() -> Result<String> {
    debug!("Requesting application-default access token from gcloud");

    let output = Command::new("gcloud")
        .args(["auth", "application-default", "print-access-token"])
        .output()
        .map_err(|e| GeminiError::Auth(format!("failed to run gcloud: {}", e)))?;

    if !output.status.success() {
        return Err(GeminiError::Auth(format!(
            "gcloud exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(GeminiError::Auth("gcloud returned an empty token".to_string()));
    }
    Ok(token)
}

#[derive(Clone)]
enum Backend {
    Direct {
        api_key: String,
    },
    ProjectScoped {
        project: String,
        location: String,
        access_token: String,
    },
}

impl Backend {
    fn default_base_url(&self) -> String {
        match self {
            Backend::Direct { .. } => GEMINI_API_URL.to_string(),
            Backend::ProjectScoped { location, .. } if location == "global" => {
                "https://aiplatform.googleapis.com/v1".to_string()
            }
            Backend::ProjectScoped { location, .. } => {
                format!("https://{}-aiplatform.googleapis.com/v1", location)
            }
        }
    }
}

/// Response body of `generateContent`; only the fields needed to extract text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Result<String> {
        let candidate = self.candidates.first().ok_or_else(|| {
            let reason = self
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone())
                .unwrap_or_else(|| "no candidates returned".to_string());
            GeminiError::Blocked(reason)
        })?;

        let texts: Vec<&str> = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();

        if texts.is_empty() {
            return Err(GeminiError::NoText(
                candidate
                    .finish_reason
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        Ok(texts.concat())
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [&'a Content; 1],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Anything that can answer a generation request
pub trait ContentModel {
    fn model_name(&self) -> &str;

    fn generate_content(
        &self,
        content: &Content,
    ) -> impl Future<Output = Result<GenerateContentResponse>> + Send;
}

/// Long-lived handle to one hosted model
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    backend: Backend,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Handle on the direct Generative Language API, keyed by `GOOGLE_API_KEY`
    pub fn direct(config: &Config, model: &str) -> Result<Self> {
        Self::direct_with_config(config, model, GeminiClientConfig::default())
    }

    pub fn direct_with_config(
        config: &Config,
        model: &str,
        client_config: GeminiClientConfig,
    ) -> Result<Self> {
        let backend = Backend::Direct {
            api_key: config.api_key.clone().unwrap_or_default(),
        };
        Self::build(backend, model, client_config)
    }

    /// Handle bound to an already initialized project session
    pub fn project_scoped(session: &ProjectSession, model: &str) -> Result<Self> {
        Self::project_scoped_with_config(session, model, GeminiClientConfig::default())
    }

    pub fn project_scoped_with_config(
        session: &ProjectSession,
        model: &str,
        client_config: GeminiClientConfig,
    ) -> Result<Self> {
        let backend = Backend::ProjectScoped {
            project: session.project.clone(),
            location: session.location.clone(),
            access_token: session.access_token.clone(),
        };
        Self::build(backend, model, client_config)
    }

    fn build(backend: Backend, model: &str, client_config: GeminiClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(client_config.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(GeminiError::NetworkError)?;

        let base_url = client_config
            .base_url
            .unwrap_or_else(|| backend.default_base_url())
            .trim_end_matches('/')
            .to_string();

        debug!("Created client for model {} at {}", model, base_url);

        Ok(Self {
            client,
            backend,
            model: model.to_string(),
            base_url,
        })
    }

    fn generate_url(&self) -> String {
        match &self.backend {
            Backend::Direct { .. } => {
                format!("{}/models/{}:generateContent", self.base_url, self.model)
            }
            Backend::ProjectScoped {
                project, location, ..
            } => format!(
                "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                self.base_url, project, location, self.model
            ),
        }
    }

    // Credentials go in headers so they never show up in a request URL.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.backend {
            Backend::Direct { api_key } => request.header(API_KEY_HEADER, api_key),
            Backend::ProjectScoped { access_token, .. } => request.bearer_auth(access_token),
        }
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(
            self.client
                .post(url)
                .header("Content-Type", "application/json"),
        )
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        debug!("Received response with status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeminiError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeminiError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        Ok(response)
    }

    /// Models on the direct API that accept `generateContent`
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let Backend::Direct { .. } = &self.backend else {
            return Err(GeminiError::Unsupported("Model listing"));
        };

        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = reqwest::Url::parse(&format!("{}/models", self.base_url))
                .map_err(|e| GeminiError::InvalidUrl(e.to_string()))?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let request = self.authorize(self.client.get(url));
            let response = Self::check_status(request.send().await?).await?;
            let page: ListModelsResponse = response.json().await?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::supports_generate_content),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Found {} models supporting generateContent", models.len());
        Ok(models)
    }
}

impl ContentModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, content: &Content) -> Result<GenerateContentResponse> {
        let url = self.generate_url();
        let payload = GenerateContentRequest {
            contents: [content],
        };

        debug!(
            "Sending generateContent request with {} parts (model: {})",
            content.parts.len(),
            self.model
        );

        let response = Self::check_status(self.post(&url).json(&payload).send().await?).await?;
        let body: GenerateContentResponse = response.json().await?;
        Ok(body)
    }
}
