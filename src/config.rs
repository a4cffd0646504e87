use tracing::debug;

pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const PROJECT_ID_VAR: &str = "PROJECT_ID";
pub const LOCATION_VAR: &str = "LOCATION";
pub const ACCESS_TOKEN_VAR: &str = "GOOGLE_ACCESS_TOKEN";
pub const DEFAULT_LOCATION: &str = "us-west1";

/// Process-wide settings, read once at startup and passed to whatever needs them.
///
/// Nothing is validated here: a missing API key is only noticed when the
/// vendor rejects the first request.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub location: String,
    /// Overrides the token minted through `gcloud` for the project-scoped backend
    pub access_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            project_id: None,
            location: DEFAULT_LOCATION.to_string(),
            access_token: None,
        }
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load `.env` (if any) into the process environment, then read it.
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {:?}", path),
            Err(e) => debug!("No .env file loaded: {}", e),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

        Self {
            api_key: read(API_KEY_VAR),
            project_id: read(PROJECT_ID_VAR),
            location: read(LOCATION_VAR).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            access_token: read(ACCESS_TOKEN_VAR),
        }
    }
}
