use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Failed to run '{program}': {message}")]
    CommandSpawn { program: String, message: String },

    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Cloudflare API error: {0}")]
    Cloudflare(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled by user")]
    UserCancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FleetError {
    fn from(err: reqwest::Error) -> Self {
        FleetError::Http(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
