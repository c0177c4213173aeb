#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    NoConfigDir,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Empty payload from {0}")]
    EmptyPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown widget: {0}")]
    UnknownWidget(String),

    #[error("Widget {widget} has no function {function}")]
    UnknownFunction { widget: String, function: String },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
