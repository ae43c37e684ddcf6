use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaleWobError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Command execution failures cross the wire verbatim in the response
    /// `error` field, so this variant carries the raw message text.
    #[error("{0}")]
    Command(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Launcher error: {0}")]
    Launcher(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type ScaleWobResult<T> = Result<T, ScaleWobError>;
