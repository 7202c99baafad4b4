use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed client state: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("expected integer after '{0}', but didn't find one")]
    Extraction(String),

    #[error("failed to open log stream {}: {}", path.display(), source)]
    StreamOpen {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("server error: {0}")]
    Server(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
