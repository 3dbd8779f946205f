use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config Error: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Yaml Error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Detector Error: {0}")]
    Detector(String),

    #[error("Tracker Error: {0}")]
    Tracker(String),

    #[error("Frame Source Error: {0}")]
    Source(String),

    #[error("Worker Error: {0}")]
    Worker(String),
}
