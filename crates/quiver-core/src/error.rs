use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Rebuild error: {0}")]
    Rebuild(String),

    #[error("Launch error: {0}")]
    Launch(String),
}

pub type Result<T> = std::result::Result<T, Error>;
