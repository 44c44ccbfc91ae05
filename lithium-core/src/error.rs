use thiserror::Error;

#[derive(Error, Debug)]
pub enum LithiumError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] rusqlite::Error),

    #[error("Thumbnail store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, LithiumError>;
