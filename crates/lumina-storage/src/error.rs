use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no data directory available on this system")]
    NoDataDir,

    #[error("read failed for key {key}: {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },

    #[error("write failed for key {key}: {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },

    #[error("remove failed for key {key}: {source}")]
    Remove {
        key: String,
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
