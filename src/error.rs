use thiserror::Error;

#[derive(Error, Debug)]
pub enum RfpError {
    #[error("Not in an rfpdesk project. Run 'rfpdesk init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .rfpdesk/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Submission snapshot already recorded; snapshots are immutable")]
    SnapshotAlreadyRecorded,

    #[error("Partial delete: {0}")]
    PartialDelete(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Loro error: {0}")]
    Loro(#[from] loro::LoroError),

    #[error("Loro encode error: {0}")]
    LoroEncode(#[from] loro::LoroEncodeError),
}

pub type Result<T> = std::result::Result<T, RfpError>;
