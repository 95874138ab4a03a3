use thiserror::Error;

#[derive(Debug, Error)]
pub enum MddfError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid setup: {0}")]
    Invalid(String),
    #[error("mismatch: {0}")]
    Mismatch(String),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("failed to read frame {frame}: {reason}")]
    FrameRead { frame: usize, reason: String },
    #[error("cannot merge partial results: {0}")]
    Merge(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type MddfResult<T> = Result<T, MddfError>;

impl From<serde_json::Error> for MddfError {
    fn from(err: serde_json::Error) -> Self {
        MddfError::Parse(err.to_string())
    }
}
