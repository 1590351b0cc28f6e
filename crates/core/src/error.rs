use std::io;

use room404_proto::{DecodeError, EncodeError};
use thiserror::Error;

/// Boxed cause reported by a save backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The save backend reported a failure.
///
/// The controller does not distinguish causes; the underlying error is kept as
/// the source for logging.
#[derive(Debug, Error)]
#[error("save failed: {source}")]
pub struct SaveFailed {
    #[source]
    source: BoxError,
}

impl SaveFailed {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Errors raised by the file-backed document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("corrupt document: {0}")]
    Decode(#[from] DecodeError),
}

impl From<StoreError> for SaveFailed {
    fn from(err: StoreError) -> Self {
        SaveFailed::new(err)
    }
}
