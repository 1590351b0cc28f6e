//! Autosave building blocks for room404 editing sessions.
pub mod autosave;
pub mod debounce;
pub mod error;
pub mod sink;
pub mod store;

pub use autosave::{AutosaveConfig, AutosaveController};
pub use debounce::Debouncer;
pub use error::{BoxError, SaveFailed, StoreError};
pub use room404_proto::SaveStatus;
pub use sink::SaveSink;
pub use store::DocumentStore;
