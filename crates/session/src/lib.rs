//! Editing sessions hosting an autosave controller.
pub mod session;

pub use session::{DEFAULT_POLL_INTERVAL, SessionCmd, SessionHandle, open, spawn};
