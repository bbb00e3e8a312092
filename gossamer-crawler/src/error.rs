use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a [`PageDriver`](crate::driver::PageDriver)
/// implementation.
///
/// Only `Session` is fatal to a scan; everything else is caught at the
/// smallest enclosing scope and downgraded to a logged skip.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("browser session could not be started: {0}")]
    Session(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page did not become ready within {0:?}")]
    Timeout(Duration),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("element not found: {0}")]
    NotFound(String),

    #[error("operation not supported by this driver: {0}")]
    Unsupported(&'static str),
}

impl DriverError {
    /// True for the only error class that aborts an entire scan.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DriverError::Session(_))
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
