//! Submission collaborator contract and the shipped implementations
//!
//! The wizard only needs the call contract: fire with the validated
//! payload, observe success or failure. Transport and endpoint stay out
//! of scope.

use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of the external submission operation
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to write payload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The external submission collaborator
pub trait Submitter {
    /// Deliver a fully validated payload for `form`
    fn submit(&mut self, form: &str, payload: &JsonValue) -> Result<(), SubmitError>;
}

/// Writes the payload as pretty JSON to a fixed path
pub struct FileSubmitter {
    path: PathBuf,
}

impl FileSubmitter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Submitter for FileSubmitter {
    fn submit(&mut self, _form: &str, payload: &JsonValue) -> Result<(), SubmitError> {
        let mut body = serde_json::to_string_pretty(payload)?;
        body.push('\n');
        fs::write(&self.path, body)?;
        Ok(())
    }
}

/// Prints the payload as pretty JSON to stdout
pub struct StdoutSubmitter;

impl Submitter for StdoutSubmitter {
    fn submit(&mut self, _form: &str, payload: &JsonValue) -> Result<(), SubmitError> {
        println!("{}", serde_json::to_string_pretty(payload)?);
        Ok(())
    }
}
