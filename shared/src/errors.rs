//! Shared error types for the outreach engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid identifier: {input}")]
    InvalidId { input: String },

    #[error("Unknown {kind}: {input}")]
    UnknownVariant { kind: &'static str, input: String },
}
