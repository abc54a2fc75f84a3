//! Decoders for raw git output.
//!
//! Commit output is a stream of `<entry>` fragments with no root element and
//! no escaping of field text, so it is scanned one record at a time rather
//! than parsed as a document. Branch output is plain newline-separated text.

pub mod branch;
pub mod commit;

pub use branch::decode_branches;
pub use commit::{decode_commits, CommitDecoder, ENTRY_TEMPLATE};

use thiserror::Error;

/// A stream fault beyond what the lenient scanner tolerates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} at byte {offset}")]
pub struct DecodeError {
    pub offset: usize,
    pub reason: String,
}

impl DecodeError {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

/// Outcome of one decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep<T> {
    Record(T),
    /// A structurally complete fragment that lacks usable fields.
    Skipped(String),
    End,
}
