//! Errors that can legitimately surface across a public API boundary.
//!
//! Everything else — a failed repr round-trip, a reducer that can't be
//! invoked, an equality check that panics on mismatched arms — is caught
//! close to the source and converted into `comparable = false` on the
//! affected [`crate::memory::object::MemoryObject`] instead of propagating.
//! That policy lives in the modules that make the decision; this enum is
//! only for failures with no sane fallback.

use thiserror::Error;

use crate::memory::dump::PythonId;

#[derive(Debug, Error)]
pub enum DeepDumpError {
    #[error("no strategy provider matched value of kind {kind:?}")]
    NoProvider { kind: String },

    #[error("id {0:?} is not present in the memory dump")]
    UnknownId(PythonId),

    #[error("wire serialization failed: {0}")]
    Wire(#[from] serde_json::Error),

    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeepDumpError>;
