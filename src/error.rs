//! The complete error kind set. `Get` never errors — bad paths and missing
//! targets both yield `Kind::Undefined` — so this type is only ever
//! returned by `Set`/`Delete`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The path does not parse, or references an unreachable index
    /// extension (writing `items.5` when only indexes `0..2` exist).
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The source document is malformed. Detected lazily — only reported
    /// once the engine actually scans the malformed region.
    #[error("invalid json at byte {at}: {reason}")]
    InvalidJson { at: usize, reason: String },

    /// `Delete` was asked to remove a target that does not exist. `Get`
    /// never returns this; it yields `Undefined` instead.
    #[error("path not found: {path:?}")]
    PathNotFound { path: String },

    /// `Set` tried to key into a non-object or index a non-array without
    /// permission to replace the intermediate value.
    #[error("type mismatch at {path:?}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// The injected value cannot be serialized (non-finite number,
    /// unrepresentable map key).
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}
