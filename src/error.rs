//! Crate-wide error type. Internal invariant violations still use
//! `assert!`/`panic!` (a broken hash table or a dangling ref is a bug,
//! not recoverable input); `EngineError` is reserved for things a CLI
//! user can actually cause: a bad file, a bad command, a network that
//! fails its own consistency check.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no network loaded")]
    NoNetwork,

    #[error("I/O error reading {path}: {source}")]
    Io { path: String, #[source] source: std::io::Error },

    #[error("malformed AIGER file: {0}")]
    BadAiger(String),

    #[error("AIGER file declares a liveness section (J/F counts); not supported")]
    UnsupportedLiveness,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(String),

    #[error("network failed consistency check: {0}")]
    CheckFailed(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
