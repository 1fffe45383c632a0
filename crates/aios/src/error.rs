//! Error types for AIOS.
//!
//! Every failure class resolves to a printed message and a return to the
//! prompt loop; nothing here is allowed to terminate the process.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    /// Inference produced no usable classification. Degrades to a hint,
    /// never retried.
    #[error("could not classify that request")]
    Classification,

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Multiple candidates matched; the operator must re-specify.
    #[error("ambiguous target ({} candidates)", .0.len())]
    Ambiguous(Vec<String>),

    #[error("protected system process (pid {0})")]
    Protected(i32),

    #[error("inference backend error: {0}")]
    Inference(String),

    /// The classified action needs an argument the reply did not carry.
    #[error("argument not recognized")]
    MissingArgument,

    /// The operator declined a destructive confirmation.
    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// True when the failure is a privilege problem the operator can fix
    /// by re-running with sudo.
    pub fn is_permission(&self) -> bool {
        matches!(self, ActionError::Permission(_))
    }
}
