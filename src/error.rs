use thiserror::Error;

/// Per-message processing failures. None of these is fatal to the run: the
/// batch driver logs the failure and moves to the next message. Decode and
/// HTML-conversion faults never reach this level; they are recovered inside
/// body resolution by falling back to the next candidate source, and an
/// individual field-pattern miss just leaves that draft field unset.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// No usable text body anywhere in the message.
    #[error("message {id}: no usable text body found")]
    UnresolvedBody { id: String },

    /// The sender matched no known issuer; no pattern matching was run.
    #[error("unsupported issuer, sender: {sender}")]
    UnsupportedIssuer { sender: String },

    /// A dialect grammar faulted internally. The shipped grammars are total
    /// functions, so today this is only reachable through future dialects.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Validation refused the extracted draft; carries the missing fields.
    #[error("record rejected, missing fields: {}", missing.join(", "))]
    Rejected { missing: Vec<&'static str> },

    /// The mail source collaborator failed to deliver messages.
    #[error("mail source failed: {0}")]
    Source(String),
}
