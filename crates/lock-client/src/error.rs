/// Errors from the lock client.
///
/// A refused acquire and a release of a lock the caller does not hold are
/// not errors; those come back as `Ok(false)`. Everything here means the
/// question could not be asked or answered.
#[derive(Debug, thiserror::Error)]
pub enum LockClientError {
    /// The HTTP request failed (network, DNS, TLS, timeout) or the response
    /// body could not be decoded.
    #[error("Lock service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The lock service rejected the credential (401/403).
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The lock service returned any other non-2xx status.
    #[error("Lock service error ({status}): {body}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Input or configuration rejected before any request was sent.
    #[error("Invalid lock request: {0}")]
    Validation(String),

    /// A background task was requested outside a tokio runtime.
    #[error("No tokio runtime available to run {0}")]
    NoRuntime(&'static str),
}

impl LockClientError {
    /// `true` for failures where a cached answer is better than none.
    pub fn is_transport(&self) -> bool {
        matches!(self, LockClientError::Transport(_))
    }
}
