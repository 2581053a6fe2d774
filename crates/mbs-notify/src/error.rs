/// Errors from listener bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// The listener (or the exact listener, filter, and handback triple) is
    /// not registered with this emitter.
    #[error("listener not found: {0}")]
    ListenerNotFound(String),
}

/// Convenience type alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
