/// Errors raised by access controllers and policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecurityError {
    /// The caller may not perform this action on this target.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The bean class is not trusted to be registered.
    #[error("class not trusted: {0}")]
    Untrusted(String),

    /// A policy rule is malformed.
    #[error("invalid permission rule: {0}")]
    InvalidRule(String),
}

/// Convenience type alias for security operations.
pub type Result<T> = std::result::Result<T, SecurityError>;
