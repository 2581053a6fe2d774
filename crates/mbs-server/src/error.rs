use mbs_notify::NotifyError;
use mbs_repository::RepositoryError;
use mbs_security::SecurityError;
use mbs_types::{ObjectName, TypeError};
use thiserror::Error;

/// Failures raised by a bean while reading, writing, or invoking it, or from
/// one of its registration hooks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeanError {
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("attribute is read-only: {0}")]
    ReadOnly(String),

    #[error("invalid value for attribute {name}: {reason}")]
    InvalidAttributeValue { name: String, reason: String },

    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("operation {name} failed: {reason}")]
    Operation { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

impl BeanError {
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttributeValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn operation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Operation {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServerError {
    /// A pattern where a concrete name is required, or a malformed name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("instance not found: {0}")]
    NotFound(ObjectName),

    #[error("instance already exists: {0}")]
    AlreadyExists(ObjectName),

    #[error("not compliant: {0}")]
    NotCompliant(String),

    /// Class lookup or construction failed.
    #[error("reflection error: {0}")]
    Reflection(String),

    #[error("operation not supported: {0}")]
    OperationNotSupported(String),

    #[error("listener not found: {0}")]
    ListenerNotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(#[from] SecurityError),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// A registration hook vetoed or failed.
    #[error("registration hook failed: {0}")]
    Registration(BeanError),

    #[error(transparent)]
    Bean(#[from] BeanError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RepositoryError> for ServerError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(name) => Self::NotFound(name),
            RepositoryError::AlreadyExists(name) => Self::AlreadyExists(name),
            RepositoryError::PatternName(name) => Self::InvalidName(name.to_string()),
            RepositoryError::ReservedDomain(domain) => {
                Self::IllegalArgument(format!("domain {domain} is reserved"))
            }
        }
    }
}

impl From<NotifyError> for ServerError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::ListenerNotFound(msg) => Self::ListenerNotFound(msg),
        }
    }
}

impl From<TypeError> for ServerError {
    fn from(err: TypeError) -> Self {
        Self::InvalidName(err.to_string())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_to_server_taxonomy() {
        let name = ObjectName::parse("app:type=Cache").unwrap();
        assert_eq!(
            ServerError::from(RepositoryError::AlreadyExists(name.clone())),
            ServerError::AlreadyExists(name.clone())
        );
        assert_eq!(
            ServerError::from(RepositoryError::NotFound(name.clone())),
            ServerError::NotFound(name)
        );
        assert!(matches!(
            ServerError::from(RepositoryError::ReservedDomain("JMImplementation".into())),
            ServerError::IllegalArgument(_)
        ));
    }

    #[test]
    fn bean_errors_display() {
        let e = ServerError::from(BeanError::operation("flush", "disk full"));
        assert_eq!(e.to_string(), "operation flush failed: disk full");
        let e = ServerError::Registration(BeanError::Failed("veto".into()));
        assert_eq!(e.to_string(), "registration hook failed: veto");
    }
}
