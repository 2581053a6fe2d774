use crate::error::Result;
use crate::permission::Permission;

/// Decides whether a caller may perform an action.
///
/// The server consults its access controller before every operation that
/// reads or changes a bean. A server built without one performs no checks
/// at all, which is not the same as installing [`AllowAll`]: with a
/// controller present the plural operations also filter per element.
pub trait AccessController: Send + Sync {
    /// Check a single permission.
    fn check(&self, permission: &Permission) -> Result<()>;

    /// May beans of this class be registered at all?
    fn check_trust(&self, _class_name: &str) -> Result<()> {
        Ok(())
    }
}

/// An access controller that permits everything.
pub struct AllowAll;

impl AccessController for AllowAll {
    fn check(&self, _permission: &Permission) -> Result<()> {
        Ok(())
    }
}
