//! The [`Repository`] trait defining the bean storage interface.

use mbs_types::ObjectName;

use crate::error::Result;

/// An object together with the name it is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedObject<T> {
    pub name: ObjectName,
    pub object: T,
}

impl<T> NamedObject<T> {
    pub fn new(name: ObjectName, object: T) -> Self {
        Self { name, object }
    }
}

/// Storage backend mapping concrete object names to objects.
///
/// Implementations must be thread-safe (`Send + Sync`); each individual
/// operation is atomic with respect to the others. Callers that need several
/// operations to appear atomic (lookup-then-remove, say) serialise them
/// themselves.
pub trait Repository<T>: Send + Sync
where
    T: Clone + Send + Sync,
{
    /// The domain used for names that have none.
    fn default_domain(&self) -> &str;

    /// Bind `object` to `name`.
    ///
    /// Fails with `AlreadyExists` if the name is bound, `PatternName` if the
    /// name is a pattern.
    fn insert(&self, name: &ObjectName, object: T) -> Result<()>;

    /// Unbind `name`, returning the object that was bound to it.
    fn remove(&self, name: &ObjectName) -> Result<T>;

    /// The object bound to `name`.
    ///
    /// Returns `Ok(None)` if nothing is bound, or if `name` is a pattern.
    fn lookup(&self, name: &ObjectName) -> Result<Option<T>>;

    /// All bound objects whose names match `pattern`.
    ///
    /// `None` means "everything". A concrete name returns at most one entry.
    fn query(&self, pattern: Option<&ObjectName>) -> Result<Vec<NamedObject<T>>>;

    /// Domains that currently hold at least one object.
    fn domains(&self) -> Result<Vec<String>>;

    /// Total number of bound objects.
    fn count(&self) -> usize;

    /// Is anything bound to `name`?
    fn contains(&self, name: &ObjectName) -> Result<bool> {
        Ok(self.lookup(name)?.is_some())
    }
}
