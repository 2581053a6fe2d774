//! In-memory repository for the managed bean server.
//!
//! [`InMemoryRepository`] keeps one table per domain, each keyed by the
//! canonical key property list, behind a single `RwLock`. Pattern queries
//! first select domains by wildcard match and then filter entries by key
//! properties, so a query confined to one domain never visits the others.

use std::collections::HashMap;
use std::sync::RwLock;

use mbs_types::{wildmatch, ObjectName};
use tracing::trace;

use crate::error::{RepositoryError, Result};
use crate::traits::{NamedObject, Repository};

/// Domain reserved for the server's own beans.
pub const RESERVED_DOMAIN: &str = "JMImplementation";

struct Inner<T> {
    /// domain -> canonical key property list -> entry
    domains: HashMap<String, HashMap<String, NamedObject<T>>>,
    count: usize,
}

/// An in-memory implementation of [`Repository`].
///
/// Data is lost when the repository is dropped.
pub struct InMemoryRepository<T> {
    default_domain: String,
    inner: RwLock<Inner<T>>,
}

impl<T> InMemoryRepository<T> {
    /// Create an empty repository whose default domain is `default_domain`.
    pub fn new(default_domain: impl Into<String>) -> Self {
        let default_domain = default_domain.into();
        let mut domains = HashMap::new();
        domains.insert(default_domain.clone(), HashMap::new());
        Self {
            default_domain,
            inner: RwLock::new(Inner { domains, count: 0 }),
        }
    }

    fn resolve(&self, name: &ObjectName) -> ObjectName {
        name.with_default_domain(&self.default_domain)
    }
}

impl<T: Clone> InMemoryRepository<T> {
    fn collect_matching(
        table: &HashMap<String, NamedObject<T>>,
        pattern: &ObjectName,
        out: &mut Vec<NamedObject<T>>,
    ) {
        if pattern.is_property_pattern() && pattern.properties().is_empty() {
            out.extend(table.values().cloned());
        } else {
            out.extend(
                table
                    .values()
                    .filter(|entry| pattern.matches_properties(&entry.name))
                    .cloned(),
            );
        }
    }
}

impl<T> Repository<T> for InMemoryRepository<T>
where
    T: Clone + Send + Sync,
{
    fn default_domain(&self) -> &str {
        &self.default_domain
    }

    fn insert(&self, name: &ObjectName, object: T) -> Result<()> {
        let name = self.resolve(name);
        if name.is_pattern() {
            return Err(RepositoryError::PatternName(name));
        }

        let mut inner = self.inner.write().expect("repository lock poisoned");
        let domain = name.domain().to_string();

        if domain == RESERVED_DOMAIN
            && domain != self.default_domain
            && inner.domains.contains_key(RESERVED_DOMAIN)
        {
            return Err(RepositoryError::ReservedDomain(domain));
        }

        let key = name.canonical_key_properties();
        let table = inner.domains.entry(domain).or_default();
        if table.contains_key(&key) {
            return Err(RepositoryError::AlreadyExists(name));
        }
        trace!(name = %name, "bound");
        table.insert(key, NamedObject::new(name, object));
        inner.count += 1;
        Ok(())
    }

    fn remove(&self, name: &ObjectName) -> Result<T> {
        let name = self.resolve(name);
        let mut inner = self.inner.write().expect("repository lock poisoned");

        let domain = name.domain();
        let table = inner
            .domains
            .get_mut(domain)
            .ok_or_else(|| RepositoryError::NotFound(name.clone()))?;
        let removed = table
            .remove(&name.canonical_key_properties())
            .ok_or_else(|| RepositoryError::NotFound(name.clone()))?;

        if table.is_empty() && domain != self.default_domain {
            inner.domains.remove(domain);
        }
        inner.count -= 1;
        trace!(name = %name, "unbound");
        Ok(removed.object)
    }

    fn lookup(&self, name: &ObjectName) -> Result<Option<T>> {
        if name.is_pattern() {
            return Ok(None);
        }
        let name = self.resolve(name);
        let inner = self.inner.read().expect("repository lock poisoned");
        Ok(inner
            .domains
            .get(name.domain())
            .and_then(|table| table.get(&name.canonical_key_properties()))
            .map(|entry| entry.object.clone()))
    }

    fn query(&self, pattern: Option<&ObjectName>) -> Result<Vec<NamedObject<T>>> {
        let pattern = pattern
            .map(|p| self.resolve(p))
            .unwrap_or_else(ObjectName::wildcard);

        let mut result = Vec::new();
        if !pattern.is_pattern() {
            let inner = self.inner.read().expect("repository lock poisoned");
            if let Some(entry) = inner
                .domains
                .get(pattern.domain())
                .and_then(|table| table.get(&pattern.canonical_key_properties()))
            {
                result.push(entry.clone());
            }
            return Ok(result);
        }

        let inner = self.inner.read().expect("repository lock poisoned");
        if pattern.is_domain_pattern() {
            for (domain, table) in &inner.domains {
                if wildmatch(domain, pattern.domain()) {
                    Self::collect_matching(table, &pattern, &mut result);
                }
            }
        } else if let Some(table) = inner.domains.get(pattern.domain()) {
            Self::collect_matching(table, &pattern, &mut result);
        }

        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    fn domains(&self) -> Result<Vec<String>> {
        let inner = self.inner.read().expect("repository lock poisoned");
        let mut domains: Vec<String> = inner
            .domains
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(domain, _)| domain.clone())
            .collect();
        domains.sort();
        Ok(domains)
    }

    fn count(&self) -> usize {
        self.inner.read().expect("repository lock poisoned").count
    }
}

impl<T> std::fmt::Debug for InMemoryRepository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.inner.read().map(|inner| inner.count).unwrap_or(0);
        f.debug_struct("InMemoryRepository")
            .field("default_domain", &self.default_domain)
            .field("count", &count)
            .finish()
    }
}
