//! Bean classes and the loaders that find them.
//!
//! A [`BeanClass`] is a named constructor for beans. Classes are found
//! through [`ClassLoader`]s: the server's own [`ClassPath`], and any
//! registered class-loader beans, which the server keeps in its
//! [`ClassLoaderRepository`] in registration order.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use mbs_types::{ObjectName, Value};
use tracing::debug;

use crate::bean::ManagedBean;
use crate::error::BeanError;

/// Constructs a bean from constructor parameters and their signature.
pub type BeanFactory =
    Arc<dyn Fn(&[Value], &[String]) -> Result<Arc<dyn ManagedBean>, BeanError> + Send + Sync>;

/// A named bean constructor. A class without a factory is abstract.
#[derive(Clone)]
pub struct BeanClass {
    name: String,
    factory: Option<BeanFactory>,
    interfaces: Vec<String>,
}

impl BeanClass {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[Value], &[String]) -> Result<Arc<dyn ManagedBean>, BeanError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Some(Arc::new(factory)),
            interfaces: Vec::new(),
        }
    }

    /// A class that cannot be instantiated.
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factory: None,
            interfaces: Vec::new(),
        }
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub(crate) fn factory(&self) -> Option<&BeanFactory> {
        self.factory.as_ref()
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanClass")
            .field("name", &self.name)
            .field("abstract", &self.is_abstract())
            .field("interfaces", &self.interfaces)
            .finish()
    }
}

/// Resolves class names to bean classes.
pub trait ClassLoader: Send + Sync {
    fn load_class(&self, name: &str) -> Option<BeanClass>;
}

/// The server's own class loader: a table of defined classes.
#[derive(Default)]
pub struct ClassPath {
    classes: RwLock<HashMap<String, BeanClass>>,
}

impl ClassPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `class`, replacing (and returning) any class of the same name.
    pub fn define(&self, class: BeanClass) -> Option<BeanClass> {
        debug!(class = class.name(), "defining bean class");
        self.classes
            .write()
            .expect("class path lock poisoned")
            .insert(class.name.clone(), class)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes
            .read()
            .expect("class path lock poisoned")
            .contains_key(name)
    }

    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes
            .read()
            .expect("class path lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl ClassLoader for ClassPath {
    fn load_class(&self, name: &str) -> Option<BeanClass> {
        self.classes
            .read()
            .expect("class path lock poisoned")
            .get(name)
            .cloned()
    }
}

/// A class together with the loader that found it.
#[derive(Clone)]
pub struct LoadedClass {
    pub class: BeanClass,
    pub loader: Arc<dyn ClassLoader>,
}

/// Registered class-loader beans, searched in registration order.
#[derive(Default)]
pub struct ClassLoaderRepository {
    loaders: RwLock<Vec<(ObjectName, Arc<dyn ClassLoader>)>>,
}

impl ClassLoaderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, name: ObjectName, loader: Arc<dyn ClassLoader>) {
        debug!(name = %name, "class loader added");
        self.loaders
            .write()
            .expect("loader repository lock poisoned")
            .push((name, loader));
    }

    /// Remove the loader registered under `name`. Returns whether there was
    /// one.
    pub fn remove(&self, name: &ObjectName) -> bool {
        let mut loaders = self
            .loaders
            .write()
            .expect("loader repository lock poisoned");
        let before = loaders.len();
        loaders.retain(|(n, _)| n != name);
        let removed = loaders.len() != before;
        if removed {
            debug!(name = %name, "class loader removed");
        }
        removed
    }

    pub fn get(&self, name: &ObjectName) -> Option<Arc<dyn ClassLoader>> {
        self.loaders
            .read()
            .expect("loader repository lock poisoned")
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, loader)| Arc::clone(loader))
    }

    /// The first registered loader that knows `name`.
    pub fn load_class(&self, name: &str) -> Option<LoadedClass> {
        // Snapshot so loaders run without the lock held.
        let loaders: Vec<Arc<dyn ClassLoader>> = self
            .loaders
            .read()
            .expect("loader repository lock poisoned")
            .iter()
            .map(|(_, loader)| Arc::clone(loader))
            .collect();
        loaders.into_iter().find_map(|loader| {
            loader
                .load_class(name)
                .map(|class| LoadedClass { class, loader })
        })
    }

    pub fn len(&self) -> usize {
        self.loaders
            .read()
            .expect("loader repository lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_path_with(names: &[&str]) -> Arc<ClassPath> {
        let cp = Arc::new(ClassPath::new());
        for name in names {
            cp.define(BeanClass::abstract_class(*name));
        }
        cp
    }

    #[test]
    fn class_path_define_and_load() {
        let cp = class_path_with(&["app.Cache"]);
        assert!(cp.contains("app.Cache"));
        assert!(cp.load_class("app.Cache").unwrap().is_abstract());
        assert!(cp.load_class("app.Pool").is_none());
        assert!(cp.define(BeanClass::abstract_class("app.Cache")).is_some());
        assert_eq!(cp.class_names(), vec!["app.Cache"]);
    }

    #[test]
    fn repository_searches_in_registration_order() {
        let first = class_path_with(&["shared.Thing"]);
        let second = class_path_with(&["shared.Thing", "only.Second"]);
        let clr = ClassLoaderRepository::new();
        let first_name = ObjectName::parse("loaders:id=1").unwrap();
        clr.add(first_name.clone(), first.clone());
        clr.add(ObjectName::parse("loaders:id=2").unwrap(), second.clone());

        let found = clr.load_class("shared.Thing").unwrap();
        let first_dyn: Arc<dyn ClassLoader> = first;
        assert!(Arc::ptr_eq(&found.loader, &first_dyn));
        assert!(clr.load_class("only.Second").is_some());
        assert!(clr.load_class("nowhere.Else").is_none());

        assert!(clr.remove(&first_name));
        assert!(!clr.remove(&first_name));
        assert_eq!(clr.len(), 1);
        assert!(clr.get(&first_name).is_none());
    }

    #[test]
    fn interfaces_recorded() {
        let class = BeanClass::abstract_class("app.Cache").implementing("app.Evictable");
        assert_eq!(class.interfaces(), &["app.Evictable".to_string()]);
        assert_eq!(class.name(), "app.Cache");
    }
}
