use std::sync::Arc;

use mbs_types::Value;
use tracing::debug;

use crate::bean::ManagedBean;
use crate::class::{BeanClass, ClassLoader, ClassLoaderRepository, ClassPath, LoadedClass};
use crate::error::{ServerError, ServerResult};

/// Finds bean classes and constructs beans from them.
pub trait Instantiator: Send + Sync {
    /// Look `class_name` up on the server class path, then in the class
    /// loader repository.
    fn find_class(&self, class_name: &str) -> ServerResult<LoadedClass>;

    /// Look `class_name` up in one specific loader.
    fn find_class_in(
        &self,
        class_name: &str,
        loader: Arc<dyn ClassLoader>,
    ) -> ServerResult<LoadedClass>;

    /// Can beans of this class be created at all?
    fn test_creation(&self, class: &BeanClass) -> ServerResult<()>;

    fn instantiate(
        &self,
        class: &BeanClass,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<Arc<dyn ManagedBean>>;

    /// The repository class-loader beans join when they are registered.
    /// `None` when dynamic class loaders are disabled.
    fn class_loader_repository(&self) -> Option<&ClassLoaderRepository>;

    /// The server's own class loader.
    fn server_loader(&self) -> Arc<dyn ClassLoader>;
}

/// Instantiator over a [`ClassPath`] and an optional
/// [`ClassLoaderRepository`].
pub struct DefaultInstantiator {
    class_path: Arc<ClassPath>,
    loaders: Option<ClassLoaderRepository>,
}

impl DefaultInstantiator {
    pub fn new(class_path: Arc<ClassPath>, allow_dynamic_class_loaders: bool) -> Self {
        Self {
            class_path,
            loaders: allow_dynamic_class_loaders.then(ClassLoaderRepository::new),
        }
    }

    pub fn class_path(&self) -> &Arc<ClassPath> {
        &self.class_path
    }
}

impl Instantiator for DefaultInstantiator {
    fn find_class(&self, class_name: &str) -> ServerResult<LoadedClass> {
        if let Some(class) = self.class_path.load_class(class_name) {
            return Ok(LoadedClass {
                class,
                loader: self.server_loader(),
            });
        }
        self.loaders
            .as_ref()
            .and_then(|clr| clr.load_class(class_name))
            .ok_or_else(|| ServerError::Reflection(format!("class not found: {class_name}")))
    }

    fn find_class_in(
        &self,
        class_name: &str,
        loader: Arc<dyn ClassLoader>,
    ) -> ServerResult<LoadedClass> {
        let class = loader
            .load_class(class_name)
            .ok_or_else(|| ServerError::Reflection(format!("class not found: {class_name}")))?;
        Ok(LoadedClass { class, loader })
    }

    fn test_creation(&self, class: &BeanClass) -> ServerResult<()> {
        if class.is_abstract() {
            return Err(ServerError::NotCompliant(format!(
                "class {} is abstract and cannot be instantiated",
                class.name()
            )));
        }
        Ok(())
    }

    fn instantiate(
        &self,
        class: &BeanClass,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<Arc<dyn ManagedBean>> {
        if params.len() != signature.len() {
            return Err(ServerError::IllegalArgument(format!(
                "{} parameters but a signature of {} types",
                params.len(),
                signature.len()
            )));
        }
        let factory = class.factory().ok_or_else(|| {
            ServerError::NotCompliant(format!("class {} is abstract", class.name()))
        })?;
        debug!(class = class.name(), "instantiating bean");
        factory(params, signature).map_err(|e| {
            ServerError::Reflection(format!("constructor of {} failed: {e}", class.name()))
        })
    }

    fn class_loader_repository(&self) -> Option<&ClassLoaderRepository> {
        self.loaders.as_ref()
    }

    fn server_loader(&self) -> Arc<dyn ClassLoader> {
        self.class_path.clone()
    }
}
