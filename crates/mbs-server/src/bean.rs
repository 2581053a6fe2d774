use std::sync::Arc;

use mbs_notify::{NotificationEmitter, NotificationListener};
use mbs_types::{Attribute, AttributeList, BeanInfo, ObjectName, Value};

use crate::class::ClassLoader;
use crate::error::BeanError;

/// A managed bean: anything the server can register, introspect, and
/// dispatch attribute reads, writes, and operations to.
///
/// Optional capabilities are exposed through accessors rather than
/// discovered at runtime. A bean that emits notifications returns its
/// emitter from [`broadcaster`](Self::broadcaster); one that wants the
/// registration hooks returns itself from
/// [`registration`](Self::registration).
pub trait ManagedBean: Send + Sync {
    /// The bean's metadata. The class name in it identifies the bean to
    /// permission checks and queries.
    fn bean_info(&self) -> BeanInfo;

    fn get_attribute(&self, name: &str) -> Result<Value, BeanError>;

    fn set_attribute(&self, attribute: Attribute) -> Result<(), BeanError>;

    /// Read several attributes. Attributes that cannot be read are left out.
    fn get_attributes(&self, names: &[String]) -> AttributeList {
        names
            .iter()
            .filter_map(|name| {
                self.get_attribute(name)
                    .ok()
                    .map(|value| Attribute::new(name.as_str(), value))
            })
            .collect()
    }

    /// Write several attributes, returning the ones that were written.
    fn set_attributes(&self, attributes: AttributeList) -> AttributeList {
        attributes
            .into_iter()
            .filter(|attribute| self.set_attribute(attribute.clone()).is_ok())
            .collect()
    }

    fn invoke(
        &self,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> Result<Value, BeanError>;

    /// Does the bean claim to be an instance of `class_name` beyond its own
    /// class (an interface it implements, say)?
    fn is_instance_of(&self, _class_name: &str) -> bool {
        false
    }

    fn registration(&self) -> Option<&dyn BeanRegistration> {
        None
    }

    fn broadcaster(&self) -> Option<&dyn NotificationEmitter> {
        None
    }

    /// The bean as a notification listener, if it is one.
    fn as_listener(self: Arc<Self>) -> Option<Arc<dyn NotificationListener>> {
        None
    }

    /// The bean as a class loader, if it is one. Class loader beans join
    /// the server's class loader repository while registered.
    fn as_class_loader(self: Arc<Self>) -> Option<Arc<dyn ClassLoader>> {
        None
    }
}

/// Hooks a bean can implement to take part in its own registration.
pub trait BeanRegistration: Send + Sync {
    /// Called before registration with the requested name, which may be
    /// absent. Returns the name to register under; returning `None` aborts
    /// the registration.
    fn pre_register(&self, name: Option<&ObjectName>) -> Result<Option<ObjectName>, BeanError> {
        Ok(name.cloned())
    }

    /// Called once registration has succeeded or failed.
    fn post_register(&self, _registered: bool) {}

    /// Called before unregistration. An error keeps the bean registered.
    fn pre_deregister(&self) -> Result<(), BeanError> {
        Ok(())
    }

    fn post_deregister(&self) {}
}
