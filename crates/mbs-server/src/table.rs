//! Accessor tables: beans described by closures keyed on attribute and
//! operation name.
//!
//! Most beans are a piece of state plus a fixed set of getters, setters, and
//! operations. An [`AccessorTable`] records those closures together with
//! the matching metadata, and a [`TableBean`] pairs the table with the state
//! to make a [`ManagedBean`].

use std::collections::HashMap;
use std::sync::Arc;

use mbs_notify::{BroadcasterSupport, NotificationEmitter};
use mbs_types::{
    Attribute, AttributeInfo, BeanInfo, Impact, Notification, NotificationInfo, NotificationSource,
    ObjectRef, OperationInfo, ParameterInfo, Value,
};

use crate::bean::ManagedBean;
use crate::error::BeanError;

type Getter<T> = Box<dyn Fn(&T) -> Result<Value, BeanError> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&T, Value) -> Result<(), BeanError> + Send + Sync>;
type Operation<T> = Box<dyn Fn(&T, &[Value]) -> Result<Value, BeanError> + Send + Sync>;

/// Attribute and operation closures for beans with state `T`.
pub struct AccessorTable<T> {
    info: BeanInfo,
    interfaces: Vec<String>,
    getters: HashMap<String, Getter<T>>,
    setters: HashMap<String, Setter<T>>,
    operations: Vec<Operation<T>>,
}

impl<T> AccessorTable<T> {
    pub fn new(class_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            info: BeanInfo::new(class_name, description),
            interfaces: Vec::new(),
            getters: HashMap::new(),
            setters: HashMap::new(),
            operations: Vec::new(),
        }
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn read_only<G>(
        mut self,
        name: &str,
        type_name: &str,
        description: &str,
        getter: G,
    ) -> Self
    where
        G: Fn(&T) -> Result<Value, BeanError> + Send + Sync + 'static,
    {
        self.info
            .attributes
            .push(AttributeInfo::read_only(name, type_name, description));
        self.getters.insert(name.to_string(), Box::new(getter));
        self
    }

    pub fn read_write<G, S>(
        mut self,
        name: &str,
        type_name: &str,
        description: &str,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(&T) -> Result<Value, BeanError> + Send + Sync + 'static,
        S: Fn(&T, Value) -> Result<(), BeanError> + Send + Sync + 'static,
    {
        self.info
            .attributes
            .push(AttributeInfo::read_write(name, type_name, description));
        self.getters.insert(name.to_string(), Box::new(getter));
        self.setters.insert(name.to_string(), Box::new(setter));
        self
    }

    /// Add an operation. `parameters` lists `(name, type)` pairs; their types
    /// form the signature the operation is invoked with.
    pub fn operation<F>(
        mut self,
        name: &str,
        description: &str,
        parameters: &[(&str, &str)],
        return_type: &str,
        impact: Impact,
        body: F,
    ) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, BeanError> + Send + Sync + 'static,
    {
        self.info.operations.push(OperationInfo {
            name: name.to_string(),
            description: description.to_string(),
            parameters: parameters
                .iter()
                .map(|(n, t)| ParameterInfo::new(*n, *t))
                .collect(),
            return_type: return_type.to_string(),
            impact,
        });
        self.operations.push(Box::new(body));
        self
    }

    pub fn notification(mut self, info: NotificationInfo) -> Self {
        self.info.notifications.push(info);
        self
    }

    pub fn info(&self) -> &BeanInfo {
        &self.info
    }

    pub fn implements(&self, class_name: &str) -> bool {
        self.interfaces.iter().any(|i| i == class_name)
    }

    pub fn get(&self, target: &T, name: &str) -> Result<Value, BeanError> {
        let getter = self
            .getters
            .get(name)
            .ok_or_else(|| BeanError::AttributeNotFound(name.to_string()))?;
        getter(target)
    }

    pub fn set(&self, target: &T, attribute: Attribute) -> Result<(), BeanError> {
        match self.setters.get(&attribute.name) {
            Some(setter) => setter(target, attribute.value),
            None if self.getters.contains_key(&attribute.name) => {
                Err(BeanError::ReadOnly(attribute.name))
            }
            None => Err(BeanError::AttributeNotFound(attribute.name)),
        }
    }

    pub fn invoke(
        &self,
        target: &T,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> Result<Value, BeanError> {
        let index = self
            .info
            .operations
            .iter()
            .position(|op| op.name == operation && op.accepts(signature))
            .ok_or_else(|| {
                BeanError::OperationNotFound(format!("{operation}({})", signature.join(",")))
            })?;
        if params.len() != signature.len() {
            return Err(BeanError::operation(
                operation,
                format!("expected {} parameters, got {}", signature.len(), params.len()),
            ));
        }
        (self.operations[index])(target, params)
    }
}

/// A [`ManagedBean`] made of state and an [`AccessorTable`] over it.
///
/// Tables are shared, so many beans of one class can use one table.
pub struct TableBean<T> {
    state: T,
    table: Arc<AccessorTable<T>>,
    broadcaster: Option<BroadcasterSupport>,
}

impl<T> TableBean<T> {
    pub fn new(state: T, table: Arc<AccessorTable<T>>) -> Self {
        Self {
            state,
            table,
            broadcaster: None,
        }
    }

    /// Make the bean a notification emitter advertising the table's
    /// notification families.
    pub fn with_broadcaster(mut self) -> Self {
        self.broadcaster = Some(BroadcasterSupport::with_info(
            self.table.info().notifications.clone(),
        ));
        self
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    /// Send a notification with this bean as its raw source. Does nothing
    /// if the bean has no broadcaster.
    pub fn notify(&self, notif_type: &str, sequence: u64, message: &str) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.send_notification(Notification::new(
                notif_type,
                NotificationSource::Object(ObjectRef::of(self)),
                sequence,
                message,
            ));
        }
    }
}

impl<T: Send + Sync> ManagedBean for TableBean<T> {
    fn bean_info(&self) -> BeanInfo {
        self.table.info().clone()
    }

    fn get_attribute(&self, name: &str) -> Result<Value, BeanError> {
        self.table.get(&self.state, name)
    }

    fn set_attribute(&self, attribute: Attribute) -> Result<(), BeanError> {
        self.table.set(&self.state, attribute)
    }

    fn invoke(
        &self,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> Result<Value, BeanError> {
        self.table.invoke(&self.state, operation, params, signature)
    }

    fn is_instance_of(&self, class_name: &str) -> bool {
        self.table.implements(class_name)
    }

    fn broadcaster(&self) -> Option<&dyn NotificationEmitter> {
        self.broadcaster
            .as_ref()
            .map(|b| b as &dyn NotificationEmitter)
    }
}
