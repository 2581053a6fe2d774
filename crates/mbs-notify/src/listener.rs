use std::any::Any;
use std::sync::Arc;

use mbs_types::{Notification, ObjectRef};

/// Opaque value a client attaches when it registers a listener; handed back
/// unchanged with every delivery. Compared by pointer identity.
pub type Handback = Arc<dyn Any + Send + Sync>;

/// Receives notifications.
pub trait NotificationListener: Send + Sync {
    fn handle_notification(&self, notification: Notification, handback: Option<&Handback>);
}

impl<F> NotificationListener for F
where
    F: Fn(Notification, Option<&Handback>) + Send + Sync,
{
    fn handle_notification(&self, notification: Notification, handback: Option<&Handback>) {
        self(notification, handback)
    }
}

/// Decides, before delivery, whether a listener wants a notification.
pub trait NotificationFilter: Send + Sync {
    fn is_enabled(&self, notification: &Notification) -> bool;
}

/// Enables notifications whose type starts with one of the given prefixes.
///
/// A filter with no prefixes enables nothing.
#[derive(Clone, Debug, Default)]
pub struct TypeFilter {
    prefixes: Vec<String>,
}

impl TypeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    pub fn disable(&mut self, prefix: &str) {
        self.prefixes.retain(|p| p != prefix);
    }

    pub fn enabled_types(&self) -> &[String] {
        &self.prefixes
    }
}

impl NotificationFilter for TypeFilter {
    fn is_enabled(&self, notification: &Notification) -> bool {
        self.prefixes
            .iter()
            .any(|p| notification.notif_type.starts_with(p.as_str()))
    }
}

pub(crate) fn same_listener(a: &Arc<dyn NotificationListener>, b: &Arc<dyn NotificationListener>) -> bool {
    ObjectRef::of_arc(a) == ObjectRef::of_arc(b)
}

pub(crate) fn same_filter(
    a: Option<&Arc<dyn NotificationFilter>>,
    b: Option<&Arc<dyn NotificationFilter>>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ObjectRef::of_arc(a) == ObjectRef::of_arc(b),
        _ => false,
    }
}

pub(crate) fn same_handback(a: Option<&Handback>, b: Option<&Handback>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ObjectRef::of_arc(a) == ObjectRef::of_arc(b),
        _ => false,
    }
}
