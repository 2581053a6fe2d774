//! Listener wrappers and the weak table that lets the server reuse them.
//!
//! A bean that emits a notification about itself sets the source to its own
//! identity ([`NotificationSource::Object`]). Clients registered through the
//! server must see the bean's registered name instead, so the server hands
//! the bean a [`ListenerWrapper`] rather than the client's listener. The
//! same client listener registered twice on the same bean must map to the
//! same wrapper, or removing it would not find the registration.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use mbs_types::{Notification, NotificationSource, ObjectName, ObjectRef};
use tracing::trace;

use crate::listener::{Handback, NotificationListener};

/// Forwards to a client listener, replacing a raw bean source with the
/// bean's registered name.
pub struct ListenerWrapper {
    listener: Arc<dyn NotificationListener>,
    name: ObjectName,
    bean: ObjectRef,
}

impl ListenerWrapper {
    pub fn new(listener: Arc<dyn NotificationListener>, name: ObjectName, bean: ObjectRef) -> Self {
        Self {
            listener,
            name,
            bean,
        }
    }

    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    pub fn bean(&self) -> ObjectRef {
        self.bean
    }

    /// Identity of the wrapped client listener.
    pub fn listener_ref(&self) -> ObjectRef {
        ObjectRef::of_arc(&self.listener)
    }

    /// The wrapper as the listener a broadcaster stores.
    pub fn as_listener(self: &Arc<Self>) -> Arc<dyn NotificationListener> {
        self.clone()
    }
}

impl NotificationListener for ListenerWrapper {
    fn handle_notification(&self, mut notification: Notification, handback: Option<&Handback>) {
        if notification.is_from_object(self.bean) {
            notification.source = NotificationSource::Name(self.name.clone());
        }
        self.listener.handle_notification(notification, handback);
    }
}

/// Listener identity, bean identity, and name by value.
impl PartialEq for ListenerWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.listener_ref() == other.listener_ref()
            && self.bean == other.bean
            && self.name == other.name
    }
}

impl Eq for ListenerWrapper {}

impl std::hash::Hash for ListenerWrapper {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.listener_ref().addr() ^ self.bean.addr()).hash(state);
    }
}

impl fmt::Debug for ListenerWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerWrapper")
            .field("listener", &self.listener_ref())
            .field("name", &self.name)
            .field("bean", &self.bean)
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct WrapperKey {
    listener: ObjectRef,
    bean: ObjectRef,
}

/// Weak table of live wrappers.
///
/// The table never keeps a wrapper alive; the broadcaster it was handed to
/// does. Entries whose wrapper is gone are pruned lazily on access, and
/// eagerly through [`WrapperTable::release`].
#[derive(Default)]
pub struct WrapperTable {
    entries: Mutex<HashMap<WrapperKey, Vec<Weak<ListenerWrapper>>>>,
}

impl WrapperTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live wrapper for this listener, name, and bean, creating and
    /// recording a new one if there is none.
    pub fn get_or_create(
        &self,
        listener: &Arc<dyn NotificationListener>,
        name: &ObjectName,
        bean: ObjectRef,
    ) -> Arc<ListenerWrapper> {
        let key = WrapperKey {
            listener: ObjectRef::of_arc(listener),
            bean,
        };
        let mut entries = self.entries.lock().expect("wrapper table lock poisoned");
        let slot = entries.entry(key).or_default();
        if let Some(existing) = Self::find_live(slot, name) {
            return existing;
        }

        let wrapper = Arc::new(ListenerWrapper::new(Arc::clone(listener), name.clone(), bean));
        slot.push(Arc::downgrade(&wrapper));
        trace!(name = %name, "created listener wrapper");
        wrapper
    }

    /// The live wrapper for this listener, name, and bean, if there is one.
    pub fn find(
        &self,
        listener: &Arc<dyn NotificationListener>,
        name: &ObjectName,
        bean: ObjectRef,
    ) -> Option<Arc<ListenerWrapper>> {
        let key = WrapperKey {
            listener: ObjectRef::of_arc(listener),
            bean,
        };
        let mut entries = self.entries.lock().expect("wrapper table lock poisoned");
        let slot = entries.get_mut(&key)?;
        let found = Self::find_live(slot, name);
        if slot.is_empty() {
            entries.remove(&key);
        }
        found
    }

    /// Drop the table entry for `wrapper` once the caller's handle is the
    /// only one left, i.e. the broadcaster no longer holds it.
    pub fn release(&self, wrapper: Arc<ListenerWrapper>) {
        // Upgrades only happen under this lock, so the count is stable here.
        let mut entries = self.entries.lock().expect("wrapper table lock poisoned");
        if Arc::strong_count(&wrapper) > 1 {
            return;
        }
        let key = WrapperKey {
            listener: wrapper.listener_ref(),
            bean: wrapper.bean,
        };
        if let Some(slot) = entries.get_mut(&key) {
            slot.retain(|weak| {
                weak.upgrade()
                    .is_some_and(|live| !Arc::ptr_eq(&live, &wrapper))
            });
            if slot.is_empty() {
                entries.remove(&key);
            }
        }
        trace!(name = %wrapper.name, "released listener wrapper");
    }

    /// Number of live wrappers.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().expect("wrapper table lock poisoned");
        entries.retain(|_, slot| {
            slot.retain(|weak| weak.strong_count() > 0);
            !slot.is_empty()
        });
        entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_live(slot: &mut Vec<Weak<ListenerWrapper>>, name: &ObjectName) -> Option<Arc<ListenerWrapper>> {
        slot.retain(|weak| weak.strong_count() > 0);
        slot.iter()
            .filter_map(Weak::upgrade)
            .find(|wrapper| wrapper.name == *name)
    }
}
