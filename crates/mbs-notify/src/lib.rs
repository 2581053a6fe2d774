//! Notification plumbing for the managed bean server.
//!
//! Beans that emit notifications embed a [`BroadcasterSupport`] and expose it
//! as a [`NotificationEmitter`]. The server never registers a client's
//! listener with a bean directly; it registers a [`ListenerWrapper`] taken
//! from a [`WrapperTable`], which rewrites the bean's raw self-reference
//! into its registered name. The [`ServerDelegate`] publishes the server's
//! own registration lifecycle.
//!
//! # Modules
//!
//! - [`listener`] — Listener and filter traits, handbacks, [`TypeFilter`]
//! - [`broadcaster`] — The emitter trait and [`BroadcasterSupport`]
//! - [`wrapper`] — [`ListenerWrapper`] and its weak [`WrapperTable`]
//! - [`delegate`] — [`ServerDelegate`] and the lifecycle notifications

pub mod broadcaster;
pub mod delegate;
pub mod error;
pub mod listener;
pub mod wrapper;

pub use broadcaster::{BroadcasterSupport, NotificationEmitter};
pub use delegate::{delegate_name, ServerDelegate, DELEGATE_NAME};
pub use error::{NotifyError, Result};
pub use listener::{Handback, NotificationFilter, NotificationListener, TypeFilter};
pub use wrapper::{ListenerWrapper, WrapperTable};

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_types::{Notification, NotificationSource, ObjectName, ObjectRef};
    use std::sync::{Arc, Mutex};

    /// A bean that announces changes about itself.
    struct Cache {
        broadcaster: BroadcasterSupport,
    }

    impl Cache {
        fn evict(&self) {
            self.broadcaster.send_notification(Notification::new(
                "app.cache.evicted",
                NotificationSource::Object(ObjectRef::of(self)),
                1,
                "evicted",
            ));
        }
    }

    fn collector() -> (Arc<Mutex<Vec<Notification>>>, Arc<dyn NotificationListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn NotificationListener> =
            Arc::new(move |n: Notification, _: Option<&Handback>| sink.lock().unwrap().push(n));
        (seen, listener)
    }

    // -----------------------------------------------------------------------
    // 1. Registering the same listener twice reuses one wrapper
    // -----------------------------------------------------------------------
    #[test]
    fn wrapper_reuse_and_source_rewrite() {
        let cache = Arc::new(Cache {
            broadcaster: BroadcasterSupport::new(),
        });
        let table = WrapperTable::new();
        let name = ObjectName::parse("d:type=T").unwrap();
        let (seen, listener) = collector();

        let bean = ObjectRef::of_arc(&cache);
        let w1 = table.get_or_create(&listener, &name, bean);
        cache
            .broadcaster
            .add_notification_listener(w1.as_listener(), None, None);
        let w2 = table.get_or_create(&listener, &name, bean);
        assert!(Arc::ptr_eq(&w1, &w2));

        cache.evict();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].source, NotificationSource::Name(name));
    }

    // -----------------------------------------------------------------------
    // 2. Removing through the table releases the wrapper
    // -----------------------------------------------------------------------
    #[test]
    fn removal_releases_wrapper() {
        let cache = Cache {
            broadcaster: BroadcasterSupport::new(),
        };
        let table = WrapperTable::new();
        let name = ObjectName::parse("d:type=T").unwrap();
        let (seen, listener) = collector();
        let bean = ObjectRef::of(&cache);

        let wrapper = table.get_or_create(&listener, &name, bean);
        cache
            .broadcaster
            .add_notification_listener(wrapper.as_listener(), None, None);
        drop(wrapper);
        assert_eq!(table.len(), 1);

        let found = table.find(&listener, &name, bean).unwrap();
        cache
            .broadcaster
            .remove_notification_listener(&found.as_listener())
            .unwrap();
        table.release(found);
        assert!(table.is_empty());

        cache.evict();
        assert!(seen.lock().unwrap().is_empty());
    }
}
