use std::sync::{Arc, RwLock};

use mbs_types::{Notification, NotificationInfo};
use tracing::trace;

use crate::error::{NotifyError, Result};
use crate::listener::{
    same_filter, same_handback, same_listener, Handback, NotificationFilter, NotificationListener,
};

/// A bean that can send notifications to registered listeners.
pub trait NotificationEmitter: Send + Sync {
    /// Register `listener`. The same listener may be registered several
    /// times with different filters or handbacks.
    fn add_notification_listener(
        &self,
        listener: Arc<dyn NotificationListener>,
        filter: Option<Arc<dyn NotificationFilter>>,
        handback: Option<Handback>,
    );

    /// Remove every registration of `listener`.
    fn remove_notification_listener(&self, listener: &Arc<dyn NotificationListener>) -> Result<()>;

    /// Remove the registration with exactly this listener, filter, and
    /// handback.
    fn remove_notification_listener_with(
        &self,
        listener: &Arc<dyn NotificationListener>,
        filter: Option<&Arc<dyn NotificationFilter>>,
        handback: Option<&Handback>,
    ) -> Result<()>;

    /// The notifications this emitter may send.
    fn notification_info(&self) -> Vec<NotificationInfo> {
        Vec::new()
    }
}

#[derive(Clone)]
struct Registration {
    listener: Arc<dyn NotificationListener>,
    filter: Option<Arc<dyn NotificationFilter>>,
    handback: Option<Handback>,
}

/// Ready-made [`NotificationEmitter`] for beans to embed.
///
/// Sending takes a snapshot of the registrations and delivers outside the
/// lock, so a listener may add or remove listeners while it runs.
#[derive(Default)]
pub struct BroadcasterSupport {
    registrations: RwLock<Vec<Registration>>,
    info: Vec<NotificationInfo>,
}

impl BroadcasterSupport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broadcaster that advertises the given notification families.
    pub fn with_info(info: Vec<NotificationInfo>) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            info,
        }
    }

    /// Deliver `notification` to every listener whose filter enables it.
    pub fn send_notification(&self, notification: Notification) {
        let snapshot = self
            .registrations
            .read()
            .expect("broadcaster lock poisoned")
            .clone();

        trace!(
            notif_type = %notification.notif_type,
            listeners = snapshot.len(),
            "sending notification"
        );
        for reg in snapshot {
            if let Some(filter) = &reg.filter {
                if !filter.is_enabled(&notification) {
                    continue;
                }
            }
            reg.listener
                .handle_notification(notification.clone(), reg.handback.as_ref());
        }
    }

    /// Number of registrations (not distinct listeners).
    pub fn listener_count(&self) -> usize {
        self.registrations
            .read()
            .expect("broadcaster lock poisoned")
            .len()
    }
}

impl NotificationEmitter for BroadcasterSupport {
    fn add_notification_listener(
        &self,
        listener: Arc<dyn NotificationListener>,
        filter: Option<Arc<dyn NotificationFilter>>,
        handback: Option<Handback>,
    ) {
        self.registrations
            .write()
            .expect("broadcaster lock poisoned")
            .push(Registration {
                listener,
                filter,
                handback,
            });
    }

    fn remove_notification_listener(&self, listener: &Arc<dyn NotificationListener>) -> Result<()> {
        let mut regs = self.registrations.write().expect("broadcaster lock poisoned");
        let before = regs.len();
        regs.retain(|r| !same_listener(&r.listener, listener));
        if regs.len() == before {
            return Err(NotifyError::ListenerNotFound(
                "listener is not registered".into(),
            ));
        }
        Ok(())
    }

    fn remove_notification_listener_with(
        &self,
        listener: &Arc<dyn NotificationListener>,
        filter: Option<&Arc<dyn NotificationFilter>>,
        handback: Option<&Handback>,
    ) -> Result<()> {
        let mut regs = self.registrations.write().expect("broadcaster lock poisoned");
        let pos = regs
            .iter()
            .position(|r| {
                same_listener(&r.listener, listener)
                    && same_filter(r.filter.as_ref(), filter)
                    && same_handback(r.handback.as_ref(), handback)
            })
            .ok_or_else(|| {
                NotifyError::ListenerNotFound(
                    "no registration with this listener, filter, and handback".into(),
                )
            })?;
        regs.remove(pos);
        Ok(())
    }

    fn notification_info(&self) -> Vec<NotificationInfo> {
        self.info.clone()
    }
}
