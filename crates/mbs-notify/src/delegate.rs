use std::sync::atomic::{AtomicU64, Ordering};

use mbs_types::{Notification, NotificationInfo, ObjectName, ServerNotificationKind};
use tracing::debug;
use uuid::Uuid;

use crate::broadcaster::BroadcasterSupport;

/// Name under which the delegate is registered in every server.
pub const DELEGATE_NAME: &str = "JMImplementation:type=MBeanServerDelegate";

/// [`DELEGATE_NAME`] as an [`ObjectName`].
pub fn delegate_name() -> ObjectName {
    ObjectName::parse(DELEGATE_NAME).expect("delegate name is well-formed")
}

/// Identity of the server, and the source of its lifecycle notifications.
///
/// Every successful registration and unregistration is published through
/// the delegate exactly once. Clients subscribe by adding a listener on
/// [`DELEGATE_NAME`].
pub struct ServerDelegate {
    server_id: String,
    broadcaster: BroadcasterSupport,
    sequence: AtomicU64,
}

impl ServerDelegate {
    pub const SPECIFICATION_NAME: &'static str = "Managed Bean Server";
    pub const SPECIFICATION_VERSION: &'static str = "1.0";
    pub const SPECIFICATION_VENDOR: &'static str = "MapleAI";
    pub const IMPLEMENTATION_NAME: &'static str = "mbs";
    pub const IMPLEMENTATION_VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const IMPLEMENTATION_VENDOR: &'static str = "MapleAI";

    pub fn new() -> Self {
        let info = NotificationInfo {
            types: vec![
                ServerNotificationKind::REGISTERED.to_string(),
                ServerNotificationKind::UNREGISTERED.to_string(),
            ],
            name: "ServerNotification".into(),
            description: "Bean registration lifecycle".into(),
        };
        Self {
            server_id: Uuid::now_v7().to_string(),
            broadcaster: BroadcasterSupport::with_info(vec![info]),
            sequence: AtomicU64::new(0),
        }
    }

    /// Unique, time-ordered identifier of this server instance.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn broadcaster(&self) -> &BroadcasterSupport {
        &self.broadcaster
    }

    /// Stamp and send a lifecycle notification about `bean_name`.
    pub fn publish(&self, kind: ServerNotificationKind, bean_name: &ObjectName) -> Notification {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let notification =
            Notification::server_lifecycle(kind, delegate_name(), sequence, bean_name.clone());
        debug!(kind = %kind, name = %bean_name, sequence, "publishing lifecycle notification");
        self.broadcaster.send_notification(notification.clone());
        notification
    }
}

impl Default for ServerDelegate {
    fn default() -> Self {
        Self::new()
    }
}
