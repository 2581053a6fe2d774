use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::name::ObjectName;

/// Pointer identity of a live bean.
///
/// A bean that emits a notification about itself only knows `self`, not the
/// name it was registered under, so it reports `ObjectRef::of(self)` as the
/// source. The server rewrites that source to the registered name before the
/// notification reaches a client listener.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef(usize);

impl ObjectRef {
    /// Identity of the value behind a reference.
    pub fn of<T: ?Sized>(value: &T) -> Self {
        Self(value as *const T as *const () as usize)
    }

    /// Identity of the value behind an `Arc`; equal to [`Self::of`] called on
    /// the same value through `&*arc`.
    pub fn of_arc<T: ?Sized>(value: &Arc<T>) -> Self {
        Self(Arc::as_ptr(value) as *const () as usize)
    }

    pub fn addr(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.0)
    }
}

/// Who a notification claims to come from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationSource {
    #[default]
    None,
    /// A registered name; the stable identity clients see.
    Name(ObjectName),
    /// The raw bean, before the server has rewritten it.
    Object(ObjectRef),
}

/// Lifecycle events the server delegate publishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerNotificationKind {
    Registered,
    Unregistered,
}

impl ServerNotificationKind {
    pub const REGISTERED: &'static str = "mbs.bean.registered";
    pub const UNREGISTERED: &'static str = "mbs.bean.unregistered";

    pub fn as_type(&self) -> &'static str {
        match self {
            Self::Registered => Self::REGISTERED,
            Self::Unregistered => Self::UNREGISTERED,
        }
    }

    pub fn from_type(notif_type: &str) -> Option<Self> {
        match notif_type {
            Self::REGISTERED => Some(Self::Registered),
            Self::UNREGISTERED => Some(Self::Unregistered),
            _ => None,
        }
    }
}

impl fmt::Display for ServerNotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_type())
    }
}

/// An event delivered to notification listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Dot-separated type, e.g. `"mbs.bean.registered"` or `"app.cache.full"`.
    pub notif_type: String,
    pub source: NotificationSource,
    /// Per-emitter sequence number.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub user_data: Option<Value>,
    /// For server lifecycle notifications, the bean that was registered or
    /// unregistered.
    pub bean_name: Option<ObjectName>,
}

impl Notification {
    pub fn new(
        notif_type: impl Into<String>,
        source: NotificationSource,
        sequence: u64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notif_type: notif_type.into(),
            source,
            sequence,
            timestamp: Utc::now(),
            message: message.into(),
            user_data: None,
            bean_name: None,
        }
    }

    /// A registration or unregistration event about `bean_name`, emitted by
    /// the delegate named `delegate`.
    pub fn server_lifecycle(
        kind: ServerNotificationKind,
        delegate: ObjectName,
        sequence: u64,
        bean_name: ObjectName,
    ) -> Self {
        let message = match kind {
            ServerNotificationKind::Registered => format!("registered {bean_name}"),
            ServerNotificationKind::Unregistered => format!("unregistered {bean_name}"),
        };
        Self {
            bean_name: Some(bean_name),
            ..Self::new(kind.as_type(), NotificationSource::Name(delegate), sequence, message)
        }
    }

    pub fn with_user_data(mut self, data: impl Into<Value>) -> Self {
        self.user_data = Some(data.into());
        self
    }

    /// The lifecycle kind, if this is a server lifecycle notification.
    pub fn lifecycle_kind(&self) -> Option<ServerNotificationKind> {
        ServerNotificationKind::from_type(&self.notif_type)
    }

    /// Is the source the given raw bean?
    pub fn is_from_object(&self, object: ObjectRef) -> bool {
        self.source == NotificationSource::Object(object)
    }
}
