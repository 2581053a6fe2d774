//! Foundation types for the managed bean server (MBS).
//!
//! This crate provides the naming, metadata, and notification types shared by
//! every other MBS crate. It has no knowledge of how beans are stored or
//! dispatched.
//!
//! # Key Types
//!
//! - [`ObjectName`] — Structured `domain:key=value,...` identifier, possibly a pattern
//! - [`ObjectInstance`] — A registered name paired with its bean class name
//! - [`Notification`] — An event emitted by a bean or by the server delegate
//! - [`ObjectRef`] — Pointer identity of a live bean, used as a raw notification source
//! - [`BeanInfo`] — Attributes, operations, and notifications a bean exposes
//! - [`Attribute`] — A named attribute value

pub mod error;
pub mod info;
pub mod instance;
pub mod name;
pub mod notification;

pub use error::TypeError;
pub use info::{
    Attribute, AttributeInfo, AttributeList, BeanInfo, Impact, NotificationInfo, OperationInfo,
    ParameterInfo,
};
pub use instance::ObjectInstance;
pub use name::{wildmatch, ObjectName};
pub use notification::{Notification, NotificationSource, ObjectRef, ServerNotificationKind};

/// Attribute values, operation parameters, and notification payloads.
pub use serde_json::Value;
