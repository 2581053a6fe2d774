//! The managed bean server.
//!
//! An [`Interceptor`] keeps a registry of [`ManagedBean`]s under
//! [`ObjectName`](mbs_types::ObjectName)s and is the only way clients reach
//! them. Each request is validated, checked against an optional access
//! controller, and dispatched through the [`Introspector`]. Beans are
//! registered directly or created from [`BeanClass`]es found by the
//! [`Instantiator`]. Registrations and unregistrations are announced by the
//! server delegate, itself a registered bean.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mbs_server::{AccessorTable, Interceptor, ServerConfig, TableBean};
//! use mbs_types::{ObjectName, Value};
//!
//! let server = Interceptor::new(ServerConfig::default()).unwrap();
//! let table = AccessorTable::new("app.Counter", "a counter")
//!     .read_only("Count", "u64", "current count", |_: &()| Ok(Value::from(7)));
//! let name = ObjectName::parse("app:type=Counter").unwrap();
//! server
//!     .register_bean(Arc::new(TableBean::new((), Arc::new(table))), Some(&name))
//!     .unwrap();
//!
//! assert_eq!(server.get_attribute(&name, "Count").unwrap(), Value::from(7));
//! ```
//!
//! # Modules
//!
//! - [`bean`] — The [`ManagedBean`] trait and its registration hooks
//! - [`table`] — [`AccessorTable`] and [`TableBean`], beans built from closures
//! - [`class`] — Bean classes, class loaders, the class loader repository
//! - [`instantiator`] — Finding classes and constructing beans
//! - [`introspector`] — Compliance checks and dispatch
//! - [`query`] — Query expressions over registered beans
//! - [`interceptor`] — The server itself
//! - [`config`] — TOML-backed server configuration

pub mod bean;
pub mod class;
pub mod config;
pub mod delegate;
pub mod error;
pub mod instantiator;
pub mod interceptor;
pub mod introspector;
pub mod query;
pub mod table;

pub use bean::{BeanRegistration, ManagedBean};
pub use class::{BeanClass, BeanFactory, ClassLoader, ClassLoaderRepository, ClassPath, LoadedClass};
pub use config::ServerConfig;
pub use error::{BeanError, ServerError, ServerResult};
pub use instantiator::{DefaultInstantiator, Instantiator};
pub use interceptor::{Interceptor, InterceptorBuilder, RegisteredBean};
pub use introspector::{Introspector, StandardIntrospector};
pub use query::{CompareOp, QueryContext, QueryError, QueryExp, ValueExp};
pub use table::{AccessorTable, TableBean};
