//! The in-process server the CLI talks to.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use mbs_server::{AccessorTable, BeanError, Interceptor, ServerConfig, TableBean};
use mbs_types::{Impact, ObjectName, Value};
use tracing::debug;

pub const RUNTIME_NAME: &str = "mbs:type=Runtime";

pub struct Runtime {
    started: DateTime<Utc>,
    clock: Instant,
    label: Mutex<String>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            started: Utc::now(),
            clock: Instant::now(),
            label: Mutex::new(String::from("default")),
        }
    }
}

fn runtime_table() -> AccessorTable<Runtime> {
    AccessorTable::new("mbs.Runtime", "The process hosting this server")
        .read_only("Pid", "u32", "operating system process id", |_: &Runtime| {
            Ok(Value::from(std::process::id()))
        })
        .read_only("StartTime", "string", "start time, RFC 3339", |r: &Runtime| {
            Ok(Value::from(r.started.to_rfc3339()))
        })
        .read_only("UptimeMillis", "u64", "milliseconds since start", |r: &Runtime| {
            Ok(Value::from(r.clock.elapsed().as_millis() as u64))
        })
        .read_only("Version", "string", "server version", |_: &Runtime| {
            Ok(Value::from(env!("CARGO_PKG_VERSION")))
        })
        .read_write(
            "Label",
            "string",
            "free-form label for this process",
            |r: &Runtime| Ok(Value::from(r.label.lock().expect("label lock poisoned").clone())),
            |r: &Runtime, value: Value| {
                let Value::String(label) = value else {
                    return Err(BeanError::invalid_value("Label", "expected a string"));
                };
                *r.label.lock().expect("label lock poisoned") = label;
                Ok(())
            },
        )
        .operation(
            "echo",
            "return the argument unchanged",
            &[("text", "string")],
            "string",
            Impact::Info,
            |_: &Runtime, params: &[Value]| Ok(params[0].clone()),
        )
}

/// Build the server from `config` (defaults when `None`) and register the
/// runtime bean.
pub fn start(config: Option<&Path>) -> anyhow::Result<Interceptor> {
    let config = match config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    let server = Interceptor::new(config)?;

    let runtime = TableBean::new(Runtime::new(), Arc::new(runtime_table()));
    let name = ObjectName::parse(RUNTIME_NAME)?;
    server.register_bean(Arc::new(runtime), Some(&name))?;
    debug!(beans = server.get_bean_count(), "server ready");
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_types::Attribute;

    #[test]
    fn runtime_bean_registered() {
        let server = start(None).unwrap();
        let name = ObjectName::parse(RUNTIME_NAME).unwrap();
        assert!(server.is_registered(&name).unwrap());
        assert_eq!(
            server.get_attribute(&name, "Pid").unwrap(),
            Value::from(std::process::id())
        );
        assert_eq!(
            server
                .invoke(&name, "echo", &[Value::from("hi")], &["string".into()])
                .unwrap(),
            Value::from("hi")
        );
    }

    #[test]
    fn label_is_writable_strings_only() {
        let server = start(None).unwrap();
        let name = ObjectName::parse(RUNTIME_NAME).unwrap();
        server
            .set_attribute(&name, Attribute::new("Label", "blue"))
            .unwrap();
        assert_eq!(server.get_attribute(&name, "Label").unwrap(), Value::from("blue"));
        assert!(server.set_attribute(&name, Attribute::new("Label", 3)).is_err());
    }
}
