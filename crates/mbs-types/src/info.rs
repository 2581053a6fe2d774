//! Bean metadata: the attributes, operations, and notifications a bean
//! exposes to management clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named attribute value, as read from or written to a bean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Result of the plural attribute operations: only the members that were
/// actually read or written appear in it.
pub type AttributeList = Vec<Attribute>;

/// Description of one attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    /// Free-form type label, e.g. `"string"`, `"u64"`, `"bool"`.
    pub type_name: String,
    pub description: String,
    pub readable: bool,
    pub writable: bool,
}

impl AttributeInfo {
    pub fn read_only(
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: description.into(),
            readable: true,
            writable: false,
        }
    }

    pub fn read_write(
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            writable: true,
            ..Self::read_only(name, type_name, description)
        }
    }
}

/// Description of one operation parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub name: String,
    pub type_name: String,
    pub description: String,
}

impl ParameterInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: String::new(),
        }
    }
}

/// What invoking an operation does to the bean.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    /// Read-only: returns information, changes nothing.
    Info,
    /// Changes state, returns nothing of interest.
    Action,
    /// Changes state and returns information.
    ActionInfo,
    #[default]
    Unknown,
}

/// Description of one operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterInfo>,
    pub return_type: String,
    pub impact: Impact,
}

impl OperationInfo {
    /// Parameter type names in order; this is the operation's signature.
    pub fn signature(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.type_name.as_str()).collect()
    }

    /// Does `signature` select this operation?
    pub fn accepts(&self, signature: &[String]) -> bool {
        self.parameters.len() == signature.len()
            && self
                .parameters
                .iter()
                .zip(signature)
                .all(|(p, s)| p.type_name == *s)
    }
}

/// Description of a family of notifications a bean can emit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationInfo {
    /// Notification types in this family, e.g. `"mbs.bean.registered"`.
    pub types: Vec<String>,
    pub name: String,
    pub description: String,
}

/// Everything a management client can learn about a bean.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeanInfo {
    pub class_name: String,
    pub description: String,
    pub attributes: Vec<AttributeInfo>,
    pub operations: Vec<OperationInfo>,
    pub notifications: Vec<NotificationInfo>,
}

impl BeanInfo {
    pub fn new(class_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Find the operation selected by `name` and `signature`.
    pub fn operation(&self, name: &str, signature: &[String]) -> Option<&OperationInfo> {
        self.operations
            .iter()
            .find(|op| op.name == name && op.accepts(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BeanInfo {
        let mut info = BeanInfo::new("app.Cache", "a cache");
        info.attributes.push(AttributeInfo::read_only("Size", "u64", "entries"));
        info.attributes.push(AttributeInfo::read_write("Capacity", "u64", "max entries"));
        info.operations.push(OperationInfo {
            name: "evict".into(),
            description: String::new(),
            parameters: vec![ParameterInfo::new("key", "string")],
            return_type: "bool".into(),
            impact: Impact::Action,
        });
        info.operations.push(OperationInfo {
            name: "evict".into(),
            description: String::new(),
            parameters: Vec::new(),
            return_type: "u64".into(),
            impact: Impact::Action,
        });
        info
    }

    #[test]
    fn attribute_lookup() {
        let info = sample();
        assert!(info.attribute("Size").unwrap().readable);
        assert!(!info.attribute("Size").unwrap().writable);
        assert!(info.attribute("Capacity").unwrap().writable);
        assert!(info.attribute("Missing").is_none());
    }

    #[test]
    fn operation_overloads_resolve_by_signature() {
        let info = sample();
        let one = info.operation("evict", &["string".into()]).unwrap();
        assert_eq!(one.return_type, "bool");
        assert_eq!(one.signature(), vec!["string"]);
        let none = info.operation("evict", &[]).unwrap();
        assert_eq!(none.return_type, "u64");
        assert!(info.operation("evict", &["u64".into()]).is_none());
    }
}
