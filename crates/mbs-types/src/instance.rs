use std::fmt;

use serde::{Deserialize, Serialize};

use crate::name::ObjectName;

/// A registered bean as seen from outside the server: its name and the class
/// name its metadata reports.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectInstance {
    pub name: ObjectName,
    /// `None` when the bean's class name could not be obtained.
    pub class_name: Option<String>,
}

impl ObjectInstance {
    pub fn new(name: ObjectName, class_name: impl Into<String>) -> Self {
        Self {
            name,
            class_name: Some(class_name.into()),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }
}

impl fmt::Display for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class_name {
            Some(class) => write!(f, "{} ({class})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
