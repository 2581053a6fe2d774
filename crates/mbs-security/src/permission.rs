use std::fmt;
use std::str::FromStr;

use mbs_types::ObjectName;
use serde::{Deserialize, Serialize};

use crate::error::SecurityError;

/// Every action the server checks before touching a bean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Instantiate,
    RegisterMBean,
    UnregisterMBean,
    GetAttribute,
    SetAttribute,
    Invoke,
    GetObjectInstance,
    QueryMBeans,
    QueryNames,
    GetDomains,
    AddNotificationListener,
    RemoveNotificationListener,
    GetMBeanInfo,
    IsInstanceOf,
    GetClassLoaderFor,
    GetClassLoader,
}

impl Action {
    pub const ALL: [Action; 16] = [
        Self::Instantiate,
        Self::RegisterMBean,
        Self::UnregisterMBean,
        Self::GetAttribute,
        Self::SetAttribute,
        Self::Invoke,
        Self::GetObjectInstance,
        Self::QueryMBeans,
        Self::QueryNames,
        Self::GetDomains,
        Self::AddNotificationListener,
        Self::RemoveNotificationListener,
        Self::GetMBeanInfo,
        Self::IsInstanceOf,
        Self::GetClassLoaderFor,
        Self::GetClassLoader,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instantiate => "instantiate",
            Self::RegisterMBean => "registerMBean",
            Self::UnregisterMBean => "unregisterMBean",
            Self::GetAttribute => "getAttribute",
            Self::SetAttribute => "setAttribute",
            Self::Invoke => "invoke",
            Self::GetObjectInstance => "getObjectInstance",
            Self::QueryMBeans => "queryMBeans",
            Self::QueryNames => "queryNames",
            Self::GetDomains => "getDomains",
            Self::AddNotificationListener => "addNotificationListener",
            Self::RemoveNotificationListener => "removeNotificationListener",
            Self::GetMBeanInfo => "getMBeanInfo",
            Self::IsInstanceOf => "isInstanceOf",
            Self::GetClassLoaderFor => "getClassLoaderFor",
            Self::GetClassLoader => "getClassLoader",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = SecurityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| SecurityError::InvalidRule(format!("unknown action '{s}'")))
    }
}

/// A request to perform `action` on a bean.
///
/// Any of the target fields may be absent. An absent member or name means
/// the check is coarse: it asks whether the action is permitted on some
/// member or some bean, not on a particular one. The plural operations
/// (`get_attributes`, `query_names`, `get_domains`) run a coarse check first
/// and then one fine check per element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permission {
    pub class_name: Option<String>,
    pub member: Option<String>,
    pub object_name: Option<ObjectName>,
    pub action: Action,
}

impl Permission {
    pub fn new(action: Action) -> Self {
        Self {
            class_name: None,
            member: None,
            object_name: None,
            action,
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    pub fn with_name(mut self, name: ObjectName) -> Self {
        self.object_name = Some(name);
        self
    }

    /// Is this a coarse check (no member and no name)?
    pub fn is_coarse(&self) -> bool {
        self.member.is_none() && self.object_name.is_none()
    }
}

/// Renders as `class#member[name] action`, with `-` for absent fields.
impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}[{}] {}",
            self.class_name.as_deref().unwrap_or("-"),
            self.member.as_deref().unwrap_or("-"),
            self.object_name
                .as_ref()
                .map(|n| n.canonical_name().to_string())
                .unwrap_or_else(|| "-".into()),
            self.action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_string_forms_agree() {
        for action in Action::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn unknown_action_rejected() {
        assert!("frobnicate".parse::<Action>().is_err());
    }

    #[test]
    fn permission_display() {
        let p = Permission::new(Action::GetAttribute)
            .with_class("app.Cache")
            .with_member("Size")
            .with_name(ObjectName::parse("app:type=Cache").unwrap());
        assert_eq!(p.to_string(), "app.Cache#Size[app:type=Cache] getAttribute");
        assert!(!p.is_coarse());

        let coarse = Permission::new(Action::QueryNames);
        assert_eq!(coarse.to_string(), "-#-[-] queryNames");
        assert!(coarse.is_coarse());
    }
}
