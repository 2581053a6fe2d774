use serde::{Deserialize, Serialize};

use crate::policy::{Effect, PermissionRule};

/// Security section of the server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Outcome for permissions no rule matches.
    pub default_effect: Effect,
    /// Allow and deny rules, deny taking precedence.
    pub rules: Vec<PermissionRule>,
    /// Globs naming the bean classes that may be registered.
    pub trusted_classes: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            default_effect: Effect::Deny,
            rules: Vec::new(),
            trusted_classes: vec!["*".into()],
        }
    }
}
