use mbs_types::{wildmatch, ObjectName};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SecurityConfig;
use crate::controller::AccessController;
use crate::error::{Result, SecurityError};
use crate::permission::{Action, Permission};

// ---------------------------------------------------------------------------
// Rule types
// ---------------------------------------------------------------------------

/// What a matching rule does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    #[default]
    Deny,
}

/// One allow or deny rule.
///
/// Every target field is optional; an absent field matches anything.
/// `class_name` and `member` are globs (`*` and `?`), `object_name` is an
/// object name pattern, and an empty `actions` list covers every action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_name: Option<ObjectName>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl PermissionRule {
    pub fn allow(actions: impl IntoIterator<Item = Action>) -> Self {
        Self::with_effect(Effect::Allow, actions)
    }

    pub fn deny(actions: impl IntoIterator<Item = Action>) -> Self {
        Self::with_effect(Effect::Deny, actions)
    }

    fn with_effect(effect: Effect, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            effect,
            class_name: None,
            member: None,
            object_name: None,
            actions: actions.into_iter().collect(),
        }
    }

    pub fn on_class(mut self, glob: impl Into<String>) -> Self {
        self.class_name = Some(glob.into());
        self
    }

    pub fn on_member(mut self, glob: impl Into<String>) -> Self {
        self.member = Some(glob.into());
        self
    }

    pub fn on_name(mut self, pattern: ObjectName) -> Self {
        self.object_name = Some(pattern);
        self
    }

    /// Does this rule apply to `permission`?
    ///
    /// A permission field that is absent is a coarse request. Allow rules
    /// match it whatever they name, since the action is allowed for at least
    /// the targets the rule names. Deny rules only match it when they name
    /// nothing for that field, so denying one attribute does not deny the
    /// coarse check that precedes a filtered plural read.
    pub fn matches(&self, permission: &Permission) -> bool {
        if !self.actions.is_empty() && !self.actions.contains(&permission.action) {
            return false;
        }
        let coarse_matches = self.effect == Effect::Allow;

        let class_ok = match (&self.class_name, &permission.class_name) {
            (None, _) => true,
            (Some(_), None) => coarse_matches,
            (Some(glob), Some(class)) => wildmatch(class, glob),
        };
        let member_ok = match (&self.member, &permission.member) {
            (None, _) => true,
            (Some(_), None) => coarse_matches,
            (Some(glob), Some(member)) => wildmatch(member, glob),
        };
        let name_ok = match (&self.object_name, &permission.object_name) {
            (None, _) => true,
            (Some(_), None) => coarse_matches,
            (Some(pattern), Some(name)) => pattern.matches(name),
        };
        class_ok && member_ok && name_ok
    }

    fn validate(&self) -> Result<()> {
        if self.class_name.as_deref() == Some("") {
            return Err(SecurityError::InvalidRule("empty class_name glob".into()));
        }
        if self.member.as_deref() == Some("") {
            return Err(SecurityError::InvalidRule("empty member glob".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PermissionPolicy
// ---------------------------------------------------------------------------

/// Rule-based access controller.
///
/// A permission is denied when any deny rule matches it. Otherwise it is
/// allowed when any allow rule matches, and falls back to the default effect
/// when none does.
#[derive(Clone, Debug)]
pub struct PermissionPolicy {
    default_effect: Effect,
    rules: Vec<PermissionRule>,
    trusted_classes: Vec<String>,
}

impl PermissionPolicy {
    /// Build a policy from configuration, rejecting malformed rules.
    pub fn from_config(config: SecurityConfig) -> Result<Self> {
        for rule in &config.rules {
            rule.validate()?;
        }
        Ok(Self {
            default_effect: config.default_effect,
            rules: config.rules,
            trusted_classes: config.trusted_classes,
        })
    }

    /// A policy that denies everything not explicitly allowed.
    pub fn deny_by_default(rules: Vec<PermissionRule>) -> Self {
        Self {
            default_effect: Effect::Deny,
            rules,
            trusted_classes: vec!["*".into()],
        }
    }

    pub fn rules(&self) -> &[PermissionRule] {
        &self.rules
    }
}

impl AccessController for PermissionPolicy {
    fn check(&self, permission: &Permission) -> Result<()> {
        let denied = self
            .rules
            .iter()
            .any(|r| r.effect == Effect::Deny && r.matches(permission));
        if denied {
            debug!(permission = %permission, "denied by rule");
            return Err(SecurityError::AccessDenied(permission.to_string()));
        }

        let allowed = self
            .rules
            .iter()
            .any(|r| r.effect == Effect::Allow && r.matches(permission));
        if allowed || self.default_effect == Effect::Allow {
            Ok(())
        } else {
            debug!(permission = %permission, "no rule allows");
            Err(SecurityError::AccessDenied(permission.to_string()))
        }
    }

    fn check_trust(&self, class_name: &str) -> Result<()> {
        if self
            .trusted_classes
            .iter()
            .any(|glob| wildmatch(class_name, glob))
        {
            Ok(())
        } else {
            debug!(class = class_name, "untrusted bean class");
            Err(SecurityError::Untrusted(class_name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> ObjectName {
        ObjectName::parse(s).unwrap()
    }

    #[test]
    fn empty_action_list_covers_all_actions() {
        let rule = PermissionRule::allow([]);
        for action in Action::ALL {
            assert!(rule.matches(&Permission::new(action)));
        }
    }

    #[test]
    fn rule_fields_are_globs() {
        let rule = PermissionRule::allow([Action::GetAttribute])
            .on_class("app.*")
            .on_member("Size*")
            .on_name(name("app:*"));
        let p = Permission::new(Action::GetAttribute)
            .with_class("app.Cache")
            .with_member("SizeLimit")
            .with_name(name("app:type=Cache,name=a"));
        assert!(rule.matches(&p));
        assert!(!rule.matches(&p.clone().with_member("Hits")));
        assert!(!rule.matches(&Permission { action: Action::SetAttribute, ..p }));
    }

    #[test]
    fn coarse_requests_match_allow_rules_only() {
        let allow = PermissionRule::allow([Action::GetAttribute]).on_member("Size");
        let deny = PermissionRule::deny([Action::GetAttribute]).on_member("Secret");
        let coarse = Permission::new(Action::GetAttribute).with_name(name("app:type=Cache"));
        assert!(allow.matches(&coarse));
        assert!(!deny.matches(&coarse));
    }

    #[test]
    fn deny_overrides_allow() {
        let policy = PermissionPolicy::deny_by_default(vec![
            PermissionRule::allow([]),
            PermissionRule::deny([Action::UnregisterMBean]).on_name(name("app:*")),
        ]);
        let p = Permission::new(Action::UnregisterMBean).with_name(name("app:type=Cache"));
        assert_eq!(
            policy.check(&p),
            Err(SecurityError::AccessDenied(
                "-#-[app:type=Cache] unregisterMBean".into()
            ))
        );
        let other = Permission::new(Action::UnregisterMBean).with_name(name("web:type=Cache"));
        assert!(policy.check(&other).is_ok());
    }

    #[test]
    fn default_effect_applies_when_nothing_matches() {
        let deny = PermissionPolicy::deny_by_default(Vec::new());
        assert!(deny.check(&Permission::new(Action::GetDomains)).is_err());

        let allow = PermissionPolicy::from_config(SecurityConfig {
            default_effect: Effect::Allow,
            ..Default::default()
        })
        .unwrap();
        assert!(allow.check(&Permission::new(Action::GetDomains)).is_ok());
    }

    #[test]
    fn trust_by_class_glob() {
        let policy = PermissionPolicy::from_config(SecurityConfig {
            trusted_classes: vec!["app.*".into()],
            ..Default::default()
        })
        .unwrap();
        assert!(policy.check_trust("app.Cache").is_ok());
        assert_eq!(
            policy.check_trust("evil.Thing"),
            Err(SecurityError::Untrusted("evil.Thing".into()))
        );
    }

    #[test]
    fn malformed_rule_rejected() {
        let config = SecurityConfig {
            rules: vec![PermissionRule::allow([]).on_member("")],
            ..Default::default()
        };
        assert!(matches!(
            PermissionPolicy::from_config(config),
            Err(SecurityError::InvalidRule(_))
        ));
    }
}
