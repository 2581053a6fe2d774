//! Permission checks for the managed bean server.
//!
//! Before the server reads, changes, creates, or removes a bean it builds a
//! [`Permission`] naming the bean class, the member (attribute or operation),
//! the object name, and the [`Action`], and hands it to an
//! [`AccessController`]. The rule-based [`PermissionPolicy`] is the
//! controller the server builds from its configuration.
//!
//! # Quick Start
//!
//! ```rust
//! use mbs_security::{AccessController, Action, Permission, PermissionPolicy, PermissionRule};
//! use mbs_types::ObjectName;
//!
//! let policy = PermissionPolicy::deny_by_default(vec![
//!     PermissionRule::allow([Action::GetAttribute]).on_name(ObjectName::parse("app:*").unwrap()),
//! ]);
//! let read = Permission::new(Action::GetAttribute)
//!     .with_member("Size")
//!     .with_name(ObjectName::parse("app:type=Cache").unwrap());
//! assert!(policy.check(&read).is_ok());
//! assert!(policy.check(&Permission::new(Action::UnregisterMBean)).is_err());
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod permission;
pub mod policy;

pub use config::SecurityConfig;
pub use controller::{AccessController, AllowAll};
pub use error::{Result, SecurityError};
pub use permission::{Action, Permission};
pub use policy::{Effect, PermissionPolicy, PermissionRule};

#[cfg(test)]
mod tests {
    use super::*;
    use mbs_types::ObjectName;

    fn name(s: &str) -> ObjectName {
        ObjectName::parse(s).unwrap()
    }

    fn reader_policy() -> PermissionPolicy {
        PermissionPolicy::deny_by_default(vec![
            PermissionRule::allow([Action::GetAttribute, Action::QueryNames, Action::GetDomains])
                .on_name(name("app:*")),
            PermissionRule::deny([Action::GetAttribute]).on_member("Password"),
        ])
    }

    // -----------------------------------------------------------------------
    // 1. Coarse plural check passes while a single member stays denied
    // -----------------------------------------------------------------------
    #[test]
    fn plural_read_filters_denied_member() {
        let policy = reader_policy();
        let target = name("app:type=Db");

        let coarse = Permission::new(Action::GetAttribute).with_name(target.clone());
        assert!(policy.check(&coarse).is_ok());

        let visible = ["User", "Password", "Url"]
            .into_iter()
            .filter(|member| {
                policy
                    .check(
                        &Permission::new(Action::GetAttribute)
                            .with_member(*member)
                            .with_name(target.clone()),
                    )
                    .is_ok()
            })
            .collect::<Vec<_>>();
        assert_eq!(visible, vec!["User", "Url"]);
    }

    // -----------------------------------------------------------------------
    // 2. Names outside the allowed pattern are denied
    // -----------------------------------------------------------------------
    #[test]
    fn other_domains_denied() {
        let policy = reader_policy();
        let p = Permission::new(Action::GetAttribute)
            .with_member("User")
            .with_name(name("web:type=Db"));
        assert!(matches!(policy.check(&p), Err(SecurityError::AccessDenied(_))));
    }

    // -----------------------------------------------------------------------
    // 3. A policy loaded from TOML behaves like the one built in code
    // -----------------------------------------------------------------------
    #[test]
    fn configured_policy_matches_built_policy() {
        let config: SecurityConfig = toml::from_str(
            r#"
            [[rules]]
            effect = "allow"
            actions = ["getAttribute", "queryNames", "getDomains"]
            object_name = "app:*"

            [[rules]]
            effect = "deny"
            actions = ["getAttribute"]
            member = "Password"
            "#,
        )
        .unwrap();
        let configured = PermissionPolicy::from_config(config).unwrap();
        assert_eq!(configured.rules(), reader_policy().rules());
    }
}
