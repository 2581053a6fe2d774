//! Object names: `domain:key=value,...` identifiers for registered beans.
//!
//! A name is a domain plus an unordered set of key properties. Two names are
//! equal iff their domains and property sets match, regardless of the order
//! the properties were written in. A name may also be a *pattern*:
//!
//! - the domain may contain `*` (any run of characters) and `?` (exactly one
//!   character);
//! - the property list may be exactly `*`, or end with `,*`, meaning "at least
//!   these properties".
//!
//! An empty domain stands for the server's default domain and is resolved with
//! [`ObjectName::with_default_domain`] before the name reaches a repository.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that may not appear in a property key or value.
const FORBIDDEN_IN_PROPERTY: &[char] = &[':', ',', '=', '*', '?', '\n'];

/// A structured bean identifier.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName {
    domain: String,
    properties: BTreeMap<String, String>,
    /// Keys in the order they were written, for display.
    key_order: Vec<String>,
    property_pattern: bool,
    /// `domain:sorted-properties[,*]`, used for equality, hashing and ordering.
    canonical: String,
}

impl ObjectName {
    /// Build a concrete name from a domain and key properties.
    ///
    /// ```
    /// use mbs_types::ObjectName;
    ///
    /// let name = ObjectName::new("app", [("type", "Cache"), ("name", "users")]).unwrap();
    /// assert_eq!(name.canonical_name(), "app:name=users,type=Cache");
    /// assert_eq!(name.to_string(), "app:type=Cache,name=users");
    /// ```
    pub fn new<I, K, V>(domain: impl Into<String>, properties: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let domain = domain.into();
        let pairs: Vec<(String, String)> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::build(domain, pairs, false)
    }

    /// Parse a name from its textual form.
    ///
    /// ```
    /// use mbs_types::ObjectName;
    ///
    /// assert!(ObjectName::parse("app:type=Cache").is_ok());
    /// assert!(ObjectName::parse("app*:type=Cache,*").unwrap().is_pattern());
    /// assert!(ObjectName::parse("no-colon").is_err());
    /// assert!(ObjectName::parse("app:").is_err());
    /// ```
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let (domain, props) = text
            .split_once(':')
            .ok_or_else(|| TypeError::malformed(text, "missing ':' after domain"))?;

        if props == "*" {
            return Self::build(domain.to_string(), Vec::new(), true);
        }

        let mut property_pattern = false;
        let mut pairs = Vec::new();
        let parts: Vec<&str> = props.split(',').collect();
        for (i, part) in parts.iter().enumerate() {
            if *part == "*" && i == parts.len() - 1 && i > 0 {
                property_pattern = true;
                continue;
            }
            let (k, v) = part.split_once('=').ok_or_else(|| {
                TypeError::malformed(text, format!("property {part:?} is not key=value"))
            })?;
            pairs.push((k.to_string(), v.to_string()));
        }

        Self::build(domain.to_string(), pairs, property_pattern)
    }

    /// The pattern that matches every name in every domain: `*:*`.
    pub fn wildcard() -> Self {
        Self {
            domain: "*".into(),
            properties: BTreeMap::new(),
            key_order: Vec::new(),
            property_pattern: true,
            canonical: "*:*".into(),
        }
    }

    fn build(
        domain: String,
        pairs: Vec<(String, String)>,
        property_pattern: bool,
    ) -> Result<Self, TypeError> {
        let display = render(&domain, pairs.iter().map(|(k, v)| (k, v)), property_pattern);

        if domain.contains(':') || domain.contains('\n') {
            return Err(TypeError::malformed(
                &display,
                "domain must not contain ':' or newline",
            ));
        }
        if pairs.is_empty() && !property_pattern {
            return Err(TypeError::malformed(
                &display,
                "key property list must not be empty",
            ));
        }

        let mut properties = BTreeMap::new();
        let mut key_order = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            validate_property(&display, &k, "key")?;
            validate_property(&display, &v, "value")?;
            if properties.contains_key(&k) {
                return Err(TypeError::malformed(
                    &display,
                    format!("duplicate key {k:?}"),
                ));
            }
            key_order.push(k.clone());
            properties.insert(k, v);
        }

        let canonical = render(&domain, properties.iter(), property_pattern);
        Ok(Self {
            domain,
            properties,
            key_order,
            property_pattern,
            canonical,
        })
    }

    /// The domain part, possibly empty or containing wildcards.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Value of a single key property.
    pub fn key_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// All key properties, sorted by key.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Canonical textual form: properties sorted by key.
    pub fn canonical_name(&self) -> &str {
        &self.canonical
    }

    /// Canonical key property list (the part after the `:`), without any
    /// trailing `*`.
    pub fn canonical_key_properties(&self) -> String {
        self.properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `true` if the domain contains a wildcard.
    pub fn is_domain_pattern(&self) -> bool {
        self.domain.contains(['*', '?'])
    }

    /// `true` if the property list ends in `*`.
    pub fn is_property_pattern(&self) -> bool {
        self.property_pattern
    }

    /// `true` if this name matches more than one concrete name.
    pub fn is_pattern(&self) -> bool {
        self.is_domain_pattern() || self.property_pattern
    }

    /// Resolve an empty domain to `default_domain`. Names that already carry
    /// a domain are returned unchanged.
    pub fn with_default_domain(&self, default_domain: &str) -> Self {
        if !self.domain.is_empty() {
            return self.clone();
        }
        let mut resolved = self.clone();
        resolved.domain = default_domain.to_string();
        resolved.canonical = render(
            &resolved.domain,
            resolved.properties.iter(),
            resolved.property_pattern,
        );
        resolved
    }

    /// Does this name (usually a pattern) match the concrete `name`?
    ///
    /// A concrete name matches only itself.
    pub fn matches(&self, name: &ObjectName) -> bool {
        if !wildmatch(&name.domain, &self.domain) {
            return false;
        }
        self.matches_properties(name)
    }

    /// Property half of [`Self::matches`], for callers that have already
    /// matched the domain.
    pub fn matches_properties(&self, name: &ObjectName) -> bool {
        if self.property_pattern {
            self.properties
                .iter()
                .all(|(k, v)| name.key_property(k) == Some(v.as_str()))
        } else {
            self.properties == name.properties
        }
    }
}

fn validate_property(display: &str, text: &str, what: &str) -> Result<(), TypeError> {
    if text.is_empty() {
        return Err(TypeError::malformed(
            display,
            format!("property {what} must not be empty"),
        ));
    }
    if let Some(ch) = text.chars().find(|c| FORBIDDEN_IN_PROPERTY.contains(c)) {
        return Err(TypeError::malformed(
            display,
            format!("property {what} {text:?} contains forbidden character {ch:?}"),
        ));
    }
    Ok(())
}

fn render<'a, I>(domain: &str, properties: I, property_pattern: bool) -> String
where
    I: Iterator<Item = (&'a String, &'a String)>,
{
    let mut out = String::with_capacity(domain.len() + 16);
    out.push_str(domain);
    out.push(':');
    let mut first = true;
    for (k, v) in properties {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    if property_pattern {
        if !first {
            out.push(',');
        }
        out.push('*');
    }
    out
}

/// Glob match `text` against `pattern`, where `*` matches any run of
/// characters and `?` matches exactly one.
///
/// ```
/// use mbs_types::wildmatch;
///
/// assert!(wildmatch("JMImplementation", "JM*"));
/// assert!(wildmatch("app1", "app?"));
/// assert!(!wildmatch("app", "app?"));
/// ```
pub fn wildmatch(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut ti, mut pi) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        match pattern.get(pi) {
            Some('*') => {
                backtrack = Some((pi, ti));
                pi += 1;
            }
            Some('?') => {
                ti += 1;
                pi += 1;
            }
            Some(c) if *c == text[ti] => {
                ti += 1;
                pi += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    pi = star + 1;
                    ti = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }
    pattern[pi..].iter().all(|c| *c == '*')
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl PartialOrd for ObjectName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ObjectName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical.cmp(&other.canonical)
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ordered = self
            .key_order
            .iter()
            .filter_map(|k| self.properties.get_key_value(k));
        f.write_str(&render(&self.domain, ordered, self.property_pattern))
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectName({})", self.canonical)
    }
}

impl FromStr for ObjectName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name(s: &str) -> ObjectName {
        ObjectName::parse(s).unwrap()
    }

    #[test]
    fn equality_ignores_property_order() {
        let a = name("app:type=Cache,name=users");
        let b = name("app:name=users,type=Cache");
        assert_eq!(a, b);
        assert_eq!(a.canonical_name(), "app:name=users,type=Cache");
        // Display keeps the written order.
        assert_eq!(a.to_string(), "app:type=Cache,name=users");
        assert_eq!(b.to_string(), "app:name=users,type=Cache");
    }

    #[test]
    fn different_domains_are_different_names() {
        assert_ne!(name("a:type=T"), name("b:type=T"));
    }

    #[test]
    fn reject_malformed_names() {
        assert!(ObjectName::parse("nodomain").is_err());
        assert!(ObjectName::parse("app:").is_err());
        assert!(ObjectName::parse("app:type").is_err());
        assert!(ObjectName::parse("app:=x").is_err());
        assert!(ObjectName::parse("app:type=").is_err());
        assert!(ObjectName::parse("app:type=a,type=b").is_err());
        assert!(ObjectName::parse("app:type=a*").is_err());
        assert!(ObjectName::parse("app:*,type=a").is_err());
    }

    #[test]
    fn pattern_flags() {
        assert!(!name("app:type=T").is_pattern());
        assert!(name("app:*").is_property_pattern());
        assert!(name("app:type=T,*").is_property_pattern());
        assert!(name("ap?:type=T").is_domain_pattern());
        assert!(name("*:type=T").is_pattern());
        assert!(ObjectName::wildcard().is_pattern());
        assert_eq!(ObjectName::wildcard(), name("*:*"));
    }

    #[test]
    fn property_pattern_matches_supersets() {
        let pattern = name("app:type=Cache,*");
        assert!(pattern.matches(&name("app:type=Cache,name=users")));
        assert!(pattern.matches(&name("app:type=Cache")));
        assert!(!pattern.matches(&name("app:type=Pool,name=users")));
        assert!(!pattern.matches(&name("other:type=Cache")));
    }

    #[test]
    fn exact_property_list_must_match_fully() {
        let pattern = name("ap*:type=Cache");
        assert!(pattern.matches(&name("app:type=Cache")));
        assert!(pattern.matches(&name("apple:type=Cache")));
        assert!(!pattern.matches(&name("app:type=Cache,name=users")));
    }

    #[test]
    fn wildcard_matches_everything() {
        let all = ObjectName::wildcard();
        assert!(all.matches(&name("a:b=c")));
        assert!(all.matches(&name("JMImplementation:type=MBeanServerDelegate")));
    }

    #[test]
    fn default_domain_is_applied_only_when_empty() {
        let bare = name(":type=T");
        assert_eq!(bare.domain(), "");
        let resolved = bare.with_default_domain("Default");
        assert_eq!(resolved, name("Default:type=T"));

        let explicit = name("app:type=T");
        assert_eq!(explicit.with_default_domain("Default"), explicit);
    }

    #[test]
    fn wildmatch_cases() {
        assert!(wildmatch("", ""));
        assert!(wildmatch("", "*"));
        assert!(!wildmatch("", "?"));
        assert!(wildmatch("abc", "a*c"));
        assert!(wildmatch("abbbc", "a*c"));
        assert!(wildmatch("abc", "*"));
        assert!(wildmatch("abc", "a?c"));
        assert!(!wildmatch("abd", "a*c"));
        assert!(wildmatch("aXbXc", "*b*c"));
        assert!(!wildmatch("abc", "abcd"));
    }

    #[test]
    fn serde_uses_textual_form() {
        let n = name("app:type=Cache,name=users");
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"app:type=Cache,name=users\"");
        let back: ObjectName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
        assert!(serde_json::from_str::<ObjectName>("\"broken\"").is_err());
    }

    proptest! {
        #[test]
        fn canonical_form_independent_of_order(
            props in proptest::collection::btree_map("[a-z]{1,6}", "[a-zA-Z0-9]{1,6}", 1..6)
        ) {
            let forward: Vec<_> = props.iter().collect();
            let reversed: Vec<_> = props.iter().rev().collect();
            let a = ObjectName::new("d", forward).unwrap();
            let b = ObjectName::new("d", reversed).unwrap();
            prop_assert_eq!(a.canonical_name(), b.canonical_name());
            prop_assert_eq!(&a, &b);
            prop_assert!(a.matches(&b));
        }

        #[test]
        fn star_domain_pattern_matches_any_domain(domain in "[a-zA-Z.]{0,12}") {
            let target = ObjectName::new(domain, [("k", "v")]).unwrap();
            prop_assert!(ObjectName::wildcard().matches(&target));
        }
    }
}
