//! Query expressions evaluated against registered beans.
//!
//! A [`QueryExp`] narrows the result of a name-pattern query by looking at
//! each candidate's attributes, class, and name. Expressions are plain data
//! (serde-serialisable, so the CLI accepts them as JSON) and are evaluated
//! against a [`QueryContext`] that reads from the server.

use std::cmp::Ordering;

use mbs_types::{wildmatch, ObjectName, Value};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("cannot read {attribute} of {name}: {reason}")]
    Attribute {
        name: ObjectName,
        attribute: String,
        reason: String,
    },

    #[error("cannot compare {left} with {right}")]
    Incomparable { left: Value, right: Value },

    #[error("bean not available: {0}")]
    Bean(String),
}

/// What a query reads from the server while it runs.
pub trait QueryContext {
    fn attribute(&self, name: &ObjectName, attribute: &str) -> Result<Value, QueryError>;
    fn class_name(&self, name: &ObjectName) -> Result<String, QueryError>;
    fn is_instance_of(&self, name: &ObjectName, class_name: &str) -> Result<bool, QueryError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A value in a query: an attribute of the candidate, or a constant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueExp {
    Attr(String),
    Literal(Value),
}

impl ValueExp {
    pub fn attr(name: impl Into<String>) -> Self {
        Self::Attr(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    fn eval(&self, name: &ObjectName, ctx: &dyn QueryContext) -> Result<Value, QueryError> {
        match self {
            Self::Attr(attribute) => ctx.attribute(name, attribute),
            Self::Literal(value) => Ok(value.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryExp {
    And(Box<QueryExp>, Box<QueryExp>),
    Or(Box<QueryExp>, Box<QueryExp>),
    Not(Box<QueryExp>),
    Compare {
        op: CompareOp,
        left: ValueExp,
        right: ValueExp,
    },
    /// `low <= value <= high`.
    Between {
        value: ValueExp,
        low: ValueExp,
        high: ValueExp,
    },
    In {
        value: ValueExp,
        list: Vec<ValueExp>,
    },
    /// A string attribute matches a `*`/`?` glob.
    Match { attr: String, pattern: String },
    InstanceOf(String),
    /// The bean class name matches a glob.
    ClassName(String),
    /// The candidate's name matches an object name pattern.
    Name(ObjectName),
}

impl QueryExp {
    pub fn and(self, other: QueryExp) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: QueryExp) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn compare(op: CompareOp, left: ValueExp, right: ValueExp) -> Self {
        Self::Compare { op, left, right }
    }

    /// Shorthand for `attr == value`.
    pub fn attr_eq(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, ValueExp::attr(attr), ValueExp::literal(value))
    }

    /// Does the bean named `name` satisfy this expression?
    pub fn apply(&self, name: &ObjectName, ctx: &dyn QueryContext) -> Result<bool, QueryError> {
        match self {
            Self::And(a, b) => Ok(a.apply(name, ctx)? && b.apply(name, ctx)?),
            Self::Or(a, b) => Ok(a.apply(name, ctx)? || b.apply(name, ctx)?),
            Self::Not(e) => Ok(!e.apply(name, ctx)?),
            Self::Compare { op, left, right } => {
                let l = left.eval(name, ctx)?;
                let r = right.eval(name, ctx)?;
                compare(*op, &l, &r)
            }
            Self::Between { value, low, high } => {
                let v = value.eval(name, ctx)?;
                let lo = low.eval(name, ctx)?;
                let hi = high.eval(name, ctx)?;
                Ok(compare(CompareOp::Ge, &v, &lo)? && compare(CompareOp::Le, &v, &hi)?)
            }
            Self::In { value, list } => {
                let v = value.eval(name, ctx)?;
                for candidate in list {
                    if compare(CompareOp::Eq, &v, &candidate.eval(name, ctx)?)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Match { attr, pattern } => match ctx.attribute(name, attr)? {
                Value::String(s) => Ok(wildmatch(&s, pattern)),
                _ => Ok(false),
            },
            Self::InstanceOf(class_name) => ctx.is_instance_of(name, class_name),
            Self::ClassName(glob) => Ok(wildmatch(&ctx.class_name(name)?, glob)),
            Self::Name(pattern) => Ok(pattern.matches(name)),
        }
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, QueryError> {
    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => compare_numbers(l, r),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) if op == CompareOp::Eq => Some(l.cmp(r)),
        _ if op == CompareOp::Eq => return Ok(left == right),
        _ => None,
    };
    let ordering = ordering.ok_or_else(|| QueryError::Incomparable {
        left: left.clone(),
        right: right.clone(),
    })?;
    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
    })
}

/// Integers compare exactly; floats only when either side is one.
fn compare_numbers(l: &Number, r: &Number) -> Option<Ordering> {
    if let (Some(l), Some(r)) = (l.as_u64(), r.as_u64()) {
        return Some(l.cmp(&r));
    }
    if let (Some(l), Some(r)) = (l.as_i64(), r.as_i64()) {
        return Some(l.cmp(&r));
    }
    // above i64::MAX against a negative
    if l.is_u64() && r.is_i64() {
        return Some(Ordering::Greater);
    }
    if l.is_i64() && r.is_u64() {
        return Some(Ordering::Less);
    }
    l.as_f64()?.partial_cmp(&r.as_f64()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixture {
        attrs: HashMap<String, Value>,
        class: String,
    }

    impl QueryContext for Fixture {
        fn attribute(&self, name: &ObjectName, attribute: &str) -> Result<Value, QueryError> {
            self.attrs
                .get(attribute)
                .cloned()
                .ok_or_else(|| QueryError::Attribute {
                    name: name.clone(),
                    attribute: attribute.into(),
                    reason: "no such attribute".into(),
                })
        }

        fn class_name(&self, _: &ObjectName) -> Result<String, QueryError> {
            Ok(self.class.clone())
        }

        fn is_instance_of(&self, _: &ObjectName, class_name: &str) -> Result<bool, QueryError> {
            Ok(self.class == class_name)
        }
    }

    fn fixture() -> Fixture {
        let mut attrs = HashMap::new();
        attrs.insert("Size".to_string(), Value::from(42));
        attrs.insert("Owner".to_string(), Value::from("billing"));
        attrs.insert("Enabled".to_string(), Value::from(true));
        Fixture {
            attrs,
            class: "app.Cache".into(),
        }
    }

    fn name() -> ObjectName {
        ObjectName::parse("app:type=Cache,name=users").unwrap()
    }

    #[test]
    fn comparisons() {
        let ctx = fixture();
        let gt = QueryExp::compare(CompareOp::Gt, ValueExp::attr("Size"), ValueExp::literal(40));
        assert!(gt.apply(&name(), &ctx).unwrap());
        assert!(!gt.clone().not().apply(&name(), &ctx).unwrap());
        assert!(QueryExp::attr_eq("Enabled", true).apply(&name(), &ctx).unwrap());
        assert!(QueryExp::attr_eq("Owner", "billing").apply(&name(), &ctx).unwrap());

        let between = QueryExp::Between {
            value: ValueExp::attr("Size"),
            low: ValueExp::literal(42),
            high: ValueExp::literal(50.5),
        };
        assert!(between.apply(&name(), &ctx).unwrap());

        let in_list = QueryExp::In {
            value: ValueExp::attr("Owner"),
            list: vec![ValueExp::literal("ops"), ValueExp::literal("billing")],
        };
        assert!(in_list.apply(&name(), &ctx).unwrap());
    }

    #[test]
    fn large_integers_compare_exactly() {
        let mut ctx = fixture();
        ctx.attrs.insert("Id".into(), Value::from(9_007_199_254_740_993u64));
        assert!(!QueryExp::attr_eq("Id", 9_007_199_254_740_992u64)
            .apply(&name(), &ctx)
            .unwrap());
        assert!(QueryExp::attr_eq("Id", 9_007_199_254_740_993u64)
            .apply(&name(), &ctx)
            .unwrap());

        let in_list = QueryExp::In {
            value: ValueExp::attr("Id"),
            list: vec![ValueExp::literal(9_007_199_254_740_992u64)],
        };
        assert!(!in_list.apply(&name(), &ctx).unwrap());

        let between = QueryExp::Between {
            value: ValueExp::attr("Id"),
            low: ValueExp::literal(9_007_199_254_740_990u64),
            high: ValueExp::literal(9_007_199_254_740_992u64),
        };
        assert!(!between.apply(&name(), &ctx).unwrap());

        ctx.attrs.insert("Id".into(), Value::from(u64::MAX));
        let above_negative =
            QueryExp::compare(CompareOp::Gt, ValueExp::attr("Id"), ValueExp::literal(-1));
        assert!(above_negative.apply(&name(), &ctx).unwrap());
    }

    #[test]
    fn incomparable_values_are_errors() {
        let ctx = fixture();
        let bad = QueryExp::compare(CompareOp::Lt, ValueExp::attr("Owner"), ValueExp::literal(3));
        assert!(matches!(
            bad.apply(&name(), &ctx),
            Err(QueryError::Incomparable { .. })
        ));
        let missing = QueryExp::attr_eq("Nope", 1);
        assert!(matches!(
            missing.apply(&name(), &ctx),
            Err(QueryError::Attribute { .. })
        ));
    }

    #[test]
    fn class_name_and_pattern_tests() {
        let ctx = fixture();
        assert!(QueryExp::ClassName("app.*".into()).apply(&name(), &ctx).unwrap());
        assert!(QueryExp::InstanceOf("app.Cache".into()).apply(&name(), &ctx).unwrap());
        assert!(QueryExp::Match {
            attr: "Owner".into(),
            pattern: "bill*".into()
        }
        .apply(&name(), &ctx)
        .unwrap());
        let by_name = QueryExp::Name(ObjectName::parse("app:name=users,*").unwrap());
        assert!(by_name.clone().and(QueryExp::attr_eq("Size", 42)).apply(&name(), &ctx).unwrap());
        assert!(QueryExp::attr_eq("Size", 0)
            .or(by_name)
            .apply(&name(), &ctx)
            .unwrap());
    }

    #[test]
    fn parses_from_json() {
        let json = r#"{"and": [
            {"compare": {"op": "ge", "left": {"attr": "Size"}, "right": {"literal": 10}}},
            {"class_name": "app.*"}
        ]}"#;
        let exp: QueryExp = serde_json::from_str(json).unwrap();
        assert!(exp.apply(&name(), &fixture()).unwrap());
    }
}
