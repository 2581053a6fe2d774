use std::collections::HashSet;

use mbs_types::{Attribute, AttributeList, BeanInfo, ObjectName, Value};
use tracing::warn;

use crate::bean::ManagedBean;
use crate::class::BeanClass;
use crate::error::{BeanError, ServerError, ServerResult};

/// Checks beans for compliance and dispatches to them.
///
/// The interceptor never calls a bean directly; everything goes through
/// its introspector, which validates requests against the bean's metadata
/// and runs the registration hooks.
pub trait Introspector: Send + Sync {
    /// Class-level compliance, checked before construction.
    fn test_class(&self, class: &BeanClass) -> ServerResult<()>;

    /// Instance-level compliance. Returns the validated metadata.
    fn test_compliance(&self, bean: &dyn ManagedBean) -> ServerResult<BeanInfo>;

    fn class_name(&self, bean: &dyn ManagedBean) -> String;

    fn bean_info(&self, bean: &dyn ManagedBean) -> BeanInfo;

    fn get_attribute(&self, bean: &dyn ManagedBean, name: &str) -> ServerResult<Value>;

    fn get_attributes(&self, bean: &dyn ManagedBean, names: &[String]) -> AttributeList;

    fn set_attribute(&self, bean: &dyn ManagedBean, attribute: Attribute) -> ServerResult<()>;

    fn set_attributes(&self, bean: &dyn ManagedBean, attributes: AttributeList) -> AttributeList;

    fn invoke(
        &self,
        bean: &dyn ManagedBean,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<Value>;

    fn is_instance_of(&self, bean: &dyn ManagedBean, class_name: &str) -> bool;

    fn pre_register(
        &self,
        bean: &dyn ManagedBean,
        name: Option<&ObjectName>,
    ) -> ServerResult<Option<ObjectName>>;

    fn post_register(&self, bean: &dyn ManagedBean, registered: bool);

    fn pre_deregister(&self, bean: &dyn ManagedBean) -> ServerResult<()>;

    fn post_deregister(&self, bean: &dyn ManagedBean);
}

/// The default [`Introspector`].
#[derive(Debug, Default)]
pub struct StandardIntrospector;

impl StandardIntrospector {
    pub fn new() -> Self {
        Self
    }
}

impl Introspector for StandardIntrospector {
    fn test_class(&self, class: &BeanClass) -> ServerResult<()> {
        if class.name().trim().is_empty() {
            return Err(ServerError::NotCompliant("class name is empty".into()));
        }
        Ok(())
    }

    fn test_compliance(&self, bean: &dyn ManagedBean) -> ServerResult<BeanInfo> {
        let info = bean.bean_info();
        if info.class_name.trim().is_empty() {
            return Err(ServerError::NotCompliant(
                "bean metadata has no class name".into(),
            ));
        }

        let mut attributes = HashSet::new();
        for attribute in &info.attributes {
            if !attributes.insert(attribute.name.as_str()) {
                return Err(ServerError::NotCompliant(format!(
                    "{}: attribute {} declared twice",
                    info.class_name, attribute.name
                )));
            }
            if !attribute.readable && !attribute.writable {
                return Err(ServerError::NotCompliant(format!(
                    "{}: attribute {} is neither readable nor writable",
                    info.class_name, attribute.name
                )));
            }
        }

        let mut operations = HashSet::new();
        for operation in &info.operations {
            if !operations.insert((operation.name.as_str(), operation.signature())) {
                return Err(ServerError::NotCompliant(format!(
                    "{}: operation {}({}) declared twice",
                    info.class_name,
                    operation.name,
                    operation.signature().join(",")
                )));
            }
        }
        Ok(info)
    }

    fn class_name(&self, bean: &dyn ManagedBean) -> String {
        bean.bean_info().class_name
    }

    fn bean_info(&self, bean: &dyn ManagedBean) -> BeanInfo {
        bean.bean_info()
    }

    fn get_attribute(&self, bean: &dyn ManagedBean, name: &str) -> ServerResult<Value> {
        let info = bean.bean_info();
        match info.attribute(name) {
            Some(attribute) if attribute.readable => Ok(bean.get_attribute(name)?),
            _ => Err(BeanError::AttributeNotFound(name.to_string()).into()),
        }
    }

    fn get_attributes(&self, bean: &dyn ManagedBean, names: &[String]) -> AttributeList {
        let info = bean.bean_info();
        let readable: Vec<String> = names
            .iter()
            .filter(|n| info.attribute(n).is_some_and(|a| a.readable))
            .cloned()
            .collect();
        bean.get_attributes(&readable)
    }

    fn set_attribute(&self, bean: &dyn ManagedBean, attribute: Attribute) -> ServerResult<()> {
        let info = bean.bean_info();
        match info.attribute(&attribute.name) {
            Some(declared) if declared.writable => Ok(bean.set_attribute(attribute)?),
            Some(_) => Err(BeanError::ReadOnly(attribute.name).into()),
            None => Err(BeanError::AttributeNotFound(attribute.name).into()),
        }
    }

    fn set_attributes(&self, bean: &dyn ManagedBean, attributes: AttributeList) -> AttributeList {
        let info = bean.bean_info();
        let writable: AttributeList = attributes
            .into_iter()
            .filter(|a| info.attribute(&a.name).is_some_and(|d| d.writable))
            .collect();
        bean.set_attributes(writable)
    }

    fn invoke(
        &self,
        bean: &dyn ManagedBean,
        operation: &str,
        params: &[Value],
        signature: &[String],
    ) -> ServerResult<Value> {
        if params.len() != signature.len() {
            return Err(ServerError::IllegalArgument(format!(
                "{} parameters but a signature of {} types",
                params.len(),
                signature.len()
            )));
        }
        if bean.bean_info().operation(operation, signature).is_none() {
            return Err(BeanError::OperationNotFound(format!(
                "{operation}({})",
                signature.join(",")
            ))
            .into());
        }
        Ok(bean.invoke(operation, params, signature)?)
    }

    fn is_instance_of(&self, bean: &dyn ManagedBean, class_name: &str) -> bool {
        bean.bean_info().class_name == class_name || bean.is_instance_of(class_name)
    }

    fn pre_register(
        &self,
        bean: &dyn ManagedBean,
        name: Option<&ObjectName>,
    ) -> ServerResult<Option<ObjectName>> {
        match bean.registration() {
            Some(hooks) => hooks.pre_register(name).map_err(ServerError::Registration),
            None => Ok(name.cloned()),
        }
    }

    fn post_register(&self, bean: &dyn ManagedBean, registered: bool) {
        if let Some(hooks) = bean.registration() {
            hooks.post_register(registered);
        }
    }

    fn pre_deregister(&self, bean: &dyn ManagedBean) -> ServerResult<()> {
        match bean.registration() {
            Some(hooks) => hooks.pre_deregister().map_err(|e| {
                warn!(error = %e, "pre-deregister hook refused");
                ServerError::Registration(e)
            }),
            None => Ok(()),
        }
    }

    fn post_deregister(&self, bean: &dyn ManagedBean) {
        if let Some(hooks) = bean.registration() {
            hooks.post_deregister();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{AccessorTable, TableBean};
    use mbs_types::{AttributeInfo, Impact};
    use std::sync::Arc;

    struct Raw(BeanInfo);

    impl ManagedBean for Raw {
        fn bean_info(&self) -> BeanInfo {
            self.0.clone()
        }
        fn get_attribute(&self, name: &str) -> Result<Value, BeanError> {
            Err(BeanError::AttributeNotFound(name.into()))
        }
        fn set_attribute(&self, attribute: Attribute) -> Result<(), BeanError> {
            Err(BeanError::AttributeNotFound(attribute.name))
        }
        fn invoke(&self, op: &str, _: &[Value], _: &[String]) -> Result<Value, BeanError> {
            Err(BeanError::OperationNotFound(op.into()))
        }
    }

    fn echo_bean() -> TableBean<()> {
        let table = AccessorTable::new("test.Echo", "")
            .read_only("Name", "string", "", |_: &()| Ok(Value::from("echo")))
            .operation(
                "echo",
                "",
                &[("text", "string")],
                "string",
                Impact::Info,
                |_: &(), params| Ok(params[0].clone()),
            );
        TableBean::new((), Arc::new(table))
    }

    #[test]
    fn compliance_rejects_bad_metadata() {
        let intro = StandardIntrospector::new();
        assert!(matches!(
            intro.test_compliance(&Raw(BeanInfo::default())),
            Err(ServerError::NotCompliant(_))
        ));

        let mut dup = BeanInfo::new("test.Dup", "");
        dup.attributes.push(AttributeInfo::read_only("A", "u64", ""));
        dup.attributes.push(AttributeInfo::read_write("A", "u64", ""));
        assert!(matches!(
            intro.test_compliance(&Raw(dup)),
            Err(ServerError::NotCompliant(_))
        ));

        let mut dead = BeanInfo::new("test.Dead", "");
        let mut attr = AttributeInfo::read_only("A", "u64", "");
        attr.readable = false;
        dead.attributes.push(attr);
        assert!(intro.test_compliance(&Raw(dead)).is_err());

        assert_eq!(
            intro.test_compliance(&echo_bean()).unwrap().class_name,
            "test.Echo"
        );
    }

    #[test]
    fn dispatch_validates_against_metadata() {
        let intro = StandardIntrospector::new();
        let bean = echo_bean();
        assert_eq!(intro.get_attribute(&bean, "Name").unwrap(), Value::from("echo"));
        assert!(matches!(
            intro.get_attribute(&bean, "Other"),
            Err(ServerError::Bean(BeanError::AttributeNotFound(_)))
        ));
        assert!(matches!(
            intro.set_attribute(&bean, Attribute::new("Name", "x")),
            Err(ServerError::Bean(BeanError::ReadOnly(_)))
        ));

        let sig = vec!["string".to_string()];
        assert_eq!(
            intro.invoke(&bean, "echo", &[Value::from("hi")], &sig).unwrap(),
            Value::from("hi")
        );
        assert!(matches!(
            intro.invoke(&bean, "echo", &[Value::from(1)], &["u64".to_string()]),
            Err(ServerError::Bean(BeanError::OperationNotFound(_)))
        ));
        assert!(matches!(
            intro.invoke(&bean, "echo", &[], &sig),
            Err(ServerError::IllegalArgument(_))
        ));
    }

    /// Answers every read and accepts every write, whatever its metadata says.
    struct Permissive;

    impl ManagedBean for Permissive {
        fn bean_info(&self) -> BeanInfo {
            let mut info = BeanInfo::new("test.Permissive", "");
            info.attributes.push(AttributeInfo::read_only("Name", "string", ""));
            let mut secret = AttributeInfo::read_write("Secret", "string", "");
            secret.readable = false;
            info.attributes.push(secret);
            info
        }
        fn get_attribute(&self, name: &str) -> Result<Value, BeanError> {
            Ok(Value::from(format!("{name}-value")))
        }
        fn set_attribute(&self, _: Attribute) -> Result<(), BeanError> {
            Ok(())
        }
        fn invoke(&self, op: &str, _: &[Value], _: &[String]) -> Result<Value, BeanError> {
            Err(BeanError::OperationNotFound(op.into()))
        }
    }

    #[test]
    fn plural_dispatch_respects_access_flags() {
        let intro = StandardIntrospector::new();
        let bean = Permissive;
        assert!(intro.get_attribute(&bean, "Secret").is_err());

        let read = intro.get_attributes(
            &bean,
            &["Name".to_string(), "Secret".to_string(), "Undeclared".to_string()],
        );
        assert_eq!(read, vec![Attribute::new("Name", "Name-value")]);

        let written = intro.set_attributes(
            &bean,
            vec![
                Attribute::new("Name", "x"),
                Attribute::new("Secret", "y"),
                Attribute::new("Undeclared", "z"),
            ],
        );
        assert_eq!(written, vec![Attribute::new("Secret", "y")]);
    }

    #[test]
    fn hooks_default_to_pass_through() {
        let intro = StandardIntrospector::new();
        let bean = echo_bean();
        let name = ObjectName::parse("app:type=Echo").unwrap();
        assert_eq!(intro.pre_register(&bean, Some(&name)).unwrap(), Some(name));
        assert_eq!(intro.pre_register(&bean, None).unwrap(), None);
        assert!(intro.pre_deregister(&bean).is_ok());
        assert!(intro.is_instance_of(&bean, "test.Echo"));
        assert!(!intro.is_instance_of(&bean, "test.Other"));
    }
}
