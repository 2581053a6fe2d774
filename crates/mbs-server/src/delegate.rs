//! The server delegate as a registered bean.

use mbs_notify::{NotificationEmitter, ServerDelegate};
use mbs_types::{Attribute, AttributeInfo, BeanInfo, Value};

use crate::bean::ManagedBean;
use crate::error::BeanError;

const CLASS_NAME: &str = "mbs.ServerDelegate";

const ATTRIBUTES: [(&str, &str); 7] = [
    ("ServerId", "unique identifier of this server"),
    ("SpecificationName", "management specification implemented"),
    ("SpecificationVersion", "specification version"),
    ("SpecificationVendor", "specification vendor"),
    ("ImplementationName", "implementation name"),
    ("ImplementationVersion", "implementation version"),
    ("ImplementationVendor", "implementation vendor"),
];

impl ManagedBean for ServerDelegate {
    fn bean_info(&self) -> BeanInfo {
        let mut info = BeanInfo::new(CLASS_NAME, "Identifies the server and announces registrations");
        info.attributes = ATTRIBUTES
            .iter()
            .map(|(name, description)| AttributeInfo::read_only(*name, "string", *description))
            .collect();
        info.notifications = self.broadcaster().notification_info();
        info
    }

    fn get_attribute(&self, name: &str) -> Result<Value, BeanError> {
        let value = match name {
            "ServerId" => self.server_id(),
            "SpecificationName" => Self::SPECIFICATION_NAME,
            "SpecificationVersion" => Self::SPECIFICATION_VERSION,
            "SpecificationVendor" => Self::SPECIFICATION_VENDOR,
            "ImplementationName" => Self::IMPLEMENTATION_NAME,
            "ImplementationVersion" => Self::IMPLEMENTATION_VERSION,
            "ImplementationVendor" => Self::IMPLEMENTATION_VENDOR,
            other => return Err(BeanError::AttributeNotFound(other.to_string())),
        };
        Ok(Value::from(value))
    }

    fn set_attribute(&self, attribute: Attribute) -> Result<(), BeanError> {
        if ATTRIBUTES.iter().any(|(name, _)| *name == attribute.name) {
            Err(BeanError::ReadOnly(attribute.name))
        } else {
            Err(BeanError::AttributeNotFound(attribute.name))
        }
    }

    fn invoke(&self, operation: &str, _: &[Value], _: &[String]) -> Result<Value, BeanError> {
        Err(BeanError::OperationNotFound(operation.to_string()))
    }

    fn broadcaster(&self) -> Option<&dyn NotificationEmitter> {
        Some(ServerDelegate::broadcaster(self) as &dyn NotificationEmitter)
    }
}
