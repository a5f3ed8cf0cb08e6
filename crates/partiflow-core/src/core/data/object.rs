use super::container::{ElementKind, PropertyContainer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a global (per-frame) attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Text(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<usize> for AttributeValue {
    fn from(v: usize) -> Self {
        AttributeValue::Int(v as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// Type tag of a data object, used to dispatch per-type handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataObjectType {
    Attribute,
    Elements(ElementKind),
}

impl fmt::Display for DataObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataObjectType::Attribute => f.write_str("attribute"),
            DataObjectType::Elements(kind) => write!(f, "{}", kind),
        }
    }
}

/// A named unit of information inside a data collection.
#[derive(Debug, Clone, PartialEq)]
pub enum DataObject {
    Attribute(Attribute),
    Container(PropertyContainer),
}

impl DataObject {
    pub fn attribute(name: &str, value: impl Into<AttributeValue>) -> Self {
        DataObject::Attribute(Attribute {
            name: name.to_string(),
            value: value.into(),
        })
    }

    pub fn identifier(&self) -> &str {
        match self {
            DataObject::Attribute(attr) => &attr.name,
            DataObject::Container(container) => container.identifier(),
        }
    }

    pub fn object_type(&self) -> DataObjectType {
        match self {
            DataObject::Attribute(_) => DataObjectType::Attribute,
            DataObject::Container(container) => DataObjectType::Elements(container.kind()),
        }
    }

    pub fn as_container(&self) -> Option<&PropertyContainer> {
        match self {
            DataObject::Container(container) => Some(container),
            DataObject::Attribute(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut PropertyContainer> {
        match self {
            DataObject::Container(container) => Some(container),
            DataObject::Attribute(_) => None,
        }
    }
}

impl From<PropertyContainer> for DataObject {
    fn from(container: PropertyContainer) -> Self {
        DataObject::Container(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_reflects_container_kind() {
        let obj: DataObject = PropertyContainer::new(ElementKind::Bonds, 0).into();
        assert_eq!(obj.object_type(), DataObjectType::Elements(ElementKind::Bonds));
        assert_eq!(obj.identifier(), "bonds");
    }

    #[test]
    fn attribute_identifier_is_its_name() {
        let obj = DataObject::attribute("Timestep", 1000_i64);
        assert_eq!(obj.identifier(), "Timestep");
        assert_eq!(obj.object_type(), DataObjectType::Attribute);
        assert!(obj.as_container().is_none());
    }

    #[test]
    fn attribute_value_converts_ints_to_floats() {
        assert_eq!(AttributeValue::Int(3).as_float(), Some(3.0));
        assert_eq!(AttributeValue::from("x").as_float(), None);
        assert_eq!(AttributeValue::from(2.5).to_string(), "2.5");
    }
}
