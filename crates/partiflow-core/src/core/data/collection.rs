use super::container::{ElementKind, PropertyContainer};
use super::error::DataError;
use super::object::{AttributeValue, DataObject, DataObjectType};
use std::sync::Arc;
use tracing::trace;

/// An ordered, identifier-keyed bundle of data objects flowing down a pipeline.
///
/// Objects are held through `Arc`s. Cloning a collection is therefore cheap,
/// and the `*_mut` accessors copy an object only when another collection
/// still refers to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataCollection {
    objects: Vec<Arc<DataObject>>,
}

impl DataCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> impl Iterator<Item = &DataObject> {
        self.objects.iter().map(|o| o.as_ref())
    }

    pub fn get(&self, identifier: &str) -> Option<&DataObject> {
        self.objects
            .iter()
            .find(|o| o.identifier() == identifier)
            .map(|o| o.as_ref())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// Appends a data object.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::DuplicateIdentifier`] if an object with the same
    /// identifier is already part of the collection.
    pub fn add(&mut self, object: DataObject) -> Result<(), DataError> {
        if self.contains(object.identifier()) {
            return Err(DataError::DuplicateIdentifier(
                object.identifier().to_string(),
            ));
        }
        self.objects.push(Arc::new(object));
        Ok(())
    }

    /// Inserts or replaces the object with the same identifier, keeping its
    /// position in the collection. Returns the replaced object, if any.
    pub fn upsert(&mut self, object: DataObject) -> Option<Arc<DataObject>> {
        let object = Arc::new(object);
        match self
            .objects
            .iter_mut()
            .find(|o| o.identifier() == object.identifier())
        {
            Some(slot) => Some(std::mem::replace(slot, object)),
            None => {
                self.objects.push(object);
                None
            }
        }
    }

    pub fn remove(&mut self, identifier: &str) -> Option<Arc<DataObject>> {
        let index = self
            .objects
            .iter()
            .position(|o| o.identifier() == identifier)?;
        Some(self.objects.remove(index))
    }

    /// Returns an exclusively owned, mutable view of the named object,
    /// cloning it first if it is shared with another collection.
    pub fn make_mutable(&mut self, identifier: &str) -> Option<&mut DataObject> {
        let shared = self
            .objects
            .iter_mut()
            .find(|o| o.identifier() == identifier)?;
        if Arc::strong_count(shared) > 1 {
            trace!(object = identifier, "Cloning shared data object before mutation.");
        }
        Some(Arc::make_mut(shared))
    }

    pub fn objects_of_type(&self, object_type: DataObjectType) -> impl Iterator<Item = &DataObject> {
        self.objects()
            .filter(move |o| o.object_type() == object_type)
    }

    pub fn identifiers_of_type(&self, object_type: DataObjectType) -> Vec<String> {
        self.objects_of_type(object_type)
            .map(|o| o.identifier().to_string())
            .collect()
    }

    /// Returns the first container holding elements of the given kind.
    pub fn container(&self, kind: ElementKind) -> Option<&PropertyContainer> {
        self.objects_of_type(DataObjectType::Elements(kind))
            .find_map(|o| o.as_container())
    }

    pub fn expect_container(&self, kind: ElementKind) -> Result<&PropertyContainer, DataError> {
        self.container(kind)
            .ok_or(DataError::MissingContainer { kind })
    }

    pub fn container_by_id(&self, identifier: &str) -> Option<&PropertyContainer> {
        self.get(identifier).and_then(|o| o.as_container())
    }

    pub fn container_mut(&mut self, identifier: &str) -> Option<&mut PropertyContainer> {
        self.make_mutable(identifier)
            .and_then(|o| o.as_container_mut())
    }

    /// Mutable access to the first container of the given kind.
    pub fn expect_container_mut(
        &mut self,
        kind: ElementKind,
    ) -> Result<&mut PropertyContainer, DataError> {
        let identifier = self
            .container(kind)
            .map(|c| c.identifier().to_string())
            .ok_or(DataError::MissingContainer { kind })?;
        self.container_mut(&identifier)
            .ok_or(DataError::MissingContainer { kind })
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        match self.get(name)? {
            DataObject::Attribute(attr) => Some(&attr.value),
            DataObject::Container(_) => None,
        }
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.objects().filter_map(|o| match o {
            DataObject::Attribute(attr) => Some((attr.name.as_str(), &attr.value)),
            DataObject::Container(_) => None,
        })
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.upsert(DataObject::attribute(name, value));
    }

    /// Returns `base` if unused, otherwise the first free `base.N` (N >= 2).
    pub fn unique_identifier(&self, base: &str) -> String {
        if !self.contains(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}.{}", base, n))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    /// Whether both collections refer to the very same instance of an object.
    pub fn shares_object_with(&self, other: &DataCollection, identifier: &str) -> bool {
        let find = |c: &DataCollection| {
            c.objects
                .iter()
                .find(|o| o.identifier() == identifier)
                .cloned()
        };
        match (find(self), find(other)) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}
