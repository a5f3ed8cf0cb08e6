use super::error::DataError;
use super::property::Property;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The kind of elements a property container describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Particles,
    Bonds,
}

impl ElementKind {
    pub const ALL: [ElementKind; 2] = [ElementKind::Particles, ElementKind::Bonds];

    /// Identifier used for the container of this kind when none is given.
    pub fn default_identifier(&self) -> &'static str {
        match self {
            ElementKind::Particles => "particles",
            ElementKind::Bonds => "bonds",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_identifier())
    }
}

/// A set of equally long property columns describing `element_count` elements.
///
/// Columns are shared through `Arc`s, so cloning a container is cheap and
/// only the columns that are subsequently modified get copied.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyContainer {
    identifier: String,
    kind: ElementKind,
    element_count: usize,
    properties: Vec<Arc<Property>>,
}

impl PropertyContainer {
    pub fn new(kind: ElementKind, element_count: usize) -> Self {
        Self::with_identifier(kind.default_identifier(), kind, element_count)
    }

    pub fn with_identifier(identifier: &str, kind: ElementKind, element_count: usize) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind,
            element_count,
            properties: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().map(|p| p.as_ref())
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn contains_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// Returns an exclusively owned, mutable view of the named property,
    /// cloning the column first if it is shared with another container.
    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        let shared = self.properties.iter_mut().find(|p| p.name() == name)?;
        if Arc::strong_count(shared) > 1 {
            trace!(property = name, "Cloning shared property before mutation.");
        }
        Some(Arc::make_mut(shared))
    }

    /// Inserts a property, replacing any existing property of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::LengthMismatch`] if the column length differs from
    /// the container's element count.
    pub fn insert_property(&mut self, property: Property) -> Result<(), DataError> {
        if property.len() != self.element_count {
            return Err(DataError::LengthMismatch {
                name: property.name().to_string(),
                expected: self.element_count,
                found: property.len(),
            });
        }
        let property = Arc::new(property);
        match self
            .properties
            .iter_mut()
            .find(|p| p.name() == property.name())
        {
            Some(slot) => *slot = property,
            None => self.properties.push(property),
        }
        Ok(())
    }

    /// Returns the named standard property for modification, creating a
    /// zero-initialized column if it does not exist yet.
    pub fn standard_property_mut(&mut self, name: &str) -> Result<&mut Property, DataError> {
        if !self.contains_property(name) {
            self.insert_property(Property::standard(name, self.element_count)?)?;
        }
        self.property_mut(name)
            .ok_or_else(|| DataError::ObjectNotFound(name.to_string()))
    }

    pub fn remove_property(&mut self, name: &str) -> Option<Arc<Property>> {
        let index = self.properties.iter().position(|p| p.name() == name)?;
        Some(self.properties.remove(index))
    }

    /// Deletes every element whose mask entry is `true` from all columns and
    /// returns the number of deleted elements.
    pub fn delete_elements(&mut self, mask: &[bool]) -> Result<usize, DataError> {
        if mask.len() != self.element_count {
            return Err(DataError::LengthMismatch {
                name: "deletion mask".to_string(),
                expected: self.element_count,
                found: mask.len(),
            });
        }
        let deleted = mask.iter().filter(|&&m| m).count();
        if deleted == 0 {
            return Ok(0);
        }
        for property in &mut self.properties {
            Arc::make_mut(property).remove_masked(mask);
        }
        self.element_count -= deleted;
        Ok(deleted)
    }

    /// Whether both containers refer to the very same column for `name`.
    pub fn shares_property_with(&self, other: &PropertyContainer, name: &str) -> bool {
        let find = |c: &PropertyContainer| c.properties.iter().find(|p| p.name() == name).cloned();
        match (find(self), find(other)) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }
}
