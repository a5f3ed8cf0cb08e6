use super::error::DataError;
use super::standard;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyDataType {
    Int,
    Float,
    Vector3,
}

impl fmt::Display for PropertyDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropertyDataType::Int => "int",
            PropertyDataType::Float => "float",
            PropertyDataType::Vector3 => "vector3",
        };
        f.write_str(label)
    }
}

/// Column storage of a property, one entry per element.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Vector3(Vec<Vector3<f64>>),
}

impl PropertyData {
    pub fn zeros(data_type: PropertyDataType, len: usize) -> Self {
        match data_type {
            PropertyDataType::Int => PropertyData::Int(vec![0; len]),
            PropertyDataType::Float => PropertyData::Float(vec![0.0; len]),
            PropertyDataType::Vector3 => PropertyData::Vector3(vec![Vector3::zeros(); len]),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PropertyData::Int(v) => v.len(),
            PropertyData::Float(v) => v.len(),
            PropertyData::Vector3(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn data_type(&self) -> PropertyDataType {
        match self {
            PropertyData::Int(_) => PropertyDataType::Int,
            PropertyData::Float(_) => PropertyDataType::Float,
            PropertyData::Vector3(_) => PropertyDataType::Vector3,
        }
    }

    fn retain_unmasked(&mut self, mask: &[bool]) {
        fn retain<T>(values: &mut Vec<T>, mask: &[bool]) {
            let mut index = 0;
            values.retain(|_| {
                let keep = !mask.get(index).copied().unwrap_or(false);
                index += 1;
                keep
            });
        }
        match self {
            PropertyData::Int(v) => retain(v, mask),
            PropertyData::Float(v) => retain(v, mask),
            PropertyData::Vector3(v) => retain(v, mask),
        }
    }
}

/// A named per-element data column, e.g. particle positions or a selection flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    data: PropertyData,
}

impl Property {
    /// Creates a property with arbitrary name and data.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::TypeMismatch`] if `name` is a standard property
    /// name whose fixed type differs from the type of `data`.
    pub fn new(name: &str, data: PropertyData) -> Result<Self, DataError> {
        if let Some(expected) = standard::standard_data_type(name) {
            if expected != data.data_type() {
                return Err(DataError::TypeMismatch {
                    name: name.to_string(),
                    expected,
                    found: data.data_type(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            data,
        })
    }

    /// Creates a zero-initialized standard property with `len` elements.
    pub fn standard(name: &str, len: usize) -> Result<Self, DataError> {
        let data_type = standard::standard_data_type(name)
            .ok_or_else(|| DataError::UnknownStandardProperty(name.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            data: PropertyData::zeros(data_type, len),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &PropertyData {
        &self.data
    }

    pub fn data_type(&self) -> PropertyDataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        match &self.data {
            PropertyData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_mut(&mut self) -> Option<&mut [i64]> {
        match &mut self.data {
            PropertyData::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match &self.data {
            PropertyData::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<&[Vector3<f64>]> {
        match &self.data {
            PropertyData::Vector3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector3_mut(&mut self) -> Option<&mut [Vector3<f64>]> {
        match &mut self.data {
            PropertyData::Vector3(v) => Some(v),
            _ => None,
        }
    }

    /// Interprets an integer column as per-element flags (non-zero = set).
    pub fn flags(&self) -> Option<Vec<bool>> {
        self.as_int().map(|values| values.iter().map(|&v| v != 0).collect())
    }

    /// Builds a selection-style integer column from boolean flags.
    pub fn from_flags(name: &str, flags: &[bool]) -> Result<Self, DataError> {
        Self::new(
            name,
            PropertyData::Int(flags.iter().map(|&f| i64::from(f)).collect()),
        )
    }

    pub(crate) fn remove_masked(&mut self, mask: &[bool]) {
        self.data.retain_unmasked(mask);
    }
}
