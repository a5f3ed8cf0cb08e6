//! # Data Module
//!
//! Data objects and the collection that carries them down a pipeline.
//!
//! ## Overview
//!
//! A [`collection::DataCollection`] is an ordered, identifier-keyed list of
//! shared [`object::DataObject`]s. Objects are either scalar attributes or
//! [`container::PropertyContainer`]s holding per-element property columns.
//!
//! Sharing is explicit: objects and properties sit behind `Arc`s, and every
//! `*_mut` accessor clones the shared value first if anybody else still holds
//! a reference. Readers holding an older collection never observe a change.
//!
//! ## Key Components
//!
//! - [`property`] - Typed property columns
//! - [`standard`] - Compile-time table of standard property names and types
//! - [`container`] - Element kinds and property containers
//! - [`object`] - Attributes and the data object variant
//! - [`collection`] - The data collection itself
//! - [`error`] - Data model errors

pub mod collection;
pub mod container;
pub mod error;
pub mod object;
pub mod property;
pub mod standard;

pub use collection::DataCollection;
pub use container::{ElementKind, PropertyContainer};
pub use error::DataError;
pub use object::{Attribute, AttributeValue, DataObject, DataObjectType};
pub use property::{Property, PropertyData, PropertyDataType};
