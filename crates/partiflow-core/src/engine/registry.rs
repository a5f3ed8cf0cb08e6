use super::error::PipelineError;
use super::modifier::{SharedModifier, read_modifier, write_modifier};
use crate::core::data::DataCollection;
use tracing::{debug, warn};

pub type ModifierFactory = fn() -> SharedModifier;

/// Metadata and constructor of one modifier type.
#[derive(Debug, Clone)]
pub struct ModifierClass {
    pub type_name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub factory: ModifierFactory,
}

/// The set of modifier types available to pipeline builders.
///
/// Classes are enumerated in registration order, so listings are
/// reproducible.
#[derive(Debug, Clone, Default)]
pub struct ModifierRegistry {
    classes: Vec<ModifierClass>,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in modifier.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for class in crate::modifiers::builtin_classes() {
            if let Err(e) = registry.register(class) {
                warn!("Skipping built-in modifier: {}", e);
            }
        }
        registry
    }

    pub fn register(&mut self, class: ModifierClass) -> Result<(), PipelineError> {
        if self.get(class.type_name).is_some() {
            return Err(PipelineError::DuplicateModifierType(
                class.type_name.to_string(),
            ));
        }
        debug!(modifier = class.type_name, "Registered modifier type.");
        self.classes.push(class);
        Ok(())
    }

    pub fn classes(&self) -> &[ModifierClass] {
        &self.classes
    }

    pub fn get(&self, type_name: &str) -> Option<&ModifierClass> {
        self.classes.iter().find(|c| c.type_name == type_name)
    }

    /// Creates a modifier with default parameters overridden by `params`.
    pub fn create(
        &self,
        type_name: &str,
        params: &toml::Table,
    ) -> Result<SharedModifier, PipelineError> {
        let class = self
            .get(type_name)
            .ok_or_else(|| PipelineError::UnknownModifierType(type_name.to_string()))?;
        let modifier = (class.factory)();
        {
            let mut guard = write_modifier(&modifier);
            let invalid = |source| PipelineError::InvalidParameters {
                type_name: type_name.to_string(),
                source,
            };
            let merged = guard.parameters().map_err(invalid)?.merged(params);
            guard.set_parameters(&merged).map_err(invalid)?;
        }
        Ok(modifier)
    }

    /// Classes whose default-configured modifier applies to `input`.
    pub fn applicable_to(&self, input: &DataCollection) -> Vec<&ModifierClass> {
        self.classes
            .iter()
            .filter(|class| read_modifier(&(class.factory)()).is_applicable_to(input))
            .collect()
    }
}
