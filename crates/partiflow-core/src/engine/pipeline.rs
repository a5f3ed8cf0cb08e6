use super::application::ModifierApplication;
use super::cache::StageCache;
use super::config::{AnimationSettings, ModifierSpec, PipelineConfig};
use super::error::PipelineError;
use super::evaluator::PipelineEvaluator;
use super::events::{EventCallback, PipelineEvent, Stage};
use super::modifier::{SharedModifier, read_modifier, write_modifier};
use super::registry::ModifierRegistry;
use super::request::RequestTracker;
use super::source::DataSource;
use slotmap::{SlotMap, new_key_type};
use std::fmt;
use tracing::{debug, warn};

new_key_type! {
    pub struct ModAppId;
}

/// An ordered chain of modifier applications rooted at a data source.
///
/// The chain owns its applications and their caches. Modifiers themselves
/// are shared handles and may be referenced from outside the chain; edits
/// made through such a handle are picked up on the next evaluation because
/// every stage compares a snapshot of its modifier's parameters.
pub struct Pipeline {
    pub(crate) source: Box<dyn DataSource>,
    pub(crate) source_cache: StageCache<u64>,
    pub(crate) stages: SlotMap<ModAppId, ModifierApplication>,
    pub(crate) order: Vec<ModAppId>,
    next_revision: u64,
    tracker: RequestTracker,
    observers: Vec<EventCallback>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &self.source)
            .field("stages", &self.order.len())
            .field("next_revision", &self.next_revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Pipeline {
    pub fn new<S: DataSource + 'static>(source: S) -> Self {
        Self::with_source(Box::new(source))
    }

    pub fn with_source(source: Box<dyn DataSource>) -> Self {
        Self {
            source,
            source_cache: StageCache::new(),
            stages: SlotMap::with_key(),
            order: Vec::new(),
            next_revision: 1,
            tracker: RequestTracker::new(),
            observers: Vec::new(),
        }
    }

    /// Builds a chain from a serialized description, creating each modifier
    /// through `registry`.
    pub fn from_config(
        config: &PipelineConfig,
        registry: &ModifierRegistry,
        source: Box<dyn DataSource>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let mut pipeline = Self::with_source(source);
        for spec in &config.modifiers {
            let modifier = registry.create(&spec.type_name, &spec.params)?;
            let id = pipeline.append(modifier);
            if let Some(app) = pipeline.stages.get_mut(id) {
                app.set_enabled(spec.enabled);
                app.set_title(spec.title.clone());
            }
        }
        debug!(stages = pipeline.len(), "Built pipeline from configuration.");
        Ok(pipeline)
    }

    /// Serializes the chain's current modifier settings.
    pub fn to_config(&self) -> Result<PipelineConfig, PipelineError> {
        let modifiers = self
            .stages()
            .map(|(_, app)| {
                let modifier = read_modifier(app.modifier());
                let params = modifier
                    .parameters()
                    .map_err(|source| PipelineError::InvalidParameters {
                        type_name: modifier.type_name().to_string(),
                        source,
                    })?;
                Ok(ModifierSpec {
                    type_name: modifier.type_name().to_string(),
                    enabled: app.is_enabled(),
                    title: app.custom_title().map(str::to_string),
                    params: params.into_table(),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(PipelineConfig {
            animation: AnimationSettings {
                ticks_per_frame: self.source.ticks_per_frame(),
            },
            modifiers,
        })
    }

    pub fn source(&self) -> &dyn DataSource {
        self.source.as_ref()
    }

    /// Mutable access to the source. Content changes are detected through the
    /// source's revision on the next evaluation.
    pub fn source_mut(&mut self) -> &mut dyn DataSource {
        self.tracker.supersede();
        self.source.as_mut()
    }

    pub fn replace_source(&mut self, source: Box<dyn DataSource>) -> Box<dyn DataSource> {
        let old = std::mem::replace(&mut self.source, source);
        self.invalidate_source();
        old
    }

    pub fn invalidate_source(&mut self) {
        self.source_cache.invalidate();
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageInvalidated {
            stage: Stage::Source,
        });
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Stage ids in chain order, from the source towards the output.
    pub fn stage_ids(&self) -> &[ModAppId] {
        &self.order
    }

    pub fn stage(&self, id: ModAppId) -> Option<&ModifierApplication> {
        self.stages.get(id)
    }

    pub fn stages(&self) -> impl Iterator<Item = (ModAppId, &ModifierApplication)> {
        self.order
            .iter()
            .filter_map(|&id| self.stages.get(id).map(|app| (id, app)))
    }

    pub fn position(&self, id: ModAppId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn append(&mut self, modifier: SharedModifier) -> ModAppId {
        self.insert_at(self.order.len(), modifier)
    }

    /// Inserts a modifier so that it becomes the stage at `index`.
    ///
    /// A warning is logged when the modifier does not apply to the data
    /// arriving at that position; it is inserted regardless.
    pub fn insert(&mut self, index: usize, modifier: SharedModifier) -> Result<ModAppId, PipelineError> {
        if index > self.order.len() {
            return Err(PipelineError::IndexOutOfRange {
                index,
                len: self.order.len(),
            });
        }
        Ok(self.insert_at(index, modifier))
    }

    fn insert_at(&mut self, index: usize, modifier: SharedModifier) -> ModAppId {
        let time = self.source.time_at_frame(0);
        let upstream = PipelineEvaluator::default().preliminary_until(self, time, index);
        if let Some(data) = upstream.data() {
            let modifier = read_modifier(&modifier);
            if !modifier.is_applicable_to(data) {
                warn!(
                    modifier = modifier.type_name(),
                    index, "Modifier is not applicable to the data at its insertion point."
                );
            }
        }

        let id = self.stages.insert(ModifierApplication::new(modifier));
        self.order.insert(index, id);
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageInserted { id, index });
        id
    }

    pub fn remove(&mut self, id: ModAppId) -> Result<ModifierApplication, PipelineError> {
        let index = self.position(id).ok_or(PipelineError::UnknownStage)?;
        self.order.remove(index);
        let app = self.stages.remove(id).ok_or(PipelineError::UnknownStage)?;
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageRemoved { id });
        Ok(app)
    }

    pub fn move_stage(&mut self, id: ModAppId, to: usize) -> Result<(), PipelineError> {
        let from = self.position(id).ok_or(PipelineError::UnknownStage)?;
        if to >= self.order.len() {
            return Err(PipelineError::IndexOutOfRange {
                index: to,
                len: self.order.len(),
            });
        }
        if from == to {
            return Ok(());
        }
        self.order.remove(from);
        self.order.insert(to, id);
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageMoved { id, from, to });
        Ok(())
    }

    /// Swaps the modifier of a stage, returning the previous one.
    pub fn replace_modifier(
        &mut self,
        id: ModAppId,
        modifier: SharedModifier,
    ) -> Result<SharedModifier, PipelineError> {
        let app = self.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        let old = app.modifier().clone();
        app.set_modifier(modifier);
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageInvalidated {
            stage: Stage::Modifier(id),
        });
        Ok(old)
    }

    pub fn set_enabled(&mut self, id: ModAppId, enabled: bool) -> Result<(), PipelineError> {
        let app = self.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        if app.is_enabled() == enabled {
            return Ok(());
        }
        app.set_enabled(enabled);
        app.invalidate();
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageInvalidated {
            stage: Stage::Modifier(id),
        });
        Ok(())
    }

    pub fn set_title(&mut self, id: ModAppId, title: Option<String>) -> Result<(), PipelineError> {
        let app = self.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        app.set_title(title);
        Ok(())
    }

    /// Overrides some of a stage's modifier parameters.
    pub fn set_parameters(&mut self, id: ModAppId, patch: &toml::Table) -> Result<(), PipelineError> {
        let app = self.stages.get(id).ok_or(PipelineError::UnknownStage)?;
        {
            let mut modifier = write_modifier(app.modifier());
            let type_name = modifier.type_name().to_string();
            let invalid = |source| PipelineError::InvalidParameters {
                type_name: type_name.clone(),
                source,
            };
            let params = modifier.parameters().map_err(invalid)?.merged(patch);
            modifier.set_parameters(&params).map_err(invalid)?;
        }
        self.tracker.supersede();
        Ok(())
    }

    /// Drops the cached output of a stage after a change the parameter
    /// snapshot cannot see.
    pub fn invalidate(&mut self, id: ModAppId) -> Result<(), PipelineError> {
        let app = self.stages.get_mut(id).ok_or(PipelineError::UnknownStage)?;
        app.invalidate();
        self.tracker.supersede();
        self.notify(&PipelineEvent::StageInvalidated {
            stage: Stage::Modifier(id),
        });
        Ok(())
    }

    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: Fn(&PipelineEvent) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(callback));
    }

    /// A handle that lets other threads supersede running evaluations.
    pub fn request_tracker(&self) -> RequestTracker {
        self.tracker.clone()
    }

    pub(crate) fn notify(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }

    pub(crate) fn allocate_revision(&mut self) -> u64 {
        let revision = self.next_revision;
        self.next_revision += 1;
        revision
    }
}
