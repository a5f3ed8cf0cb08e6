//! # Engine Module
//!
//! The pipeline evaluation and caching engine.
//!
//! A [`Pipeline`](pipeline::Pipeline) is an ordered chain of
//! [`ModifierApplication`](application::ModifierApplication)s rooted at a
//! [`DataSource`](source::DataSource). The [`PipelineEvaluator`](evaluator::PipelineEvaluator)
//! walks the chain for a requested animation time, reusing each stage's cached
//! [`PipelineFlowState`](flow_state::PipelineFlowState) while its inputs are
//! unchanged and its validity interval still covers the time. Data flows
//! between stages through shared, copy-on-write [`DataCollection`](crate::core::data::DataCollection)s.
//!
//! Cache invalidation is lazy: editing a stage only drops that stage's cache,
//! and downstream stages notice the new upstream revision the next time they
//! are evaluated.

pub mod application;
pub mod cache;
pub mod config;
pub mod delegate;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod flow_state;
pub mod modifier;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod request;
pub mod source;
