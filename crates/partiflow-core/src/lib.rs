//! # Partiflow Core Library
//!
//! A caching modifier pipeline for time-dependent particle datasets. A pipeline
//! is an ordered chain of modifiers rooted at a data source; evaluating it at an
//! animation time produces a flow state (data collection, status and validity
//! interval). Stage results are cached per chain position and reused for as
//! long as their inputs stay unchanged.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict layering:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`DataCollection`,
//!   `PropertyContainer`, `TimeInterval`, `PipelineStatus`) and the tabular
//!   input loader.
//!
//! - **[`engine`]: The Logic Core.** The stateful evaluation machinery: flow
//!   states with copy-on-write data, cache state tracking, the `Modifier`
//!   contract, modifier applications, the pipeline chain and its evaluator.
//!
//! - **[`modifiers`]: The Built-ins.** Concrete pipeline stages registered in
//!   the default `ModifierRegistry`.
//!
//! - **[`workflows`]: The Public API.** Entry points that drive whole
//!   animations through a pipeline while reporting progress.

pub mod core;
pub mod engine;
pub mod modifiers;
pub mod workflows;
