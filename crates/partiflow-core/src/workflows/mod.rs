//! # Workflows Module
//!
//! High-level entry points that drive whole animations through a pipeline.
//!
//! ## Overview
//!
//! A single call to [`PipelineEvaluator::evaluate`](crate::engine::evaluator::PipelineEvaluator::evaluate)
//! answers one request for one time. Front ends usually want more: the result
//! of every frame in a range, with progress feedback while the frames are being
//! computed, or a snapshot of several unrelated datasets at the same time.
//! Workflows package these patterns on top of the engine.
//!
//! ## Architecture
//!
//! - **Animation Workflow** ([`animation`]) - Frame-range evaluation with
//!   [`Progress`](crate::engine::progress::Progress) reporting, and evaluation
//!   of independent pipelines (in parallel with the `parallel` feature).

pub mod animation;
