//! # Core Module
//!
//! Fundamental data structures shared by every pipeline stage.
//!
//! ## Architecture
//!
//! - **Animation Time** ([`time`]) - Integer time points and validity intervals
//! - **Pipeline Health** ([`status`]) - Severity-ordered status values attached to results
//! - **Datasets** ([`data`]) - Data objects, property containers and the shared data collection
//! - **Input** ([`io`]) - Loading particle tables into per-frame data collections
//!
//! Nothing in this module knows about caching or evaluation order; those concerns
//! live in [`crate::engine`].

pub mod data;
pub mod io;
pub mod status;
pub mod time;
