//! Loading of particle data into data collections.
//!
//! File import is deliberately thin: the engine only needs a way to turn a
//! plain table of per-particle columns into one data collection per frame.

pub mod table;

pub use table::{TableLoadError, load_particle_table, read_particle_table};
