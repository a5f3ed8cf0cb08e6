//! Layered configuration of the `eval` command: built-in defaults, then the
//! pipeline file, then `-S` overrides, then dedicated command-line flags.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;

pub use builder::build_config;
pub use models::AppConfig;
