pub mod eval;
pub mod modifiers;

use crate::error::{CliError, Result};
use partiflow::core::data::DataCollection;
use partiflow::core::io::load_particle_table;
use std::path::Path;
use tracing::info;

/// Loads a particle table, one collection per frame.
pub(crate) fn load_frames(path: &Path) -> Result<Vec<DataCollection>> {
    info!("Loading particle table from {:?}", path);
    load_particle_table(path).map_err(|source| CliError::Table {
        path: path.to_path_buf(),
        source,
    })
}
