//! CLI command implementations

pub mod kinds;
pub mod mode;
pub mod rules;
pub mod simulate;

use std::path::Path;

use petscale_engine::{EngineConfig, JsonFileRepository, ReferenceHandle, ScaleEngine};
use tracing::debug;

use crate::error::CliResult;

/// Open the engine over a profile file, for editing.
pub fn open_profile(path: &Path, config: EngineConfig) -> CliResult<ScaleEngine> {
    debug!(profile = %path.display(), "Opening rule profile");
    let engine = ScaleEngine::open(
        config,
        ReferenceHandle::unavailable(),
        Box::new(JsonFileRepository::new(path)),
    )?;
    Ok(engine)
}
