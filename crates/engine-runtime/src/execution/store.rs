use crate::error::JobError;
use engine_core::state::{StateStore, sled_store::SledStateStore};
use std::{path::PathBuf, sync::Arc};
use tracing::debug;

/// Default location of the execution state: `~/.batch/state`.
pub fn default_state_dir() -> Result<PathBuf, JobError> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        JobError::Initialization("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(".batch").join("state"))
}

pub fn open_state_store(dir: Option<PathBuf>) -> Result<Arc<dyn StateStore>, JobError> {
    let dir = match dir {
        Some(dir) => dir,
        None => default_state_dir()?,
    };
    debug!(path = %dir.display(), "Opening state store");
    Ok(Arc::new(SledStateStore::open(&dir)?))
}
