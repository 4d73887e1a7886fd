use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::GardenError;

/// Remove any previous output and recreate the directory empty.
pub fn prepare_output_dir(output_dir: &Path) -> Result<(), GardenError> {
    if output_dir.exists() {
        info!("cleaning output directory {}", output_dir.display());
        fs::remove_dir_all(output_dir).map_err(GardenError::io(output_dir))?;
    }
    fs::create_dir_all(output_dir).map_err(GardenError::io(output_dir))?;
    Ok(())
}

pub fn copy_asset(path: &Path, output_path: &Path) -> Result<(), GardenError> {
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(GardenError::io(parent))?;
    }
    debug!("copying asset {} -> {}", path.display(), output_path.display());
    fs::copy(path, output_path).map_err(GardenError::io(output_path))?;
    Ok(())
}

pub fn write_page(path: &Path, contents: &str) -> Result<(), GardenError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(GardenError::io(parent))?;
    }
    fs::write(path, contents).map_err(GardenError::io(path))?;
    debug!("wrote {}", path.display());
    Ok(())
}
