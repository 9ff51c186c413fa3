//! PNG output for sheets.

use std::fs;
use std::path::Path;

use image::RgbaImage;

use crate::error::{GenError, Result};

/// Write an RGBA sheet, creating parent directories as needed.
pub fn write_png(img: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenError::Io {
            path: parent.to_path_buf(),
            message: format!("Failed to create directory: {}", e),
        })?;
    }
    img.save(path).map_err(|e| GenError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write PNG: {}", e),
    })?;
    Ok(())
}
