use crate::scan::{Activation, ModFolder, ACTIVE_MARKER_EXT, INACTIVE_MARKER_EXT};
use std::{fs, io, path::PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("no activation marker in {}", .0.display())]
    MarkerMissing(PathBuf),
    #[error("rename {} -> {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Flips the marker extension with a single rename. Nothing else in the
/// folder is touched; on failure the marker keeps its old name.
pub fn toggle_marker(folder: &ModFolder) -> Result<(PathBuf, Activation), ToggleError> {
    let marker = folder
        .marker
        .as_ref()
        .filter(|path| path.is_file())
        .ok_or_else(|| ToggleError::MarkerMissing(folder.path.clone()))?;

    let extension = marker
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let (next_ext, next_state) = match extension.as_str() {
        ext if ext == ACTIVE_MARKER_EXT => (INACTIVE_MARKER_EXT, Activation::Inactive),
        ext if ext == INACTIVE_MARKER_EXT => (ACTIVE_MARKER_EXT, Activation::Active),
        _ => return Err(ToggleError::MarkerMissing(folder.path.clone())),
    };

    let target = marker.with_extension(next_ext);
    fs::rename(marker, &target).map_err(|source| ToggleError::Rename {
        from: marker.clone(),
        to: target.clone(),
        source,
    })?;
    Ok((target, next_state))
}
