//! Screensaver Loop
//!
//! Cycles through a directory of art files unattended: render, pause,
//! next, forever. A single file degenerates to one render. The loop owns
//! no state across iterations beyond the shared cancellation token, which
//! is honored between files, inside each render, and during the pause.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::render::{self, sleep_cancellable, CancelToken, RenderError, RenderOptions};

/// Fixed pause between works.
const INTER_FILE_PAUSE: Duration = Duration::from_secs(4);

/// List the regular files directly inside `dir`, lexicographically.
///
/// Re-run on every cycle so files added to a live directory join the
/// rotation.
pub(crate) fn list_art_files(dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RenderError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run the screensaver over a file or directory until cancelled.
///
/// A directory is cycled indefinitely in stable lexicographic order; a
/// plain file renders once. Cancellation is a normal `Ok` return. A file
/// that fails to render mid-cycle is skipped with a warning — files may
/// come and go under a live directory — but an unreadable or empty
/// directory is a real error.
pub fn screensaver(
    path: &Path,
    options: &RenderOptions,
    cancel: &CancelToken,
) -> Result<(), RenderError> {
    options.validate()?;

    if !path.is_dir() {
        return render::render_art(path, options, cancel);
    }

    info!("Screensaver over {}", path.display());
    loop {
        let files = list_art_files(path)?;
        if files.is_empty() {
            return Err(RenderError::NoArtFiles {
                path: path.to_path_buf(),
            });
        }

        for file in files {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if let Err(err) = render::render_art(&file, options, cancel) {
                warn!("Skipping {}: {}", file.display(), err);
            }
            sleep_cancellable(INTER_FILE_PAUSE, cancel);
        }

        if cancel.is_cancelled() {
            return Ok(());
        }
    }
}
