//! Upload session staging
//!
//! A session is a directory under the tmp root, created on the first staged
//! file. Staged files are named `<fileId>_<originalName>`. Nothing expires
//! them: a session lives until it is committed or cancelled.

use super::{asset_file_name, original_name, AssetLayout};
use ingr_common::{ids, Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A file waiting in a session directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub file_id: String,
    pub filename: String,
    pub path: PathBuf,
}

/// Stage `bytes` under the session and return the generated file id
pub fn stage_file(
    layout: &AssetLayout,
    session_id: &str,
    original: &str,
    bytes: &[u8],
) -> Result<StagedFile> {
    let session_dir = layout.session_dir(session_id)?;
    let filename = sanitize_file_name(original)?;

    std::fs::create_dir_all(&session_dir)?;

    let file_id = ids::generate();
    let path = session_dir.join(asset_file_name(&file_id, &filename));
    std::fs::write(&path, bytes)?;

    debug!(
        session_id = %session_id,
        file_id = %file_id,
        bytes = bytes.len(),
        "Staged upload"
    );

    Ok(StagedFile {
        file_id,
        filename,
        path,
    })
}

/// Files currently staged under the session, ordered by stored name
///
/// A session that was never created has no staged files.
pub fn list_staged(layout: &AssetLayout, session_id: &str) -> Result<Vec<StagedFile>> {
    let session_dir = layout.session_dir(session_id)?;

    let entries = match std::fs::read_dir(&session_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut staged = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some((file_id, _)) = name.split_once('_') else {
            continue;
        };
        staged.push(StagedFile {
            file_id: file_id.to_string(),
            filename: original_name(&name).to_string(),
            path: entry.path(),
        });
    }
    staged.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(staged)
}

/// Remove the session directory and everything in it
///
/// Idempotent: a missing directory is not an error.
pub fn cancel_session(layout: &AssetLayout, session_id: &str) -> Result<()> {
    let session_dir = layout.session_dir(session_id)?;

    match std::fs::remove_dir_all(&session_dir) {
        Ok(()) => {
            info!(session_id = %session_id, "Upload session cancelled");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Keep only the final component of a client-supplied filename
fn sanitize_file_name(original: &str) -> Result<String> {
    Path::new(original.trim())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Validation(format!("Invalid filename: {:?}", original)))
}
