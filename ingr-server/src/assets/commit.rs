//! Asset commit engine
//!
//! `store_direct` is the single-shot path (write + thumbnail). `commit` moves
//! staged files into permanent storage without deriving thumbnails; the
//! returned thumbnail path is where the caller is expected to put one.

use super::{asset_file_name, original_name, staging, thumbnail, AssetLayout};
use ingr_common::{ids, Error, Result};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Result of the single-shot upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAsset {
    pub id: String,
    pub filename: String,
    pub file_location: String,
    pub thumbnail_location: String,
    pub width: u32,
    pub height: u32,
    #[serde(rename = "type")]
    pub media_type: String,
    pub size: u64,
}

/// A staged file that was moved into permanent storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedAsset {
    pub id: String,
    pub filename: String,
    pub file_location: String,
    pub thumbnail_location: String,
}

/// Write `bytes` to `<upload_root>/images/<assetId>_<name>` and derive its thumbnail
///
/// A thumbnail failure fails the call but leaves the written source in place.
pub fn store_direct(layout: &AssetLayout, original: &str, bytes: &[u8]) -> Result<StoredAsset> {
    let filename = Path::new(original.trim())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::Validation(format!("Invalid filename: {:?}", original)))?;

    let images_dir = layout.images_dir();
    let thumbnails_dir = layout.thumbnails_dir();
    std::fs::create_dir_all(&images_dir)?;
    std::fs::create_dir_all(&thumbnails_dir)?;

    let id = ids::generate();
    let stored_name = asset_file_name(&id, &filename);
    let file_path = images_dir.join(&stored_name);
    let thumbnail_path = thumbnails_dir.join(&stored_name);

    std::fs::write(&file_path, bytes)
        .map_err(|e| Error::Asset(format!("Cannot write {}: {}", file_path.display(), e)))?;

    thumbnail::derive_thumbnail(&file_path, &thumbnail_path)?;

    let (width, height) = thumbnail::image_dimensions(&file_path)?;
    let media_type = infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());

    info!(asset_id = %id, filename = %filename, width, height, "Stored asset");

    Ok(StoredAsset {
        id,
        filename,
        file_location: file_path.display().to_string(),
        thumbnail_location: thumbnail_path.display().to_string(),
        width,
        height,
        media_type,
        size: bytes.len() as u64,
    })
}

/// Move the requested staged files into the permanent images directory
///
/// Ids with no staged file are skipped. A failed move is logged and left out
/// of the result; the rest of the batch continues.
pub fn commit(layout: &AssetLayout, session_id: &str, file_ids: &[String]) -> Result<Vec<MovedAsset>> {
    let staged = staging::list_staged(layout, session_id)?;

    let images_dir = layout.images_dir();
    let thumbnails_dir = layout.thumbnails_dir();
    std::fs::create_dir_all(&images_dir)?;
    std::fs::create_dir_all(&thumbnails_dir)?;

    let mut moved = Vec::with_capacity(file_ids.len());
    for file_id in file_ids {
        let Some(entry) = staged.iter().find(|s| &s.file_id == file_id) else {
            warn!(session_id = %session_id, file_id = %file_id, "No staged file for id");
            continue;
        };
        let Some(stored_name) = entry.path.file_name() else {
            continue;
        };

        let final_path = images_dir.join(stored_name);
        if let Err(e) = std::fs::rename(&entry.path, &final_path) {
            warn!(
                session_id = %session_id,
                file_id = %file_id,
                "Move {} -> {} failed: {}",
                entry.path.display(),
                final_path.display(),
                e
            );
            continue;
        }

        let stored_name = stored_name.to_string_lossy();
        debug!(session_id = %session_id, file_id = %file_id, "Committed {}", stored_name);

        moved.push(MovedAsset {
            id: file_id.clone(),
            filename: original_name(&stored_name).to_string(),
            file_location: final_path.display().to_string(),
            thumbnail_location: thumbnails_dir.join(&*stored_name).display().to_string(),
        });
    }

    info!(
        session_id = %session_id,
        requested = file_ids.len(),
        moved = moved.len(),
        "Commit finished"
    );

    Ok(moved)
}

/// Discard an upload session
pub fn cancel(layout: &AssetLayout, session_id: &str) -> Result<()> {
    staging::cancel_session(layout, session_id)
}

/// Best-effort removal of an image's file and thumbnail
///
/// Failures are logged, never returned.
pub async fn delete_asset_files(file_location: &str, thumbnail_location: &str) {
    for location in [file_location, thumbnail_location] {
        if location.is_empty() {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(location).await {
            warn!("Failed to delete {}: {}", location, e);
        }
    }
}
