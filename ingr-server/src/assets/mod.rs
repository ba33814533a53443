//! Asset ingestion
//!
//! Two-phase upload pipeline: files are staged per session under the tmp
//! root, then committed into the permanent upload root. The single-shot path
//! writes straight to permanent storage and derives a thumbnail.
//!
//! Everything here is synchronous filesystem work; handlers run it on the
//! blocking pool.

pub mod commit;
pub mod layout;
pub mod staging;
pub mod thumbnail;

pub use commit::{cancel, commit, delete_asset_files, store_direct, MovedAsset, StoredAsset};
pub use layout::AssetLayout;
pub use staging::{cancel_session, list_staged, stage_file, StagedFile};
pub use thumbnail::{derive_thumbnail, render_thumbnail, THUMBNAIL_SIZE};

/// Stored filename for an asset: `<assetId>_<originalName>`
pub fn asset_file_name(asset_id: &str, original_name: &str) -> String {
    format!("{}_{}", asset_id, original_name)
}

/// Recover the original name from a `<assetId>_<originalName>` filename
///
/// Splits on the first underscore; a name without one is returned unchanged.
pub fn original_name(stored_name: &str) -> &str {
    stored_name
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(stored_name)
}
