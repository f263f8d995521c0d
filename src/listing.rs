use crate::constants::LISTING_FILE;
use crate::error::Result;
use crate::protocol::Recording;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes the search result as pretty JSON into `dir` and returns its path.
pub async fn save_listing(dir: &Path, recordings: &[Recording]) -> Result<PathBuf> {
    let path = dir.join(LISTING_FILE);
    let data = serde_json::to_vec_pretty(recordings)?;
    tokio::fs::write(&path, data).await?;
    debug!(path = %path.display(), count = recordings.len(), "listing saved");
    Ok(path)
}
