use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::{
    error::{GridsubError, Result},
    layout::{REWRITTEN_SUFFIX, sort_by_chunk_number},
    srt::parse_srt,
    types::SubtitleEntry,
};

/// Concatenate chunk results in the given order and number them 1..N.
pub fn merge_entries(chunks: Vec<Vec<SubtitleEntry>>) -> Vec<SubtitleEntry> {
    chunks
        .into_iter()
        .flatten()
        .zip(1..)
        .map(|(entry, index)| SubtitleEntry { index, ..entry })
        .collect()
}

/// List rewritten chunk files in `dir`, in chunk order
pub async fn select_rewritten_chunks(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut read_dir = fs::read_dir(dir)
        .await
        .map_err(|e| GridsubError::io(dir, e))?;

    let mut paths = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| GridsubError::io(dir, e))?
    {
        let path = entry.path();
        let is_rewritten = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(REWRITTEN_SUFFIX))
            .unwrap_or(false);
        if is_rewritten && path.is_file() {
            paths.push(path);
        }
    }

    sort_by_chunk_number(&mut paths);
    Ok(paths)
}

/// Read and parse each chunk file in order, then merge with global numbering
pub async fn merge_chunk_files(paths: &[PathBuf]) -> Result<Vec<SubtitleEntry>> {
    let mut chunks = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GridsubError::io(path, e))?;
        let entries = parse_srt(&content).map_err(|source| GridsubError::SubtitleFile {
            path: path.clone(),
            source,
        })?;
        debug!("Read {} entries from {}", entries.len(), path.display());
        chunks.push(entries);
    }
    Ok(merge_entries(chunks))
}
