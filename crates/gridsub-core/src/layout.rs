use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{GridsubError, Result};

pub const CHUNK_PREFIX: &str = "chunk_";
pub const REWRITTEN_SUFFIX: &str = "_processed.srt";
pub const MERGED_STEM: &str = "merged_output";

/// File name for the 1-based chunk `number` (chunk_001.srt, chunk_002.srt, ...)
pub fn chunk_file_name(number: u32) -> String {
    format!("{}{:03}.srt", CHUNK_PREFIX, number)
}

/// File name of the rewritten counterpart of a chunk file
pub fn rewritten_file_name(chunk_path: &Path) -> String {
    let stem = chunk_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}", stem, REWRITTEN_SUFFIX)
}

/// Chunk number encoded in a chunk or rewritten chunk file name.
///
/// `chunk_007.srt` and `chunk_007_processed.srt` both give 7; names past
/// `chunk_999` simply grow wider, so ordering must use this, not the name.
pub fn chunk_number(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix(CHUNK_PREFIX)?;
    let digits = rest
        .strip_suffix(REWRITTEN_SUFFIX)
        .or_else(|| rest.strip_suffix(".srt"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Order paths by chunk number, falling back to the file name
pub(crate) fn sort_by_chunk_number(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (chunk_number(&name).unwrap_or(u32::MAX), name)
    });
}

/// Chunk files in `dir` (not their rewritten counterparts), in chunk order
pub async fn list_chunk_files(dir: &Path) -> Result<Vec<PathBuf>> {
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
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(CHUNK_PREFIX)
            && name.ends_with(".srt")
            && !name.ends_with(REWRITTEN_SUFFIX)
            && path.is_file()
        {
            paths.push(path);
        }
    }

    sort_by_chunk_number(&mut paths);
    Ok(paths)
}

/// Every artifact location of one project run.
///
/// Inputs live under `<input_root>/<project>/`, everything produced under
/// `<output_root>/<project>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(project: &str, input_root: &Path, output_root: &Path) -> Self {
        Self {
            project: project.to_string(),
            input_dir: input_root.join(project),
            output_dir: output_root.join(project),
        }
    }

    pub fn annotation_path(&self) -> PathBuf {
        self.input_dir.join(format!("{}.TextGrid", self.project))
    }

    pub fn subtitle_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.srt", self.project))
    }

    pub fn chunk_dir(&self) -> PathBuf {
        self.output_dir.join("split")
    }

    pub fn rewritten_dir(&self) -> PathBuf {
        self.output_dir.join("divided_output")
    }

    pub fn merged_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.srt", MERGED_STEM))
    }

    pub fn export_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.json", MERGED_STEM))
    }

    /// Create the output directory tree
    pub async fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.output_dir.clone(), self.chunk_dir(), self.rewritten_dir()] {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| GridsubError::io(&dir, e))?;
        }
        Ok(())
    }
}
