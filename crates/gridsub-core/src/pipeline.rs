use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::{
    chunker::{DEFAULT_CHUNK_SIZE, chunk_entries},
    error::{GridsubError, Result, Stage},
    export::{export_records, to_json},
    extractor::{extract_intervals, intervals_to_entries},
    layout::{ProjectLayout, list_chunk_files},
    merger::{merge_chunk_files, select_rewritten_chunks},
    rewriter::{Rewriter, rewrite_chunk_dir},
    srt::{parse_srt, serialize_srt},
    types::SubtitleEntry,
};

/// Knobs for a full run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size: usize,
    pub rewriter: Rewriter,
    /// Rewrite every chunk even when a fresh result exists
    pub force: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            rewriter: Rewriter::default(),
            force: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub entries: usize,
    pub chunks: usize,
    pub merged_entries: usize,
    pub subtitle_path: PathBuf,
    pub merged_path: PathBuf,
    pub export_path: PathBuf,
}

async fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| GridsubError::io(path, e))
}

async fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| GridsubError::io(parent, e))?;
    }
    fs::write(path, content)
        .await
        .map_err(|e| GridsubError::io(path, e))
}

async fn read_srt(path: &Path) -> Result<Vec<SubtitleEntry>> {
    let content = read_text(path).await?;
    parse_srt(&content).map_err(|source| GridsubError::SubtitleFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a TextGrid annotation into an SRT file, returning the entry count
pub async fn convert_annotation(input: &Path, output: &Path) -> Result<usize> {
    let content = read_text(input).await?;
    let entries = intervals_to_entries(&extract_intervals(&content));
    write_text(output, &serialize_srt(&entries)).await?;
    info!(
        "Converted {} -> {} ({} entries)",
        input.display(),
        output.display(),
        entries.len()
    );
    Ok(entries.len())
}

/// Split an SRT file into chunk files in `chunk_dir`.
///
/// Chunk files left over from an earlier, longer run are removed, and files
/// whose content is unchanged are not rewritten so their timestamps stay put.
pub async fn split_subtitles(
    input: &Path,
    chunk_dir: &Path,
    max_size: usize,
) -> Result<Vec<PathBuf>> {
    let entries = read_srt(input).await?;
    let chunks = chunk_entries(&entries, max_size)?;

    fs::create_dir_all(chunk_dir)
        .await
        .map_err(|e| GridsubError::io(chunk_dir, e))?;

    let mut paths = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        let path = chunk_dir.join(chunk.file_name());
        let content = chunk.to_srt();
        match fs::read_to_string(&path).await {
            Ok(existing) if existing == content => debug!("{} unchanged", path.display()),
            _ => write_text(&path, &content).await?,
        }
        paths.push(path);
    }

    for stale in list_chunk_files(chunk_dir).await? {
        if !paths.contains(&stale) {
            debug!("Removing stale chunk {}", stale.display());
            fs::remove_file(&stale)
                .await
                .map_err(|e| GridsubError::io(&stale, e))?;
        }
    }

    info!("Split {} entries into {} chunks", entries.len(), paths.len());
    Ok(paths)
}

/// Run every chunk in `chunk_dir` through `rewriter` into `output_dir`
pub async fn rewrite_chunks(
    chunk_dir: &Path,
    output_dir: &Path,
    rewriter: &Rewriter,
    force: bool,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| GridsubError::io(output_dir, e))?;
    rewrite_chunk_dir(chunk_dir, output_dir, rewriter, force).await
}

/// Merge the given rewritten chunk files, in order, into one SRT file
pub async fn merge_files(paths: &[PathBuf], output: &Path) -> Result<usize> {
    let merged = merge_chunk_files(paths).await?;
    write_text(output, &serialize_srt(&merged)).await?;
    info!(
        "Merged {} files into {} ({} entries)",
        paths.len(),
        output.display(),
        merged.len()
    );
    Ok(merged.len())
}

/// Merge every rewritten chunk found in `rewritten_dir`, in chunk order
pub async fn merge_rewritten(rewritten_dir: &Path, output: &Path) -> Result<usize> {
    let paths = select_rewritten_chunks(rewritten_dir).await?;
    if paths.is_empty() {
        return Err(GridsubError::NoRewrittenChunks {
            dir: rewritten_dir.to_path_buf(),
        });
    }
    merge_files(&paths, output).await
}

/// Export an SRT file as the JSON record document
pub async fn export_subtitles(input: &Path, output: &Path) -> Result<usize> {
    let entries = read_srt(input).await?;
    let document = export_records(&entries);
    write_text(output, &to_json(&document)?).await?;
    info!(
        "Exported {} records to {}",
        document.subtitles.len(),
        output.display()
    );
    Ok(document.subtitles.len())
}

/// Progress of a full run, reported to the caller as stages start and end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Started(Stage),
    Finished { stage: Stage, detail: String },
    Failed(Stage),
}

fn watch<T>(
    stage: Stage,
    observer: &mut impl FnMut(StageEvent),
    result: Result<T>,
) -> Result<T> {
    result.map_err(|e| {
        observer(StageEvent::Failed(stage));
        e.in_stage(stage)
    })
}

/// Run convert, split, rewrite, merge and export in order.
///
/// The first failing stage stops the run; its error says which stage it was.
pub async fn run_pipeline(
    layout: &ProjectLayout,
    options: &PipelineOptions,
) -> Result<PipelineSummary> {
    run_pipeline_with(layout, options, |_| {}).await
}

/// [`run_pipeline`], calling `observer` as each stage starts, finishes or fails
pub async fn run_pipeline_with(
    layout: &ProjectLayout,
    options: &PipelineOptions,
    mut observer: impl FnMut(StageEvent),
) -> Result<PipelineSummary> {
    observer(StageEvent::Started(Stage::Convert));
    watch(Stage::Convert, &mut observer, layout.ensure_dirs().await)?;
    let subtitle_path = layout.subtitle_path();
    let entries = watch(
        Stage::Convert,
        &mut observer,
        convert_annotation(&layout.annotation_path(), &subtitle_path).await,
    )?;
    observer(StageEvent::Finished {
        stage: Stage::Convert,
        detail: format!("Converted: {} entries", entries),
    });

    observer(StageEvent::Started(Stage::Split));
    let chunk_paths = watch(
        Stage::Split,
        &mut observer,
        split_subtitles(&subtitle_path, &layout.chunk_dir(), options.chunk_size).await,
    )?;
    observer(StageEvent::Finished {
        stage: Stage::Split,
        detail: format!(
            "Split into {} chunks of up to {}",
            chunk_paths.len(),
            options.chunk_size
        ),
    });

    observer(StageEvent::Started(Stage::Rewrite));
    let rewritten = watch(
        Stage::Rewrite,
        &mut observer,
        rewrite_chunks(
            &layout.chunk_dir(),
            &layout.rewritten_dir(),
            &options.rewriter,
            options.force,
        )
        .await,
    )?;
    observer(StageEvent::Finished {
        stage: Stage::Rewrite,
        detail: format!(
            "Rewritten: {} chunks ({})",
            rewritten.len(),
            options.rewriter.name()
        ),
    });

    // merge exactly what this run rewrote, in chunk order
    observer(StageEvent::Started(Stage::Merge));
    let merged_path = layout.merged_path();
    let merged_entries = watch(
        Stage::Merge,
        &mut observer,
        merge_files(&rewritten, &merged_path).await,
    )?;
    observer(StageEvent::Finished {
        stage: Stage::Merge,
        detail: format!("Merged: {} entries", merged_entries),
    });

    observer(StageEvent::Started(Stage::Export));
    let export_path = layout.export_path();
    let records = watch(
        Stage::Export,
        &mut observer,
        export_subtitles(&merged_path, &export_path).await,
    )?;
    observer(StageEvent::Finished {
        stage: Stage::Export,
        detail: format!("Exported: {} records", records),
    });

    Ok(PipelineSummary {
        entries,
        chunks: chunk_paths.len(),
        merged_entries,
        subtitle_path,
        merged_path,
        export_path,
    })
}
