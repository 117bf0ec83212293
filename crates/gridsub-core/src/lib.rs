//! Gridsub Core Library
//!
//! Turns Praat TextGrid transcripts into SRT subtitles, splits them into
//! small chunks for outside rewriting, merges the rewritten chunks back in
//! order and exports the result as JSON.

pub mod chunker;
pub mod error;
pub mod export;
pub mod extractor;
pub mod layout;
pub mod merger;
pub mod pipeline;
pub mod rewriter;
pub mod srt;
pub mod timecode;
pub mod types;

// Re-export commonly used items at crate root
pub use chunker::{DEFAULT_CHUNK_SIZE, SubtitleChunk, chunk_entries};
pub use error::{GridsubError, Result, Stage, SubtitleError, TimecodeError};
pub use export::{export_records, to_json};
pub use extractor::{extract_intervals, intervals_to_entries};
pub use layout::{ProjectLayout, chunk_file_name, chunk_number, rewritten_file_name};
pub use merger::{merge_chunk_files, merge_entries, select_rewritten_chunks};
pub use pipeline::{
    PipelineOptions, PipelineSummary, StageEvent, convert_annotation, export_subtitles,
    merge_files, merge_rewritten, rewrite_chunks, run_pipeline, run_pipeline_with,
    split_subtitles,
};
pub use rewriter::Rewriter;
pub use srt::{parse_srt, serialize_srt};
pub use timecode::{Timecode, format_timecode, parse_timecode};
pub use types::{SubtitleDocument, SubtitleEntry, SubtitleRecord, TimeInterval};
