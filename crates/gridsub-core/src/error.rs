use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Pipeline stage, used to tag which step of a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Convert,
    Split,
    Rewrite,
    Merge,
    Export,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Convert => "convert",
            Stage::Split => "split",
            Stage::Rewrite => "rewrite",
            Stage::Merge => "merge",
            Stage::Export => "export",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimecodeError {
    #[error("Malformed timecode {text:?}: expected HH:MM:SS,mmm")]
    Malformed { text: String },

    #[error("Timecode {text:?} has {field} out of range")]
    OutOfRange { text: String, field: &'static str },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SubtitleError {
    #[error("Subtitle entry before {start} --> {end} has a non-numeric index {token:?}")]
    InvalidIndex {
        token: String,
        start: String,
        end: String,
    },
}

#[derive(Error, Debug)]
pub enum GridsubError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Subtitle parse error in {path}: {source}")]
    SubtitleFile {
        path: PathBuf,
        #[source]
        source: SubtitleError,
    },

    #[error(transparent)]
    Subtitle(#[from] SubtitleError),

    #[error(transparent)]
    Timecode(#[from] TimecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Chunk size must be at least 1")]
    InvalidChunkSize,

    #[error("No rewritten chunk files found in {dir}")]
    NoRewrittenChunks { dir: PathBuf },

    #[error("Rewrite failed for {chunk_path}: {reason}")]
    RewriteFailed { chunk_path: PathBuf, reason: String },

    #[error("Stage '{stage}' failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<GridsubError>,
    },
}

impl GridsubError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GridsubError::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag this error with the stage it happened in.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            already @ GridsubError::StageFailed { .. } => already,
            other => GridsubError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that failed, if the error has been tagged.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            GridsubError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GridsubError>;
