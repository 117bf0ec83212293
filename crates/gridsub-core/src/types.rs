use serde::{Deserialize, Serialize};

/// Time-bounded text segment read from a TextGrid interval block.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInterval {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// One SRT unit. `start`/`end` keep the literal timestamp text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    pub index: u32,
    pub start: String,
    pub end: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub index: u32,
    pub start_time: String,
    pub end_time: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleDocument {
    pub subtitles: Vec<SubtitleRecord>,
}
