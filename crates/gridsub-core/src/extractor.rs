//! Interval extraction from Praat TextGrid annotations.
//!
//! The scanner walks the annotation line by line. Each `intervals [n]:` line
//! opens a candidate block which must then yield, in order, an `xmin` line,
//! an `xmax` line and a `text` line. Any other lines in between are skipped.
//! A block that hits the next block marker or the end of input before it is
//! complete is dropped, and scanning carries on from where it stopped.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::{
    timecode::format_timecode,
    types::{SubtitleEntry, TimeInterval},
};

const BLOCK_MARKER: &str = "intervals [";
const START_KEY: &str = "xmin =";
const END_KEY: &str = "xmax =";
const TEXT_KEY: &str = "text =";

static START_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xmin = (\d+(?:\.\d*)?)").expect("xmin pattern is valid"));
static END_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xmax = (\d+(?:\.\d*)?)").expect("xmax pattern is valid"));
static TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"text = "((?:[^"]|"")*)""#).expect("text pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    SeekBlockStart,
    SeekStartTime { block_line: usize },
    SeekEndTime { block_line: usize, start: f64 },
    SeekText { block_line: usize, start: f64, end: f64 },
}

impl ScanState {
    fn block_line(&self) -> Option<usize> {
        match *self {
            ScanState::SeekBlockStart => None,
            ScanState::SeekStartTime { block_line }
            | ScanState::SeekEndTime { block_line, .. }
            | ScanState::SeekText { block_line, .. } => Some(block_line),
        }
    }
}

fn capture_number(pattern: &Regex, line: &str) -> Option<f64> {
    pattern.captures(line)?[1].parse().ok()
}

fn capture_text(line: &str) -> Option<String> {
    let caps = TEXT_PATTERN.captures(line)?;
    Some(caps[1].replace("\"\"", "\""))
}

fn drop_block(state: ScanState, reason: &str) {
    if let Some(block_line) = state.block_line() {
        debug!("Dropping interval block at line {}: {}", block_line, reason);
    }
}

/// Extract ordered time/text intervals from TextGrid content.
///
/// Incomplete or malformed blocks contribute nothing; an annotation with no
/// interval blocks yields an empty list.
pub fn extract_intervals(content: &str) -> Vec<TimeInterval> {
    let mut intervals = Vec::new();
    let mut state = ScanState::SeekBlockStart;

    for (line_no, raw) in content.lines().enumerate() {
        let line = raw.trim();

        if line.starts_with(BLOCK_MARKER) {
            drop_block(state, "next block started");
            state = ScanState::SeekStartTime {
                block_line: line_no + 1,
            };
            continue;
        }

        state = match state {
            ScanState::SeekBlockStart => ScanState::SeekBlockStart,
            ScanState::SeekStartTime { block_line } if line.contains(START_KEY) => {
                match capture_number(&START_PATTERN, line) {
                    Some(start) => ScanState::SeekEndTime { block_line, start },
                    None => {
                        drop_block(state, "unreadable xmin");
                        ScanState::SeekBlockStart
                    }
                }
            }
            ScanState::SeekEndTime { block_line, start } if line.contains(END_KEY) => {
                match capture_number(&END_PATTERN, line) {
                    Some(end) => ScanState::SeekText {
                        block_line,
                        start,
                        end,
                    },
                    None => {
                        drop_block(state, "unreadable xmax");
                        ScanState::SeekBlockStart
                    }
                }
            }
            ScanState::SeekText { start, end, .. } if line.contains(TEXT_KEY) => {
                match capture_text(line) {
                    Some(text) => intervals.push(TimeInterval {
                        start_seconds: start,
                        end_seconds: end,
                        text,
                    }),
                    None => drop_block(state, "unreadable text"),
                }
                ScanState::SeekBlockStart
            }
            other => other,
        };
    }

    drop_block(state, "end of input");
    debug!("Extracted {} intervals", intervals.len());
    intervals
}

/// Number intervals 1..n and render their bounds as SRT timestamps
pub fn intervals_to_entries(intervals: &[TimeInterval]) -> Vec<SubtitleEntry> {
    intervals
        .iter()
        .zip(1..)
        .map(|(interval, index)| SubtitleEntry {
            index,
            start: format_timecode(interval.start_seconds),
            end: format_timecode(interval.end_seconds),
            text: interval.text.clone(),
        })
        .collect()
}
