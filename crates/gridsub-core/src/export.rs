use crate::{
    error::Result,
    types::{SubtitleDocument, SubtitleEntry, SubtitleRecord},
};

/// Convert entries into the exported record list, keeping order and
/// timestamp text as-is
pub fn export_records(entries: &[SubtitleEntry]) -> SubtitleDocument {
    SubtitleDocument {
        subtitles: entries
            .iter()
            .map(|entry| SubtitleRecord {
                index: entry.index,
                start_time: entry.start.clone(),
                end_time: entry.end.clone(),
                text: entry.text.clone(),
            })
            .collect(),
    }
}

pub fn to_json(document: &SubtitleDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(document)?)
}
