use crate::{
    error::{GridsubError, Result},
    layout::chunk_file_name,
    srt::serialize_srt,
    types::SubtitleEntry,
};

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// A bounded run of entries, renumbered 1..k, written as one chunk file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleChunk {
    /// 1-based position among all chunks
    pub number: u32,
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleChunk {
    pub fn file_name(&self) -> String {
        chunk_file_name(self.number)
    }

    pub fn to_srt(&self) -> String {
        serialize_srt(&self.entries)
    }
}

/// Split entries into consecutive chunks of `max_size`; the last one holds
/// the remainder. No chunk is produced for empty input.
pub fn chunk_entries(entries: &[SubtitleEntry], max_size: usize) -> Result<Vec<SubtitleChunk>> {
    if max_size == 0 {
        return Err(GridsubError::InvalidChunkSize);
    }

    let chunks = entries
        .chunks(max_size)
        .zip(1..)
        .map(|(group, number)| SubtitleChunk {
            number,
            entries: group
                .iter()
                .zip(1..)
                .map(|(entry, index)| SubtitleEntry {
                    index,
                    ..entry.clone()
                })
                .collect(),
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: u32) -> Vec<SubtitleEntry> {
        (0..n)
            .map(|i| SubtitleEntry {
                index: 100 + i,
                start: format!("00:00:{:02},000", i % 60),
                end: format!("00:00:{:02},500", i % 60),
                text: format!("line {}", i),
            })
            .collect()
    }

    fn sizes(chunks: &[SubtitleChunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.entries.len()).collect()
    }

    #[test]
    fn chunk_count_is_ceiling_of_ratio() {
        let cases = [
            (25, 10, vec![10, 10, 5]),
            (20, 10, vec![10, 10]),
            (3, 10, vec![3]),
            (7, 1, vec![1; 7]),
        ];
        for (n, m, expected) in cases {
            let chunks = chunk_entries(&entries(n), m).unwrap();
            assert_eq!(sizes(&chunks), expected, "n={n} m={m}");
        }
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_entries(&[], DEFAULT_CHUNK_SIZE).unwrap().is_empty());
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert!(matches!(
            chunk_entries(&entries(3), 0),
            Err(GridsubError::InvalidChunkSize)
        ));
    }

    #[test]
    fn chunks_are_renumbered_locally() {
        let chunks = chunk_entries(&entries(25), 10).unwrap();
        for chunk in &chunks {
            let indices: Vec<u32> = chunk.entries.iter().map(|e| e.index).collect();
            let expected: Vec<u32> = (1..=chunk.entries.len() as u32).collect();
            assert_eq!(indices, expected);
        }
        assert_eq!(chunks[2].entries[0].text, "line 20");
        assert_eq!(chunks[2].entries[0].start, "00:00:20,000");
    }

    #[test]
    fn chunks_are_named_sequentially() {
        let chunks = chunk_entries(&entries(25), 10).unwrap();
        let names: Vec<String> = chunks.iter().map(|c| c.file_name()).collect();
        assert_eq!(names, vec!["chunk_001.srt", "chunk_002.srt", "chunk_003.srt"]);
        assert!(chunks[1].to_srt().starts_with("1\n00:00:10,000 --> 00:00:10,500\nline 10\n\n"));
    }
}
