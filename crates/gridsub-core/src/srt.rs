use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

use crate::{error::SubtitleError, types::SubtitleEntry};

// index line, timing line, then text up to the first blank line or end of input
static ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(\S+)\n(\d{2,}:\d{2}:\d{2},\d{3}) --> (\d{2,}:\d{2}:\d{2},\d{3})\n(.*?)(?:\n\n|\z)",
    )
    .expect("srt entry pattern is valid")
});

fn normalize(content: &str) -> Cow<'_, str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.contains('\r') {
        Cow::Owned(content.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(content)
    }
}

/// Parse SRT content into ordered entries.
///
/// Units are picked up wherever they occur; anything that does not look like
/// an entry is ignored. An entry whose index token is not a number fails the
/// whole parse.
pub fn parse_srt(content: &str) -> Result<Vec<SubtitleEntry>, SubtitleError> {
    let content = normalize(content);

    ENTRY_PATTERN
        .captures_iter(&content)
        .map(|caps| -> Result<SubtitleEntry, SubtitleError> {
            let index = caps[1]
                .parse::<u32>()
                .map_err(|_| SubtitleError::InvalidIndex {
                    token: caps[1].to_string(),
                    start: caps[2].to_string(),
                    end: caps[3].to_string(),
                })?;
            Ok(SubtitleEntry {
                index,
                start: caps[2].to_string(),
                end: caps[3].to_string(),
                text: caps[4].trim().to_string(),
            })
        })
        .collect()
}

/// Render entries as SRT, using each entry's own index
pub fn serialize_srt(entries: &[SubtitleEntry]) -> String {
    let mut output = String::new();
    for entry in entries {
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            entry.index, entry.start, entry.end, entry.text
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: u32, start: &str, end: &str, text: &str) -> SubtitleEntry {
        SubtitleEntry {
            index,
            start: start.to_string(),
            end: end.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn serializes_entries_verbatim() {
        let entries = vec![
            entry(7, "00:00:01,000", "00:00:02,500", "Hello"),
            entry(3, "00:00:02,500", "00:00:04,000", "two\nlines"),
        ];
        assert_eq!(
            serialize_srt(&entries),
            "7\n00:00:01,000 --> 00:00:02,500\nHello\n\n\
             3\n00:00:02,500 --> 00:00:04,000\ntwo\nlines\n\n"
        );
    }

    #[test]
    fn round_trips_entries_without_blank_lines() {
        let entries = vec![
            entry(1, "00:00:00,000", "00:00:01,200", "first"),
            entry(2, "00:00:01,200", "00:00:03,000", "multi\nline\ntext"),
            entry(3, "100:00:00,000", "100:00:01,000", "long recording"),
        ];
        assert_eq!(parse_srt(&serialize_srt(&entries)).unwrap(), entries);
    }

    #[test]
    fn final_entry_may_omit_blank_line() {
        let content = "1\n00:00:00,000 --> 00:00:01,000\nA\n\n2\n00:00:01,000 --> 00:00:02,000\nB";
        let entries = parse_srt(content).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "B");
    }

    #[test]
    fn trims_text_and_ignores_surrounding_noise() {
        let content = "Here is the rewritten file:\n\n\
                       1\n00:00:00,000 --> 00:00:01,000\n   padded text  \n\n\
                       That's all.";
        let entries = parse_srt(content).unwrap();
        assert_eq!(
            entries,
            vec![entry(1, "00:00:00,000", "00:00:01,000", "padded text")]
        );
    }

    #[test]
    fn accepts_crlf_and_bom() {
        let content = "\u{feff}1\r\n00:00:00,000 --> 00:00:01,000\r\nA\r\nB\r\n\r\n";
        let entries = parse_srt(content).unwrap();
        assert_eq!(entries, vec![entry(1, "00:00:00,000", "00:00:01,000", "A\nB")]);
    }

    #[test]
    fn non_numeric_index_is_an_error() {
        let content = "one\n00:00:00,000 --> 00:00:01,000\nA\n";
        assert_eq!(
            parse_srt(content),
            Err(SubtitleError::InvalidIndex {
                token: "one".to_string(),
                start: "00:00:00,000".to_string(),
                end: "00:00:01,000".to_string(),
            })
        );
    }

    #[test]
    fn empty_input_has_no_entries() {
        assert!(parse_srt("").unwrap().is_empty());
        assert!(serialize_srt(&[]).is_empty());
    }
}
