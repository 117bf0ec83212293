use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;

use crate::error::TimecodeError;

static TIMECODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})$").expect("timecode pattern is valid")
});

// Absorbs binary representation error, e.g. 59.999 * 1000 = 59998.99999999999
const MILLIS_TOLERANCE: f64 = 1e-6;

/// SRT timestamp split into its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timecode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

impl Timecode {
    /// Build a timecode from a non-negative number of seconds.
    ///
    /// Whole fields are truncated, the fractional part is floored to
    /// milliseconds. Hours are not wrapped at 24. Negative input is outside
    /// the contract.
    pub fn from_seconds(seconds: f64) -> Self {
        let total_millis = (seconds * 1000.0 + MILLIS_TOLERANCE).floor() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let secs = (total_millis % 60_000) / 1_000;
        let millis = total_millis % 1_000;
        Self {
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: secs as u32,
            millis: millis as u32,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        f64::from(self.hours) * 3600.0
            + f64::from(self.minutes) * 60.0
            + f64::from(self.seconds)
            + f64::from(self.millis) / 1000.0
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_timecode(s)
    }
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timecode(seconds: f64) -> String {
    Timecode::from_seconds(seconds).to_string()
}

/// Parse an SRT timestamp (HH:MM:SS,mmm) back into its fields
pub fn parse_timecode(text: &str) -> Result<Timecode, TimecodeError> {
    let caps = TIMECODE_PATTERN
        .captures(text)
        .ok_or_else(|| TimecodeError::Malformed {
            text: text.to_string(),
        })?;

    let field = |i: usize, name: &'static str, limit: Option<u32>| {
        let value: u32 = caps[i].parse().map_err(|_| TimecodeError::OutOfRange {
            text: text.to_string(),
            field: name,
        })?;
        match limit {
            Some(max) if value >= max => Err(TimecodeError::OutOfRange {
                text: text.to_string(),
                field: name,
            }),
            _ => Ok(value),
        }
    };

    Ok(Timecode {
        hours: field(1, "hours", None)?,
        minutes: field(2, "minutes", Some(60))?,
        seconds: field(3, "seconds", Some(60))?,
        millis: field(4, "milliseconds", None)?,
    })
}
