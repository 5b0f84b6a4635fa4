//! Cue timestamps.
//!
//! Grammar: `[hours ':'] minutes ':' seconds '.' fraction`, with exactly two
//! digits for minutes and seconds, three for the fraction and at least two
//! for hours. Timestamps that break the digit counts or the ranges, but can
//! still be read, are normalized and flagged as malformed.

use std::fmt;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Milliseconds since the start of the media, or [`Timestamp::INVALID`].
///
/// `INVALID` orders after every real time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Sentinel for "unset or unparseable".
    pub const INVALID: Timestamp = Timestamp(u64::MAX);

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for Timestamp {
    /// `hh:mm:ss.fff`, or `--:--:--.---` for the sentinel.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("--:--:--.---");
        }
        let ms = self.0;
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            ms / MS_PER_HOUR,
            (ms % MS_PER_HOUR) / MS_PER_MINUTE,
            (ms % MS_PER_MINUTE) / MS_PER_SECOND,
            ms % MS_PER_SECOND
        )
    }
}

/// A timestamp recognized at the start of some input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedTimestamp {
    pub value: Timestamp,
    /// Bytes consumed from the input.
    pub len: usize,
    /// Digit counts or ranges were off, but the value is usable.
    pub malformed: bool,
}

/// Scan a timestamp at the start of `input`.
///
/// Returns `None` when the input does not start with anything that can be
/// read as a timestamp.
pub fn scan(input: &[u8]) -> Option<ScannedTimestamp> {
    let mut pos = 0;
    let mut malformed = false;

    let (first, digits) = digits_at(input, &mut pos)?;
    // Anything but a two-digit value below 60 must be the hours component.
    let have_hours = digits != 2 || first > 59;
    if have_hours && digits < 2 {
        malformed = true;
    }

    if input.get(pos) != Some(&b':') {
        return None;
    }
    pos += 1;

    let (second, digits) = digits_at(input, &mut pos)?;
    if digits != 2 {
        malformed = true;
    }

    let (hours, minutes, seconds);
    match input.get(pos) {
        Some(b':') => {
            pos += 1;
            let third = match digits_at(input, &mut pos) {
                Some((value, 2)) => value,
                Some((value, _)) => {
                    malformed = true;
                    value
                }
                None => {
                    malformed = true;
                    0
                }
            };
            hours = first;
            minutes = second;
            seconds = third;
        }
        Some(b'.') => {
            // `hh:ss.fff` style input where the first group looked like hours
            if have_hours {
                malformed = true;
            }
            hours = 0;
            minutes = first;
            seconds = second;
        }
        _ => return None,
    }

    if input.get(pos) != Some(&b'.') {
        return None;
    }
    pos += 1;
    let (fraction, digits) = digits_at(input, &mut pos)?;
    if digits != 3 {
        malformed = true;
    }

    // Carry out-of-range components into the next unit.
    let mut total = fraction;
    if fraction >= 1000 || seconds >= 60 || minutes >= 60 {
        malformed = true;
    }
    total = total.checked_add(seconds.checked_mul(MS_PER_SECOND)?)?;
    total = total.checked_add(minutes.checked_mul(MS_PER_MINUTE)?)?;
    total = total.checked_add(hours.checked_mul(MS_PER_HOUR)?)?;
    if total == u64::MAX {
        return None;
    }

    Some(ScannedTimestamp { value: Timestamp(total), len: pos, malformed })
}

/// Parse an entire string as a timestamp.
///
/// Trailing input makes the whole string invalid.
pub fn parse(input: &str) -> Option<ScannedTimestamp> {
    scan(input.as_bytes()).filter(|ts| ts.len == input.len())
}

/// Read a run of ASCII digits, returning the value and the digit count.
fn digits_at(input: &[u8], pos: &mut usize) -> Option<(u64, usize)> {
    let start = *pos;
    let mut value: u64 = 0;
    while let Some(&b) = input.get(*pos) {
        if !b.is_ascii_digit() {
            break;
        }
        value = value.checked_mul(10)?.checked_add(u64::from(b - b'0'))?;
        *pos += 1;
    }
    match *pos - start {
        0 => None,
        n => Some((value, n)),
    }
}
