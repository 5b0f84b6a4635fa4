//! The `start --> end settings...` line.
//!
//! Timestamp failures skip the whole cue. Settings problems are reported per
//! token and never stop the line: the offending setting keeps its prior
//! value and parsing moves on to the next token.

use std::ops::ControlFlow;

use crate::buffer::SEPARATOR;
use crate::cue::{Cue, SettingOutcome};
use crate::error::{emit, Diagnostic, ErrorCode, ParseError};
use crate::span::{char_column, Location};
use crate::timestamp::{self, Timestamp};

/// What became of a timings line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Timings {
    Parsed,
    /// The line cannot provide timings; the cue block must be skipped.
    Skip,
}

#[inline]
fn is_space(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_space(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// Parse a timings line into `cue`.
pub(crate) fn parse_timings_line<F>(
    line: &str,
    line_no: u32,
    cue: &mut Cue,
    report: &mut F,
) -> Result<Timings, ParseError>
where
    F: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    let bytes = line.as_bytes();
    let at = |pos: usize| Location::new(line_no, char_column(line, pos));

    let mut pos = skip_whitespace(bytes, 0);
    let location = at(pos);
    let Some(start) = collect_timestamp(bytes, &mut pos, location, report)? else {
        return Ok(Timings::Skip);
    };

    pos = skip_whitespace(bytes, pos);
    if !bytes[pos..].starts_with(SEPARATOR) {
        emit(report, Diagnostic::new(ErrorCode::ExpectedCuetimeSeparator, at(pos)))?;
        return Ok(Timings::Skip);
    }
    pos = skip_whitespace(bytes, pos + SEPARATOR.len());
    let location = at(pos);
    let Some(end) = collect_timestamp(bytes, &mut pos, location, report)? else {
        return Ok(Timings::Skip);
    };

    cue.start = start;
    cue.end = end;
    cue.mark_timings();

    if pos < bytes.len() && !is_space(bytes[pos]) {
        emit(report, Diagnostic::new(ErrorCode::ExpectedWhitespace, at(pos)))?;
    }

    parse_settings(line, pos, line_no, cue, report)?;
    Ok(Timings::Parsed)
}

/// Scan one timestamp at `*pos`, reporting problems at `location`.
fn collect_timestamp<F>(
    bytes: &[u8],
    pos: &mut usize,
    location: Location,
    report: &mut F,
) -> Result<Option<Timestamp>, ParseError>
where
    F: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    let Some(scanned) = timestamp::scan(&bytes[*pos..]) else {
        emit(report, Diagnostic::new(ErrorCode::ExpectedTimestamp, location))?;
        return Ok(None);
    };
    if scanned.malformed {
        emit(report, Diagnostic::new(ErrorCode::MalformedTimestamp, location))?;
    }
    *pos += scanned.len;
    Ok(Some(scanned.value))
}

/// Apply the whitespace-separated `key:value` settings in `line[from..]`.
fn parse_settings<F>(
    line: &str,
    from: usize,
    line_no: u32,
    cue: &mut Cue,
    report: &mut F,
) -> Result<(), ParseError>
where
    F: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    let bytes = line.as_bytes();
    let at = |pos: usize| Location::new(line_no, char_column(line, pos));
    let mut pos = from;

    loop {
        pos = skip_whitespace(bytes, pos);
        if pos >= bytes.len() {
            return Ok(());
        }
        let start = pos;
        while pos < bytes.len() && !is_space(bytes[pos]) {
            pos += 1;
        }
        // Token boundaries are ASCII, so slicing stays on char boundaries.
        let token = &line[start..pos];

        let Some(colon) = token.find(':') else {
            emit(report, Diagnostic::new(ErrorCode::InvalidCueSetting, at(start)))?;
            continue;
        };
        let (key, value) = (&token[..colon], &token[colon + 1..]);
        if key.is_empty() || value.is_empty() {
            emit(report, Diagnostic::new(ErrorCode::InvalidCueSetting, at(start)))?;
            continue;
        }

        match cue.apply_setting(key, value) {
            SettingOutcome::Applied => {}
            SettingOutcome::Duplicate(code) => emit(report, Diagnostic::new(code, at(start)))?,
            SettingOutcome::BadValue(code) => {
                emit(report, Diagnostic::new(code, at(start + colon + 1)))?
            }
            SettingOutcome::UnknownKey => {
                emit(report, Diagnostic::new(ErrorCode::InvalidCueSetting, at(start)))?
            }
        }
    }
}
