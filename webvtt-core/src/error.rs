//! Diagnostics and hard failures.
//!
//! Two layers of error reporting exist:
//!
//! - [`Diagnostic`]: a recoverable problem, delivered to
//!   [`Handler::on_error`](crate::Handler::on_error). The handler decides
//!   whether parsing continues.
//! - [`ParseError`]: a hard failure. The parser is unusable afterwards and
//!   every later call returns the same error.

use std::fmt;
use std::ops::ControlFlow;

use thiserror::Error;

use crate::span::Location;

/// Error codes for diagnostics.
///
/// Using an enum instead of String keeps [`Diagnostic`] `Copy` and removes
/// heap allocation from the error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Growing an internal buffer failed
    AllocationFailed = 0,
    /// Missing or malformed `WEBVTT` signature (fatal)
    MalformedTag,
    /// A newline was expected
    ExpectedEol,
    /// Whitespace was expected after the end timestamp
    ExpectedWhitespace,
    /// Timestamp out of range or with wrong digit counts, still usable
    MalformedTimestamp,
    /// Timestamp could not be parsed at all
    ExpectedTimestamp,
    /// The `-->` separator is missing
    ExpectedCuetimeSeparator,
    /// End time is not greater than start time
    InvalidEndTime,
    /// Unknown setting key, or a setting without `key:value` shape
    InvalidCueSetting,
    VerticalAlreadySet,
    VerticalBadValue,
    LineAlreadySet,
    LineBadValue,
    PositionAlreadySet,
    PositionBadValue,
    SizeAlreadySet,
    SizeBadValue,
    AlignAlreadySet,
    AlignBadValue,
    /// A payload line holds `-->` where a blank line was expected
    CueContainsSeparator,
    /// A cue has an id but no timings or payload
    CueIncomplete,
    /// An end tag with no matching open tag
    UnmatchedEndTag,
    /// Cue text contains an empty line
    UnexpectedBlankLine,
}

impl ErrorCode {
    /// Get a human-readable message for this error code.
    pub fn message(self) -> &'static str {
        match self {
            Self::AllocationFailed => "error allocating object",
            Self::MalformedTag => "malformed 'WEBVTT' tag",
            Self::ExpectedEol => "expected newline",
            Self::ExpectedWhitespace => "expected whitespace",
            Self::MalformedTimestamp => "malformed webvtt-timestamp",
            Self::ExpectedTimestamp => "expected webvtt-timestamp",
            Self::ExpectedCuetimeSeparator => "missing webvtt-cuetime-separator `-->'",
            Self::InvalidEndTime => "webvtt-cue end-time must have value greater than start-time",
            Self::InvalidCueSetting => "unrecognized webvtt-cue-setting",
            Self::VerticalAlreadySet => "'vertical' cue-setting already used",
            Self::VerticalBadValue => "'vertical' setting must have a value of either 'lr' or 'rl'",
            Self::LineAlreadySet => "'line' cue-setting already used",
            Self::LineBadValue => "'line' cue-setting must have a value that is an integer (signed) line number, or percentage (%) from top of video display",
            Self::PositionAlreadySet => "'position' cue-setting already used",
            Self::PositionBadValue => "'position' cue-setting must be a percentage (%) value representing the position in the direction orthogonal to the 'line' setting",
            Self::SizeAlreadySet => "'size' cue-setting already used",
            Self::SizeBadValue => "'size' cue-setting must have percentage (%) value",
            Self::AlignAlreadySet => "'align' cue-setting already used",
            Self::AlignBadValue => "'align' cue-setting must have a value of either 'start', 'middle', 'end', 'left' or 'right'",
            Self::CueContainsSeparator => "cue-text line contains unescaped timestamp separator '-->'",
            Self::CueIncomplete => "cue contains cue-id, but is missing cuetimes or cue text",
            Self::UnmatchedEndTag => "end tag does not match any open tag",
            Self::UnexpectedBlankLine => "cue-text contains an unexpected blank line",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A recoverable problem found while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub location: Location,
    pub code: ErrorCode,
}

impl Diagnostic {
    #[inline]
    pub fn new(code: ErrorCode, location: Location) -> Self {
        Self { location, code }
    }

    #[inline]
    pub fn at(code: ErrorCode, line: u32, column: u32) -> Self {
        Self::new(code, Location::new(line, column))
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.location.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.location.column
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.code.message())
    }
}

/// Hard failure. The document is unusable beyond this point.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("not a WebVTT document: {0}")]
    MalformedSignature(Diagnostic),

    #[error("parse aborted by error handler at {0}")]
    Aborted(Diagnostic),

    #[error("out of memory")]
    OutOfMemory,
}

impl ParseError {
    /// The diagnostic that caused the failure, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::MalformedSignature(d) | Self::Aborted(d) => Some(d),
            Self::OutOfMemory => None,
        }
    }
}

/// Deliver a diagnostic to `report`, turning `Break` into a hard failure.
pub(crate) fn emit<F>(report: &mut F, diagnostic: Diagnostic) -> Result<(), ParseError>
where
    F: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    match report(&diagnostic) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(ParseError::Aborted(diagnostic)),
    }
}
