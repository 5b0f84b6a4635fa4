//! Cue records and display settings.

use phf::phf_map;

use crate::error::{ErrorCode, ParseError};
use crate::timestamp::Timestamp;
use crate::tree::CueText;

// ============================================================================
// Settings
// ============================================================================

/// Writing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vertical {
    #[default]
    Horizontal,
    /// `vertical:lr`
    LeftToRight,
    /// `vertical:rl`
    RightToLeft,
}

/// Text alignment within the cue box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Align {
    Start,
    #[default]
    Middle,
    End,
    Left,
    Right,
}

/// The `line` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinePosition {
    #[default]
    Auto,
    /// Line number, negative counts from the bottom. Snaps to lines.
    Line(i32),
    /// Percentage of the viewport. Does not snap to lines.
    Percent(u8),
}

impl LinePosition {
    /// False only for percentage positions.
    #[inline]
    pub fn snap_to_lines(&self) -> bool {
        !matches!(self, LinePosition::Percent(_))
    }
}

/// Display settings of a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CueSettings {
    pub vertical: Vertical,
    pub line: LinePosition,
    /// Text position, percent
    pub position: u8,
    /// Box size, percent
    pub size: u8,
    pub align: Align,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            vertical: Vertical::Horizontal,
            line: LinePosition::Auto,
            position: 50,
            size: 100,
            align: Align::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SettingKey {
    Vertical,
    Line,
    Position,
    Size,
    Align,
}

static SETTING_KEYS: phf::Map<&'static str, SettingKey> = phf_map! {
    "vertical" => SettingKey::Vertical,
    "line" => SettingKey::Line,
    "position" => SettingKey::Position,
    "size" => SettingKey::Size,
    "align" => SettingKey::Align,
};

static ALIGN_VALUES: phf::Map<&'static str, Align> = phf_map! {
    "start" => Align::Start,
    "middle" => Align::Middle,
    "end" => Align::End,
    "left" => Align::Left,
    "right" => Align::Right,
};

impl SettingKey {
    fn flag(self) -> u8 {
        match self {
            Self::Vertical => CueFlags::VERTICAL,
            Self::Line => CueFlags::LINE,
            Self::Position => CueFlags::POSITION,
            Self::Size => CueFlags::SIZE,
            Self::Align => CueFlags::ALIGN,
        }
    }

    fn already_set(self) -> ErrorCode {
        match self {
            Self::Vertical => ErrorCode::VerticalAlreadySet,
            Self::Line => ErrorCode::LineAlreadySet,
            Self::Position => ErrorCode::PositionAlreadySet,
            Self::Size => ErrorCode::SizeAlreadySet,
            Self::Align => ErrorCode::AlignAlreadySet,
        }
    }

    fn bad_value(self) -> ErrorCode {
        match self {
            Self::Vertical => ErrorCode::VerticalBadValue,
            Self::Line => ErrorCode::LineBadValue,
            Self::Position => ErrorCode::PositionBadValue,
            Self::Size => ErrorCode::SizeBadValue,
            Self::Align => ErrorCode::AlignBadValue,
        }
    }
}

/// Result of applying one `key:value` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettingOutcome {
    Applied,
    /// Applied, but the key was already seen on this cue.
    Duplicate(ErrorCode),
    /// Value rejected, field unchanged.
    BadValue(ErrorCode),
    UnknownKey,
}

fn parse_vertical(value: &str) -> Option<Vertical> {
    match value {
        "lr" => Some(Vertical::LeftToRight),
        "rl" => Some(Vertical::RightToLeft),
        _ => None,
    }
}

/// `-`? digits `%`?, with `-` and `%` mutually exclusive.
fn parse_line(value: &str) -> Option<LinePosition> {
    let (negative, rest) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (percent, digits) = match rest.strip_suffix('%') {
        Some(digits) => (true, digits),
        None => (false, rest),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative && percent {
        return None;
    }
    if percent {
        return parse_percent_digits(digits).map(LinePosition::Percent);
    }
    let magnitude: i64 = digits.parse().ok()?;
    let line = if negative { -magnitude } else { magnitude };
    i32::try_from(line).ok().map(LinePosition::Line)
}

/// Digits with a mandatory trailing `%`, at most 100.
fn parse_percent(value: &str) -> Option<u8> {
    let digits = value.strip_suffix('%')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    parse_percent_digits(digits)
}

fn parse_percent_digits(digits: &str) -> Option<u8> {
    // Leading zeros are fine, so parse wide before range-checking.
    let value: u64 = digits.parse().ok()?;
    (value <= 100).then_some(value as u8)
}

// ============================================================================
// Cue
// ============================================================================

/// Which cue parts and setting keys have been seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct CueFlags(u8);

impl CueFlags {
    const HAVE_ID: u8 = 1 << 0;
    const HAVE_TIMINGS: u8 = 1 << 1;
    const VERTICAL: u8 = 1 << 2;
    const LINE: u8 = 1 << 3;
    const POSITION: u8 = 1 << 4;
    const SIZE: u8 = 1 << 5;
    const ALIGN: u8 = 1 << 6;

    #[inline]
    fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }
}

/// One timed subtitle unit.
///
/// Built field by field while its block is parsed, then handed to
/// [`Handler::on_cue`](crate::Handler::on_cue) once it validates. The parser
/// keeps no reference to an emitted cue.
#[derive(Debug, Clone, Default)]
pub struct Cue {
    /// Cue identifier, empty when the block has none.
    pub id: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub settings: CueSettings,
    /// Raw payload, lines joined with `\n`.
    pub text: String,
    /// Parsed payload markup.
    pub body: CueText,
    flags: CueFlags,
}

impl Cue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
        self.flags.set(CueFlags::HAVE_ID);
    }

    #[inline]
    pub(crate) fn has_id(&self) -> bool {
        self.flags.has(CueFlags::HAVE_ID)
    }

    pub(crate) fn mark_timings(&mut self) {
        self.flags.set(CueFlags::HAVE_TIMINGS);
    }

    /// Has an id but never got a timings line.
    pub(crate) fn is_incomplete(&self) -> bool {
        self.has_id() && !self.flags.has(CueFlags::HAVE_TIMINGS)
    }

    /// Append one payload line.
    pub(crate) fn push_line(&mut self, line: &str) -> Result<(), ParseError> {
        self.text
            .try_reserve(line.len() + 1)
            .map_err(|_| ParseError::OutOfMemory)?;
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
        Ok(())
    }

    /// Both times set and `end` after `start`.
    pub fn is_valid(&self) -> bool {
        self.start.is_valid() && self.end.is_valid() && self.end > self.start
    }

    /// Apply one setting. A duplicate key still overwrites the value.
    pub(crate) fn apply_setting(&mut self, key: &str, value: &str) -> SettingOutcome {
        let Some(&setting) = SETTING_KEYS.get(key) else {
            return SettingOutcome::UnknownKey;
        };
        let settings = &mut self.settings;
        let parsed = match setting {
            SettingKey::Vertical => parse_vertical(value).map(|v| settings.vertical = v),
            SettingKey::Line => parse_line(value).map(|v| settings.line = v),
            SettingKey::Position => parse_percent(value).map(|v| settings.position = v),
            SettingKey::Size => parse_percent(value).map(|v| settings.size = v),
            SettingKey::Align => ALIGN_VALUES.get(value).map(|&v| settings.align = v),
        };
        if parsed.is_none() {
            return SettingOutcome::BadValue(setting.bad_value());
        }
        if self.flags.has(setting.flag()) {
            return SettingOutcome::Duplicate(setting.already_set());
        }
        self.flags.set(setting.flag());
        SettingOutcome::Applied
    }
}
