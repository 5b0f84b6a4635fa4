//! Source locations for diagnostics.
//!
//! Lines and columns are 1-based. Columns count decoded characters, not
//! bytes, so a diagnostic after `"é"` points at column 2.

use std::fmt;

/// A 1-based line/column position in the decoded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Create a new location.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Location at `byte_offset` within `text`, which starts at `self`.
    ///
    /// Newlines inside `text[..byte_offset]` advance the line and reset the
    /// column.
    pub fn advance(self, text: &str, byte_offset: usize) -> Self {
        let prefix = prefix(text, byte_offset);
        match prefix.rfind('\n') {
            Some(nl) => {
                let lines = prefix.bytes().filter(|&b| b == b'\n').count() as u32;
                Location::new(self.line + lines, char_column(&prefix[nl + 1..], prefix.len() - nl - 1))
            }
            None => Location::new(self.line, self.column + char_column(prefix, prefix.len()) - 1),
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// 1-based character column of `byte_offset` within a single line.
///
/// Offsets that fall inside a multi-byte sequence are rounded down to the
/// start of that character.
pub fn char_column(line: &str, byte_offset: usize) -> u32 {
    prefix(line, byte_offset).chars().count() as u32 + 1
}

fn prefix(text: &str, byte_offset: usize) -> &str {
    let mut end = byte_offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_column_ascii() {
        assert_eq!(char_column("align:start", 0), 1);
        assert_eq!(char_column("align:start", 6), 7);
    }

    #[test]
    fn test_char_column_multibyte() {
        // "é" is two bytes but one column
        let line = "é line:x";
        assert_eq!(char_column(line, 3), 3);
        assert_eq!(char_column(line, line.len()), 9);
    }

    #[test]
    fn test_char_column_mid_sequence() {
        assert_eq!(char_column("éa", 1), 1);
    }

    #[test]
    fn test_advance_across_newlines() {
        let start = Location::new(5, 1);
        assert_eq!(start.advance("ab</i>", 2), Location::new(5, 3));
        assert_eq!(start.advance("one\ntwo</b>", 7), Location::new(6, 4));
        assert_eq!(start.advance("a\nb\nc", 4), Location::new(7, 1));
    }
}
