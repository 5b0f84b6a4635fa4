//! Growable line buffer.
//!
//! Holds the bytes of one physical line while they arrive across chunks.
//! Growth goes through `try_reserve` so allocation failure surfaces as an
//! error instead of aborting the process.

use memchr::memmem;

use crate::error::ParseError;

/// The cue-timing separator.
pub const SEPARATOR: &[u8] = b"-->";

const REPLACEMENT: &str = "\u{FFFD}";

/// Byte buffer for a partially received line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    bytes: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Append bytes, growing the buffer as needed.
    pub fn append(&mut self, data: &[u8]) -> Result<(), ParseError> {
        self.bytes
            .try_reserve(data.len())
            .map_err(|_| ParseError::OutOfMemory)?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shorten the buffer to `len` bytes. Longer lengths are ignored.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Whether the buffered line holds the `-->` separator.
    pub fn contains_separator(&self) -> bool {
        memmem::find(&self.bytes, SEPARATOR).is_some()
    }

    /// Take the line as text, leaving the buffer empty.
    ///
    /// Invalid UTF-8 and NUL bytes both become U+FFFD.
    pub fn take_text(&mut self) -> String {
        let text = match String::from_utf8(std::mem::take(&mut self.bytes)) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
        replace_all(text, "\0", REPLACEMENT)
    }
}

/// Replace every occurrence of `from` with `to`.
///
/// Returns the input untouched when there is nothing to replace.
pub fn replace_all(text: String, from: &str, to: &str) -> String {
    if from.is_empty() || memmem::find(text.as_bytes(), from.as_bytes()).is_none() {
        return text;
    }
    text.replace(from, to)
}
