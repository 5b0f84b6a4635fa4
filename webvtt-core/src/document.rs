//! Whole-file convenience wrapper around [`Parser`].

use tracing::debug;

use crate::cue::Cue;
use crate::error::{Diagnostic, ParseError};
use crate::handler::Collect;
use crate::parser::{Parser, ParserOptions};

/// Every cue and diagnostic from one complete document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub cues: Vec<Cue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// Parse a complete document held in memory.
    ///
    /// ```
    /// use webvtt_core::Document;
    ///
    /// let doc = Document::parse(b"WEBVTT\n\n1\n00:01.000 --> 00:02.000\n<b>Hi</b>\n").unwrap();
    /// assert_eq!(doc.cues[0].id, "1");
    /// assert_eq!(doc.cues[0].body.root().all_text(), "Hi");
    /// ```
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with_options(input, ParserOptions::default())
    }

    pub fn parse_with_options(input: &[u8], options: ParserOptions) -> Result<Self, ParseError> {
        let mut parser = Parser::with_options(Collect::new(), options);
        parser.feed(input)?;
        parser.finish()?;
        let Collect { cues, diagnostics } = parser.into_handler();
        debug!(cues = cues.len(), diagnostics = diagnostics.len(), "document parsed");
        Ok(Self { cues, diagnostics })
    }

    /// Parse from UTF-8 text.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        Self::parse(input.as_bytes())
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
