//! Resumable document parser.
//!
//! The parser keeps its position in the grammar on an explicit stack of
//! [`Frame`]s instead of the call stack, so a chunk may end anywhere (inside
//! the signature, between CR and LF, halfway through a timestamp) and the
//! next [`Parser::feed`] picks up at the following byte. Bytes are never
//! read twice.
//!
//! # Architecture
//!
//! ```text
//! Chunks            Lexer             Frame stack                   Handler
//!   │                 │                    │                           │
//!   │──feed(chunk)───▶│──token────────────▶│ Initial → Tag → EolCount  │
//!   │                 │                    │ Body ─▶ Cue ─▶ CueId      │
//!   │                 │                    │        └────▶ CueText     │
//!   │                 │                    │ CueRead (one line)        │
//!   │                 │                    │──on_cue / on_error───────▶│
//! ```
//!
//! Header bytes go through the lexer token by token. After the header the
//! parser works a line at a time: a `CueRead` frame collects one physical
//! line, however many chunks it spans, and the frame beneath decides what
//! the line means.

use std::fmt;
use std::ops::ControlFlow;

use memchr::{memchr2, memmem};
use tracing::{debug, trace};

use crate::buffer::{LineBuffer, SEPARATOR};
use crate::cue::Cue;
use crate::error::{emit, Diagnostic, ErrorCode, ParseError};
use crate::handler::Handler;
use crate::lexer::{Lexer, Token};
use crate::payload;
use crate::span::{char_column, Location};
use crate::timing::{parse_timings_line, Timings};

// ============================================================================
// Configuration
// ============================================================================

/// Parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// Frames to reserve up front. The stack still grows past this.
    pub stack_capacity: usize,
    /// Report [`ErrorCode::InvalidEndTime`] for cues dropped because their
    /// end time is not after their start time. Off by default: such cues
    /// vanish without a diagnostic.
    pub report_invalid_cue_times: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { stack_capacity: 256, report_invalid_cue_times: false }
    }
}

impl ParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack_capacity(mut self, frames: usize) -> Self {
        self.stack_capacity = frames;
        self
    }

    pub fn report_invalid_cue_times(mut self, report: bool) -> Self {
        self.report_invalid_cue_times = report;
        self
    }
}

/// Result of a feed or finish call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedResult {
    /// Number of bytes consumed from input
    pub bytes_consumed: usize,
    /// Number of cues handed to the handler
    pub cues_emitted: usize,
    /// Number of diagnostics reported
    pub diagnostics: usize,
    /// The chunk ended inside a token or line
    pub needs_more: bool,
}

// ============================================================================
// Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Expecting the byte-order mark or the signature
    Initial,
    /// Just after `WEBVTT`
    Tag,
    /// Free text after the signature
    TagComment,
    /// Counting newlines after the header
    EolCount,
    /// Between cue blocks
    Body,
    /// Owns the cue under construction
    Cue,
    /// Have an id, the timings line comes next
    CueId,
    /// Reading payload lines
    CueText,
    /// Discarding the rest of a broken cue block
    SkipCue,
    /// Collecting one physical line
    CueRead,
}

#[derive(Debug)]
enum Value {
    None,
    Count(u32),
    Cue(Box<Cue>),
    Text(LineBuffer),
}

/// One entry of the resumption stack.
#[derive(Debug)]
struct Frame {
    state: State,
    value: Value,
    line: u32,
    /// Frames to pop, this one included, when this rule returns.
    back: u8,
}

/// Build a diagnostic reporter over the handler and the running count.
fn reporter<'a, H: Handler>(
    handler: &'a mut H,
    count: &'a mut usize,
) -> impl FnMut(&Diagnostic) -> ControlFlow<()> + 'a {
    move |diagnostic: &Diagnostic| {
        *count += 1;
        trace!(%diagnostic, "diagnostic");
        handler.on_error(diagnostic)
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Incremental WebVTT parser.
///
/// ```
/// use webvtt_core::{Collect, Parser};
///
/// let mut parser = Parser::new(Collect::new());
/// parser.feed(b"WEBVTT\n\n00:00:01.000 --> 00:0").unwrap();
/// parser.feed(b"0:02.000\nHello\n").unwrap();
/// parser.finish().unwrap();
///
/// let collected = parser.into_handler();
/// assert_eq!(collected.cues.len(), 1);
/// assert_eq!(collected.cues[0].text, "Hello");
/// ```
pub struct Parser<H: Handler> {
    handler: H,
    options: ParserOptions,
    lexer: Lexer,
    stack: Vec<Frame>,
    /// Line and column of the next byte.
    line: u32,
    column: u32,
    cues_emitted: usize,
    diagnostics: usize,
    finished: bool,
    failed: Option<ParseError>,
}

impl<H: Handler> Parser<H> {
    /// Create a parser with default options.
    pub fn new(handler: H) -> Self {
        Self::with_options(handler, ParserOptions::default())
    }

    pub fn with_options(handler: H, options: ParserOptions) -> Self {
        let mut stack = Vec::with_capacity(options.stack_capacity);
        stack.push(Frame { state: State::Initial, value: Value::Count(0), line: 1, back: 1 });
        Self {
            handler,
            options,
            lexer: Lexer::new(),
            stack,
            line: 1,
            column: 1,
            cues_emitted: 0,
            diagnostics: 0,
            finished: false,
            failed: None,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the parser, returning the handler.
    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Total cues emitted so far.
    pub fn cues_emitted(&self) -> usize {
        self.cues_emitted
    }

    /// Total diagnostics reported so far.
    pub fn diagnostics(&self) -> usize {
        self.diagnostics
    }

    /// Whether [`finish`](Self::finish) has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The hard failure that stopped this parser, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.failed.as_ref()
    }

    /// Feed the next chunk of the document.
    ///
    /// All bytes are always consumed. Cues completed by this chunk are
    /// delivered before the call returns. After a hard failure every call
    /// returns that failure again.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FeedResult, ParseError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if self.finished {
            return Ok(FeedResult::default());
        }
        let before = (self.cues_emitted, self.diagnostics);
        match self.run(chunk, false) {
            Ok(()) => Ok(FeedResult {
                bytes_consumed: chunk.len(),
                cues_emitted: self.cues_emitted - before.0,
                diagnostics: self.diagnostics - before.1,
                needs_more: self.has_partial_input(),
            }),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Flush buffered state as if the input ended here.
    ///
    /// Idempotent: later calls return an empty result.
    pub fn finish(&mut self) -> Result<FeedResult, ParseError> {
        if let Some(err) = self.failed {
            return Err(err);
        }
        if self.finished {
            return Ok(FeedResult::default());
        }
        let before = (self.cues_emitted, self.diagnostics);
        let outcome = self.run(&[], true);
        self.finished = true;
        match outcome {
            Ok(()) => Ok(FeedResult {
                bytes_consumed: 0,
                cues_emitted: self.cues_emitted - before.0,
                diagnostics: self.diagnostics - before.1,
                needs_more: false,
            }),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&mut self, err: ParseError) -> ParseError {
        if err == ParseError::OutOfMemory {
            let diagnostic = Diagnostic::at(ErrorCode::AllocationFailed, self.line, self.column);
            self.diagnostics += 1;
            let _ = self.handler.on_error(&diagnostic);
        }
        debug!(error = %err, line = self.line, "parse failed");
        self.stack.clear();
        self.lexer.reset();
        self.failed = Some(err);
        err
    }

    fn has_partial_input(&self) -> bool {
        self.lexer.is_pending()
            || matches!(self.stack.last(), Some(Frame { value: Value::Text(buf), .. }) if !buf.is_empty())
    }

    // ------------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------------

    fn top_state(&self) -> Option<State> {
        self.stack.last().map(|f| f.state)
    }

    fn push(&mut self, state: State, value: Value, line: u32, back: u8) {
        self.stack.push(Frame { state, value, line, back });
    }

    /// Replace the top frame's state and value, keeping its origin.
    fn replace(&mut self, state: State, value: Value) {
        if let Some(top) = self.stack.last_mut() {
            top.state = state;
            top.value = value;
        }
    }

    /// Pop the top frame together with the frames it returns through.
    /// Returns the deepest frame removed.
    fn pop_back(&mut self) -> Option<Frame> {
        let back = usize::from(self.stack.last()?.back.max(1));
        let keep = self.stack.len().saturating_sub(back);
        self.stack.drain(keep..).next()
    }

    fn cue_mut(&mut self) -> Option<&mut Cue> {
        self.stack.iter_mut().rev().find_map(|f| match &mut f.value {
            Value::Cue(cue) => Some(cue.as_mut()),
            _ => None,
        })
    }

    fn report(&mut self, diagnostic: Diagnostic) -> Result<(), ParseError> {
        let Self { handler, diagnostics, .. } = self;
        emit(&mut reporter(handler, diagnostics), diagnostic)
    }

    fn malformed_signature(&mut self) -> ParseError {
        let diagnostic = Diagnostic::at(ErrorCode::MalformedTag, self.line, self.column);
        self.diagnostics += 1;
        let _ = self.handler.on_error(&diagnostic);
        ParseError::MalformedSignature(diagnostic)
    }

    fn newline(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    // ------------------------------------------------------------------------
    // Driver
    // ------------------------------------------------------------------------

    fn run(&mut self, chunk: &[u8], finished: bool) -> Result<(), ParseError> {
        let mut pos = 0;
        loop {
            if pos >= chunk.len() && !self.lexer.is_pending() {
                return if finished { self.end_of_input() } else { Ok(()) };
            }
            let Some(state) = self.top_state() else {
                return Ok(());
            };
            let progressed = match state {
                State::Initial | State::Tag | State::TagComment | State::EolCount => {
                    self.header(state, chunk, &mut pos, finished)?
                }
                State::Body | State::CueId | State::CueText | State::SkipCue => {
                    self.push(State::CueRead, Value::Text(LineBuffer::new()), self.line, 1);
                    true
                }
                State::CueRead => self.read_line(chunk, &mut pos, finished)?,
                State::Cue => {
                    // Cue frames sit under CueId/CueText and are never on top.
                    self.pop_back();
                    true
                }
            };
            if !progressed {
                return Ok(());
            }
        }
    }

    /// One header step. Returns false when the chunk ended mid-token.
    fn header(
        &mut self,
        state: State,
        chunk: &[u8],
        pos: &mut usize,
        finished: bool,
    ) -> Result<bool, ParseError> {
        match state {
            State::Initial => match self.lexer.next(chunk, pos, finished) {
                Token::Unfinished => return Ok(false),
                Token::Bom if matches!(self.stack.last(), Some(Frame { value: Value::Count(0), .. })) => {
                    self.replace(State::Initial, Value::Count(1));
                }
                Token::Webvtt => {
                    self.column += 6;
                    self.replace(State::Tag, Value::None);
                }
                _ => return Err(self.malformed_signature()),
            },

            State::Tag => {
                let start = *pos;
                match self.lexer.next(chunk, pos, finished) {
                    Token::Unfinished => return Ok(false),
                    Token::Whitespace => {
                        self.column += (*pos - start) as u32;
                        self.replace(State::TagComment, Value::None);
                    }
                    Token::Newline => {
                        self.newline();
                        self.replace(State::EolCount, Value::Count(1));
                    }
                    _ => return Err(self.malformed_signature()),
                }
            }

            State::TagComment => {
                if self.lexer.is_pending() || matches!(chunk.get(*pos), Some(b'\r' | b'\n')) {
                    match self.lexer.next(chunk, pos, finished) {
                        Token::Unfinished => return Ok(false),
                        _ => {
                            self.newline();
                            self.replace(State::EolCount, Value::Count(1));
                        }
                    }
                } else {
                    let rest = &chunk[*pos..];
                    *pos += memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
                }
            }

            State::EolCount => {
                if self.lexer.is_pending() || matches!(chunk.get(*pos), Some(b'\r' | b'\n')) {
                    match self.lexer.next(chunk, pos, finished) {
                        Token::Unfinished => return Ok(false),
                        _ => {
                            self.newline();
                            if let Some(Frame { value: Value::Count(n), .. }) = self.stack.last_mut() {
                                *n += 1;
                            }
                        }
                    }
                } else {
                    let count = match self.stack.last() {
                        Some(Frame { value: Value::Count(n), .. }) => *n,
                        _ => 0,
                    };
                    if count < 2 {
                        self.report(Diagnostic::at(ErrorCode::ExpectedEol, self.line, 1))?;
                    }
                    trace!(line = self.line, "header done");
                    self.replace(State::Body, Value::None);
                }
            }

            _ => {}
        }
        Ok(true)
    }

    /// Collect bytes into the top line buffer. Returns false when the chunk
    /// ended between CR and a possible LF.
    fn read_line(&mut self, chunk: &[u8], pos: &mut usize, finished: bool) -> Result<bool, ParseError> {
        if self.lexer.is_pending() || matches!(chunk.get(*pos), Some(b'\r' | b'\n')) {
            return match self.lexer.next(chunk, pos, finished) {
                Token::Unfinished => Ok(false),
                _ => {
                    self.complete_line()?;
                    self.newline();
                    Ok(true)
                }
            };
        }
        let rest = &chunk[*pos..];
        let end = memchr2(b'\r', b'\n', rest).unwrap_or(rest.len());
        if let Some(Frame { value: Value::Text(buf), .. }) = self.stack.last_mut() {
            buf.append(&rest[..end])?;
        }
        *pos += end;
        Ok(true)
    }

    /// Pop the finished line and hand it to the frame beneath.
    fn complete_line(&mut self) -> Result<(), ParseError> {
        let Some(Frame { value: Value::Text(mut buf), line, .. }) = self.pop_back() else {
            return Ok(());
        };
        let has_separator = buf.contains_separator();
        let text = buf.take_text();
        self.dispatch_line(text, has_separator, line)
    }

    fn end_of_input(&mut self) -> Result<(), ParseError> {
        loop {
            let Some(state) = self.top_state() else {
                return Ok(());
            };
            match state {
                State::Initial => return Err(self.malformed_signature()),
                State::Tag | State::TagComment | State::EolCount | State::Body => {
                    self.stack.clear();
                }
                State::CueRead => self.complete_line()?,
                State::CueId => self.drop_incomplete()?,
                State::CueText => self.finish_cue()?,
                State::SkipCue | State::Cue => {
                    self.pop_back();
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Cue blocks
    // ------------------------------------------------------------------------

    fn dispatch_line(&mut self, text: String, has_separator: bool, line: u32) -> Result<(), ParseError> {
        let Some(state) = self.top_state() else {
            return Ok(());
        };
        match state {
            State::Body => {
                if !text.is_empty() {
                    self.start_cue(text, has_separator, line)?;
                }
            }

            State::CueId => {
                if text.is_empty() {
                    self.drop_incomplete()?;
                } else if has_separator {
                    let Some(Frame { value: Value::Cue(mut cue), line: id_line, .. }) = self.pop_back() else {
                        return Ok(());
                    };
                    match self.timings(&text, line, &mut cue)? {
                        Timings::Parsed => {
                            self.push(State::Cue, Value::Cue(cue), id_line, 1);
                            self.push(State::CueText, Value::None, line + 1, 2);
                        }
                        Timings::Skip => self.enter_skip(line),
                    }
                } else {
                    // A second line without `-->`: text before the timings.
                    self.pop_back();
                    self.report(Diagnostic::at(ErrorCode::CueIncomplete, line, 1))?;
                    self.enter_skip(line);
                }
            }

            State::CueText => {
                if text.is_empty() {
                    self.finish_cue()?;
                } else if has_separator {
                    let column = memmem::find(text.as_bytes(), SEPARATOR)
                        .map_or(1, |at| char_column(&text, at));
                    // Diagnostics stay in line order: the payload's come first.
                    self.finish_cue()?;
                    self.report(Diagnostic::at(ErrorCode::CueContainsSeparator, line, column))?;
                    self.start_cue(text, true, line)?;
                } else if let Some(cue) = self.cue_mut() {
                    cue.push_line(&text)?;
                }
            }

            State::SkipCue => {
                if text.is_empty() {
                    self.pop_back();
                } else if has_separator {
                    self.pop_back();
                    self.start_cue(text, true, line)?;
                }
            }

            _ => {}
        }
        Ok(())
    }

    /// First non-blank line of a block: either timings or an id.
    fn start_cue(&mut self, text: String, has_separator: bool, line: u32) -> Result<(), ParseError> {
        let mut cue = Box::new(Cue::new());
        if !has_separator {
            cue.set_id(text);
            self.push(State::Cue, Value::Cue(cue), line, 1);
            self.push(State::CueId, Value::None, line, 2);
            return Ok(());
        }
        match self.timings(&text, line, &mut cue)? {
            Timings::Parsed => {
                self.push(State::Cue, Value::Cue(cue), line, 1);
                self.push(State::CueText, Value::None, line + 1, 2);
            }
            Timings::Skip => self.enter_skip(line),
        }
        Ok(())
    }

    fn timings(&mut self, text: &str, line: u32, cue: &mut Cue) -> Result<Timings, ParseError> {
        let Self { handler, diagnostics, .. } = self;
        parse_timings_line(text, line, cue, &mut reporter(handler, diagnostics))
    }

    /// Pop a cue that never got its timings line.
    fn drop_incomplete(&mut self) -> Result<(), ParseError> {
        if let Some(Frame { value: Value::Cue(cue), line, .. }) = self.pop_back() {
            if cue.is_incomplete() {
                self.report(Diagnostic::at(ErrorCode::CueIncomplete, line, 1))?;
            }
        }
        Ok(())
    }

    fn enter_skip(&mut self, line: u32) {
        debug!(line, "skipping cue block");
        self.push(State::SkipCue, Value::None, line, 1);
    }

    /// Pop the payload and cue frames, validate, and deliver.
    fn finish_cue(&mut self) -> Result<(), ParseError> {
        let payload_line = self.stack.last().map_or(self.line, |f| f.line);
        let Some(Frame { value: Value::Cue(cue), .. }) = self.pop_back() else {
            return Ok(());
        };
        let mut cue = *cue;

        if !cue.is_valid() {
            debug!(line = payload_line - 1, start = %cue.start, end = %cue.end, "dropping cue with invalid times");
            if self.options.report_invalid_cue_times {
                self.report(Diagnostic::at(ErrorCode::InvalidEndTime, payload_line - 1, 1))?;
            }
            return Ok(());
        }

        let origin = Location::new(payload_line, 1);
        let Self { handler, diagnostics, .. } = self;
        cue.body = payload::parse(&cue.text, origin, &mut reporter(handler, diagnostics))?;

        trace!(id = %cue.id, start = %cue.start, end = %cue.end, "cue");
        self.handler.on_cue(cue);
        self.cues_emitted += 1;
        Ok(())
    }
}

impl<H: Handler> fmt::Debug for Parser<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("options", &self.options)
            .field("line", &self.line)
            .field("stack", &self.stack.iter().map(|fr| fr.state).collect::<Vec<_>>())
            .field("cues_emitted", &self.cues_emitted)
            .field("finished", &self.finished)
            .field("failed", &self.failed)
            .finish()
    }
}
