//! WebVTT Core Parser
//!
//! Incremental, chunk-resumable parser for WebVTT caption files. Bytes go in
//! through [`Parser::feed`] in chunks of any size; validated cues and
//! diagnostics come out through a [`Handler`].
//!
//! # Architecture
//!
//! - **lexer.rs** - Resumable byte lexer (BOM, signature, newlines, whitespace)
//! - **parser.rs** - Document state machine over an explicit frame stack
//! - **timing.rs** - Cue timings and settings line
//! - **payload.rs** - Cue text tokenizer and tree construction
//! - **tree.rs** - Payload node arena
//! - **cue.rs** - Cue record, settings, validation
//! - **timestamp.rs** - Timestamp type and grammar
//! - **error.rs** - Error codes, diagnostics, hard failures
//! - **buffer.rs** - Growable line buffer
//! - **span.rs** - Location type
//! - **handler.rs** - Callback interface
//! - **document.rs** - Whole-file helper

pub mod buffer;
pub mod cue;
pub mod document;
pub mod error;
pub mod handler;
pub mod lexer;
pub mod parser;
pub mod payload;
pub mod span;
pub mod timestamp;
mod timing;
pub mod tree;

pub use cue::{Align, Cue, CueSettings, LinePosition, Vertical};
pub use document::Document;
pub use error::{Diagnostic, ErrorCode, ParseError};
pub use handler::{handler_fn, Collect, FnHandler, Handler};
pub use parser::{FeedResult, Parser, ParserOptions};
pub use span::Location;
pub use timestamp::Timestamp;
pub use tree::{CueText, Node, NodeId, NodeKind};
