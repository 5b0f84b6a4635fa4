//! Callback interface between the parser and its consumer.
//!
//! Instead of pushing cues into a queue, the parser calls the handler for
//! each validated cue and each diagnostic. The diagnostic callback controls
//! the pace: returning `ControlFlow::Break` aborts the parse.

use std::ops::ControlFlow;

use crate::cue::Cue;
use crate::error::Diagnostic;

/// Receives cues and diagnostics from a [`Parser`](crate::Parser).
pub trait Handler {
    /// Called once per validated cue, in document order. The handler owns
    /// the cue from here on.
    fn on_cue(&mut self, cue: Cue);

    /// Called for every diagnostic. `Break` aborts parsing.
    fn on_error(&mut self, diagnostic: &Diagnostic) -> ControlFlow<()> {
        let _ = diagnostic;
        ControlFlow::Continue(())
    }
}

impl<H: Handler + ?Sized> Handler for &mut H {
    fn on_cue(&mut self, cue: Cue) {
        (**self).on_cue(cue)
    }

    fn on_error(&mut self, diagnostic: &Diagnostic) -> ControlFlow<()> {
        (**self).on_error(diagnostic)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn on_cue(&mut self, cue: Cue) {
        (**self).on_cue(cue)
    }

    fn on_error(&mut self, diagnostic: &Diagnostic) -> ControlFlow<()> {
        (**self).on_error(diagnostic)
    }
}

/// Handler built from two closures. See [`handler_fn`].
pub struct FnHandler<C, E> {
    on_cue: C,
    on_error: E,
}

/// Build a handler from a cue closure and an error closure.
///
/// ```
/// use std::ops::ControlFlow;
/// use webvtt_core::{handler_fn, Parser};
///
/// let mut count = 0;
/// let mut parser = Parser::new(handler_fn(
///     |_cue| count += 1,
///     |_diag| ControlFlow::Continue(()),
/// ));
/// parser.feed(b"WEBVTT\n\n00:01.000 --> 00:02.000\nhi\n").unwrap();
/// parser.finish().unwrap();
/// drop(parser);
/// assert_eq!(count, 1);
/// ```
pub fn handler_fn<C, E>(on_cue: C, on_error: E) -> FnHandler<C, E>
where
    C: FnMut(Cue),
    E: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    FnHandler { on_cue, on_error }
}

impl<C, E> Handler for FnHandler<C, E>
where
    C: FnMut(Cue),
    E: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    fn on_cue(&mut self, cue: Cue) {
        (self.on_cue)(cue)
    }

    fn on_error(&mut self, diagnostic: &Diagnostic) -> ControlFlow<()> {
        (self.on_error)(diagnostic)
    }
}

/// Handler that keeps every cue and diagnostic.
#[derive(Debug, Default, Clone)]
pub struct Collect {
    pub cues: Vec<Cue>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Collect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Handler for Collect {
    fn on_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    fn on_error(&mut self, diagnostic: &Diagnostic) -> ControlFlow<()> {
        self.diagnostics.push(*diagnostic);
        ControlFlow::Continue(())
    }
}
