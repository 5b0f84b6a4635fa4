//! Test harness for running documents whole, split, and with variations

use crate::common::{ExpectedCue, ExpectedError, Gen, TestCase};
use std::sync::Once;

use webvtt_core::{Collect, Cue, Diagnostic, ParseError, Parser};

static TRACING: Once = Once::new();

/// Route parser logs to the test writer; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Everything a parse produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub cues: Vec<Cue>,
    pub diagnostics: Vec<Diagnostic>,
    pub fatal: Option<ParseError>,
}

impl Outcome {
    pub fn cue_lines(&self, with_markup: bool) -> Vec<String> {
        self.cues.iter().map(|c| format_cue(c, with_markup)).collect()
    }

    pub fn error_lines(&self) -> Vec<String> {
        self.diagnostics.iter().map(format_diagnostic).collect()
    }
}

/// Feed `input` in chunks whose sizes come from `next_size`, then finish.
pub fn parse_chunked(input: &[u8], mut next_size: impl FnMut() -> usize) -> Outcome {
    init_tracing();
    let mut parser = Parser::new(Collect::new());
    let mut fatal = None;
    let mut rest = input;
    while !rest.is_empty() {
        let n = next_size().clamp(1, rest.len());
        let (chunk, tail) = rest.split_at(n);
        if let Err(e) = parser.feed(chunk) {
            fatal = Some(e);
            break;
        }
        rest = tail;
    }
    if fatal.is_none() {
        fatal = parser.finish().err();
    }
    let Collect { cues, diagnostics } = parser.into_handler();
    Outcome { cues, diagnostics, fatal }
}

pub fn parse_whole(input: &[u8]) -> Outcome {
    parse_chunked(input, || usize::MAX)
}

pub fn parse_bytewise(input: &[u8]) -> Outcome {
    parse_chunked(input, || 1)
}

/// Two chunks, split before byte `at`.
pub fn parse_split_at(input: &[u8], at: usize) -> Outcome {
    let mut sizes = [at, usize::MAX].into_iter();
    parse_chunked(input, move || sizes.next().unwrap_or(usize::MAX))
}

/// Format cue for comparison
pub fn format_cue(cue: &Cue, with_markup: bool) -> String {
    let mut line = format!("{:?} {} --> {} {:?}", cue.id, cue.start, cue.end, cue.text);
    if with_markup {
        line.push_str(&format!(" markup {:?}", cue.body.to_string()));
    }
    line
}

pub fn format_diagnostic(d: &Diagnostic) -> String {
    format!("{:?} {}:{}", d.code, d.line(), d.column())
}

fn format_expected_cue(cue: &ExpectedCue) -> String {
    let mut line = format!("{:?} {} --> {} {:?}", cue.id, cue.start, cue.end, cue.text);
    if let Some(markup) = &cue.markup {
        line.push_str(&format!(" markup {:?}", markup));
    }
    line
}

fn format_expected_error(e: &ExpectedError) -> String {
    format!("{} {}:{}", e.0, e.1, e.2)
}

/// Result of running a test
#[derive(Debug)]
pub struct TestResult {
    pub passed: bool,
    pub input: Vec<u8>,
    pub expected: Vec<String>,
    pub actual: Vec<String>,
    pub seed: u64,
    pub errors: Vec<String>,
}

fn check(case: &TestCase, input: Vec<u8>, outcome: &Outcome, seed: u64) -> TestResult {
    let with_markup = case.cues.iter().any(|c| c.markup.is_some());
    let mut expected: Vec<String> = case.cues.iter().map(format_expected_cue).collect();
    expected.extend(case.errors.iter().map(format_expected_error));
    let mut actual = outcome.cue_lines(with_markup);
    actual.extend(outcome.error_lines());

    let mut errors = Vec::new();
    if actual.len() != expected.len() {
        errors.push(format!(
            "Count mismatch: expected {}, got {}",
            expected.len(),
            actual.len()
        ));
    }
    for (i, (act, exp)) in actual.iter().zip(expected.iter()).enumerate() {
        if act != exp {
            errors.push(format!("Entry {}: expected '{}', got '{}'", i, exp, act));
        }
    }
    if case.fatal != outcome.fatal.is_some() {
        errors.push(format!("Expected fatal: {}, got {:?}", case.fatal, outcome.fatal));
    }

    TestResult { passed: errors.is_empty(), input, expected, actual, seed, errors }
}

/// Run a single test case (canonical, no variations)
pub fn run_test(case: &TestCase) -> TestResult {
    let input = case.vtt.as_bytes().to_vec();
    let outcome = parse_whole(&input);
    check(case, input, &outcome, 0)
}

/// Run test with stochastic variations
///
/// None of these change what the parser reports:
/// - 30% chance of a leading byte-order mark
/// - Random line terminator (LF, CRLF or CR)
/// - Random chunk sizes
pub fn run_with_variations(case: &TestCase, gen: &mut Gen) -> TestResult {
    let mut input = Vec::new();
    if gen.chance(0.3) {
        input.extend_from_slice("\u{FEFF}".as_bytes());
    }

    let eol = gen.line_ending();
    let mut lines = case.vtt.as_bytes().split(|&b| b == b'\n').peekable();
    while let Some(line) = lines.next() {
        input.extend_from_slice(line);
        if lines.peek().is_some() {
            input.extend_from_slice(eol);
        }
    }

    let outcome = parse_chunked(&input, || gen.chunk_size());
    check(case, input, &outcome, gen.seed)
}

impl TestResult {
    /// Print detailed failure info
    pub fn print_failure(&self, case_id: &str) {
        eprintln!("\n=== FAILED: {} ===", case_id);
        eprintln!("Seed: {} (set WEBVTT_TEST_SEED={} to reproduce)", self.seed, self.seed);
        eprintln!("\nInput:");
        eprintln!("{:?}", String::from_utf8_lossy(&self.input));
        eprintln!("\nExpected:");
        for (i, e) in self.expected.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nActual:");
        for (i, e) in self.actual.iter().enumerate() {
            eprintln!("  {}: {}", i, e);
        }
        eprintln!("\nErrors:");
        for e in &self.errors {
            eprintln!("  - {}", e);
        }
    }
}
