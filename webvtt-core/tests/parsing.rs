//! Integration tests for WebVTT parsing.
//!
//! Fixture documents first, then hand-written cases for settings, payload
//! trees, and the handler surface.

mod common;

use std::ops::ControlFlow;

use common::{load_all_fixtures, load_fixtures_by_name, parse_whole, run_test};
use pretty_assertions::assert_eq;
use webvtt_core::{
    handler_fn, Align, Diagnostic, Document, ErrorCode, LinePosition, NodeKind, ParseError,
    Parser, ParserOptions, Timestamp, Vertical,
};

// =============================================================================
// Fixtures
// =============================================================================

fn run_fixture_file(name: &str) {
    let cases = load_fixtures_by_name(name);
    assert!(!cases.is_empty(), "no cases in {}", name);
    let mut failed = 0;
    for case in &cases {
        let result = run_test(case);
        if !result.passed {
            result.print_failure(&case.id);
            failed += 1;
        }
    }
    assert_eq!(failed, 0, "{} of {} cases in {} failed", failed, cases.len(), name);
}

#[test]
fn fixtures_basic() {
    run_fixture_file("basic");
}

#[test]
fn fixtures_errors() {
    run_fixture_file("errors");
}

#[test]
fn fixtures_markup() {
    run_fixture_file("markup");
}

#[test]
fn fixture_ids_are_unique() {
    let cases = load_all_fixtures();
    let mut ids: Vec<_> = cases.iter().map(|c| c.id.as_str()).collect();
    ids.sort_unstable();
    let before = ids.len();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

// =============================================================================
// Header
// =============================================================================

#[test]
fn bom_is_skipped() {
    let out = parse_whole(b"\xEF\xBB\xBFWEBVTT\n\n00:01.000 --> 00:02.000\nx\n");
    assert!(out.fatal.is_none());
    assert_eq!(out.cues.len(), 1);
    assert!(out.diagnostics.is_empty());
}

#[test]
fn second_bom_is_fatal() {
    let out = parse_whole(b"\xEF\xBB\xBF\xEF\xBB\xBFWEBVTT\n");
    assert!(matches!(out.fatal, Some(ParseError::MalformedSignature(_))));
}

#[test]
fn leading_whitespace_is_fatal() {
    let out = parse_whole(b" WEBVTT\n");
    assert!(matches!(out.fatal, Some(ParseError::MalformedSignature(_))));
    assert!(out.cues.is_empty());
}

#[test]
fn tab_before_header_comment() {
    let out = parse_whole(b"WEBVTT\tKind: captions\nLanguage: en\n\n00:01.000 --> 00:02.000\nx\n");
    // A metadata line right after the header reads as a lone cue id.
    assert_eq!(
        out.diagnostics.iter().map(|d| (d.code, d.line())).collect::<Vec<_>>(),
        vec![(ErrorCode::ExpectedEol, 2), (ErrorCode::CueIncomplete, 2)]
    );
    assert_eq!(out.cues.len(), 1);
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn all_settings_applied() {
    let doc = Document::parse(
        b"WEBVTT\n\n00:01.000 --> 00:02.000 vertical:rl line:42% position:20% size:60% align:left\nx\n",
    )
    .unwrap();
    assert!(doc.is_clean());
    let settings = &doc.cues[0].settings;
    assert_eq!(settings.vertical, Vertical::RightToLeft);
    assert_eq!(settings.line, LinePosition::Percent(42));
    assert!(!settings.line.snap_to_lines());
    assert_eq!(settings.position, 20);
    assert_eq!(settings.size, 60);
    assert_eq!(settings.align, Align::Left);
}

#[test]
fn default_settings() {
    let doc = Document::parse(b"WEBVTT\n\n00:01.000 --> 00:02.000\nx\n").unwrap();
    let settings = &doc.cues[0].settings;
    assert_eq!(settings.vertical, Vertical::Horizontal);
    assert_eq!(settings.line, LinePosition::Auto);
    assert!(settings.line.snap_to_lines());
    assert_eq!(settings.position, 50);
    assert_eq!(settings.size, 100);
    assert_eq!(settings.align, Align::Middle);
}

#[test]
fn negative_line_number() {
    let doc = Document::parse(b"WEBVTT\n\n00:01.000 --> 00:02.000 line:-3\nx\n").unwrap();
    assert_eq!(doc.cues[0].settings.line, LinePosition::Line(-3));
}

#[test]
fn unknown_setting_reported_at_key() {
    let doc = Document::parse(b"WEBVTT\n\n00:01.000 --> 00:02.000  color:red align:end\nx\n").unwrap();
    assert_eq!(doc.diagnostics, vec![Diagnostic::at(ErrorCode::InvalidCueSetting, 3, 26)]);
    assert_eq!(doc.cues[0].settings.align, Align::End);
}

#[test]
fn bad_setting_keeps_default() {
    let doc = Document::parse(b"WEBVTT\n\n00:01.000 --> 00:02.000 position:101%\nx\n").unwrap();
    assert_eq!(doc.diagnostics, vec![Diagnostic::at(ErrorCode::PositionBadValue, 3, 34)]);
    assert_eq!(doc.cues[0].settings.position, 50);
}

// =============================================================================
// Cues
// =============================================================================

#[test]
fn cue_fields() {
    let doc = Document::parse(b"WEBVTT\n\nc1\n01:02:03.004 --> 01:02:04.000\nHi\n").unwrap();
    let cue = &doc.cues[0];
    assert_eq!(cue.id, "c1");
    assert_eq!(cue.start, Timestamp::from_millis(3_723_004));
    assert_eq!(cue.end.as_millis(), 3_724_000);
    assert_eq!(cue.start.to_string(), "01:02:03.004");
    assert!(cue.is_valid());
}

#[test]
fn end_to_end_example() {
    let doc = Document::parse(
        b"WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.500 align:middle line:10%\nHello <b>World</b>\n",
    )
    .unwrap();
    assert!(doc.is_clean());
    assert_eq!(doc.cues.len(), 1);
    let cue = &doc.cues[0];
    assert_eq!(cue.id, "1");
    assert_eq!((cue.start.as_millis(), cue.end.as_millis()), (1_000, 2_500));
    assert_eq!(cue.settings.align, Align::Middle);
    assert_eq!(cue.settings.line, LinePosition::Percent(10));
    assert!(!cue.settings.line.snap_to_lines());

    let children: Vec<_> = cue.body.root().children().collect();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].text_content(), Some("Hello "));
    assert_eq!(children[1].kind(), &NodeKind::Bold);
    assert_eq!(children[1].all_text(), "World");
}

#[test]
fn cues_in_document_order() {
    let doc = Document::parse(
        b"WEBVTT\n\n00:05.000 --> 00:06.000\nlater\n\n00:01.000 --> 00:02.000\nearlier\n",
    )
    .unwrap();
    let texts: Vec<_> = doc.cues.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["later", "earlier"]);
}

#[test]
fn one_digit_hour_is_malformed_but_used() {
    let doc = Document::parse(b"WEBVTT\n\n1:00:00.000 --> 1:00:01.000\nx\n").unwrap();
    assert_eq!(doc.cues[0].start.as_millis(), 3_600_000);
    assert_eq!(
        doc.diagnostics,
        vec![
            Diagnostic::at(ErrorCode::MalformedTimestamp, 3, 1),
            Diagnostic::at(ErrorCode::MalformedTimestamp, 3, 17),
        ]
    );
}

#[test]
fn invalid_times_reported_on_request() {
    let options = ParserOptions::new().report_invalid_cue_times(true);
    let doc = Document::parse_with_options(
        b"WEBVTT\n\n00:02.000 --> 00:01.000\nx\n\n00:03.000 --> 00:04.000\ny\n",
        options,
    )
    .unwrap();
    assert_eq!(doc.cues.len(), 1);
    assert_eq!(doc.diagnostics, vec![Diagnostic::at(ErrorCode::InvalidEndTime, 3, 1)]);
}

#[test]
fn crlf_payload_normalized() {
    let doc = Document::parse(b"WEBVTT\r\n\r\n00:01.000 --> 00:02.000\r\none\r\ntwo\r\n").unwrap();
    assert_eq!(doc.cues[0].text, "one\ntwo");
}

#[test]
fn invalid_utf8_replaced() {
    let doc = Document::parse(b"WEBVTT\n\n00:01.000 --> 00:02.000\na\xFFb\n").unwrap();
    assert_eq!(doc.cues[0].text, "a\u{FFFD}b");
}

// =============================================================================
// Payload tree
// =============================================================================

#[test]
fn payload_tree_shape() {
    let doc = Document::parse(
        b"WEBVTT\n\n00:01.000 --> 00:02.000\n<v.loud Roger>Hey <c.yellow>you</c></v>\n",
    )
    .unwrap();
    let body = &doc.cues[0].body;
    let voice = body.root().first_child().unwrap();
    assert_eq!(voice.kind(), &NodeKind::Voice("Roger".into()));
    assert!(voice.has_class("loud"));
    assert_eq!(voice.annotation(), Some("Roger"));

    let class = voice.children().nth(1).unwrap();
    assert_eq!(class.kind(), &NodeKind::Class);
    assert_eq!(class.classes(), ["yellow".to_string()]);
    assert_eq!(class.parent().unwrap().id(), voice.id());
    assert_eq!(body.root().all_text(), "Hey you");
}

#[test]
fn payload_lang_scoping() {
    let doc = Document::parse(
        b"WEBVTT\n\n00:01.000 --> 00:02.000\n<lang en>a <lang fr>b</lang> c</lang>\n",
    )
    .unwrap();
    let outer = doc.cues[0].body.root().first_child().unwrap();
    let langs: Vec<_> = outer.children().map(|n| n.lang()).collect();
    assert_eq!(langs, vec![Some("en"), Some("fr"), Some("en")]);
}

// =============================================================================
// Handler surface
// =============================================================================

#[test]
fn abort_on_first_diagnostic() {
    let mut cues = 0;
    let mut diagnostics = Vec::new();
    let mut parser = Parser::new(handler_fn(
        |_| cues += 1,
        |d: &Diagnostic| {
            diagnostics.push(*d);
            ControlFlow::Break(())
        },
    ));
    parser.feed(b"WEBVTT\n\n00:01.000 --> 00:02.000\nfine\n\n").unwrap();
    let err = parser.feed(b"00:03.000 --> 00:04.000\n<b>x</i>\n\n").unwrap_err();
    assert_eq!(err, ParseError::Aborted(Diagnostic::at(ErrorCode::UnmatchedEndTag, 7, 5)));
    assert_eq!(parser.error(), Some(&err));
    drop(parser);
    assert_eq!(cues, 1);
    assert_eq!(diagnostics.len(), 1);
}

#[test]
fn handler_by_reference() {
    let mut collect = webvtt_core::Collect::new();
    {
        let mut parser = Parser::new(&mut collect);
        parser.feed(b"WEBVTT\n\n00:01.000 --> 00:02.000\nx\n").unwrap();
        parser.finish().unwrap();
    }
    assert_eq!(collect.cues.len(), 1);
}

#[test]
fn boxed_handler() {
    let handler: Box<webvtt_core::Collect> = Box::default();
    let mut parser = Parser::new(handler);
    parser.feed(b"WEBVTT\n\n00:01.000 --> 00:02.000\nx\n").unwrap();
    parser.finish().unwrap();
    assert_eq!(parser.handler().cues.len(), 1);
}

#[test]
fn diagnostic_messages() {
    let d = Diagnostic::at(ErrorCode::CueIncomplete, 3, 1);
    assert!(!ErrorCode::CueIncomplete.message().is_empty());
    assert!(d.to_string().starts_with("3:1"));
}
