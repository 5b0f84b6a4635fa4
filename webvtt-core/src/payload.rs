//! Cue payload tokenizer and tree construction.
//!
//! The payload grammar is lenient: unknown tags vanish, unknown entities stay
//! verbatim, and unbalanced end tags are reported and skipped. Nothing in a
//! payload can fail the cue.
//!
//! # Tokenizer states
//!
//! ```text
//! Data ──&──▶ Escape ──;/other──▶ Data
//!  │
//!  └──<──▶ Tag ──/──▶ EndTag ──>──▶ Data
//!          │  ──digit──▶ TimestampTag ──>──▶ Data
//!          │  ──.──▶ StartTagClass ──ws──▶ StartTagAnnotation ──>──▶ Data
//!          └──name──▶ StartTag ──.──▶ StartTagClass
//!                         └──ws──▶ StartTagAnnotation
//! ```

use std::ops::ControlFlow;

use phf::phf_map;

use crate::error::{emit, Diagnostic, ErrorCode, ParseError};
use crate::span::Location;
use crate::timestamp;
use crate::tree::{CueText, NodeKind, TreeBuilder};

/// Named character references.
static ENTITIES: phf::Map<&'static str, &'static str> = phf_map! {
    "&amp;" => "&",
    "&lt;" => "<",
    "&gt;" => ">",
    "&lrm;" => "\u{200E}",
    "&rlm;" => "\u{200F}",
    "&nbsp;" => "\u{00A0}",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Bold,
    Italic,
    Underline,
    Ruby,
    RubyText,
    Voice,
    Lang,
    Class,
}

static TAGS: phf::Map<&'static str, Tag> = phf_map! {
    "b" => Tag::Bold,
    "i" => Tag::Italic,
    "u" => Tag::Underline,
    "ruby" => Tag::Ruby,
    "rt" => Tag::RubyText,
    "v" => Tag::Voice,
    "lang" => Tag::Lang,
    "c" => Tag::Class,
};

impl Tag {
    fn node_kind(self, annotation: String) -> NodeKind {
        match self {
            Tag::Bold => NodeKind::Bold,
            Tag::Italic => NodeKind::Italic,
            Tag::Underline => NodeKind::Underline,
            Tag::Ruby => NodeKind::Ruby,
            Tag::RubyText => NodeKind::RubyText,
            Tag::Voice => NodeKind::Voice(annotation),
            Tag::Lang => NodeKind::Lang(annotation),
            Tag::Class => NodeKind::Class,
        }
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

/// A payload token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Text with entities decoded.
    Text(String),
    StartTag {
        name: String,
        classes: Vec<String>,
        annotation: String,
    },
    EndTag(String),
    /// Contents of a `<...>` that started with a digit.
    Timestamp(String),
    /// An empty line inside the payload.
    BlankLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Escape,
    Tag,
    StartTag,
    StartTagClass,
    StartTagAnnotation,
    EndTag,
    TimestampTag,
}

#[inline]
fn is_tag_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

/// Splits payload text into tokens, each with the byte offset it starts at.
///
/// A [`Token::BlankLine`] is placed at the start of the empty line.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn at_blank_line(&self) -> bool {
        self.input[self.pos..].starts_with("\n\n")
    }

    fn next_token(&mut self) -> Option<Token> {
        let mut state = State::Data;
        let mut result = String::new();
        let mut buffer = String::new();
        let mut classes = Vec::new();

        if self.pos == 0 && self.input.starts_with('\n') {
            self.pos = 1;
            return Some(Token::BlankLine);
        }

        loop {
            let Some(c) = self.peek() else {
                // End of input: flush whatever the state holds.
                return match state {
                    State::Data => (!result.is_empty()).then_some(Token::Text(result)),
                    State::Escape => {
                        result.push_str(&buffer);
                        Some(Token::Text(result))
                    }
                    State::Tag => None,
                    State::StartTag | State::StartTagAnnotation => Some(Token::StartTag {
                        name: result,
                        classes,
                        annotation: collapse_whitespace(&buffer),
                    }),
                    State::StartTagClass => {
                        push_class(&mut classes, &mut buffer);
                        Some(Token::StartTag { name: result, classes, annotation: String::new() })
                    }
                    State::EndTag => Some(Token::EndTag(result)),
                    State::TimestampTag => Some(Token::Timestamp(result)),
                };
            };

            match state {
                State::Data => match c {
                    '&' => {
                        self.bump();
                        buffer.push('&');
                        state = State::Escape;
                    }
                    '<' if result.is_empty() => {
                        self.bump();
                        state = State::Tag;
                    }
                    '<' => return Some(Token::Text(result)),
                    '\n' if self.at_blank_line() => {
                        if result.is_empty() {
                            self.pos += 2;
                            return Some(Token::BlankLine);
                        }
                        return Some(Token::Text(result));
                    }
                    _ => {
                        self.bump();
                        result.push(c);
                    }
                },

                State::Escape => match c {
                    ';' => {
                        self.bump();
                        buffer.push(';');
                        match ENTITIES.get(buffer.as_str()) {
                            Some(decoded) => result.push_str(decoded),
                            None => result.push_str(&buffer),
                        }
                        buffer.clear();
                        state = State::Data;
                    }
                    '&' => {
                        self.bump();
                        result.push_str(&buffer);
                        buffer.clear();
                        buffer.push('&');
                    }
                    '<' => {
                        result.push_str(&buffer);
                        return Some(Token::Text(result));
                    }
                    c if c.is_ascii_alphanumeric() => {
                        self.bump();
                        buffer.push(c);
                    }
                    _ => {
                        // The terminating character belongs to the text,
                        // except for a line break that may start a blank line.
                        result.push_str(&buffer);
                        buffer.clear();
                        state = State::Data;
                    }
                },

                State::Tag => {
                    self.bump();
                    match c {
                        '/' => state = State::EndTag,
                        '.' => state = State::StartTagClass,
                        '>' => {
                            // `<>` is an empty start tag with no effect
                            return Some(Token::StartTag {
                                name: String::new(),
                                classes,
                                annotation: String::new(),
                            });
                        }
                        c if is_tag_space(c) => state = State::StartTagAnnotation,
                        c if c.is_ascii_digit() => {
                            result.push(c);
                            state = State::TimestampTag;
                        }
                        c => {
                            result.push(c);
                            state = State::StartTag;
                        }
                    }
                }

                State::StartTag => {
                    self.bump();
                    match c {
                        '>' => {
                            return Some(Token::StartTag {
                                name: result,
                                classes,
                                annotation: String::new(),
                            })
                        }
                        '.' => state = State::StartTagClass,
                        c if is_tag_space(c) => state = State::StartTagAnnotation,
                        c => result.push(c),
                    }
                }

                State::StartTagClass => {
                    self.bump();
                    match c {
                        '>' => {
                            push_class(&mut classes, &mut buffer);
                            return Some(Token::StartTag {
                                name: result,
                                classes,
                                annotation: String::new(),
                            });
                        }
                        '.' => push_class(&mut classes, &mut buffer),
                        c if is_tag_space(c) => {
                            push_class(&mut classes, &mut buffer);
                            state = State::StartTagAnnotation;
                        }
                        c => buffer.push(c),
                    }
                }

                State::StartTagAnnotation => {
                    self.bump();
                    match c {
                        '>' => {
                            return Some(Token::StartTag {
                                name: result,
                                classes,
                                annotation: collapse_whitespace(&buffer),
                            })
                        }
                        c => buffer.push(c),
                    }
                }

                State::EndTag => {
                    self.bump();
                    match c {
                        '>' => return Some(Token::EndTag(result)),
                        c => result.push(c),
                    }
                }

                State::TimestampTag => {
                    self.bump();
                    match c {
                        '>' => return Some(Token::Timestamp(result)),
                        c => result.push(c),
                    }
                }
            }
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = (usize, Token);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.input.len() {
            return None;
        }
        let start = self.pos;
        let token = self.next_token()?;
        let offset = match token {
            Token::BlankLine => self.pos - 1,
            _ => start,
        };
        Some((offset, token))
    }
}

fn push_class(classes: &mut Vec<String>, buffer: &mut String) {
    if !buffer.is_empty() {
        classes.push(std::mem::take(buffer));
    }
}

/// Trim and collapse internal whitespace runs to one space.
fn collapse_whitespace(annotation: &str) -> String {
    annotation.split(is_tag_space).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

// ============================================================================
// Tree construction
// ============================================================================

/// Parse payload text into a node tree.
///
/// `origin` is the location of the first payload character and anchors the
/// diagnostics. A blank line stops parsing early with
/// [`ErrorCode::UnexpectedBlankLine`]; everything before it is kept.
pub fn parse<F>(text: &str, origin: Location, report: &mut F) -> Result<CueText, ParseError>
where
    F: FnMut(&Diagnostic) -> ControlFlow<()>,
{
    let mut builder = TreeBuilder::new();

    let at = |offset: usize| origin.advance(text, offset);

    for (offset, token) in Tokenizer::new(text) {
        match token {
            Token::Text(s) => builder.text(&s),
            Token::StartTag { name, classes, annotation } => {
                let Some(&tag) = TAGS.get(name.as_str()) else {
                    continue;
                };
                if tag == Tag::RubyText && !matches!(builder.current_kind(), NodeKind::Ruby) {
                    continue;
                }
                builder.open(tag.node_kind(annotation), classes);
            }
            Token::EndTag(name) => {
                let Some(&tag) = TAGS.get(name.trim_end_matches(is_tag_space)) else {
                    continue;
                };
                if !builder.close(&tag.node_kind(String::new())) {
                    emit(report, Diagnostic::new(ErrorCode::UnmatchedEndTag, at(offset)))?;
                }
            }
            Token::Timestamp(s) => {
                if let Some(ts) = timestamp::parse(&s).filter(|ts| !ts.malformed) {
                    builder.timestamp(ts.value);
                }
            }
            Token::BlankLine => {
                emit(report, Diagnostic::new(ErrorCode::UnexpectedBlankLine, at(offset)))?;
                break;
            }
        }
    }

    Ok(builder.finish())
}

/// Parse payload text, ignoring diagnostics.
pub fn parse_text(text: &str) -> CueText {
    let mut ignore = |_: &Diagnostic| ControlFlow::Continue(());
    match parse(text, Location::default(), &mut ignore) {
        Ok(tree) => tree,
        // unreachable: the reporter never breaks
        Err(_) => CueText::default(),
    }
}
