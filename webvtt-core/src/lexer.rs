//! Low-level tokens: signature, byte-order mark, newlines, whitespace.
//!
//! The lexer never looks behind the current token and never waits for input.
//! When a chunk ends inside a multi-byte token it returns
//! [`Token::Unfinished`] and remembers how far it got, so the next call with
//! the following chunk picks up at the next byte. A CR at the end of a chunk
//! is held back the same way until the next byte says whether it is CRLF.

const SIGNATURE: &[u8; 6] = b"WEBVTT";
const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// UTF-8 byte-order mark
    Bom,
    /// The `WEBVTT` signature keyword
    Webvtt,
    /// CR, LF or CRLF
    Newline,
    /// A run of spaces and tabs
    Whitespace,
    /// The chunk ended inside a token
    Unfinished,
    /// Bytes that start no token, or a token cut short by end of input
    BadToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Start,
    /// Matched this many bytes of the BOM
    Bom(u8),
    /// Matched this many bytes of `WEBVTT`
    Signature(u8),
    /// Saw CR, waiting to see if LF follows
    Cr,
}

/// Resumable lexer. Carries partial-token state between chunks.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    state: State,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a token is partially read.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.state != State::Start
    }

    /// Forget any partial token.
    pub fn reset(&mut self) {
        self.state = State::Start;
    }

    /// Read the next token from `input[*pos..]`, advancing `pos`.
    ///
    /// With `finished` set, the end of `input` is the end of the document:
    /// a held CR becomes a newline and any other partial token is bad.
    pub fn next(&mut self, input: &[u8], pos: &mut usize, finished: bool) -> Token {
        loop {
            let Some(&b) = input.get(*pos) else {
                return self.end_of_input(finished);
            };

            match self.state {
                State::Start => {
                    *pos += 1;
                    match b {
                        b'\n' => return Token::Newline,
                        b'\r' => self.state = State::Cr,
                        0xEF => self.state = State::Bom(1),
                        b'W' => self.state = State::Signature(1),
                        b' ' | b'\t' => {
                            while let Some(b' ' | b'\t') = input.get(*pos) {
                                *pos += 1;
                            }
                            return Token::Whitespace;
                        }
                        _ => return Token::BadToken,
                    }
                }
                State::Cr => {
                    if b == b'\n' {
                        *pos += 1;
                    }
                    self.state = State::Start;
                    return Token::Newline;
                }
                State::Bom(n) => {
                    if b != BOM[n as usize] {
                        self.state = State::Start;
                        return Token::BadToken;
                    }
                    *pos += 1;
                    if n as usize + 1 == BOM.len() {
                        self.state = State::Start;
                        return Token::Bom;
                    }
                    self.state = State::Bom(n + 1);
                }
                State::Signature(n) => {
                    if b != SIGNATURE[n as usize] {
                        self.state = State::Start;
                        return Token::BadToken;
                    }
                    *pos += 1;
                    if n as usize + 1 == SIGNATURE.len() {
                        self.state = State::Start;
                        return Token::Webvtt;
                    }
                    self.state = State::Signature(n + 1);
                }
            }
        }
    }

    fn end_of_input(&mut self, finished: bool) -> Token {
        if !finished {
            return Token::Unfinished;
        }
        let state = std::mem::take(&mut self.state);
        match state {
            State::Cr => Token::Newline,
            _ => Token::BadToken,
        }
    }
}
