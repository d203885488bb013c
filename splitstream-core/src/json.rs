//! JSON boundary automaton.
//!
//! Tracks the container stack and what may come next (key, colon, value,
//! comma) so that separators are checked, not just brackets counted.
//! Inside a string only `"`, `\` and raw control bytes matter.
//!
//! Numbers have no terminator of their own: a number ends at the first
//! delimiter byte, which is reported as [`Step::EndBefore`] and fed again.

use crate::error::SyntaxErrorKind;
use crate::format::{Automaton, Finish, Step};

// Byte classes for the hot loops.
const WS: u8 = 1 << 0;
const DELIM: u8 = 1 << 1;
const STR_STOP: u8 = 1 << 2;
const DIGIT: u8 = 1 << 3;
const HEX: u8 = 1 << 4;

/// JSON-seq (RFC 7464) record separator, skipped between top-level values.
const RS: u8 = 0x1E;

static CLASS: [u8; 256] = build_class_table();

const fn build_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        let mut class = 0;
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
            class |= WS | DELIM;
        }
        if matches!(b, b',' | b']' | b'}' | b'[' | b'{' | b'"' | b':' | RS) {
            class |= DELIM;
        }
        if b < 0x20 || b == b'"' || b == b'\\' {
            class |= STR_STOP;
        }
        if b.is_ascii_digit() {
            class |= DIGIT | HEX;
        }
        if matches!(b, b'a'..=b'f' | b'A'..=b'F') {
            class |= HEX;
        }
        table[i] = class;
        i += 1;
    }
    table
}

#[inline]
fn is(b: u8, class: u8) -> bool {
    CLASS[b as usize] & class != 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the grammar allows next in structural mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Top level, after `:`, or after `,` in an array
    Value,
    /// Right after `[`
    ValueOrClose,
    /// Right after `{`
    KeyOrClose,
    /// After `,` in an object
    Key,
    /// After an object key
    Colon,
    /// After a member value
    CommaOrClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Number {
    Minus,
    Zero,
    Integer,
    Dot,
    Fraction,
    Exponent,
    ExponentSign,
    ExponentDigits,
}

impl Number {
    /// Whether a number may end in this phase.
    fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Zero | Self::Integer | Self::Fraction | Self::ExponentDigits
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    Structural,
    String { key: bool },
    Escape { key: bool },
    Unicode { key: bool, remaining: u8 },
    Number(Number),
    Literal { word: &'static [u8], matched: u8 },
}

/// Incremental JSON boundary detector.
#[derive(Debug, Clone)]
pub struct JsonMachine {
    stack: Vec<Container>,
    expect: Expect,
    lex: Lex,
    /// Depth at which values are reported as objects
    split_depth: usize,
}

impl JsonMachine {
    pub fn new(split_depth: usize) -> Self {
        Self {
            stack: Vec::with_capacity(32),
            expect: Expect::Value,
            lex: Lex::Structural,
            split_depth,
        }
    }

    /// A value just finished at the current depth. Returns true if it is
    /// a reported object.
    #[inline]
    fn complete_value(&mut self) -> bool {
        self.expect = if self.stack.is_empty() {
            Expect::Value
        } else {
            Expect::CommaOrClose
        };
        self.stack.len() == self.split_depth
    }

    #[inline]
    fn boundary(&mut self) -> Step {
        if self.complete_value() {
            Step::End
        } else {
            Step::Continue
        }
    }

    fn begin_value(&mut self, b: u8) -> Step {
        let at_split = self.stack.len() == self.split_depth;
        match b {
            b'{' => {
                self.stack.push(Container::Object);
                self.expect = Expect::KeyOrClose;
            }
            b'[' => {
                self.stack.push(Container::Array);
                self.expect = Expect::ValueOrClose;
            }
            b'"' => self.lex = Lex::String { key: false },
            b'-' => self.lex = Lex::Number(Number::Minus),
            b'0' => self.lex = Lex::Number(Number::Zero),
            b'1'..=b'9' => self.lex = Lex::Number(Number::Integer),
            b't' => self.lex = Lex::Literal { word: b"true", matched: 1 },
            b'f' => self.lex = Lex::Literal { word: b"false", matched: 1 },
            b'n' => self.lex = Lex::Literal { word: b"null", matched: 1 },
            b'}' | b']' if self.stack.is_empty() => {
                return Step::Error(SyntaxErrorKind::UnbalancedClose)
            }
            _ => return Step::Error(SyntaxErrorKind::UnexpectedByte),
        }
        if at_split {
            Step::Start
        } else {
            Step::Continue
        }
    }

    fn close(&mut self, kind: Container) -> Step {
        match self.stack.pop() {
            None => Step::Error(SyntaxErrorKind::UnbalancedClose),
            Some(open) if open != kind => Step::Error(SyntaxErrorKind::MismatchedClose),
            Some(_) => self.boundary(),
        }
    }

    fn structural(&mut self, b: u8) -> Step {
        if is(b, WS) {
            return Step::Continue;
        }
        match self.expect {
            Expect::Value => {
                if b == RS && self.stack.is_empty() {
                    Step::Continue
                } else {
                    self.begin_value(b)
                }
            }
            Expect::ValueOrClose => match b {
                b']' => self.close(Container::Array),
                b'}' => self.close(Container::Object),
                _ => self.begin_value(b),
            },
            Expect::KeyOrClose => match b {
                b'}' => self.close(Container::Object),
                b']' => self.close(Container::Array),
                b'"' => {
                    self.lex = Lex::String { key: true };
                    Step::Continue
                }
                _ => Step::Error(SyntaxErrorKind::ExpectedKey),
            },
            Expect::Key => match b {
                b'"' => {
                    self.lex = Lex::String { key: true };
                    Step::Continue
                }
                _ => Step::Error(SyntaxErrorKind::ExpectedKey),
            },
            Expect::Colon => match b {
                b':' => {
                    self.expect = Expect::Value;
                    Step::Continue
                }
                _ => Step::Error(SyntaxErrorKind::ExpectedColon),
            },
            Expect::CommaOrClose => match b {
                b',' => {
                    self.expect = match self.stack.last() {
                        Some(Container::Object) => Expect::Key,
                        _ => Expect::Value,
                    };
                    Step::Continue
                }
                b']' => self.close(Container::Array),
                b'}' => self.close(Container::Object),
                _ => Step::Error(SyntaxErrorKind::ExpectedCommaOrClose),
            },
        }
    }

    fn number(&mut self, phase: Number, b: u8) -> Step {
        let next = match (phase, b) {
            (Number::Minus, b'0') => Number::Zero,
            (Number::Minus, b'1'..=b'9') => Number::Integer,
            (Number::Zero, b'0'..=b'9') => return Step::Error(SyntaxErrorKind::InvalidNumber),
            (Number::Integer, b'0'..=b'9') => Number::Integer,
            (Number::Zero | Number::Integer, b'.') => Number::Dot,
            (Number::Dot | Number::Fraction, b'0'..=b'9') => Number::Fraction,
            (Number::Zero | Number::Integer | Number::Fraction, b'e' | b'E') => Number::Exponent,
            (Number::Exponent, b'+' | b'-') => Number::ExponentSign,
            (Number::Exponent | Number::ExponentSign | Number::ExponentDigits, b'0'..=b'9') => {
                Number::ExponentDigits
            }
            (phase, b) if phase.is_terminal() && is(b, DELIM) => {
                self.lex = Lex::Structural;
                return if self.complete_value() {
                    Step::EndBefore
                } else {
                    self.structural(b)
                };
            }
            _ => return Step::Error(SyntaxErrorKind::InvalidNumber),
        };
        self.lex = Lex::Number(next);
        Step::Continue
    }
}

impl Default for JsonMachine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Automaton for JsonMachine {
    fn step(&mut self, b: u8) -> Step {
        match self.lex {
            Lex::Structural => self.structural(b),
            Lex::String { key } => match b {
                b'"' => {
                    self.lex = Lex::Structural;
                    if key {
                        self.expect = Expect::Colon;
                        Step::Continue
                    } else {
                        self.boundary()
                    }
                }
                b'\\' => {
                    self.lex = Lex::Escape { key };
                    Step::Continue
                }
                0x00..=0x1F => Step::Error(SyntaxErrorKind::ControlCharacter),
                _ => Step::Continue,
            },
            Lex::Escape { key } => {
                self.lex = match b {
                    b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => Lex::String { key },
                    b'u' => Lex::Unicode { key, remaining: 4 },
                    _ => return Step::Error(SyntaxErrorKind::InvalidEscape),
                };
                Step::Continue
            }
            Lex::Unicode { key, remaining } => {
                if !is(b, HEX) {
                    return Step::Error(SyntaxErrorKind::InvalidUnicodeEscape);
                }
                self.lex = if remaining == 1 {
                    Lex::String { key }
                } else {
                    Lex::Unicode { key, remaining: remaining - 1 }
                };
                Step::Continue
            }
            Lex::Number(phase) => self.number(phase, b),
            Lex::Literal { word, matched } => {
                if word[matched as usize] != b {
                    return Step::Error(SyntaxErrorKind::InvalidLiteral);
                }
                let matched = matched + 1;
                if matched as usize == word.len() {
                    self.lex = Lex::Structural;
                    self.boundary()
                } else {
                    self.lex = Lex::Literal { word, matched };
                    Step::Continue
                }
            }
        }
    }

    fn skip_run(&mut self, input: &[u8]) -> usize {
        let stop = match self.lex {
            Lex::String { .. } => input.iter().position(|&b| is(b, STR_STOP)),
            Lex::Structural => input.iter().position(|&b| !is(b, WS)),
            Lex::Number(Number::Integer | Number::Fraction | Number::ExponentDigits) => {
                input.iter().position(|&b| !is(b, DIGIT))
            }
            _ => Some(0),
        };
        stop.unwrap_or(input.len())
    }

    fn finish(&mut self) -> Finish {
        match self.lex {
            Lex::Number(phase) if phase.is_terminal() && self.stack.is_empty() => {
                self.lex = Lex::Structural;
                if self.complete_value() {
                    Finish::Complete
                } else {
                    Finish::Idle
                }
            }
            Lex::Structural if self.stack.is_empty() => Finish::Idle,
            _ => Finish::Incomplete,
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}
