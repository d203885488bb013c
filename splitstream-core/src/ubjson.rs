//! UBJSON (Draft 12) boundary automaton.
//!
//! UBJSON is length/type prefixed, so most of the work is counting: scalar
//! payloads have a size fixed by their marker, strings and high-precision
//! numbers carry an integer length, and containers either end with an
//! explicit `]`/`}` or declare a `#` count (optionally with a `$` element
//! type, in which case elements carry no marker of their own).
//!
//! Counted containers close on their last element, so one byte may finish
//! several nested values at once.

use phf::phf_map;

use crate::error::SyntaxErrorKind;
use crate::format::{Automaton, Finish, Step};

/// How a type marker is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// No-op, ignored where a marker is read
    NoOp,
    /// Fixed payload size after the marker (0 for null/true/false)
    Fixed(u8),
    /// Integer length prefix, then that many bytes (`S`, `H`)
    Sized,
    Array,
    Object,
}

static MARKERS: phf::Map<u8, Marker> = phf_map! {
    b'N' => Marker::NoOp,
    b'Z' => Marker::Fixed(0),
    b'T' => Marker::Fixed(0),
    b'F' => Marker::Fixed(0),
    b'i' => Marker::Fixed(1),
    b'U' => Marker::Fixed(1),
    b'C' => Marker::Fixed(1),
    b'I' => Marker::Fixed(2),
    b'l' => Marker::Fixed(4),
    b'd' => Marker::Fixed(4),
    b'L' => Marker::Fixed(8),
    b'D' => Marker::Fixed(8),
    b'S' => Marker::Sized,
    b'H' => Marker::Sized,
    b'[' => Marker::Array,
    b'{' => Marker::Object,
};

const SIGNED: u8 = 0x80;

/// Integer markers usable for lengths and counts: (size, signed).
fn length_marker(b: u8) -> Option<(u8, bool)> {
    match b {
        b'i' => Some((1, true)),
        b'U' => Some((1, false)),
        b'I' => Some((2, true)),
        b'l' => Some((4, true)),
        b'L' => Some((8, true)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Array,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    kind: Kind,
    /// Element type from `$`
    typed: Option<u8>,
    /// Elements (pairs, for objects) still expected after `#`
    remaining: Option<u64>,
    /// Objects only: the next item is a key
    at_key: bool,
}

/// What a length prefix introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Then {
    Body,
    Key,
    Count,
}

/// Outcome of beginning a value.
enum Begin {
    /// More bytes follow
    Pending,
    /// The value has no payload and is already complete
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    /// Expecting a type marker, an end marker, or (in objects) a key length
    Marker,
    Payload { remaining: u64, key: bool },
    LengthMarker(Then),
    LengthBytes { then: Then, need: u8, have: u8, value: u64 },
    /// Right after `[` or `{`
    Header,
    /// After `$`
    HeaderType,
    /// After the `$` type, `#` must follow
    HeaderCount,
}

/// Incremental UBJSON boundary detector.
#[derive(Debug, Clone)]
pub struct UbjsonMachine {
    stack: Vec<Frame>,
    lex: Lex,
    /// Depth at which values are reported as objects
    split_depth: usize,
}

impl UbjsonMachine {
    pub fn new(split_depth: usize) -> Self {
        Self {
            stack: Vec::with_capacity(32),
            lex: Lex::Marker,
            split_depth,
        }
    }

    /// Set up the value introduced by type marker `b`.
    fn begin(&mut self, b: u8) -> Result<Begin, SyntaxErrorKind> {
        let Some(&marker) = MARKERS.get(&b) else {
            return Err(SyntaxErrorKind::InvalidMarker);
        };
        match marker {
            Marker::NoOp => return Err(SyntaxErrorKind::InvalidMarker),
            Marker::Fixed(0) => return Ok(Begin::Done),
            Marker::Fixed(n) => {
                self.lex = Lex::Payload {
                    remaining: u64::from(n),
                    key: false,
                }
            }
            Marker::Sized => self.lex = Lex::LengthMarker(Then::Body),
            Marker::Array | Marker::Object => {
                let kind = if marker == Marker::Array {
                    Kind::Array
                } else {
                    Kind::Object
                };
                self.stack.push(Frame {
                    kind,
                    typed: None,
                    remaining: None,
                    at_key: kind == Kind::Object,
                });
                self.lex = Lex::Header;
            }
        }
        Ok(Begin::Pending)
    }

    /// A value at the current depth completed; account for it in the
    /// parent. Returns true if it is a reported object.
    fn account(&mut self) -> bool {
        let emitted = self.stack.len() == self.split_depth;
        if let Some(frame) = self.stack.last_mut() {
            if frame.kind == Kind::Object {
                frame.at_key = true;
            }
            if let Some(n) = frame.remaining.as_mut() {
                *n = n.saturating_sub(1);
            }
        }
        emitted
    }

    /// Position on the next item of the innermost container, closing
    /// counted containers that are full and consuming payload-free typed
    /// elements. Returns true if a reported object completed on the way.
    fn advance(&mut self) -> Result<bool, SyntaxErrorKind> {
        let mut emitted = false;
        loop {
            let Some(frame) = self.stack.last().copied() else {
                self.lex = Lex::Marker;
                return Ok(emitted);
            };
            if frame.remaining == Some(0) {
                self.stack.pop();
                emitted |= self.account();
                continue;
            }
            let typed = match frame.typed {
                Some(t) if !(frame.kind == Kind::Object && frame.at_key) => t,
                _ => {
                    self.lex = Lex::Marker;
                    return Ok(emitted);
                }
            };
            if self.stack.len() == self.split_depth {
                return Err(SyntaxErrorKind::UntaggedElement);
            }
            if frame.kind == Kind::Array && MARKERS.get(&typed) == Some(&Marker::Fixed(0)) {
                // Every element is the bare type; the whole count is already here.
                if let Some(last) = self.stack.last_mut() {
                    last.remaining = Some(0);
                }
                continue;
            }
            match self.begin(typed)? {
                Begin::Pending => return Ok(emitted),
                Begin::Done => emitted |= self.account(),
            }
        }
    }

    /// A value finished on this byte.
    fn value_done(&mut self) -> Step {
        let emitted = self.account();
        self.resume(emitted)
    }

    fn resume(&mut self, emitted: bool) -> Step {
        match self.advance() {
            Ok(more) if emitted || more => Step::End,
            Ok(_) => Step::Continue,
            Err(kind) => Step::Error(kind),
        }
    }

    fn close(&mut self, b: u8) -> Step {
        let Some(frame) = self.stack.last() else {
            return Step::Error(SyntaxErrorKind::UnbalancedClose);
        };
        if frame.remaining.is_some() {
            return Step::Error(SyntaxErrorKind::PrematureEnd);
        }
        let expected = match frame.kind {
            Kind::Array => b']',
            Kind::Object => b'}',
        };
        if b != expected {
            return Step::Error(SyntaxErrorKind::MismatchedClose);
        }
        if frame.kind == Kind::Object && !frame.at_key {
            // Key without a value
            return Step::Error(SyntaxErrorKind::UnexpectedByte);
        }
        self.stack.pop();
        self.value_done()
    }

    fn marker(&mut self, b: u8) -> Step {
        let at_key = matches!(
            self.stack.last(),
            Some(Frame { kind: Kind::Object, at_key: true, .. })
        );
        match b {
            b']' | b'}' => return self.close(b),
            b'N' if !at_key => return Step::Continue,
            b' ' | b'\t' | b'\r' | b'\n' if self.stack.is_empty() => return Step::Continue,
            _ => {}
        }
        if at_key {
            return match length_marker(b) {
                Some((need, signed)) => self.length_start(Then::Key, need, signed),
                None => Step::Error(SyntaxErrorKind::InvalidLengthMarker),
            };
        }
        let at_split = self.stack.len() == self.split_depth;
        match self.begin(b) {
            Err(kind) => Step::Error(kind),
            Ok(Begin::Pending) if at_split => Step::Start,
            Ok(Begin::Pending) => Step::Continue,
            Ok(Begin::Done) => match self.value_done() {
                Step::End if at_split => Step::Whole,
                step => step,
            },
        }
    }

    /// `need` carries the byte count in its low bits and signedness in
    /// `SIGNED`; only the first byte of a signed length can be negative.
    fn length_start(&mut self, then: Then, need: u8, signed: bool) -> Step {
        let need = if signed { need | SIGNED } else { need };
        self.lex = Lex::LengthBytes {
            then,
            need,
            have: 0,
            value: 0,
        };
        Step::Continue
    }

    fn length_byte(&mut self, then: Then, need: u8, have: u8, value: u64, b: u8) -> Step {
        if need & SIGNED != 0 && have == 0 && b & 0x80 != 0 {
            return Step::Error(SyntaxErrorKind::NegativeLength);
        }
        let value = (value << 8) | u64::from(b);
        let have = have + 1;
        if have < need & !SIGNED {
            self.lex = Lex::LengthBytes { then, need, have, value };
            return Step::Continue;
        }
        self.length_done(then, value)
    }

    fn length_done(&mut self, then: Then, len: u64) -> Step {
        match then {
            Then::Body if len == 0 => self.value_done(),
            Then::Body => {
                self.lex = Lex::Payload { remaining: len, key: false };
                Step::Continue
            }
            Then::Key if len == 0 => self.key_done(),
            Then::Key => {
                self.lex = Lex::Payload { remaining: len, key: true };
                Step::Continue
            }
            Then::Count => {
                if let Some(frame) = self.stack.last_mut() {
                    frame.remaining = Some(len);
                }
                self.resume(false)
            }
        }
    }

    fn key_done(&mut self) -> Step {
        if let Some(frame) = self.stack.last_mut() {
            frame.at_key = false;
        }
        self.resume(false)
    }
}

impl Default for UbjsonMachine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Automaton for UbjsonMachine {
    fn step(&mut self, b: u8) -> Step {
        match self.lex {
            Lex::Marker => self.marker(b),
            Lex::Payload { remaining, key } => {
                if remaining > 1 {
                    self.lex = Lex::Payload {
                        remaining: remaining - 1,
                        key,
                    };
                    Step::Continue
                } else if key {
                    self.key_done()
                } else {
                    self.value_done()
                }
            }
            Lex::LengthMarker(then) => match length_marker(b) {
                Some((need, signed)) => self.length_start(then, need, signed),
                None => Step::Error(SyntaxErrorKind::InvalidLengthMarker),
            },
            Lex::LengthBytes {
                then,
                need,
                have,
                value,
            } => self.length_byte(then, need, have, value, b),
            Lex::Header => match b {
                b'$' => {
                    self.lex = Lex::HeaderType;
                    Step::Continue
                }
                b'#' => {
                    self.lex = Lex::LengthMarker(Then::Count);
                    Step::Continue
                }
                _ => {
                    self.lex = Lex::Marker;
                    self.marker(b)
                }
            },
            Lex::HeaderType => match MARKERS.get(&b) {
                Some(Marker::NoOp) | None => Step::Error(SyntaxErrorKind::InvalidMarker),
                Some(_) => {
                    if let Some(frame) = self.stack.last_mut() {
                        frame.typed = Some(b);
                    }
                    self.lex = Lex::HeaderCount;
                    Step::Continue
                }
            },
            Lex::HeaderCount => match b {
                b'#' => {
                    self.lex = Lex::LengthMarker(Then::Count);
                    Step::Continue
                }
                _ => Step::Error(SyntaxErrorKind::MissingCount),
            },
        }
    }

    fn skip_run(&mut self, input: &[u8]) -> usize {
        match self.lex {
            // The last payload byte may finish a value; leave it to `step`.
            Lex::Payload { remaining, key } => {
                let run = usize::try_from(remaining.saturating_sub(1))
                    .map_or(input.len(), |run| run.min(input.len()));
                self.lex = Lex::Payload {
                    remaining: remaining - run as u64,
                    key,
                };
                run
            }
            _ => 0,
        }
    }

    fn finish(&mut self) -> Finish {
        if self.stack.is_empty() && self.lex == Lex::Marker {
            Finish::Idle
        } else {
            Finish::Incomplete
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}
