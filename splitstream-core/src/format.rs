//! Format selection and the per-byte automaton contract.
//!
//! Each format is a byte-at-a-time state machine. The splitter pushes bytes
//! through it and reacts to the returned [`Step`]:
//!
//! ```text
//!   bytes ──▶ skip_run() ──▶ step(byte) ──▶ Step ──▶ splitter
//!              (bulk)        (one byte)       │
//!                                             ├─ Start / End / Whole: object boundary
//!                                             ├─ EndBefore: boundary, re-feed byte
//!                                             ├─ Abandon: tentative start was not an object
//!                                             └─ Error: terminal
//! ```
//!
//! Automata know nothing about buffers or I/O; the splitter knows nothing
//! about grammar.

use std::fmt;
use std::str::FromStr;

use crate::config::SplitterConfig;
use crate::error::SyntaxErrorKind;
use crate::json::JsonMachine;
use crate::ubjson::UbjsonMachine;
use crate::xml::XmlMachine;

/// Serialization format of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    #[default]
    Json,
    Xml,
    Ubjson,
}

impl Format {
    /// Lowercase name, as accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
            Self::Ubjson => "ubjson",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing an unknown format name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format {0:?} (expected json, xml or ubjson)")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" | "xmlrpc" | "xml-rpc" => Ok(Self::Xml),
            "ubjson" => Ok(Self::Ubjson),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// Result of feeding one byte to an automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No boundary change. The byte belongs to the current object if one is
    /// open, and is skipped otherwise.
    Continue,
    /// The byte is the first byte of an object.
    Start,
    /// The byte is the last byte of the open object.
    End,
    /// The byte is a complete object on its own.
    Whole,
    /// The open object ended just before this byte. The automaton has left
    /// the object's state without consuming the byte; feed it again.
    EndBefore,
    /// The byte shows that the tentative object opened by the last `Start`
    /// is not an object after all. Drop it; the byte is skipped.
    Abandon,
    /// Malformed input.
    Error(SyntaxErrorKind),
}

/// What remains when the input ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// Nothing open.
    Idle,
    /// The open object is complete at end of input (a bare JSON number).
    Complete,
    /// Something is still open.
    Incomplete,
}

/// A byte-at-a-time boundary detector for one format.
pub trait Automaton {
    /// Consume one byte.
    fn step(&mut self, byte: u8) -> Step;

    /// Number of leading bytes of `input` that would each yield
    /// `Step::Continue` without changing the boundary state. The caller
    /// advances past them without calling `step`.
    fn skip_run(&mut self, input: &[u8]) -> usize;

    /// Report what is left open at end of input.
    fn finish(&mut self) -> Finish;

    /// Current nesting depth (open containers or elements).
    fn depth(&self) -> usize;
}

/// Enum dispatch over the three formats.
#[derive(Debug, Clone)]
pub enum Machine {
    Json(JsonMachine),
    Xml(XmlMachine),
    Ubjson(UbjsonMachine),
}

impl Machine {
    /// Create the automaton for a configuration.
    pub fn new(config: &SplitterConfig) -> Self {
        match config.format {
            Format::Json => Self::Json(JsonMachine::new(config.start_depth)),
            Format::Xml => Self::Xml(XmlMachine::new(config.start_depth)),
            Format::Ubjson => Self::Ubjson(UbjsonMachine::new(config.start_depth)),
        }
    }
}

impl Automaton for Machine {
    #[inline]
    fn step(&mut self, byte: u8) -> Step {
        match self {
            Self::Json(m) => m.step(byte),
            Self::Xml(m) => m.step(byte),
            Self::Ubjson(m) => m.step(byte),
        }
    }

    #[inline]
    fn skip_run(&mut self, input: &[u8]) -> usize {
        match self {
            Self::Json(m) => m.skip_run(input),
            Self::Xml(m) => m.skip_run(input),
            Self::Ubjson(m) => m.skip_run(input),
        }
    }

    fn finish(&mut self) -> Finish {
        match self {
            Self::Json(m) => m.finish(),
            Self::Xml(m) => m.finish(),
            Self::Ubjson(m) => m.finish(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Self::Json(m) => m.depth(),
            Self::Xml(m) => m.depth(),
            Self::Ubjson(m) => m.depth(),
        }
    }
}
