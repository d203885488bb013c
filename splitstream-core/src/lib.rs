//! Splitstream Core
//!
//! Incremental splitter that cuts complete JSON, XML or UBJSON objects out of
//! a fragmented byte stream without parsing them into values.
//!
//! # Architecture
//!
//! - **splitter.rs** - Stream instance: feed/drain/close, ready queue
//! - **arena.rs** - Growable buffer for objects spanning feed calls
//! - **format.rs** - Format selection, automaton trait and dispatch
//! - **json.rs / xml.rs / ubjson.rs** - Per-format boundary automata
//! - **io.rs** - Blocking `Read` adapter
//! - **error.rs** - Error types

pub mod arena;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod json;
pub mod splitter;
pub mod ubjson;
pub mod xml;

pub use arena::ArenaBuffer;
pub use bytes::Bytes;
pub use config::SplitterConfig;
pub use error::{SplitError, SyntaxError, SyntaxErrorKind};
pub use format::{Format, UnknownFormat};
pub use io::{ReadError, ReadSplitter};
pub use splitter::{split_slice, FeedResult, Splitter, StreamState};
