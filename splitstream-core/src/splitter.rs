//! The splitter driver: one stream instance.
//!
//! Bytes are pushed through the format automaton a run at a time. Objects
//! that begin and end inside one chunk are cut straight out of the input;
//! only the head of an object still open at the end of a chunk is copied
//! into the arena.
//!
//! ```text
//!   Idle ──Start──▶ Accumulating ──End──▶ Idle ──...──▶ Closed
//!                        │
//!                        └──syntax / size / memory──▶ Faulted ──close──▶ Closed
//! ```

use std::collections::vec_deque::{self, VecDeque};

use bytes::Bytes;
use log::{debug, trace};

use crate::arena::ArenaBuffer;
use crate::config::SplitterConfig;
use crate::error::{SplitError, SyntaxError};
use crate::format::{Automaton, Finish, Format, Machine, Step};

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Between objects; nothing is buffered.
    Idle,
    /// The head of an object is held in the arena.
    Accumulating,
    /// A fatal error occurred; only `close` is accepted.
    Faulted,
    Closed,
}

/// Result of one `feed` call. A successful feed always consumes the whole
/// chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedResult {
    /// Objects waiting in the ready queue after this call
    pub objects_ready: usize,
}

#[derive(Debug)]
enum Phase {
    Open,
    Faulted(SplitError),
    Closed,
}

/// Splits one byte stream into complete objects.
///
/// Between top-level values the formats differ in what they tolerate. XML
/// skips stray text along with the prolog, comments and declarations. JSON
/// and UBJSON skip only whitespace (plus the JSON-seq record separator and
/// the UBJSON no-op `N`); any other byte there is a syntax error. Skipped
/// bytes are never buffered either way.
///
/// ```
/// use splitstream_core::{Format, Splitter};
///
/// let mut splitter = Splitter::open(Format::Json);
/// splitter.feed(br#"{"x":1}{"y"#).unwrap();
/// splitter.feed(br#"":2}"#).unwrap();
/// splitter.close().unwrap();
///
/// let objects: Vec<_> = splitter.drain().collect();
/// assert_eq!(objects, [&br#"{"x":1}"#[..], br#"{"y":2}"#]);
/// ```
#[derive(Debug)]
pub struct Splitter {
    config: SplitterConfig,
    machine: Machine,
    arena: ArenaBuffer,
    ready: VecDeque<Bytes>,
    /// The arena holds the head of the open object
    pending: bool,
    phase: Phase,
    /// Bytes consumed before the current chunk
    offset: u64,
    emitted: u64,
}

impl Splitter {
    /// Open a stream with default options.
    pub fn open(format: Format) -> Self {
        Self::with_config(SplitterConfig::new(format))
    }

    pub fn with_config(config: SplitterConfig) -> Self {
        debug!(
            "opening {} splitter (start depth {}, max object size {:?})",
            config.format, config.start_depth, config.max_object_size
        );
        Self {
            machine: Machine::new(&config),
            arena: ArenaBuffer::with_capacity_hint(config.initial_capacity),
            ready: VecDeque::new(),
            pending: false,
            phase: Phase::Open,
            offset: 0,
            emitted: 0,
            config,
        }
    }

    /// Feed a chunk. Completed objects are copied out of `chunk`.
    ///
    /// On error the stream is faulted. Objects completed earlier in the same
    /// chunk stay in the ready queue.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FeedResult, SplitError> {
        self.run(chunk, None)
    }

    /// Feed an owned chunk. Objects that begin and end inside it are
    /// returned as views of `chunk` without copying.
    pub fn feed_bytes(&mut self, chunk: Bytes) -> Result<FeedResult, SplitError> {
        self.run(&chunk, Some(&chunk))
    }

    fn run(&mut self, chunk: &[u8], source: Option<&Bytes>) -> Result<FeedResult, SplitError> {
        match &self.phase {
            Phase::Open => {}
            Phase::Faulted(err) => return Err(err.clone()),
            Phase::Closed => return Err(SplitError::Closed),
        }

        // Start of the open object within this chunk
        let mut seg = self.pending.then_some(0);
        let mut i = 0;
        while i < chunk.len() {
            // Never skip past the byte that would overflow the size limit
            let end = match (self.config.max_object_size, self.held(seg, i)) {
                (Some(limit), Some(held)) => chunk.len().min(i + limit.saturating_sub(held)),
                _ => chunk.len(),
            };
            i += self.machine.skip_run(&chunk[i..end]);
            if i >= chunk.len() {
                break;
            }
            match self.machine.step(chunk[i]) {
                Step::Continue => {
                    if let Some(size) = self.held(seg, i + 1) {
                        self.check_size(size)?;
                    }
                }
                Step::Start => {
                    seg = Some(i);
                    self.check_size(1)?;
                }
                Step::End => {
                    let start = seg.take().unwrap_or(i);
                    self.emit(chunk, source, start, i + 1)?;
                }
                Step::Whole => self.emit(chunk, source, i, i + 1)?,
                Step::EndBefore => {
                    let start = seg.take().unwrap_or(i);
                    self.emit(chunk, source, start, i)?;
                    // The automaton has not consumed this byte
                    continue;
                }
                Step::Abandon => {
                    seg = None;
                    if self.pending {
                        self.arena.reset();
                        self.pending = false;
                    }
                }
                Step::Error(kind) => {
                    let offset = self.offset + i as u64;
                    return Err(self.fault(SyntaxError { kind, offset }.into()));
                }
            }
            i += 1;
        }

        if let Some(start) = seg {
            self.buffer_tail(&chunk[start..])?;
        }
        self.offset += chunk.len() as u64;

        Ok(FeedResult {
            objects_ready: self.ready.len(),
        })
    }

    /// Bytes of the open object once `chunk[..i]` is consumed.
    fn held(&self, seg: Option<usize>, i: usize) -> Option<usize> {
        seg.map(|start| self.arena.len() + i - start)
    }

    /// Keep the head of an object that continues into the next chunk.
    fn buffer_tail(&mut self, tail: &[u8]) -> Result<(), SplitError> {
        let size = self.arena.len() + tail.len();
        self.check_size(size)?;
        if let Err(err) = self.arena.append(tail) {
            return Err(self.fault(err));
        }
        self.pending = true;
        Ok(())
    }

    fn emit(
        &mut self,
        chunk: &[u8],
        source: Option<&Bytes>,
        start: usize,
        end: usize,
    ) -> Result<(), SplitError> {
        let piece = &chunk[start..end];
        let object = if self.pending {
            self.check_size(self.arena.len() + piece.len())?;
            if let Err(err) = self.arena.append(piece) {
                return Err(self.fault(err));
            }
            self.pending = false;
            self.arena.take_all()
        } else {
            self.check_size(piece.len())?;
            match source {
                Some(bytes) => bytes.slice(start..end),
                None => Bytes::copy_from_slice(piece),
            }
        };
        self.push(object);
        Ok(())
    }

    fn push(&mut self, object: Bytes) {
        trace!(
            "{} object #{} ({} bytes) in chunk at offset {}",
            self.config.format,
            self.emitted,
            object.len(),
            self.offset
        );
        self.emitted += 1;
        self.ready.push_back(object);
    }

    fn check_size(&mut self, size: usize) -> Result<(), SplitError> {
        match self.config.max_object_size {
            Some(limit) if size > limit => Err(self.fault(SplitError::ObjectTooLarge { limit, size })),
            _ => Ok(()),
        }
    }

    /// Enter the faulted state and hand the error back for returning.
    fn fault(&mut self, err: SplitError) -> SplitError {
        debug!("{} splitter faulted: {}", self.config.format, err);
        self.arena.release();
        self.pending = false;
        self.phase = Phase::Faulted(err.clone());
        err
    }

    /// End the stream.
    ///
    /// A top-level JSON number still open is completed. Anything else still
    /// open is reported as `TruncatedStream` carrying the buffered bytes.
    /// That includes constructs that are never buffered, such as an open
    /// top-level XML comment or declaration, or an open wrapper above
    /// `start_depth`: these report `TruncatedStream` with an empty `partial`.
    /// Closing a faulted or closed stream succeeds; the fault has already
    /// been reported. Queued objects remain available to `drain`.
    pub fn close(&mut self) -> Result<(), SplitError> {
        match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Open => {}
            Phase::Faulted(_) | Phase::Closed => return Ok(()),
        }

        let result = match self.machine.finish() {
            Finish::Idle => Ok(()),
            Finish::Complete => {
                let size = self.arena.len();
                match self.config.max_object_size {
                    Some(limit) if size > limit => Err(SplitError::ObjectTooLarge { limit, size }),
                    _ => {
                        let object = self.arena.take_all();
                        self.push(object);
                        Ok(())
                    }
                }
            }
            Finish::Incomplete => Err(SplitError::TruncatedStream {
                partial: self.arena.take_all(),
            }),
        };
        self.pending = false;
        self.arena.release();

        match &result {
            Ok(()) => debug!(
                "closed {} splitter after {} objects, {} bytes",
                self.config.format, self.emitted, self.offset
            ),
            Err(err) => debug!("closed {} splitter: {}", self.config.format, err),
        }
        result
    }

    /// Remove and return all queued objects, oldest first.
    pub fn drain(&mut self) -> vec_deque::Drain<'_, Bytes> {
        self.ready.drain(..)
    }

    /// Remove and return the oldest queued object.
    pub fn pop(&mut self) -> Option<Bytes> {
        self.ready.pop_front()
    }

    /// Number of queued objects.
    pub fn ready(&self) -> usize {
        self.ready.len()
    }

    pub fn state(&self) -> StreamState {
        match self.phase {
            Phase::Open if self.pending => StreamState::Accumulating,
            Phase::Open => StreamState::Idle,
            Phase::Faulted(_) => StreamState::Faulted,
            Phase::Closed => StreamState::Closed,
        }
    }

    /// The error that faulted the stream, if any.
    pub fn fault_error(&self) -> Option<&SplitError> {
        match &self.phase {
            Phase::Faulted(err) => Some(err),
            _ => None,
        }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.machine.depth()
    }

    /// Total bytes consumed by successful `feed` calls.
    pub fn stream_offset(&self) -> u64 {
        self.offset
    }

    /// Bytes of the open object held in the arena.
    pub fn buffered(&self) -> usize {
        self.arena.len()
    }

    /// Objects emitted so far.
    pub fn objects_emitted(&self) -> u64 {
        self.emitted
    }

    pub fn format(&self) -> Format {
        self.config.format
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }
}

/// Split a complete input in one call.
///
/// ```
/// use splitstream_core::{split_slice, Format};
///
/// let objects = split_slice(Format::Xml, b"<?xml version='1.0'?><a/> <b>x</b>").unwrap();
/// assert_eq!(objects, [&b"<a/>"[..], b"<b>x</b>"]);
/// ```
pub fn split_slice(
    config: impl Into<SplitterConfig>,
    input: &[u8],
) -> Result<Vec<Bytes>, SplitError> {
    let mut splitter = Splitter::with_config(config.into());
    splitter.feed(input)?;
    splitter.close()?;
    Ok(splitter.drain().collect())
}
