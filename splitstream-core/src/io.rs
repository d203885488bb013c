//! Blocking reader adapter.
//!
//! [`ReadSplitter`] pulls chunks from any [`Read`] source and yields objects
//! as they complete. Reads land in a shared [`BytesMut`] and are split off
//! as frozen chunks, so objects that fit inside one read are handed out
//! without copying and small reads do not each pin a full-sized buffer.

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};
use log::debug;

use crate::config::SplitterConfig;
use crate::error::SplitError;
use crate::splitter::Splitter;

/// Default bytes requested per read.
pub const DEFAULT_READ_SIZE: usize = 64 * 1024;

/// Smallest leftover of the read allocation still worth reading into.
const MIN_READ_SIZE: usize = 4096;

/// Error from [`ReadSplitter`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Split(#[from] SplitError),
}

impl ReadError {
    pub fn as_split(&self) -> Option<&SplitError> {
        match self {
            Self::Split(err) => Some(err),
            Self::Io(_) => None,
        }
    }
}

/// Iterator over the objects of a reader.
///
/// Reading stops at the first error, which is yielded after every object
/// completed before it. At end of input the splitter is closed, so an
/// unterminated trailing object surfaces as `TruncatedStream`.
///
/// ```
/// use splitstream_core::{Format, ReadSplitter};
///
/// let input: &[u8] = b"[1] [2]\n[3]";
/// let objects: Vec<_> = ReadSplitter::new(input, Format::Json)
///     .with_read_size(2)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(objects, [&b"[1]"[..], b"[2]", b"[3]"]);
/// ```
#[derive(Debug)]
pub struct ReadSplitter<R> {
    reader: R,
    splitter: Splitter,
    read_size: usize,
    /// Bytes logically preceding the reader's content
    preamble: Option<Bytes>,
    /// Unused tail of the current read allocation
    buf: BytesMut,
    /// Error held back until the queue is drained
    deferred: Option<ReadError>,
    done: bool,
}

impl<R: Read> ReadSplitter<R> {
    pub fn new(reader: R, config: impl Into<SplitterConfig>) -> Self {
        Self::from_splitter(reader, Splitter::with_config(config.into()))
    }

    /// Drive an existing, open splitter.
    pub fn from_splitter(reader: R, splitter: Splitter) -> Self {
        Self {
            reader,
            splitter,
            read_size: DEFAULT_READ_SIZE,
            preamble: None,
            buf: BytesMut::new(),
            deferred: None,
            done: false,
        }
    }

    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size.max(1);
        self
    }

    /// Feed `preamble` before anything read from the source.
    pub fn with_preamble(mut self, preamble: impl Into<Bytes>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read and feed one chunk, closing the splitter at end of input.
    fn fill(&mut self) -> Result<(), ReadError> {
        if let Some(preamble) = self.preamble.take() {
            self.splitter.feed_bytes(preamble)?;
            return Ok(());
        }

        // Successive reads share one allocation until little of it is left
        if self.buf.capacity() < self.read_size.min(MIN_READ_SIZE) {
            self.buf.reserve(self.read_size);
        }
        let len = self.buf.capacity().min(self.read_size);
        self.buf.resize(len, 0);
        let n = loop {
            match self.reader.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        self.buf.truncate(n);
        if n == 0 {
            debug!("end of input after {} bytes", self.splitter.stream_offset());
            self.done = true;
            self.splitter.close()?;
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.splitter.feed_bytes(chunk)?;
        Ok(())
    }
}

impl<R: Read> Iterator for ReadSplitter<R> {
    type Item = Result<Bytes, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.splitter.pop() {
                return Some(Ok(object));
            }
            if let Some(err) = self.deferred.take() {
                self.done = true;
                return Some(Err(err));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.fill() {
                self.deferred = Some(err);
            }
        }
    }
}
