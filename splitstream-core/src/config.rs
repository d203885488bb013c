//! Splitter configuration.

use crate::arena::DEFAULT_CAPACITY;
use crate::format::Format;

/// Options for a [`Splitter`](crate::Splitter).
///
/// ```
/// use splitstream_core::{Format, SplitterConfig};
///
/// let config = SplitterConfig::new(Format::Json)
///     .with_start_depth(1)
///     .with_max_object_size(1 << 20);
/// assert_eq!(config.start_depth, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SplitterConfig {
    pub format: Format,
    /// Nesting depth whose values are reported as objects. At 0 each
    /// top-level document is an object; at 1 the elements of a top-level
    /// wrapper are, and the wrapper itself is never reported.
    pub start_depth: usize,
    /// Largest object, in bytes, before the stream faults with
    /// `ObjectTooLarge`. `None` means unbounded.
    pub max_object_size: Option<usize>,
    /// Arena capacity reserved when the first partial object is buffered.
    pub initial_capacity: usize,
}

impl SplitterConfig {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            start_depth: 0,
            max_object_size: None,
            initial_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn with_start_depth(mut self, depth: usize) -> Self {
        self.start_depth = depth;
        self
    }

    pub fn with_max_object_size(mut self, limit: usize) -> Self {
        self.max_object_size = Some(limit);
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self::new(Format::default())
    }
}

impl From<Format> for SplitterConfig {
    fn from(format: Format) -> Self {
        Self::new(format)
    }
}
