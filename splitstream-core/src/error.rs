//! Error types for the stream splitter.
//!
//! Every fault is returned to the direct caller of `feed`/`close`. A syntax
//! error, an allocation failure, or a size-limit violation leaves the stream
//! faulted; later feeds return the same error again.

use bytes::Bytes;

/// Reason a byte was rejected by a format automaton.
///
/// A `Copy` enum keeps the per-byte hot path free of allocation; the
/// human-readable text lives in [`SyntaxErrorKind::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyntaxErrorKind {
    // ========== Shared ==========
    /// A byte that cannot start a value where a value is expected
    UnexpectedByte = 0,
    /// A closing token with no matching opener (depth would go negative)
    UnbalancedClose,
    /// A closing token of the wrong kind (`{` closed by `]`, ...)
    MismatchedClose,

    // ========== JSON ==========
    /// `:` missing between an object key and its value
    ExpectedColon,
    /// `,` or a closer missing after a container member
    ExpectedCommaOrClose,
    /// Object keys must be strings
    ExpectedKey,
    /// Unknown backslash escape inside a string
    InvalidEscape,
    /// `\u` not followed by four hex digits
    InvalidUnicodeEscape,
    /// Raw control byte inside a string
    ControlCharacter,
    /// Malformed number
    InvalidNumber,
    /// Misspelled `true`, `false` or `null`
    InvalidLiteral,

    // ========== XML ==========
    /// Byte not allowed in an element or attribute name
    InvalidName,
    /// End tag name differs from the open start tag
    MismatchedTag,
    /// Malformed attribute (missing `=`, unquoted value, `<` in value)
    InvalidAttribute,
    /// Malformed `<!...>` construct
    InvalidDeclaration,
    /// Unexpected byte inside a start or end tag
    InvalidTag,

    // ========== UBJSON ==========
    /// Byte is not a UBJSON type marker
    InvalidMarker,
    /// Length or count prefix is not an integer type
    InvalidLengthMarker,
    /// Length or count prefix is negative
    NegativeLength,
    /// `$` type not followed by a `#` count
    MissingCount,
    /// End marker inside a counted container
    PrematureEnd,
    /// Element of a strongly typed container sits at the split depth
    UntaggedElement,
}

impl SyntaxErrorKind {
    /// Get a human-readable message for this error kind.
    pub fn message(self) -> &'static str {
        match self {
            Self::UnexpectedByte => "unexpected byte",
            Self::UnbalancedClose => "closing delimiter without opener",
            Self::MismatchedClose => "mismatched closing delimiter",
            Self::ExpectedColon => "expected ':'",
            Self::ExpectedCommaOrClose => "expected ',' or closing delimiter",
            Self::ExpectedKey => "expected string key",
            Self::InvalidEscape => "invalid escape sequence",
            Self::InvalidUnicodeEscape => "invalid unicode escape",
            Self::ControlCharacter => "control character in string",
            Self::InvalidNumber => "invalid number",
            Self::InvalidLiteral => "invalid literal",
            Self::InvalidName => "invalid name",
            Self::MismatchedTag => "mismatched end tag",
            Self::InvalidAttribute => "invalid attribute",
            Self::InvalidDeclaration => "invalid declaration",
            Self::InvalidTag => "invalid tag",
            Self::InvalidMarker => "invalid type marker",
            Self::InvalidLengthMarker => "invalid length marker",
            Self::NegativeLength => "negative length",
            Self::MissingCount => "typed container without count",
            Self::PrematureEnd => "end marker in counted container",
            Self::UntaggedElement => "untagged element at split depth",
        }
    }
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A syntax error with the absolute stream offset of the offending byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {offset}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub offset: u64,
}

/// Errors surfaced by [`Splitter`](crate::Splitter).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    /// Malformed input for the selected format. Terminal.
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// The arena could not grow. Terminal.
    #[error("out of memory growing object buffer by {requested} bytes")]
    OutOfMemory { requested: usize },

    /// A single object exceeded the configured size limit. Terminal.
    #[error("object of {size} bytes exceeds limit of {limit} bytes")]
    ObjectTooLarge { limit: usize, size: usize },

    /// The stream was closed with an unterminated object pending.
    #[error("stream ended inside an object ({} bytes buffered)", partial.len())]
    TruncatedStream { partial: Bytes },

    /// `feed` called after `close`.
    #[error("stream is closed")]
    Closed,
}

impl SplitError {
    /// Whether this error leaves the stream unusable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TruncatedStream { .. })
    }

    /// The syntax error kind, if this is a syntax error.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Self::Syntax(e) => Some(e.kind),
            _ => None,
        }
    }
}
