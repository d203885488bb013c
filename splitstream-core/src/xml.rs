//! XML boundary automaton.
//!
//! Elements nest by name: open tag names are kept on a stack (one shared
//! byte buffer plus start offsets, so deep documents do not allocate per
//! element) and every end tag is matched against the top byte by byte.
//!
//! Comments, CDATA sections, processing instructions and quoted attribute
//! values are opaque: only their own terminator is significant.
//!
//! At the split depth a `<` might open an element or a comment, PI, or end
//! tag of the wrapper. The `<` is reported as a tentative [`Step::Start`],
//! and the next byte either confirms it or yields [`Step::Abandon`].

use memchr::{memchr, memchr2};

use crate::error::SyntaxErrorKind;
use crate::format::{Automaton, Finish, Step};

const NAME_START: u8 = 1 << 0;
const NAME_CHAR: u8 = 1 << 1;
const WS: u8 = 1 << 2;

static CLASS: [u8; 256] = build_class_table();

const fn build_class_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        let mut class = 0;
        // Non-ASCII bytes are accepted in names without decoding.
        if b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80 {
            class |= NAME_START | NAME_CHAR;
        }
        if b.is_ascii_digit() || b == b'-' || b == b'.' {
            class |= NAME_CHAR;
        }
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
            class |= WS;
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

const CDATA_OPEN: &[u8] = b"CDATA[";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lex {
    /// Character data, or anything between elements at the wrapper level
    Text,
    /// After `<`
    Open,
    StartName,
    /// Inside a start tag, between attributes
    TagSpace,
    AttrName,
    /// After an attribute name, before `=`
    AttrEq,
    /// After `=`, before the opening quote
    AttrQuote,
    AttrValue(u8),
    /// After a closing quote: whitespace, `/` or `>` must follow
    AttrDone,
    /// After `/` in a start tag
    EmptyTag,
    EndName { matched: usize },
    EndSpace,
    /// After `<!`
    Bang,
    /// After `<!-`
    CommentOpen,
    Comment,
    CommentDash,
    CommentDashDash,
    CDataOpen { matched: u8 },
    CData,
    CDataBracket,
    CDataBracketBracket,
    Pi,
    PiQuestion,
    Doctype { subset: bool, quote: Option<u8> },
}

/// Incremental XML boundary detector.
#[derive(Debug, Clone)]
pub struct XmlMachine {
    /// Concatenated names of open elements
    names: Vec<u8>,
    /// Offset of each open element's name in `names`
    bounds: Vec<usize>,
    lex: Lex,
    /// Depth at which elements are reported as objects
    split_depth: usize,
}

impl XmlMachine {
    pub fn new(split_depth: usize) -> Self {
        Self {
            names: Vec::with_capacity(256),
            bounds: Vec::with_capacity(32),
            lex: Lex::Text,
            split_depth,
        }
    }

    #[inline]
    fn at_split(&self) -> bool {
        self.bounds.len() == self.split_depth
    }

    /// Name of the innermost open element.
    fn top_name(&self) -> &[u8] {
        match self.bounds.last() {
            Some(&start) => &self.names[start..],
            None => &[],
        }
    }

    /// Pop the innermost element; reports `End` if that returns to the
    /// split depth.
    fn pop(&mut self) -> Step {
        if let Some(start) = self.bounds.pop() {
            self.names.truncate(start);
        }
        self.lex = Lex::Text;
        if self.at_split() {
            Step::End
        } else {
            Step::Continue
        }
    }

    /// The `<` just seen turned out not to open an element.
    #[inline]
    fn not_an_element(&mut self, next: Lex) -> Step {
        self.lex = next;
        if self.at_split() {
            Step::Abandon
        } else {
            Step::Continue
        }
    }

    fn open(&mut self, b: u8) -> Step {
        match b {
            b'/' => {
                if self.bounds.is_empty() {
                    return Step::Error(SyntaxErrorKind::UnbalancedClose);
                }
                self.not_an_element(Lex::EndName { matched: 0 })
            }
            b'!' => self.not_an_element(Lex::Bang),
            b'?' => self.not_an_element(Lex::Pi),
            b if is(b, NAME_START) => {
                self.bounds.push(self.names.len());
                self.names.push(b);
                self.lex = Lex::StartName;
                Step::Continue
            }
            _ => Step::Error(SyntaxErrorKind::InvalidName),
        }
    }

    fn end_name(&mut self, matched: usize, b: u8) -> Step {
        let top = self.top_name();
        if is(b, NAME_CHAR) {
            if top.get(matched) == Some(&b) {
                self.lex = Lex::EndName { matched: matched + 1 };
                return Step::Continue;
            }
            return Step::Error(SyntaxErrorKind::MismatchedTag);
        }
        if matched == 0 {
            return Step::Error(SyntaxErrorKind::InvalidName);
        }
        if matched != top.len() {
            return Step::Error(SyntaxErrorKind::MismatchedTag);
        }
        match b {
            b'>' => self.pop(),
            b if is(b, WS) => {
                self.lex = Lex::EndSpace;
                Step::Continue
            }
            _ => Step::Error(SyntaxErrorKind::InvalidTag),
        }
    }

    fn bang(&mut self, b: u8) -> Step {
        self.lex = match b {
            b'-' => Lex::CommentOpen,
            b'[' => Lex::CDataOpen { matched: 0 },
            // DOCTYPE and friends only belong in the prolog
            b'A'..=b'Z' if self.bounds.is_empty() => Lex::Doctype {
                subset: false,
                quote: None,
            },
            _ => return Step::Error(SyntaxErrorKind::InvalidDeclaration),
        };
        Step::Continue
    }

    fn doctype(&mut self, subset: bool, quote: Option<u8>, b: u8) -> Step {
        self.lex = match (quote, b) {
            (Some(q), b) if b == q => Lex::Doctype { subset, quote: None },
            (Some(_), _) => return Step::Continue,
            (None, b'"' | b'\'') => Lex::Doctype { subset, quote: Some(b) },
            (None, b'[') => Lex::Doctype { subset: true, quote: None },
            (None, b']') => Lex::Doctype { subset: false, quote: None },
            (None, b'>') if !subset => Lex::Text,
            (None, _) => return Step::Continue,
        };
        Step::Continue
    }

    /// Transition inside a start tag.
    fn tag(&mut self, b: u8) -> Step {
        let next = match (self.lex, b) {
            (Lex::StartName, b) if is(b, NAME_CHAR) => {
                self.names.push(b);
                return Step::Continue;
            }
            (Lex::StartName, _) if !is(b, WS) && b != b'/' && b != b'>' => {
                return Step::Error(SyntaxErrorKind::InvalidName)
            }
            (Lex::StartName | Lex::TagSpace | Lex::AttrDone, b'>') => Lex::Text,
            (Lex::StartName | Lex::TagSpace | Lex::AttrDone, b'/') => Lex::EmptyTag,
            (Lex::StartName | Lex::TagSpace | Lex::AttrDone, b) if is(b, WS) => Lex::TagSpace,
            (Lex::TagSpace, b) if is(b, NAME_START) => Lex::AttrName,
            (Lex::TagSpace, _) => return Step::Error(SyntaxErrorKind::InvalidTag),
            (Lex::AttrName, b) if is(b, NAME_CHAR) => Lex::AttrName,
            (Lex::AttrName | Lex::AttrEq, b'=') => Lex::AttrQuote,
            (Lex::AttrName | Lex::AttrEq, b) if is(b, WS) => Lex::AttrEq,
            (Lex::AttrQuote, b) if is(b, WS) => Lex::AttrQuote,
            (Lex::AttrQuote, b'"' | b'\'') => Lex::AttrValue(b),
            (Lex::AttrValue(q), b) if b == q => Lex::AttrDone,
            (Lex::AttrValue(_), b'<') => return Step::Error(SyntaxErrorKind::InvalidAttribute),
            (Lex::AttrValue(q), _) => Lex::AttrValue(q),
            (Lex::EmptyTag, b'>') => return self.pop(),
            (Lex::EmptyTag, _) => return Step::Error(SyntaxErrorKind::InvalidTag),
            _ => return Step::Error(SyntaxErrorKind::InvalidAttribute),
        };
        self.lex = next;
        Step::Continue
    }
}

impl Default for XmlMachine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Automaton for XmlMachine {
    fn step(&mut self, b: u8) -> Step {
        match self.lex {
            Lex::Text => {
                if b == b'<' {
                    self.lex = Lex::Open;
                    if self.at_split() {
                        return Step::Start;
                    }
                }
                Step::Continue
            }
            Lex::Open => self.open(b),
            Lex::StartName
            | Lex::TagSpace
            | Lex::AttrName
            | Lex::AttrEq
            | Lex::AttrQuote
            | Lex::AttrValue(_)
            | Lex::AttrDone
            | Lex::EmptyTag => self.tag(b),
            Lex::EndName { matched } => self.end_name(matched, b),
            Lex::EndSpace => match b {
                b'>' => self.pop(),
                b if is(b, WS) => Step::Continue,
                _ => Step::Error(SyntaxErrorKind::InvalidTag),
            },
            Lex::Bang => self.bang(b),
            Lex::CommentOpen => {
                if b != b'-' {
                    return Step::Error(SyntaxErrorKind::InvalidDeclaration);
                }
                self.lex = Lex::Comment;
                Step::Continue
            }
            Lex::Comment | Lex::CommentDash | Lex::CommentDashDash => {
                self.lex = match (self.lex, b) {
                    (Lex::Comment, b'-') => Lex::CommentDash,
                    (Lex::CommentDash | Lex::CommentDashDash, b'-') => Lex::CommentDashDash,
                    (Lex::CommentDashDash, b'>') => Lex::Text,
                    _ => Lex::Comment,
                };
                Step::Continue
            }
            Lex::CDataOpen { matched } => {
                if CDATA_OPEN[matched as usize] != b {
                    return Step::Error(SyntaxErrorKind::InvalidDeclaration);
                }
                self.lex = if matched as usize + 1 == CDATA_OPEN.len() {
                    Lex::CData
                } else {
                    Lex::CDataOpen { matched: matched + 1 }
                };
                Step::Continue
            }
            Lex::CData | Lex::CDataBracket | Lex::CDataBracketBracket => {
                self.lex = match (self.lex, b) {
                    (Lex::CData, b']') => Lex::CDataBracket,
                    (Lex::CDataBracket | Lex::CDataBracketBracket, b']') => {
                        Lex::CDataBracketBracket
                    }
                    (Lex::CDataBracketBracket, b'>') => Lex::Text,
                    _ => Lex::CData,
                };
                Step::Continue
            }
            Lex::Pi | Lex::PiQuestion => {
                self.lex = match b {
                    b'?' => Lex::PiQuestion,
                    b'>' if self.lex == Lex::PiQuestion => Lex::Text,
                    _ => Lex::Pi,
                };
                Step::Continue
            }
            Lex::Doctype { subset, quote } => self.doctype(subset, quote, b),
        }
    }

    fn skip_run(&mut self, input: &[u8]) -> usize {
        let stop = match self.lex {
            Lex::Text => memchr(b'<', input),
            Lex::Comment => memchr(b'-', input),
            Lex::CData => memchr(b']', input),
            Lex::Pi => memchr(b'?', input),
            Lex::AttrValue(quote) => memchr2(quote, b'<', input),
            _ => Some(0),
        };
        stop.unwrap_or(input.len())
    }

    fn finish(&mut self) -> Finish {
        if self.lex == Lex::Text && self.bounds.is_empty() {
            Finish::Idle
        } else {
            Finish::Incomplete
        }
    }

    fn depth(&self) -> usize {
        self.bounds.len()
    }
}
