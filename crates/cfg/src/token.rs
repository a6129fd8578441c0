//! The opaque configuration tree.
//!
//! `named.conf` is a sequence of brace-delimited, semicolon-terminated
//! statements. Nesting is uniform: a statement's arguments are themselves
//! a sequence of tokens, one of which may be a nested `{ ... }` block.
//! This module models exactly that shape, without attaching any zone- or
//! option-specific meaning to it - that's the job of `isccfg`'s validator
//! and assembler, which are the only things allowed to interpret this
//! tree semantically.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use camino::Utf8PathBuf;

//----------- Location ----------------------------------------------------

/// Where a piece of configuration came from, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Utf8PathBuf,
    pub line: u32,
}

impl Location {
    pub fn new(file: Utf8PathBuf, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

//----------- IpPrefix ------------------------------------------------------

/// A network prefix, e.g. `192.0.2.0/24` or `2001:db8::/32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IpPrefix {
    pub addr: IpAddr,
    pub len: u8,
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.len)
    }
}

//----------- Token ----------------------------------------------------------

/// A single configuration token: either a scalar, or a nested block.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// A bare or quoted string (names, paths, identifiers that did not
    /// parse as a more specific scalar).
    Str(String),
    /// An integer literal.
    Int(i64),
    /// `yes` / `no` / `true` / `false`.
    Bool(bool),
    /// The bare word `auto`, used by boolean-or-auto fields.
    Auto,
    /// An interval, given in seconds (possibly written with a unit suffix,
    /// e.g. `1h`).
    Duration(u64),
    /// A socket address, `<ip>[#<port>]` or `<ip> port <port>`.
    SocketAddr(SocketAddr),
    /// A bare IP address with no port.
    IpAddr(IpAddr),
    /// A network prefix, `<ip>/<prefixlen>`.
    Prefix(IpPrefix),
    /// A fixed-point percentage, e.g. `50%`.
    Percentage(f64),
    /// `!<elem>`: negation, used in address-match lists.
    Negated(Box<Token>),
    /// A nested `{ ... }` block: a sequence of statements.
    Block(Vec<Entry>),
}

impl Token {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Token::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Interpret as a boolean-or-auto field. `Some(None)` means "auto".
    pub fn as_auto_bool(&self) -> Option<Option<bool>> {
        match self {
            Token::Bool(b) => Some(Some(*b)),
            Token::Auto => Some(None),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<u64> {
        match self {
            Token::Duration(d) => Some(*d),
            Token::Int(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Token::SocketAddr(a) => Some(*a),
            Token::IpAddr(a) => Some(SocketAddr::new(*a, 0)),
            _ => None,
        }
    }

    pub fn as_ip_addr(&self) -> Option<IpAddr> {
        match self {
            Token::IpAddr(a) => Some(*a),
            Token::SocketAddr(a) => Some(a.ip()),
            _ => None,
        }
    }

    pub fn as_percentage(&self) -> Option<f64> {
        match self {
            Token::Percentage(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&[Entry]> {
        match self {
            Token::Block(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Token::Auto => write!(f, "auto"),
            Token::Duration(d) => write!(f, "{d}"),
            Token::SocketAddr(a) => write!(f, "{a}"),
            Token::IpAddr(a) => write!(f, "{a}"),
            Token::Prefix(p) => write!(f, "{p}"),
            Token::Percentage(p) => write!(f, "{p}%"),
            Token::Negated(t) => write!(f, "!{t}"),
            Token::Block(_) => write!(f, "{{ ... }}"),
        }
    }
}

//----------- Entry -----------------------------------------------------------

/// One semicolon-terminated statement: `<keyword> <args...>;` or, inside an
/// address-match list, a single element.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub tokens: Vec<Token>,
    pub location: Location,
}

impl Entry {
    /// The statement's keyword, i.e. its first token interpreted as a bare
    /// string. Clause lookups are case-sensitive: nothing in the lexer or
    /// parser folds case, so a keyword spelled in upper or mixed case
    /// simply won't match any clause name a caller looks up, matching
    /// `named.conf`'s own convention that keywords are written lowercase.
    pub fn keyword(&self) -> Option<&str> {
        self.tokens.first().and_then(Token::as_str)
    }

    /// The statement's arguments, i.e. every token after the keyword.
    pub fn args(&self) -> &[Token] {
        if self.tokens.is_empty() {
            &[]
        } else {
            &self.tokens[1..]
        }
    }

    /// The nested block following the keyword and any leading arguments,
    /// if the last token is a block.
    pub fn block(&self) -> Option<&[Entry]> {
        self.tokens.last().and_then(Token::as_block)
    }
}

//----------- ConfigTree ------------------------------------------------------

/// The top-level parsed configuration: every top-level statement in a
/// `named.conf` file (after `include` expansion).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigTree {
    pub entries: Vec<Entry>,
}

impl ConfigTree {
    /// All top-level entries whose keyword matches `keyword`.
    pub fn all<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.keyword() == Some(keyword))
    }

    /// The first top-level entry whose keyword matches `keyword`.
    pub fn first(&self, keyword: &str) -> Option<&Entry> {
        self.all(keyword).next()
    }
}

/// Find all entries in a block whose keyword matches `keyword`.
pub fn find_all<'a>(block: &'a [Entry], keyword: &'a str) -> impl Iterator<Item = &'a Entry> + 'a {
    block.iter().filter(move |e| e.keyword() == Some(keyword))
}

/// Find the first entry in a block whose keyword matches `keyword`.
pub fn find_one<'a>(block: &'a [Entry], keyword: &str) -> Option<&'a Entry> {
    find_all(block, keyword).next()
}
