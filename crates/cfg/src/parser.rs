//! Recursive-descent parsing of the lexeme stream into a [`ConfigTree`].
//!
//! The grammar is uniform at every nesting depth: a block is a sequence of
//! semicolon-terminated entries, each entry a sequence of tokens, one of
//! which may itself be a nested block. This parser does not know about
//! `zone`, `acl`, or any other specific keyword - that knowledge lives in
//! the validator and assembler, which interpret the resulting tree.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use camino::Utf8PathBuf;

use crate::lexer::{lex, Lexeme, LexError, SpannedLexeme};
use crate::token::{ConfigTree, Entry, IpPrefix, Location, Token};

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            location: e.location,
            message: e.message,
        }
    }
}

struct Parser<'a> {
    file: &'a Utf8PathBuf,
    toks: Vec<SpannedLexeme>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn loc(&self) -> Location {
        let line = self.toks.get(self.pos).map(|t| t.line).unwrap_or_else(|| {
            self.toks.last().map(|t| t.line).unwrap_or(1)
        });
        Location::new(self.file.clone(), line)
    }

    fn peek(&self) -> Option<&Lexeme> {
        self.toks.get(self.pos).map(|t| &t.lexeme)
    }

    fn bump(&mut self) -> Option<Lexeme> {
        let t = self.toks.get(self.pos).cloned();
        self.pos += 1;
        t.map(|t| t.lexeme)
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            location: self.loc(),
            message: message.into(),
        }
    }

    /// Parse a brace-delimited block's contents (after consuming `{`, up
    /// to but not including the matching `}`).
    fn parse_block(&mut self) -> Result<Vec<Entry>, ParseError> {
        let mut entries = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.err("unexpected end of input inside '{'")),
                Some(Lexeme::RBrace) => break,
                _ => entries.push(self.parse_entry()?),
            }
        }
        Ok(entries)
    }

    /// Parse one semicolon-terminated entry.
    fn parse_entry(&mut self) -> Result<Entry, ParseError> {
        let location = self.loc();
        let mut tokens = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.err("unexpected end of input, expected ';'")),
                Some(Lexeme::Semicolon) => {
                    self.bump();
                    break;
                }
                Some(Lexeme::RBrace) => {
                    // Tolerate a missing trailing semicolon before a closing
                    // brace, matching how list elements inside an
                    // address-match-list are sometimes written.
                    break;
                }
                _ => tokens.push(self.parse_token()?),
            }
        }
        Ok(Entry { tokens, location })
    }

    fn parse_token(&mut self) -> Result<Token, ParseError> {
        match self.bump() {
            None => Err(self.err("unexpected end of input")),
            Some(Lexeme::Bang) => Ok(Token::Negated(Box::new(self.parse_token()?))),
            Some(Lexeme::LBrace) => {
                let block = self.parse_block()?;
                match self.peek() {
                    Some(Lexeme::RBrace) => {
                        self.bump();
                        Ok(Token::Block(block))
                    }
                    _ => Err(self.err("expected '}'")),
                }
            }
            Some(Lexeme::QuotedString(s)) => Ok(Token::Str(s)),
            Some(Lexeme::Word(w)) => Ok(classify_word(&w)),
            Some(other @ (Lexeme::RBrace | Lexeme::Semicolon)) => {
                Err(self.err(format!("unexpected token '{other}'")))
            }
        }
    }
}

/// Turn a bare word into the most specific scalar it matches, falling back
/// to a plain string. Order matters: more specific grammars are tried
/// first so that, e.g., `10%` is a percentage and not a malformed integer.
fn classify_word(w: &str) -> Token {
    match w {
        "yes" | "true" => return Token::Bool(true),
        "no" | "false" => return Token::Bool(false),
        "auto" => return Token::Auto,
        _ => {}
    }

    if let Some(pct) = w.strip_suffix('%') {
        if let Ok(v) = pct.parse::<f64>() {
            return Token::Percentage(v);
        }
    }

    if let Some((addr, len)) = w.split_once('/') {
        if let (Ok(addr), Ok(len)) = (addr.parse::<IpAddr>(), len.parse::<u8>()) {
            return Token::Prefix(IpPrefix { addr, len });
        }
    }

    if let Ok(addr) = w.parse::<IpAddr>() {
        return Token::IpAddr(addr);
    }

    if let Ok(addr) = w.parse::<SocketAddr>() {
        return Token::SocketAddr(addr);
    }

    if let Some(duration) = parse_duration(w) {
        return Token::Duration(duration);
    }

    if let Ok(n) = i64::from_str(w) {
        return Token::Int(n);
    }

    Token::Str(w.to_string())
}

/// Parse an interval written as a plain integer (seconds) or with a unit
/// suffix (`s`, `m`, `h`, `d`, `w`).
fn parse_duration(w: &str) -> Option<u64> {
    let (digits, mult) = match w.chars().last()? {
        's' => (&w[..w.len() - 1], 1),
        'm' => (&w[..w.len() - 1], 60),
        'h' => (&w[..w.len() - 1], 3600),
        'd' => (&w[..w.len() - 1], 86400),
        'w' => (&w[..w.len() - 1], 604800),
        _ => return None,
    };
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().map(|v| v * mult)
}

/// Parse `text` (the contents of `file`) into a [`ConfigTree`].
pub fn parse(file: &Utf8PathBuf, text: &str) -> Result<ConfigTree, ParseError> {
    let toks = lex(file, text)?;
    let mut p = Parser {
        file,
        toks,
        pos: 0,
    };
    let mut entries = Vec::new();
    while p.peek().is_some() {
        entries.push(p.parse_entry()?);
    }
    Ok(ConfigTree { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_static_stub_zone() {
        let text = r#"
            zone "ex" {
                type static-stub;
                server-addresses { 192.0.2.1; 2001:db8::1; };
                server-names { ns.other.tld; };
            };
        "#;
        let tree = parse(&Utf8PathBuf::from("t.conf"), text).unwrap();
        let zone = tree.first("zone").unwrap();
        assert_eq!(zone.args()[0], Token::Str("ex".into()));
        let block = zone.block().unwrap();
        let typ = crate::token::find_one(block, "type").unwrap();
        assert_eq!(typ.args()[0], Token::Str("static-stub".into()));
        let addrs = crate::token::find_one(block, "server-addresses").unwrap();
        let Token::Block(elems) = &addrs.args()[0] else {
            panic!("expected block");
        };
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0].tokens[0], Token::IpAddr("192.0.2.1".parse().unwrap()));
    }

    #[test]
    fn classifies_scalars() {
        assert_eq!(classify_word("yes"), Token::Bool(true));
        assert_eq!(classify_word("auto"), Token::Auto);
        assert_eq!(classify_word("50%"), Token::Percentage(50.0));
        assert_eq!(classify_word("3600"), Token::Int(3600));
        assert_eq!(classify_word("1h"), Token::Duration(3600));
        assert_eq!(
            classify_word("192.0.2.0/24"),
            Token::Prefix(IpPrefix {
                addr: "192.0.2.0".parse().unwrap(),
                len: 24
            })
        );
    }

    #[test]
    fn parses_negated_acl_element() {
        let tree = parse(
            &Utf8PathBuf::from("t.conf"),
            r#"acl "a" { !192.0.2.1; any; };"#,
        )
        .unwrap();
        let acl = tree.first("acl").unwrap();
        let Token::Block(elems) = &acl.args()[1] else {
            panic!("expected block");
        };
        assert_eq!(
            elems[0].tokens[0],
            Token::Negated(Box::new(Token::IpAddr("192.0.2.1".parse().unwrap())))
        );
    }

    #[test]
    fn reports_unterminated_block() {
        let err = parse(&Utf8PathBuf::from("t.conf"), "zone \"ex\" { type primary;").unwrap_err();
        assert!(err.message.contains("end of input"));
    }
}
