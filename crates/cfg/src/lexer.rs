//! Lexical analysis of `named.conf`-style text.
//!
//! Handles the three comment forms (`/* */`, `//`, `#`), quoted and bare
//! strings, and the punctuation `{ } ; !`. Bare strings may contain the
//! restricted ASCII subset `named.conf` allows outside quotes: letters,
//! digits, and `.-_:/@*`.

use std::fmt;

use camino::Utf8PathBuf;

use crate::token::Location;

#[derive(Clone, Debug, PartialEq)]
pub enum Lexeme {
    Word(String),
    QuotedString(String),
    LBrace,
    RBrace,
    Semicolon,
    Bang,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Word(s) => write!(f, "{s}"),
            Lexeme::QuotedString(s) => write!(f, "{s:?}"),
            Lexeme::LBrace => write!(f, "{{"),
            Lexeme::RBrace => write!(f, "}}"),
            Lexeme::Semicolon => write!(f, ";"),
            Lexeme::Bang => write!(f, "!"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpannedLexeme {
    pub lexeme: Lexeme,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '/' | '@' | '*' | '%' | '+')
}

/// Tokenize `text` (the contents of `file`) into a flat stream of lexemes.
pub fn lex(file: &Utf8PathBuf, text: &str) -> Result<Vec<SpannedLexeme>, LexError> {
    let mut out = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut line: u32 = 1;
    let bytes = text.as_bytes();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if bytes.get(i + 1) == Some(&b'*') => {
                chars.next();
                chars.next();
                let start_line = line;
                loop {
                    match chars.next() {
                        None => {
                            return Err(LexError {
                                location: Location::new(file.clone(), start_line),
                                message: "unterminated block comment".into(),
                            });
                        }
                        Some((_, '\n')) => line += 1,
                        Some((j, '*')) if bytes.get(j + 1) == Some(&b'/') => {
                            chars.next();
                            break;
                        }
                        Some(_) => {}
                    }
                }
            }
            '{' => {
                out.push(SpannedLexeme {
                    lexeme: Lexeme::LBrace,
                    line,
                });
                chars.next();
            }
            '}' => {
                out.push(SpannedLexeme {
                    lexeme: Lexeme::RBrace,
                    line,
                });
                chars.next();
            }
            ';' => {
                out.push(SpannedLexeme {
                    lexeme: Lexeme::Semicolon,
                    line,
                });
                chars.next();
            }
            '!' => {
                out.push(SpannedLexeme {
                    lexeme: Lexeme::Bang,
                    line,
                });
                chars.next();
            }
            '"' => {
                let start_line = line;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        None => {
                            return Err(LexError {
                                location: Location::new(file.clone(), start_line),
                                message: "unterminated quoted string".into(),
                            });
                        }
                        Some((_, '"')) => break,
                        Some((_, '\\')) => {
                            if let Some((_, next)) = chars.next() {
                                s.push(next);
                            }
                        }
                        Some((_, '\n')) => {
                            line += 1;
                            s.push('\n');
                        }
                        Some((_, c)) => s.push(c),
                    }
                }
                out.push(SpannedLexeme {
                    lexeme: Lexeme::QuotedString(s),
                    line: start_line,
                });
            }
            c if is_bare_char(c) => {
                let start_line = line;
                let mut s = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_bare_char(c) {
                        s.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push(SpannedLexeme {
                    lexeme: Lexeme::Word(s),
                    line: start_line,
                });
            }
            other => {
                return Err(LexError {
                    location: Location::new(file.clone(), line),
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lx(text: &str) -> Vec<Lexeme> {
        lex(&Utf8PathBuf::from("t.conf"), text)
            .unwrap()
            .into_iter()
            .map(|s| s.lexeme)
            .collect()
    }

    #[test]
    fn skips_all_comment_forms() {
        let toks = lx("zone /* c */ \"ex\" // trailing\n{ # hash\n file \"a\"; };");
        assert_eq!(
            toks,
            vec![
                Lexeme::Word("zone".into()),
                Lexeme::QuotedString("ex".into()),
                Lexeme::LBrace,
                Lexeme::Word("file".into()),
                Lexeme::QuotedString("a".into()),
                Lexeme::Semicolon,
                Lexeme::RBrace,
                Lexeme::Semicolon,
            ]
        );
    }

    #[test]
    fn tracks_line_numbers() {
        let toks = lex(&Utf8PathBuf::from("t.conf"), "a;\nb;\nc;").unwrap();
        assert_eq!(toks[0].line, 1);
        assert_eq!(toks[2].line, 2);
        assert_eq!(toks[4].line, 3);
    }

    #[test]
    fn unterminated_string_errors() {
        assert!(lex(&Utf8PathBuf::from("t.conf"), "zone \"ex;").is_err());
    }
}
