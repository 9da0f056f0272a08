// src/parser.rs
//! Character cursor used by the query parser.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidSyntax(msg) => f.write_str(msg),
        }
    }
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn position(&self) -> usize {
        self.i
    }

    /// Bare member name: ASCII alphanumerics plus `_`, `-` and `@`.
    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '-' || c == '@' || c.is_ascii_alphanumeric() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax(format!(
                "identifier expected at {start}"
            )));
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Integer, optionally negative. Returns `None` (consuming nothing) if
    /// there is no digit here.
    pub fn parse_int(&mut self) -> Result<Option<i64>, ParseError> {
        let start = self.i;
        if self.peek_char() == Some('-') {
            self.i += 1;
        }
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        match &self.s[start..self.i] {
            "" => Ok(None),
            "-" => Err(ParseError::InvalidSyntax("expected integer".into())),
            digits => digits
                .parse::<i64>()
                .map(Some)
                .map_err(|_| ParseError::InvalidSyntax(format!("bad integer `{digits}`"))),
        }
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    match nc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '\\' => out.push('\\'),
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        _ => {
                            out.push('\\');
                            out.push(nc);
                        }
                    }
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!(
                "expected '{}' at {}",
                c, self.i
            )))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
