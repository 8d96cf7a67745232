//! Env-file parser
//!
//! Accepts the common dotenv dialect: blank lines, `#` comments, an optional
//! `export ` prefix, unquoted values (with trailing ` # comment`), single
//! quoted literals and double quoted values with escapes. Quoted values may
//! span lines. Later duplicates win. There is no variable expansion: `$FOO`
//! is kept verbatim.

use super::{EnvError, Snapshot};

/// Check a variable name against `[A-Za-z_][A-Za-z0-9_.-]*`
pub fn validate_key(key: &str) -> Result<(), EnvError> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EnvError::InvalidKey(key.to_string()))
    }
}

/// Parse env-file text into a snapshot
///
/// Empty and comment-only input yields an empty snapshot.
pub fn parse(input: &str) -> Result<Snapshot, EnvError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        line: 1,
    };
    let mut snapshot = Snapshot::new();
    while let Some((key, value)) = parser.next_entry()? {
        snapshot.insert(key, value);
    }
    Ok(snapshot)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> EnvError {
        EnvError::Parse {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.bump();
        }
    }

    fn skip_to_next_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    /// Read one `KEY=value` entry, skipping blank and comment lines
    fn next_entry(&mut self) -> Result<Option<(String, String)>, EnvError> {
        loop {
            self.skip_inline_space();
            match self.peek() {
                None => return Ok(None),
                Some('\n') => {
                    self.bump();
                }
                Some('#') => self.skip_to_next_line(),
                Some(_) => break,
            }
        }

        if self.starts_with("export ") || self.starts_with("export\t") {
            self.pos += "export".len();
            self.skip_inline_space();
        }

        let key = self.read_key()?;
        self.skip_inline_space();
        if self.peek() != Some('=') {
            return Err(self.error(format!("expected '=' after {:?}", key)));
        }
        self.bump();
        self.skip_inline_space();

        let value = match self.peek() {
            Some('\'') => {
                self.bump();
                let value = self.read_single_quoted()?;
                self.finish_quoted_line()?;
                value
            }
            Some('"') => {
                self.bump();
                let value = self.read_double_quoted()?;
                self.finish_quoted_line()?;
                value
            }
            _ => self.read_unquoted(),
        };

        Ok(Some((key, value)))
    }

    fn read_key(&mut self) -> Result<String, EnvError> {
        let mut key = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, '=' | ' ' | '\t' | '\r' | '\n') {
                break;
            }
            key.push(c);
            self.bump();
        }
        validate_key(&key).map_err(|_| self.error(format!("invalid variable name {:?}", key)))?;
        Ok(key)
    }

    fn read_single_quoted(&mut self) -> Result<String, EnvError> {
        let start = self.line;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(value),
                Some(c) => value.push(c),
                None => {
                    return Err(EnvError::Parse {
                        line: start,
                        reason: "unterminated single-quoted value".to_string(),
                    })
                }
            }
        }
    }

    fn read_double_quoted(&mut self) -> Result<String, EnvError> {
        let start = self.line;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some(c @ ('"' | '\\' | '$')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => break,
                },
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(EnvError::Parse {
            line: start,
            reason: "unterminated double-quoted value".to_string(),
        })
    }

    /// After a closing quote only whitespace or a comment may follow
    fn finish_quoted_line(&mut self) -> Result<(), EnvError> {
        self.skip_inline_space();
        match self.peek() {
            None => Ok(()),
            Some('\n') | Some('#') => {
                self.skip_to_next_line();
                Ok(())
            }
            Some(c) => Err(self.error(format!("unexpected {:?} after closing quote", c))),
        }
    }

    fn read_unquoted(&mut self) -> String {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            // a comment needs whitespace before the '#'
            if c == '#' && (raw.is_empty() || raw.ends_with(|c: char| c == ' ' || c == '\t')) {
                self.skip_to_next_line();
                return trim_inline_space(&raw).to_string();
            }
            raw.push(c);
            self.bump();
        }
        self.bump();
        trim_inline_space(&raw).to_string()
    }
}

/// Strip the same trailing whitespace `skip_inline_space` skips; anything
/// else (`\u{a0}`, `\x0b`, ...) belongs to the value
fn trim_inline_space(raw: &str) -> &str {
    raw.trim_end_matches([' ', '\t', '\r'])
}
