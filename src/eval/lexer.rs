use super::{ErrorKind, EvalError};

/// Longest identifier the lexer will accept, in bytes.
pub const MAX_IDENTIFIER_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    EndOfLine,
    OpenParen,
    CloseParen,
    /// Borrowed slice into the input line; valid only for the line's lifetime.
    Identifier(&'a str),
    Number(f64),
    /// Unary minus. Never produced by the lexer; the evaluator re-tags a
    /// `Subtract` read in value position.
    Negate,
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Factorial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte offset of the token's first character in the line.
    pub pos: usize,
}

/// On-demand tokenizer for one line of input. Holds no state besides the line
/// and a byte cursor, and allocates nothing: identifier payloads borrow from
/// the line.
pub struct Lexer<'a> {
    line: &'a str,
    cursor: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self { line, cursor: 0 }
    }

    /// Produces the next token, skipping leading spaces and tabs.
    pub fn next_token(&mut self) -> Result<Token<'a>, EvalError> {
        let bytes = self.line.as_bytes();
        while matches!(bytes.get(self.cursor), Some(b' ' | b'\t')) {
            self.cursor += 1;
        }
        let pos = self.cursor;

        let byte = match bytes.get(self.cursor) {
            None | Some(b'\n') => {
                self.cursor += 1;
                return Ok(Token {
                    kind: TokenKind::EndOfLine,
                    pos,
                });
            }
            Some(&byte) => byte,
        };

        let kind = match byte {
            b'0'..=b'9' => return self.number(pos),
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b'+' => TokenKind::Add,
            b'-' => TokenKind::Subtract,
            b'*' => TokenKind::Multiply,
            b'/' => TokenKind::Divide,
            b'^' => TokenKind::Power,
            b'!' => TokenKind::Factorial,
            _ if byte.is_ascii_alphabetic() => return self.identifier(pos),
            _ => return Err(EvalError::new(ErrorKind::UnrecognizedToken, pos)),
        };
        self.cursor += 1;
        Ok(Token { kind, pos })
    }

    /// Consumes the longest valid floating-point prefix: digits, an optional
    /// fractional part, an optional exponent. The exponent marker is taken
    /// only when digits follow it, so `2e` lexes as the number 2 with the
    /// cursor left on the `e`.
    fn number(&mut self, pos: usize) -> Result<Token<'a>, EvalError> {
        let bytes = self.line.as_bytes();
        let mut end = pos;
        while matches!(bytes.get(end), Some(b'0'..=b'9')) {
            end += 1;
        }
        if matches!(bytes.get(end), Some(b'.')) {
            end += 1;
            while matches!(bytes.get(end), Some(b'0'..=b'9')) {
                end += 1;
            }
        }
        if matches!(bytes.get(end), Some(b'e' | b'E')) {
            let mut digits = end + 1;
            if matches!(bytes.get(digits), Some(b'+' | b'-')) {
                digits += 1;
            }
            if matches!(bytes.get(digits), Some(b'0'..=b'9')) {
                end = digits;
                while matches!(bytes.get(end), Some(b'0'..=b'9')) {
                    end += 1;
                }
            }
        }
        let text = &self.line[pos..end];
        self.cursor = end;
        match text.parse::<f64>() {
            Ok(value) => Ok(Token {
                kind: TokenKind::Number(value),
                pos,
            }),
            Err(_) => Err(EvalError::new(ErrorKind::UnrecognizedToken, pos)),
        }
    }

    fn identifier(&mut self, pos: usize) -> Result<Token<'a>, EvalError> {
        let bytes = self.line.as_bytes();
        let mut end = pos;
        while bytes.get(end).is_some_and(u8::is_ascii_alphanumeric) {
            end += 1;
        }
        // The cursor moves past the whole identifier even when it is rejected,
        // so a later call resumes at the next token.
        self.cursor = end;
        if end - pos > MAX_IDENTIFIER_LEN {
            return Err(EvalError::new(ErrorKind::IdentifierTooLong, pos));
        }
        Ok(Token {
            kind: TokenKind::Identifier(&self.line[pos..end]),
            pos,
        })
    }
}
