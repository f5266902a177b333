use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_id, two_char_operator};

/// Spaces per indentation level.
pub const INDENT_WIDTH: usize = 2;

/// Pull-based tokenizer. Construction primes the first token; every
/// `next_token` call advances exactly one token.
pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    /// Current indentation in spaces (always a multiple of `INDENT_WIDTH`).
    indent: usize,
    at_line_start: bool,
    /// Measured indentation still owed `Dedent` tokens.
    pending_dedent: Option<usize>,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Result<Self, Error> {
        let mut lexer = Self {
            source: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            indent: 0,
            at_line_start: true,
            pending_dedent: None,
            // Placeholder so that an empty source lexes straight to `Eof`.
            current: Token::new(TokenKind::Newline, 1, 1),
        };
        lexer.next_token()?;
        Ok(lexer)
    }

    pub fn current_token(&self) -> &Token {
        &self.current
    }

    pub fn next_token(&mut self) -> Result<&Token, Error> {
        self.current = self.lex()?;
        Ok(&self.current)
    }

    /// Drain the whole stream, including the final `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = vec![self.current.clone()];
        while self.current.kind != TokenKind::Eof {
            tokens.push(self.next_token()?.clone());
        }
        Ok(tokens)
    }

    fn lex(&mut self) -> Result<Token, Error> {
        if let Some(target) = self.pending_dedent {
            return Ok(self.dedent_towards(target));
        }

        if self.at_line_start {
            self.at_line_start = false;
            let count = self.measure_indent();
            if !self.is_at_end() {
                if let Some(tok) = self.indent_change(count)? {
                    return Ok(tok);
                }
            }
        }

        self.skip_inline_whitespace();
        if self.is_at_end() {
            return Ok(self.end_of_input());
        }

        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'\n' => {
                self.at_line_start = true;
                TokenKind::Newline
            }
            b'\'' | b'"' => TokenKind::Str(self.read_string(ch, line, col)?),
            b'0'..=b'9' => TokenKind::Number(self.read_number(ch, line, col)?),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_id(self.read_id(ch)),
            c if c.is_ascii_graphic() => {
                let c = c as char;
                match two_char_operator(c) {
                    Some(op) if self.peek() == b'=' => {
                        self.advance();
                        op
                    }
                    _ => TokenKind::Char(c),
                }
            }
            other => {
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other.escape_ascii())));
            }
        };

        Ok(Token::new(kind, line, col))
    }

    // ─── Indentation ─────────────────────────────────────────────────────────

    /// Consume leading spaces of the next non-blank line and return their count.
    /// Blank lines are swallowed whole.
    fn measure_indent(&mut self) -> usize {
        let mut count = 0;
        while !self.is_at_end() {
            match self.peek() {
                b' ' => { self.advance(); count += 1; }
                b'\t' | b'\r' => { self.advance(); }
                b'\n' => { self.advance(); count = 0; }
                _ => break,
            }
        }
        count
    }

    fn indent_change(&mut self, count: usize) -> Result<Option<Token>, Error> {
        if count % INDENT_WIDTH != 0 {
            return Err(Error::new(ErrorCode::L004, self.line, self.column,
                format!("indentation of {count} spaces is not a multiple of {INDENT_WIDTH}")));
        }
        if count == self.indent {
            return Ok(None);
        }
        if count > self.indent {
            if count != self.indent + INDENT_WIDTH {
                return Err(Error::new(ErrorCode::L004, self.line, self.column,
                    "unexpected indent: more than one level deeper than the enclosing block"));
            }
            self.indent = count;
            return Ok(Some(Token::new(TokenKind::Indent, self.line, self.column)));
        }
        Ok(Some(self.dedent_towards(count)))
    }

    fn dedent_towards(&mut self, target: usize) -> Token {
        self.indent -= INDENT_WIDTH;
        self.pending_dedent = (self.indent != target).then_some(target);
        Token::new(TokenKind::Dedent, self.line, self.column)
    }

    /// Terminate the last statement, unwind open blocks, then `Eof` forever.
    fn end_of_input(&mut self) -> Token {
        let kind = if !self.current.kind.closes_line() {
            TokenKind::Newline
        } else if self.indent > 0 {
            self.indent -= INDENT_WIDTH;
            TokenKind::Dedent
        } else {
            TokenKind::Eof
        };
        Token::new(kind, self.line, self.column)
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn skip_inline_whitespace(&mut self) {
        while !self.is_at_end() && matches!(self.peek(), b' ' | b'\t' | b'\r') {
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Everything up to the matching quote, verbatim, line breaks included.
    fn read_string(&mut self, quote: u8, start_line: usize, start_col: usize) -> Result<String, Error> {
        let start = self.pos;
        loop {
            if self.is_at_end() {
                return Err(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
            }
            if self.advance() == quote { break; }
        }
        Ok(String::from_utf8_lossy(&self.source[start..self.pos - 1]).into_owned())
    }

    fn read_number(&mut self, first: u8, line: usize, col: usize) -> Result<i64, Error> {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance() as char);
        }
        s.parse().map_err(|_| Error::new(ErrorCode::L003, line, col,
            format!("integer literal `{s}` is out of range")))
    }

    fn read_id(&mut self, first: u8) -> String {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            s.push(self.advance() as char);
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
