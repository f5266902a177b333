use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    Number(i64),
    Id(String),
    Str(String),
    /// Any other single character: `(`, `)`, `:`, `,`, `.`, `=`, `+`, `<`, …
    Char(char),

    // Keywords
    Class,
    Def,
    Return,
    If,
    Else,
    Print,
    And,
    Or,
    Not,
    None,
    True,
    False,

    // Two-character operators
    Eq,          // ==
    NotEq,       // !=
    LessOrEq,    // <=
    GreaterOrEq, // >=

    // Structure
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Tokens after which end of input needs no synthetic `Newline`.
    pub fn closes_line(&self) -> bool {
        matches!(self, Self::Newline | Self::Dedent | Self::Eof)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "Number{{{n}}}"),
            Self::Id(s)     => write!(f, "Id{{{s}}}"),
            Self::Str(s)    => write!(f, "String{{{s}}}"),
            Self::Char(c)   => write!(f, "Char{{{c}}}"),
            Self::Class       => f.write_str("Class"),
            Self::Def         => f.write_str("Def"),
            Self::Return      => f.write_str("Return"),
            Self::If          => f.write_str("If"),
            Self::Else        => f.write_str("Else"),
            Self::Print       => f.write_str("Print"),
            Self::And         => f.write_str("And"),
            Self::Or          => f.write_str("Or"),
            Self::Not         => f.write_str("Not"),
            Self::None        => f.write_str("None"),
            Self::True        => f.write_str("True"),
            Self::False       => f.write_str("False"),
            Self::Eq          => f.write_str("Eq"),
            Self::NotEq       => f.write_str("NotEq"),
            Self::LessOrEq    => f.write_str("LessOrEq"),
            Self::GreaterOrEq => f.write_str("GreaterOrEq"),
            Self::Newline     => f.write_str("Newline"),
            Self::Indent      => f.write_str("Indent"),
            Self::Dedent      => f.write_str("Dedent"),
            Self::Eof         => f.write_str("Eof"),
        }
    }
}

/// Maps an identifier string to its keyword token, or returns `Id`.
pub fn keyword_or_id(s: String) -> TokenKind {
    match s.as_str() {
        "class"  => TokenKind::Class,
        "return" => TokenKind::Return,
        "if"     => TokenKind::If,
        "else"   => TokenKind::Else,
        "def"    => TokenKind::Def,
        "print"  => TokenKind::Print,
        "and"    => TokenKind::And,
        "or"     => TokenKind::Or,
        "not"    => TokenKind::Not,
        "None"   => TokenKind::None,
        "True"   => TokenKind::True,
        "False"  => TokenKind::False,
        "eof"    => TokenKind::Eof,
        _        => TokenKind::Id(s),
    }
}

/// Maps `c` followed by `=` to a two-character operator, if one exists.
pub fn two_char_operator(c: char) -> Option<TokenKind> {
    match c {
        '=' => Some(TokenKind::Eq),
        '!' => Some(TokenKind::NotEq),
        '<' => Some(TokenKind::LessOrEq),
        '>' => Some(TokenKind::GreaterOrEq),
        _   => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Equality compares kinds only; positions are ignored.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table() {
        assert_eq!(keyword_or_id("class".into()), TokenKind::Class);
        assert_eq!(keyword_or_id("None".into()), TokenKind::None);
        assert_eq!(keyword_or_id("eof".into()), TokenKind::Eof);
        assert_eq!(keyword_or_id("none".into()), TokenKind::Id("none".into()));
    }

    #[test]
    fn equality_compares_payload() {
        assert_eq!(TokenKind::Number(1), TokenKind::Number(1));
        assert_ne!(TokenKind::Number(1), TokenKind::Number(2));
        assert_ne!(TokenKind::Id("x".into()), TokenKind::Str("x".into()));
        assert_eq!(Token::new(TokenKind::Indent, 1, 1), Token::new(TokenKind::Indent, 9, 3));
    }

    #[test]
    fn display_matches_diagnostic_form() {
        assert_eq!(TokenKind::Number(42).to_string(), "Number{42}");
        assert_eq!(TokenKind::Char('(').to_string(), "Char{(}");
        assert_eq!(TokenKind::Dedent.to_string(), "Dedent");
    }

    #[test]
    fn helpers() {
        assert!(TokenKind::Dedent.closes_line());
        assert_eq!(two_char_operator('!'), Some(TokenKind::NotEq));
        assert_eq!(two_char_operator('+'), None);
    }
}
