use thiserror::Error;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // integer literal out of range
    L004, // inconsistent indentation

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // unknown class
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
        }
    }
}

/// A lex or parse failure. Reported once; nothing is executed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{}] {line}:{column} — {message}", .code.as_str())]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeErrorKind {
    #[error("name `{name}` is not defined")]
    UndefinedVariable { name: String },

    #[error("`{class}` has no method `{method}`")]
    UndefinedMethod { class: String, method: String },

    #[error("`{method}` expects {expected} argument(s), got {got}")]
    ArityMismatch { method: String, expected: usize, got: usize },

    #[error("`{name}` is not a class instance")]
    NotAnInstance { name: String },

    #[error("unsupported operand types for `{op}`: {left} and {right}")]
    TypeMismatch { op: &'static str, left: &'static str, right: &'static str },

    #[error("bad operand type for unary `{op}`: {operand}")]
    BadOperand { op: &'static str, operand: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in `{op}`")]
    IntegerOverflow { op: &'static str },

    #[error("maximum call depth of {depth} exceeded")]
    RecursionLimit { depth: usize },

    #[error("output error: {message}")]
    Io { message: String },
}

/// Fatal failure while executing a program. There is no guest-level recovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[runtime] {line} — {kind}")]
pub struct RuntimeError {
    pub line: usize,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(line: usize, kind: RuntimeErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Failure of the combined parse-then-execute pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error(transparent)]
    Parse(#[from] Error),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
