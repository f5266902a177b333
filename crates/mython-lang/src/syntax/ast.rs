use std::rc::Rc;

use crate::runtime::compare::Comparator;
use crate::runtime::object::Class;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

/// The whole program: top-level statements executed in order.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `x = expr`
    Assignment {
        name: String,
        value: Expr,
        span: Span,
    },
    /// `a.b.c = expr`: `object` resolves `a.b`, `field` is `c`.
    FieldAssignment {
        object: Expr,
        field: String,
        value: Expr,
        span: Span,
    },
    /// `print a, b, c`
    Print {
        args: Vec<Expr>,
        span: Span,
    },
    /// `return expr` or bare `return`
    Return(Option<Expr>, Span),
    /// `if cond: … else: …`
    IfElse {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `class Name(Parent): …`, built while parsing.
    ClassDefinition(Rc<Class>, Span),
    /// A standalone expression, usually a method call.
    Expr(Expr),
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Number(i64, Span),
    Str(String, Span),
    Bool(bool, Span),
    None(Span),

    /// Dotted lookup: `x`, `self.value`, `a.b.c`
    Variable {
        path: Vec<String>,
        span: Span,
    },

    /// `expr.field` where `expr` is not a plain dotted path, e.g. `make().x`
    Field {
        object: Box<Expr>,
        field: String,
        span: Span,
    },

    /// `expr.method(args)`
    MethodCall {
        object: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        span: Span,
    },

    /// `ClassName(args)`
    NewInstance {
        class: Rc<Class>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `str(expr)`
    Stringify(Box<Expr>, Span),

    /// `a + b`, `a and b`, …
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    /// `a < b`, `a == b`, …
    Compare {
        left: Box<Expr>,
        cmp: Comparator,
        right: Box<Expr>,
        span: Span,
    },

    /// `not x`, `-x`
    UnOp {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Number(_, s)            => s,
            Expr::Str(_, s)               => s,
            Expr::Bool(_, s)              => s,
            Expr::None(s)                 => s,
            Expr::Variable { span, .. }   => span,
            Expr::Field { span, .. }      => span,
            Expr::MethodCall { span, .. } => span,
            Expr::NewInstance { span, .. } => span,
            Expr::Stringify(_, s)         => s,
            Expr::BinOp { span, .. }      => span,
            Expr::Compare { span, .. }    => span,
            Expr::UnOp { span, .. }       => span,
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div,
    And, Or,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::And => "and",
            BinOp::Or  => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}
