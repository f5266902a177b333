use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::runtime::compare::Comparator;
use crate::runtime::object::{Class, Method};
use crate::syntax::ast::*;
use crate::syntax::lexer::Lexer;
use crate::syntax::token::{Token, TokenKind};

/// Built-in that stringifies its single argument.
const STR_BUILTIN: &str = "str";

/// Recursive-descent parser over a live token stream. Classes are built as
/// soon as their definition is parsed so later code can refer to them.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    classes: HashMap<String, Rc<Class>>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self { lexer, classes: HashMap::new() }
    }

    /// Parse statements up to `Eof`. The first error aborts the parse.
    pub fn parse(mut self) -> Result<Program, Error> {
        let mut body = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Newline => { self.advance()?; }
                _ => body.push(self.parse_stmt()?),
            }
        }
        Ok(Program { body })
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        let stmt = match self.peek_kind() {
            TokenKind::Class => return self.parse_class(),
            TokenKind::If    => return self.parse_if(),
            TokenKind::Return => self.parse_return()?,
            TokenKind::Print  => self.parse_print()?,
            _ => self.parse_simple()?,
        };
        self.expect(TokenKind::Newline)?;
        Ok(stmt)
    }

    /// `: Newline Indent stmt+ Dedent`
    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect_char(':')?;
        self.expect(TokenKind::Newline)?;
        self.expect(TokenKind::Indent)?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::Dedent)?;
        Ok(stmts)
    }

    fn parse_class(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Class)?;
        let name = self.expect_id()?;

        let parent = if self.matches_char('(')? {
            let parent_span = self.span();
            let parent_name = self.expect_id()?;
            self.expect_char(')')?;
            Some(self.lookup_class(&parent_name, &parent_span)?)
        } else {
            None
        };

        self.expect_char(':')?;
        self.expect(TokenKind::Newline)?;
        self.expect(TokenKind::Indent)?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            methods.push(self.parse_method()?);
        }
        self.expect(TokenKind::Dedent)?;

        tracing::trace!(class = %name, methods = methods.len(), "defined class");
        let class = Rc::new(Class::new(name.clone(), methods, parent));
        self.classes.insert(name, class.clone());
        Ok(Stmt::ClassDefinition(class, span))
    }

    fn parse_method(&mut self) -> Result<Method, Error> {
        self.expect(TokenKind::Def)?;
        let name = self.expect_id()?;
        self.expect_char('(')?;
        let mut params = Vec::new();
        while !self.check_char(')') && !self.is_at_end() {
            params.push(self.expect_id()?);
            if !self.matches_char(',')? { break; }
        }
        self.expect_char(')')?;
        let body = self.parse_block()?;
        Ok(Method::new(name, params, body))
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let else_body = if self.matches(&TokenKind::Else)? {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::IfElse { condition, then_body, else_body, span })
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let value = if self.check(&TokenKind::Newline) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        Ok(Stmt::Return(value, span))
    }

    fn parse_print(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Print)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::Newline) {
            args.push(self.parse_expr()?);
            while self.matches_char(',')? {
                args.push(self.parse_expr()?);
            }
        }
        Ok(Stmt::Print { args, span })
    }

    /// Assignment, field assignment, or a bare expression. The target is
    /// parsed as an ordinary expression and reinterpreted when `=` follows.
    fn parse_simple(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        let target = self.parse_expr()?;
        if !self.check_char('=') {
            return Ok(Stmt::Expr(target));
        }
        let eq = self.advance()?;
        let value = self.parse_expr()?;

        match target {
            Expr::Variable { mut path, span: path_span } => match path.pop() {
                Some(name) if path.is_empty() => Ok(Stmt::Assignment { name, value, span }),
                Some(field) => Ok(Stmt::FieldAssignment {
                    object: Expr::Variable { path, span: path_span },
                    field,
                    value,
                    span,
                }),
                None => Err(self.error_at(&eq, "cannot assign to an empty name")),
            },
            Expr::Field { object, field, .. } => Ok(Stmt::FieldAssignment { object: *object, field, value, span }),
            _ => Err(self.error_at(&eq, "cannot assign to this expression")),
        }
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::Or) {
            let span = left.span().clone();
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::BinOp { left: Box::new(left), op: BinOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_not()?;
        while self.check(&TokenKind::And) {
            let span = left.span().clone();
            self.advance()?;
            let right = self.parse_not()?;
            left = Expr::BinOp { left: Box::new(left), op: BinOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(&TokenKind::Not)? {
            let operand = self.parse_not()?;
            return Ok(Expr::UnOp { op: UnOp::Not, operand: Box::new(operand), span });
        }
        self.parse_comparison()
    }

    /// Non-associative: at most one comparison per expression.
    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let left = self.parse_addition()?;
        let cmp = match self.peek_kind() {
            TokenKind::Eq          => Comparator::Equal,
            TokenKind::NotEq       => Comparator::NotEqual,
            TokenKind::Char('<')   => Comparator::Less,
            TokenKind::Char('>')   => Comparator::Greater,
            TokenKind::LessOrEq    => Comparator::LessOrEqual,
            TokenKind::GreaterOrEq => Comparator::GreaterOrEqual,
            _ => return Ok(left),
        };
        let span = left.span().clone();
        self.advance()?;
        let right = self.parse_addition()?;
        Ok(Expr::Compare { left: Box::new(left), cmp, right: Box::new(right), span })
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Char('+') => BinOp::Add,
                TokenKind::Char('-') => BinOp::Sub,
                _ => break,
            };
            let span = left.span().clone();
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Char('*') => BinOp::Mul,
                TokenKind::Char('/') => BinOp::Div,
                _ => break,
            };
            let span = left.span().clone();
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches_char('-')? {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnOp { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        while self.check_char('.') {
            let span = expr.span().clone();
            self.advance()?;
            let name = self.expect_id()?;
            if self.matches_char('(')? {
                let args = self.parse_arg_list()?;
                self.expect_char(')')?;
                expr = Expr::MethodCall { object: Box::new(expr), method: name, args, span };
            } else {
                expr = match expr {
                    // keep plain dotted paths flat: a.b.c
                    Expr::Variable { mut path, span } => {
                        path.push(name);
                        Expr::Variable { path, span }
                    }
                    other => Expr::Field { object: Box::new(other), field: name, span },
                };
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Number(n) => { self.advance()?; Ok(Expr::Number(n, span)) }
            TokenKind::Str(s)    => { self.advance()?; Ok(Expr::Str(s, span)) }
            TokenKind::True      => { self.advance()?; Ok(Expr::Bool(true, span)) }
            TokenKind::False     => { self.advance()?; Ok(Expr::Bool(false, span)) }
            TokenKind::None      => { self.advance()?; Ok(Expr::None(span)) }

            TokenKind::Char('(') => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect_char(')')?;
                Ok(expr)
            }

            TokenKind::Id(name) => {
                self.advance()?;
                if self.matches_char('(')? {
                    let args = self.parse_arg_list()?;
                    self.expect_char(')')?;
                    self.parse_call(name, args, span)
                } else {
                    Ok(Expr::Variable { path: vec![name], span })
                }
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// `Name(args)`: class construction or the `str` built-in.
    fn parse_call(&self, name: String, mut args: Vec<Expr>, span: Span) -> Result<Expr, Error> {
        if let Some(class) = self.classes.get(&name) {
            return Ok(Expr::NewInstance { class: class.clone(), args, span });
        }
        if name == STR_BUILTIN {
            return match (args.pop(), args.is_empty()) {
                (Some(arg), true) => Ok(Expr::Stringify(Box::new(arg), span)),
                _ => Err(Error::new(ErrorCode::P001, span.line, span.column,
                    "`str` takes exactly one argument")),
            };
        }
        Err(Error::new(ErrorCode::P003, span.line, span.column, format!("unknown class `{name}`")))
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        while !self.check_char(')') && !self.is_at_end() {
            args.push(self.parse_expr()?);
            if !self.matches_char(',')? { break; }
        }
        Ok(args)
    }

    fn lookup_class(&self, name: &str, span: &Span) -> Result<Rc<Class>, Error> {
        self.classes.get(name).cloned().ok_or_else(|| {
            Error::new(ErrorCode::P003, span.line, span.column, format!("unknown class `{name}`"))
        })
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.lexer.current_token()
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.lexer.current_token().kind
    }

    fn advance(&mut self) -> Result<Token, Error> {
        let tok = self.peek().clone();
        self.lexer.next_token()?;
        Ok(tok)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn check_char(&self, c: char) -> bool {
        *self.peek_kind() == TokenKind::Char(c)
    }

    fn matches(&mut self, kind: &TokenKind) -> Result<bool, Error> {
        if self.check(kind) { self.advance()?; Ok(true) } else { Ok(false) }
    }

    fn matches_char(&mut self, c: char) -> Result<bool, Error> {
        self.matches(&TokenKind::Char(c))
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(&kind) {
            self.advance()
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {kind}, found {}", tok.kind),
            ))
        }
    }

    fn expect_char(&mut self, c: char) -> Result<Token, Error> {
        self.expect(TokenKind::Char(c))
    }

    fn expect_id(&mut self) -> Result<String, Error> {
        match self.peek_kind() {
            TokenKind::Id(_) => match self.advance()?.kind {
                TokenKind::Id(s) => Ok(s),
                _ => Err(self.unexpected("identifier")),
            },
            _ => {
                let tok = self.peek();
                Err(Error::new(ErrorCode::P002, tok.line, tok.column,
                    format!("expected identifier, found {}", tok.kind)))
            }
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {}", expected, tok.kind),
        )
    }

    fn error_at(&self, tok: &Token, msg: &str) -> Error {
        Error::new(ErrorCode::P001, tok.line, tok.column, msg)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
