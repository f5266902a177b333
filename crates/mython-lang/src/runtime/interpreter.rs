//! Tree-walking interpreter. Executes a parsed `Program` against a `Closure`
//! and writes `print` output to a caller-supplied sink.
//!
//! `return` unwinds through the error channel as `ControlAction::Return` and
//! is caught at the nearest method-call boundary (or at program level).

use std::io::Write;
use std::rc::Rc;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::runtime::object::{is_true, Closure, Object, ObjectHolder, SELF};
use crate::syntax::ast::{BinOp, Expr, Program, Stmt, UnOp};

/// Guest call depth allowed before `RecursionLimit` is raised.
pub const DEFAULT_MAX_DEPTH: usize = 2000;

// Host stack headroom for each guest call.
const RED_ZONE: usize = 100 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

const INIT_METHOD: &str = "__init__";
const STR_METHOD: &str = "__str__";
const ADD_METHOD: &str = "__add__";

/// Non-local exits of statement execution.
#[derive(Debug)]
pub enum ControlAction {
    /// `return` unwinding to the enclosing method call.
    Return(ObjectHolder),
    Error(RuntimeError),
}

impl From<RuntimeError> for ControlAction {
    fn from(e: RuntimeError) -> Self {
        ControlAction::Error(e)
    }
}

type ExecResult = Result<ObjectHolder, ControlAction>;

// ─── Interpreter ──────────────────────────────────────────────────────────────

pub struct Interpreter<'w> {
    output: &'w mut dyn Write,
    depth: usize,
    max_depth: usize,
}

impl<'w> Interpreter<'w> {
    pub fn new(output: &'w mut dyn Write) -> Self {
        Self { output, depth: 0, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run every top-level statement in order. A top-level `return` stops
    /// the program without error.
    pub fn run(&mut self, program: &Program, env: &mut Closure) -> Result<(), RuntimeError> {
        match self.exec_block(&program.body, env) {
            Ok(_) | Err(ControlAction::Return(_)) => Ok(()),
            Err(ControlAction::Error(e)) => Err(e),
        }
    }

    fn exec_block(&mut self, stmts: &[Stmt], env: &mut Closure) -> ExecResult {
        for stmt in stmts {
            self.exec_stmt(stmt, env)?;
        }
        Ok(ObjectHolder::none())
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt, env: &mut Closure) -> ExecResult {
        match stmt {
            Stmt::Assignment { name, value, .. } => {
                let v = self.eval_expr(value, env)?;
                env.insert(name.clone(), v.clone());
                Ok(v)
            }

            Stmt::FieldAssignment { object, field, value, span } => {
                let target = self.eval_expr(object, env)?;
                let obj = target.get().filter(|o| o.as_instance().is_some()).ok_or_else(|| {
                    RuntimeError::new(span.line, RuntimeErrorKind::NotAnInstance { name: describe(object) })
                })?;
                let v = self.eval_expr(value, env)?;
                if let Some(inst) = obj.as_instance() {
                    inst.set_field(field.clone(), v.clone());
                }
                Ok(v)
            }

            Stmt::Print { args, span } => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    let v = self.eval_expr(arg, env)?;
                    parts.push(self.stringify(&v, span.line)?);
                }
                let mut text = parts.join(" ");
                text.push('\n');
                self.output.write_all(text.as_bytes()).map_err(|e| {
                    RuntimeError::new(span.line, RuntimeErrorKind::Io { message: e.to_string() })
                })?;
                Ok(ObjectHolder::none())
            }

            Stmt::Return(value, _) => {
                let v = match value {
                    Some(expr) => self.eval_expr(expr, env)?,
                    None => ObjectHolder::none(),
                };
                Err(ControlAction::Return(v))
            }

            Stmt::IfElse { condition, then_body, else_body, .. } => {
                let cond = self.eval_expr(condition, env)?;
                if is_true(&cond) {
                    self.exec_block(then_body, env)
                } else if let Some(body) = else_body {
                    self.exec_block(body, env)
                } else {
                    Ok(ObjectHolder::none())
                }
            }

            Stmt::ClassDefinition(class, _) => {
                tracing::trace!(class = class.name(), "binding class");
                let v = ObjectHolder::own(Object::Class(class.clone()));
                env.insert(class.name().to_string(), v.clone());
                Ok(v)
            }

            Stmt::Expr(expr) => Ok(self.eval_expr(expr, env)?),
        }
    }

    // ─── Expressions ──────────────────────────────────────────────────────────

    pub fn eval_expr(&mut self, expr: &Expr, env: &mut Closure) -> Result<ObjectHolder, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(ObjectHolder::number(*n)),
            Expr::Str(s, _)    => Ok(ObjectHolder::string(s.clone())),
            Expr::Bool(b, _)   => Ok(ObjectHolder::boolean(*b)),
            Expr::None(_)      => Ok(ObjectHolder::none()),

            Expr::Variable { path, span } => {
                let Some((first, rest)) = path.split_first() else {
                    return Ok(ObjectHolder::none());
                };
                let mut current = env.get(first).cloned().ok_or_else(|| {
                    RuntimeError::new(span.line, RuntimeErrorKind::UndefinedVariable { name: first.clone() })
                })?;
                let mut owner = first;
                for segment in rest {
                    current = field_of(&current, owner, segment, span.line)?;
                    owner = segment;
                }
                Ok(current)
            }

            Expr::Field { object, field, span } => {
                let target = self.eval_expr(object, env)?;
                field_of(&target, &describe(object), field, span.line)
            }

            Expr::MethodCall { object, method, args, span } => {
                let receiver = self.eval_expr(object, env)?;
                if receiver.get().and_then(|o| o.as_instance().map(|_| ())).is_none() {
                    return Err(RuntimeError::new(
                        span.line,
                        RuntimeErrorKind::NotAnInstance { name: describe(object) },
                    ));
                }
                let args = self.eval_args(args, env)?;
                self.call_method(&receiver, method, args, span.line)
            }

            Expr::NewInstance { class, args, span } => {
                tracing::trace!(class = class.name(), "new instance");
                let instance = ObjectHolder::new_instance(class.clone());
                let args = self.eval_args(args, env)?;
                let has_init = class.get_method(INIT_METHOD).is_some_and(|m| m.arity() == args.len());
                if has_init {
                    self.call_method(&instance, INIT_METHOD, args, span.line)?;
                }
                Ok(instance)
            }

            Expr::Stringify(arg, span) => {
                let v = self.eval_expr(arg, env)?;
                Ok(ObjectHolder::string(self.stringify(&v, span.line)?))
            }

            Expr::BinOp { left, op: BinOp::And, right, .. } => {
                let l = self.eval_expr(left, env)?;
                if !is_true(&l) {
                    return Ok(ObjectHolder::boolean(false));
                }
                let r = self.eval_expr(right, env)?;
                Ok(ObjectHolder::boolean(is_true(&r)))
            }

            Expr::BinOp { left, op: BinOp::Or, right, .. } => {
                let l = self.eval_expr(left, env)?;
                if is_true(&l) {
                    return Ok(ObjectHolder::boolean(true));
                }
                let r = self.eval_expr(right, env)?;
                Ok(ObjectHolder::boolean(is_true(&r)))
            }

            Expr::BinOp { left, op, right, span } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                self.arithmetic(*op, l, r, span.line)
            }

            Expr::Compare { left, cmp, right, .. } => {
                let l = self.eval_expr(left, env)?;
                let r = self.eval_expr(right, env)?;
                Ok(ObjectHolder::boolean(cmp.apply(&l, &r)))
            }

            Expr::UnOp { op: UnOp::Not, operand, .. } => {
                let v = self.eval_expr(operand, env)?;
                Ok(ObjectHolder::boolean(!is_true(&v)))
            }

            Expr::UnOp { op: UnOp::Neg, operand, span } => {
                let v = self.eval_expr(operand, env)?;
                let n = v.as_number().ok_or_else(|| {
                    RuntimeError::new(span.line, RuntimeErrorKind::BadOperand { op: "-", operand: v.type_name() })
                })?;
                n.checked_neg().map(ObjectHolder::number).ok_or_else(|| {
                    RuntimeError::new(span.line, RuntimeErrorKind::IntegerOverflow { op: "-" })
                })
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr], env: &mut Closure) -> Result<Vec<ObjectHolder>, RuntimeError> {
        args.iter().map(|a| self.eval_expr(a, env)).collect()
    }

    fn arithmetic(&mut self, op: BinOp, l: ObjectHolder, r: ObjectHolder, line: usize) -> Result<ObjectHolder, RuntimeError> {
        if op == BinOp::Add {
            if has_method(&l, ADD_METHOD, 1) {
                return self.call_method(&l, ADD_METHOD, vec![r], line);
            }
            if has_method(&r, ADD_METHOD, 1) {
                return self.call_method(&r, ADD_METHOD, vec![l], line);
            }
            if let (Some(a), Some(b)) = (l.as_string(), r.as_string()) {
                return Ok(ObjectHolder::string(a + &b));
            }
        }

        let mismatch = || RuntimeError::new(line, RuntimeErrorKind::TypeMismatch {
            op: op.symbol(),
            left: l.type_name(),
            right: r.type_name(),
        });
        let (Some(a), Some(b)) = (l.as_number(), r.as_number()) else {
            return Err(mismatch());
        };

        let result = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Div => {
                if b == 0 {
                    return Err(RuntimeError::new(line, RuntimeErrorKind::DivisionByZero));
                }
                a.checked_div(b)
            }
            BinOp::And | BinOp::Or => return Err(mismatch()),
        };
        result
            .map(ObjectHolder::number)
            .ok_or_else(|| RuntimeError::new(line, RuntimeErrorKind::IntegerOverflow { op: op.symbol() }))
    }

    // ─── Dispatch ─────────────────────────────────────────────────────────────

    /// Invoke `method` on the instance behind `receiver` with already
    /// evaluated arguments. Falling off the end of the body yields `None`.
    #[tracing::instrument(level = "trace", skip(self, receiver, args), fields(argc = args.len()))]
    pub fn call_method(
        &mut self,
        receiver: &ObjectHolder,
        method: &str,
        args: Vec<ObjectHolder>,
        line: usize,
    ) -> Result<ObjectHolder, RuntimeError> {
        let obj = receiver.get().ok_or_else(|| {
            RuntimeError::new(line, RuntimeErrorKind::NotAnInstance { name: "None".into() })
        })?;
        let class = match obj.as_instance() {
            Some(inst) => inst.class().clone(),
            None => {
                return Err(RuntimeError::new(
                    line,
                    RuntimeErrorKind::NotAnInstance { name: obj.type_name().into() },
                ))
            }
        };
        let m = class.get_method(method).ok_or_else(|| {
            RuntimeError::new(line, RuntimeErrorKind::UndefinedMethod {
                class: class.name().to_string(),
                method: method.to_string(),
            })
        })?;
        if m.arity() != args.len() {
            return Err(RuntimeError::new(line, RuntimeErrorKind::ArityMismatch {
                method: method.to_string(),
                expected: m.arity(),
                got: args.len(),
            }));
        }
        if self.depth >= self.max_depth {
            return Err(RuntimeError::new(line, RuntimeErrorKind::RecursionLimit { depth: self.max_depth }));
        }

        let mut frame = Closure::new();
        frame.insert(SELF.to_string(), ObjectHolder::Own(Rc::clone(&obj)));
        for (param, arg) in m.params.iter().zip(args) {
            frame.insert(param.clone(), arg);
        }

        self.depth += 1;
        let result = stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.exec_block(&m.body, &mut frame));
        self.depth -= 1;

        match result {
            Ok(_) => Ok(ObjectHolder::none()),
            Err(ControlAction::Return(v)) => Ok(v),
            Err(ControlAction::Error(e)) => Err(e),
        }
    }

    /// Text `print` writes for a value, dispatching to `__str__` when present.
    pub fn stringify(&mut self, value: &ObjectHolder, line: usize) -> Result<String, RuntimeError> {
        let Some(obj) = value.get() else {
            return Ok("None".to_string());
        };
        match &*obj {
            Object::Instance(inst) if inst.has_method(STR_METHOD, 0) => {
                let text = self.call_method(value, STR_METHOD, Vec::new(), line)?;
                self.stringify(&text, line)
            }
            Object::Class(class) if class.get_method(STR_METHOD).is_some_and(|m| m.arity() == 0) => {
                let transient = ObjectHolder::new_instance(class.clone());
                let text = self.call_method(&transient, STR_METHOD, Vec::new(), line)?;
                self.stringify(&text, line)
            }
            other => Ok(other.to_string()),
        }
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn has_method(holder: &ObjectHolder, name: &str, arity: usize) -> bool {
    holder.get().is_some_and(|o| o.as_instance().is_some_and(|i| i.has_method(name, arity)))
}

/// Field `name` of the instance behind `holder`; `owner` names the holder
/// in diagnostics.
fn field_of(holder: &ObjectHolder, owner: &str, name: &str, line: usize) -> Result<ObjectHolder, RuntimeError> {
    let obj = holder.get();
    let inst = obj.as_deref().and_then(Object::as_instance).ok_or_else(|| {
        RuntimeError::new(line, RuntimeErrorKind::NotAnInstance { name: owner.to_string() })
    })?;
    inst.get_field(name).ok_or_else(|| {
        RuntimeError::new(line, RuntimeErrorKind::UndefinedVariable { name: format!("{owner}.{name}") })
    })
}

/// Short source-like rendering of an expression for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Variable { path, .. } => path.join("."),
        Expr::Field { object, field, .. } => format!("{}.{field}", describe(object)),
        Expr::MethodCall { object, method, .. } => format!("{}.{method}()", describe(object)),
        Expr::NewInstance { class, .. } => format!("{}()", class.name()),
        Expr::None(_) => "None".to_string(),
        _ => "expression".to_string(),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;
    use crate::syntax::parser::Parser;

    fn exec_with(src: &str, max_depth: usize) -> (Result<(), RuntimeError>, String, Closure) {
        let lexer = Lexer::new(src).expect("lex failed");
        let program = Parser::new(lexer).parse().expect("parse failed");
        let mut out = Vec::new();
        let mut env = Closure::new();
        let result = Interpreter::new(&mut out)
            .with_max_depth(max_depth)
            .run(&program, &mut env);
        (result, String::from_utf8(out).expect("utf-8 output"), env)
    }

    fn output(src: &str) -> String {
        let (result, out, _) = exec_with(src, DEFAULT_MAX_DEPTH);
        result.expect("runtime error");
        out
    }

    fn runtime_error(src: &str) -> RuntimeErrorKind {
        exec_with(src, DEFAULT_MAX_DEPTH).0.expect_err("expected runtime error").kind
    }

    #[test]
    fn print_joins_with_spaces() {
        assert_eq!(output("print 1, 'a', True, None"), "1 a True None\n");
        assert_eq!(output("print"), "\n");
    }

    #[test]
    fn assignment_binds_in_env() {
        let (result, _, env) = exec_with("x = 4\ny = x", DEFAULT_MAX_DEPTH);
        assert!(result.is_ok());
        assert_eq!(env.get("y").and_then(ObjectHolder::as_number), Some(4));
        assert!(env["x"].same_object(&env["y"]));
    }

    #[test]
    fn integer_division_truncates() {
        assert_eq!(output("print 7 / 2, -7 / 2"), "3 -3\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(output("print 'ab' + 'cd'"), "abcd\n");
    }

    #[test]
    fn logic_returns_fresh_bools() {
        assert_eq!(output("print 1 and 'x', 0 or '', not None, not 5"), "True False True False\n");
    }

    #[test]
    fn and_short_circuits() {
        // the right side would fail with an undefined name
        assert_eq!(output("print False and missing, True or missing"), "False True\n");
    }

    #[test]
    fn comparisons_yield_bools() {
        assert_eq!(output("print 1 < 2, 'b' >= 'a', 1 == '1', None != None"), "True True False True\n");
    }

    #[test]
    fn if_without_else_runs_nothing() {
        assert_eq!(output("if 0:\n  print 1\nprint 2"), "2\n");
    }

    #[test]
    fn str_builtin_matches_print() {
        assert_eq!(output("print str(12) + '!', str(None), str(False)"), "12! None False\n");
    }

    #[test]
    fn method_frames_are_isolated() {
        let src = "\
class A:
  def f(x):
    y = x + 1
    return y
a = A()
y = 10
print a.f(1), y
";
        assert_eq!(output(src), "2 10\n");
    }

    #[test]
    fn init_only_runs_with_matching_arity() {
        let src = "\
class P:
  def __init__(v):
    self.v = v
p = P()
print p.v
";
        assert!(matches!(runtime_error(src), RuntimeErrorKind::UndefinedVariable { ref name } if name == "p.v"));
    }

    #[test]
    fn add_dispatches_on_either_side() {
        let src = "\
class V:
  def __init__(n):
    self.n = n
  def __add__(other):
    return self.n + other
v = V(5)
print v + 1, 2 + v
";
        assert_eq!(output(src), "6 7\n");
    }

    #[test]
    fn str_dispatch_and_fallback() {
        let src = "\
class Named:
  def __str__():
    return 'named'
class Plain:
  def f():
    return 0
print Named(), Named
p = Plain()
print Plain
";
        let out = output(&(src.to_string() + "print p\n"));
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("named named"));
        assert_eq!(lines.next(), Some("<class 'Plain'>"));
        assert!(lines.next().is_some_and(|l| l.starts_with("<Plain object at 0x")));
    }

    #[test]
    fn return_in_nested_if_ends_only_that_frame() {
        let src = "\
class Counter:
  def count(n):
    if n > 0:
      if n > 100:
        return 0
      return 1 + self.count(n - 1)
    return 0
print Counter().count(10)
";
        assert_eq!(output(src), "10\n");
    }

    #[test]
    fn top_level_return_stops_program() {
        assert_eq!(output("print 1\nreturn\nprint 2"), "1\n");
    }

    #[test]
    fn class_definition_binds_name() {
        let (result, _, env) = exec_with("class A:\n  def f():\n    return 1\n", DEFAULT_MAX_DEPTH);
        assert!(result.is_ok());
        assert_eq!(env.get("A").map(ObjectHolder::type_name), Some("Class"));
    }

    #[test]
    fn recursion_limit() {
        let src = "\
class Loop:
  def go():
    return self.go()
Loop().go()
";
        let (result, _, _) = exec_with(src, 50);
        assert_eq!(result.map_err(|e| e.kind), Err(RuntimeErrorKind::RecursionLimit { depth: 50 }));
    }

    #[test]
    fn runtime_errors() {
        assert_eq!(runtime_error("print x"), RuntimeErrorKind::UndefinedVariable { name: "x".into() });
        assert_eq!(runtime_error("print 1 / 0"), RuntimeErrorKind::DivisionByZero);
        assert_eq!(
            runtime_error("print 1 + 'a'"),
            RuntimeErrorKind::TypeMismatch { op: "+", left: "Number", right: "String" },
        );
        assert_eq!(runtime_error("print -'a'"), RuntimeErrorKind::BadOperand { op: "-", operand: "String" });
        assert_eq!(
            runtime_error("print 9223372036854775807 + 1"),
            RuntimeErrorKind::IntegerOverflow { op: "+" },
        );
        assert_eq!(runtime_error("x = 1\nx.y = 2"), RuntimeErrorKind::NotAnInstance { name: "x".into() });
        assert_eq!(runtime_error("x = 1\nprint x.y"), RuntimeErrorKind::NotAnInstance { name: "x".into() });
    }

    #[test]
    fn method_errors() {
        let class = "class A:\n  def f(a):\n    return a\n";
        assert_eq!(
            runtime_error(&format!("{class}A().g()")),
            RuntimeErrorKind::UndefinedMethod { class: "A".into(), method: "g".into() },
        );
        assert_eq!(
            runtime_error(&format!("{class}A().f()")),
            RuntimeErrorKind::ArityMismatch { method: "f".into(), expected: 1, got: 0 },
        );
        assert_eq!(runtime_error("x = None\nx.f()"), RuntimeErrorKind::NotAnInstance { name: "x".into() });
    }

    #[test]
    fn error_carries_line() {
        let (result, out, _) = exec_with("print 1\n\nprint 2 / 0", DEFAULT_MAX_DEPTH);
        assert_eq!(out, "1\n");
        assert_eq!(result.map_err(|e| e.line), Err(3));
    }
}
