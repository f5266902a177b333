pub mod syntax;
pub mod runtime;
pub mod error;

pub use error::{Error, ErrorCode, RunError, RuntimeError, RuntimeErrorKind};
pub use syntax::ast::Program;
pub use syntax::token::{Token, TokenKind};
pub use runtime::object::{Closure, Object, ObjectHolder};
pub use runtime::interpreter::{Interpreter, DEFAULT_MAX_DEPTH};

use std::io::Write;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Lex and parse source text. Classes are resolved while parsing, so an
/// unknown class name is reported here rather than at run time.
pub fn parse(source: &str) -> Result<Program, Error> {
    let _span = tracing::debug_span!("parse", bytes = source.len()).entered();
    let lexer = syntax::lexer::Lexer::new(source)?;
    let program = syntax::parser::Parser::new(lexer).parse()?;
    tracing::debug!(statements = program.body.len(), "parsed");
    Ok(program)
}

/// Execute a parsed program against `env`, writing `print` output to `output`.
pub fn execute(program: &Program, env: &mut Closure, output: &mut dyn Write) -> Result<(), RuntimeError> {
    execute_with_depth(program, env, output, DEFAULT_MAX_DEPTH)
}

/// `execute` with an explicit guest call-depth limit.
pub fn execute_with_depth(
    program: &Program,
    env: &mut Closure,
    output: &mut dyn Write,
    max_depth: usize,
) -> Result<(), RuntimeError> {
    let _span = tracing::debug_span!("execute", max_depth).entered();
    Interpreter::new(output).with_max_depth(max_depth).run(program, env)
}

/// Parse and execute in a fresh top-level environment, returning that
/// environment once the program finishes.
pub fn run(source: &str, output: &mut dyn Write) -> Result<Closure, RunError> {
    let program = parse(source)?;
    let mut env = Closure::new();
    execute(&program, &mut env, output)?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_returns_globals() {
        let mut out = Vec::new();
        let env = run("x = 2 * 21\nprint x", &mut out).expect("run failed");
        assert_eq!(out, b"42\n");
        assert_eq!(env.get("x").and_then(ObjectHolder::as_number), Some(42));
    }

    #[test]
    fn parse_error_executes_nothing() {
        let mut out = Vec::new();
        let err = run("print 1\nprint (", &mut out).unwrap_err();
        assert!(matches!(err, RunError::Parse(ref e) if e.code == ErrorCode::P001));
        assert!(out.is_empty());
    }

    #[test]
    fn runtime_error_keeps_earlier_output() {
        let mut out = Vec::new();
        let err = run("print 1\nprint y", &mut out).unwrap_err();
        assert!(matches!(err, RunError::Runtime(ref e) if e.line == 2));
        assert_eq!(out, b"1\n");
    }

    #[test]
    fn execute_shares_environment_across_programs() {
        let mut env = Closure::new();
        let mut out = Vec::new();
        let first = parse("count = 1").expect("parse");
        let second = parse("print count + 1").expect("parse");
        execute(&first, &mut env, &mut out).expect("first");
        execute(&second, &mut env, &mut out).expect("second");
        assert_eq!(out, b"2\n");
    }
}
