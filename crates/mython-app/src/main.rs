use std::io::{self, BufWriter, Read, Write};
use std::process::ExitCode;
use std::{env, fs};

use mython_lang::{Closure, DEFAULT_MAX_DEPTH};

const EXIT_USAGE: u8 = 64;
const EXIT_PARSE: u8 = 65;
const EXIT_RUNTIME: u8 = 70;
const EXIT_IO: u8 = 1;

/// Overrides the interpreter's guest call-depth limit.
const MAX_DEPTH_VAR: &str = "MYTHON_MAX_DEPTH";

/// Enable with `RUST_LOG=mython_lang=debug` or `RUST_LOG=mython_lang=trace`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn max_depth() -> usize {
    match env::var(MAX_DEPTH_VAR) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, "ignoring invalid {MAX_DEPTH_VAR}");
            DEFAULT_MAX_DEPTH
        }),
        Err(_) => DEFAULT_MAX_DEPTH,
    }
}

fn read_source(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(source)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() > 1 {
        eprintln!("usage: mython [FILE]");
        return ExitCode::from(EXIT_USAGE);
    }
    let path = args.first().map(String::as_str);

    let source = match read_source(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("mython: cannot read {}: {e}", path.unwrap_or("<stdin>"));
            return ExitCode::from(EXIT_IO);
        }
    };

    let program = match mython_lang::parse(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(EXIT_PARSE);
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut globals = Closure::new();
    let result = mython_lang::execute_with_depth(&program, &mut globals, &mut out, max_depth());

    if let Err(e) = out.flush() {
        eprintln!("mython: cannot write output: {e}");
        return ExitCode::from(EXIT_IO);
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}
