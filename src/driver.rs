//! Host glue: file mode and REPL (spec.md §6 "External interfaces"). Wires
//! together the scanner/parser/resolver/interpreter pipeline and installs
//! the native builtins; nothing in the core crate depends on this module.

use std::fs;
use std::path::Path;

use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::Editor;
use tracing::{debug, warn};

use crate::ast_printer;
use crate::config::Config;
use crate::error::{Diagnostics, ErrorSink};
use crate::interpreter::Interpreter;
use crate::natives;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;

type ReplEditor = Editor<(), FileHistory>;

pub const EX_USAGE: i32 = 64;
pub const EX_DATAERR: i32 = 65;
pub const EX_SOFTWARE: i32 = 70;

fn new_interpreter(config: &Config) -> Interpreter {
    let mut interpreter = Interpreter::new();
    natives::install(&mut interpreter.globals.borrow_mut(), config);
    interpreter
}

/// Parses `source` without resolving or running it, for `--ast` dumps.
fn parse_only(source: &str, sink: &mut dyn ErrorSink) -> Vec<Stmt> {
    let tokens = Scanner::new(source).scan_tokens(sink);
    Parser::new(tokens).parse(sink)
}

/// Runs the full pipeline over `source`, gating each phase on the previous
/// one's error flag (spec.md §7 "Propagation").
fn run_source(source: &str, interpreter: &mut Interpreter, sink: &mut Diagnostics) {
    let tokens = Scanner::new(source).scan_tokens(sink);
    if sink.had_error() {
        return;
    }

    let statements = Parser::new(tokens).parse(sink);
    if sink.had_error() {
        return;
    }

    Resolver::new(interpreter).resolve(&statements, sink);
    if sink.had_error() {
        return;
    }

    interpreter.interpret(&statements, sink);
}

/// Reads and runs a script file, exiting with spec.md §6's exit-code
/// convention: 65 for a static error, 70 for a runtime error, 0 on success.
pub fn run_file(path: &Path, config: &Config, ast_mode: bool) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Could not read {}: {error}", path.display());
            return EX_USAGE;
        }
    };

    let mut sink = Diagnostics::new();

    if ast_mode {
        let statements = parse_only(&source, &mut sink);
        if sink.had_error() {
            return EX_DATAERR;
        }
        println!("{}", ast_printer::print_program(&statements));
        return 0;
    }

    let mut interpreter = new_interpreter(config);
    run_source(&source, &mut interpreter, &mut sink);

    if sink.had_error() {
        EX_DATAERR
    } else if sink.had_runtime_error() {
        EX_SOFTWARE
    } else {
        0
    }
}

/// Interactive REPL. Reads a line; if it ends with `{`, keeps reading
/// continuation lines until the naive brace count returns to zero, then
/// submits the aggregate. Errors are reported but the session continues.
pub fn run_repl(config: &Config) {
    let mut editor = ReplEditor::new().expect("failed to initialize line editor");
    let history_path = config.history_file.clone().or_else(default_history_path);

    if let Some(path) = &history_path {
        if editor.load_history(path).is_err() {
            debug!("no existing REPL history at {}", path.display());
        }
    }

    let mut interpreter = new_interpreter(config);
    println!("glyph REPL -- Ctrl-D to exit");

    loop {
        match read_submission(&mut editor) {
            Ok(Some(source)) => {
                if source.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(source.as_str()).ok();

                let mut sink = Diagnostics::new();
                run_source(&source, &mut interpreter, &mut sink);
            }
            Ok(None) => break,
            Err(error) => {
                warn!("REPL read error: {error}");
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        editor.save_history(path).ok();
    }
}

fn read_submission(editor: &mut ReplEditor) -> Result<Option<String>, ReadlineError> {
    let mut buffer = String::new();
    let mut depth: i32 = 0;

    loop {
        let prompt = if depth > 0 { "... " } else { "> " };
        match editor.readline(prompt) {
            Ok(line) => {
                depth += brace_delta(&line);
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if depth <= 0 {
                    return Ok(Some(buffer));
                }
            }
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => return Ok(None),
            Err(error) => return Err(error),
        }
    }
}

fn brace_delta(line: &str) -> i32 {
    let trimmed = line.trim_end();
    if trimmed.ends_with('{') {
        1
    } else if trimmed.ends_with('}') {
        -1
    } else {
        0
    }
}

fn default_history_path() -> Option<std::path::PathBuf> {
    home::home_dir().map(|home| home.join(".glyph_history"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brace_delta_tracks_open_and_close() {
        assert_eq!(brace_delta("fun f() {"), 1);
        assert_eq!(brace_delta("}"), -1);
        assert_eq!(brace_delta("print 1;"), 0);
    }

    #[test]
    fn run_source_stops_before_interpreting_on_a_parse_error() {
        let mut interpreter = new_interpreter(&Config::default());
        let mut sink = Diagnostics::new();
        run_source("1 +;", &mut interpreter, &mut sink);
        assert!(sink.had_error());
        assert!(!sink.had_runtime_error());
    }

    #[test]
    fn run_source_reports_runtime_errors_without_a_static_flag() {
        let mut interpreter = new_interpreter(&Config::default());
        let mut sink = Diagnostics::new();
        run_source("undefined_name;", &mut interpreter, &mut sink);
        assert!(!sink.had_error());
        assert!(sink.had_runtime_error());
    }
}

