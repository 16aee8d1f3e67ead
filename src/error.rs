//! Error types and the host-provided diagnostic sink.
//!
//! The scanner, parser, resolver and interpreter never print or track error
//! flags themselves; they report through `&mut dyn ErrorSink`. [`Diagnostics`]
//! is this crate's own sink (stderr + flags), but any host embedding the
//! interpreter can supply another.

use thiserror::Error;

use crate::object::Value;
use crate::token::{Token, Type};

/// A malformed token: an unterminated string, a stray character, etc.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

/// A syntax error raised while parsing a token stream into statements.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

/// A static-scope violation caught by the resolver.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

/// A type mismatch, arity mismatch, or other error only detectable while
/// executing the resolved AST.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError { token, message: message.into() }
    }
}

/// The collaborator spec.md calls the "host sink": receives `(line,
/// location, message)`-shaped diagnostics from every phase of the pipeline.
/// Implementations decide how (or whether) to surface them and are
/// responsible for tracking whatever pass/fail state the host needs.
pub trait ErrorSink {
    fn scan_error(&mut self, error: &ScanError);
    fn parse_error(&mut self, error: &ParseError);
    fn resolve_error(&mut self, error: &ResolveError);
    fn runtime_error(&mut self, error: &RuntimeError);
}

/// The default sink: writes to stderr in `[line N] Error ...` form and
/// tracks whether a static error (scan/parse/resolve) or a runtime error was
/// seen, so the driver can pick the right exit code (spec.md §6/§7).
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears both flags. Used by the REPL between submissions so that one
    /// bad line doesn't poison the rest of the session (spec.md §6).
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    fn location(token: &Token) -> String {
        if token.r#type == Type::Eof {
            "at end".to_string()
        } else {
            format!("at '{}'", token.lexeme)
        }
    }
}

impl ErrorSink for Diagnostics {
    fn scan_error(&mut self, error: &ScanError) {
        eprintln!("[line {}] Error: {}", error.line, error.message);
        self.had_error = true;
    }

    fn parse_error(&mut self, error: &ParseError) {
        eprintln!(
            "[line {}] Error {}: {}",
            error.token.line,
            Self::location(&error.token),
            error.message
        );
        self.had_error = true;
    }

    fn resolve_error(&mut self, error: &ResolveError) {
        eprintln!(
            "[line {}] Error {}: {}",
            error.token.line,
            Self::location(&error.token),
            error.message
        );
        self.had_error = true;
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        eprintln!("[line {}] {}", error.token.line, error.message);
        self.had_runtime_error = true;
    }
}

/// A non-local exit triggered by `return`, `break`, or `continue`. These are
/// control-flow, not diagnostics: they must never reach an [`ErrorSink`].
#[derive(Debug, Clone)]
pub enum Signal {
    Return(Value),
    Break,
    Continue,
}

/// What can interrupt ordinary statement execution: either an error bound
/// for the host sink, or a control-flow signal bound for the nearest
/// enclosing loop/function.
#[derive(Debug)]
pub enum ControlFlow {
    Error(RuntimeError),
    Signal(Signal),
}

impl From<RuntimeError> for ControlFlow {
    fn from(error: RuntimeError) -> Self {
        ControlFlow::Error(error)
    }
}

pub type ExecResult = Result<(), ControlFlow>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Type;

    #[test]
    fn runtime_error_sets_only_runtime_flag() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.runtime_error(&RuntimeError::new(
            Token::new(Type::Identifier, "x".into(), None, 1),
            "undefined variable 'x'",
        ));
        assert!(diagnostics.had_runtime_error());
        assert!(!diagnostics.had_error());
    }

    #[test]
    fn reset_clears_both_flags() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.scan_error(&ScanError { line: 1, message: "bad".into() });
        diagnostics.reset();
        assert!(!diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
    }
}
