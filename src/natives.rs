//! Pluggable native builtins (spec.md §4.8): installed into the global
//! environment by the driver, never referenced from the core interpreter.
//!
//! Grounded in `examples/original_source/plox/native.py`'s `Pow`/`Clock`,
//! extended with the handful of extras a usable REPL needs.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::function::NativeFunction;
use crate::object::Value;
use crate::token::Token;

/// Defines every builtin not named in `config.disabled_natives` on `globals`.
pub fn install(globals: &mut Environment, config: &Config) {
    let natives: Vec<NativeFunction> = vec![
        NativeFunction::new("clock", 0, clock),
        NativeFunction::new("pow", 2, pow),
        NativeFunction::new("abs", 1, abs),
        NativeFunction::new("input", 1, input),
        NativeFunction::new("exit", 1, exit),
    ];

    for native in natives {
        if config.disabled_natives.iter().any(|name| name == native.name()) {
            continue;
        }
        let name = native.name().to_string();
        globals.define(&name, Value::NativeFunction(std::rc::Rc::new(native)));
    }
}

fn clock(_interpreter: &mut crate::interpreter::Interpreter, _arguments: Vec<Value>) -> Result<Value, RuntimeError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch");
    Ok(Value::Number(elapsed.as_secs_f64()))
}

fn pow(_interpreter: &mut crate::interpreter::Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
    let base = expect_number(&arguments, 0)?;
    let exponent = expect_number(&arguments, 1)?;
    Ok(Value::Number(base.powf(exponent)))
}

fn abs(_interpreter: &mut crate::interpreter::Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(expect_number(&arguments, 0)?.abs()))
}

/// Writes the prompt without a trailing newline, then reads one line from
/// stdin, stripped of its trailing newline. Always returns a string; spec.md
/// §9 leaves numeric coercion to the builtin and this one declines it.
fn input(_interpreter: &mut crate::interpreter::Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
    let prompt = arguments.first().map(|v| v.to_string()).unwrap_or_default();
    print!("{prompt}");
    io::stdout().flush().ok();

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| RuntimeError::new(native_token("input"), format!("Failed to read stdin: {e}")))?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(Value::from(line))
}

fn exit(_interpreter: &mut crate::interpreter::Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
    let code = expect_number(&arguments, 0)? as i32;
    io::stdout().flush().ok();
    std::process::exit(code);
}

fn expect_number(arguments: &[Value], index: usize) -> Result<f64, RuntimeError> {
    arguments
        .get(index)
        .and_then(Value::as_number)
        .ok_or_else(|| RuntimeError::new(native_token("native"), "Expected a number argument"))
}

fn native_token(name: &str) -> Token {
    Token::from_identifier(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    #[test]
    fn clock_returns_a_non_negative_number() {
        let mut interpreter = Interpreter::new();
        let value = clock(&mut interpreter, Vec::new()).unwrap();
        assert!(matches!(value, Value::Number(n) if n >= 0.0));
    }

    #[test]
    fn pow_matches_powf() {
        let mut interpreter = Interpreter::new();
        let value = pow(&mut interpreter, vec![Value::Number(2.0), Value::Number(10.0)]).unwrap();
        assert_eq!(value, Value::Number(1024.0));
    }

    #[test]
    fn abs_rejects_non_numeric_argument() {
        let mut interpreter = Interpreter::new();
        assert!(abs(&mut interpreter, vec![Value::from("nope")]).is_err());
    }

    #[test]
    fn disabled_native_is_not_installed() {
        let mut globals = Environment::new(None);
        let config = Config { disabled_natives: vec!["exit".to_string()], ..Config::default() };
        install(&mut globals, &config);
        assert!(globals.get(&Token::from_identifier("clock")).is_ok());
        assert!(globals.get(&Token::from_identifier("exit")).is_err());
    }
}
