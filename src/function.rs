//! User-defined and native callables (spec.md §4.6).

use std::cell::RefCell;
use std::fmt::{self, Debug, Display};
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::{ControlFlow, RuntimeError, Signal};
use crate::interpreter::Interpreter;
use crate::object::{Callable, Value};
use crate::stmt::FunctionStmt;
use crate::token::Token;

/// A user-declared function or method, closed over the environment frame in
/// which it was declared (spec.md §4.3 "Closures").
#[derive(Debug, Clone)]
pub struct Function {
    declaration: Rc<FunctionStmt>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionStmt>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function { declaration, closure, is_initializer }
    }

    /// Produces a copy of this method with a fresh closure frame that binds
    /// `this` to `instance` (spec.md §4.7 "Method binding").
    pub fn bind(&self, instance: Value) -> Function {
        let environment = Rc::new(RefCell::new(Environment::new(Some(self.closure.clone()))));
        environment.borrow_mut().define("this", instance);
        Function::new(self.declaration.clone(), environment, self.is_initializer)
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
}

impl Callable for Function {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let environment = Rc::new(RefCell::new(Environment::new(Some(self.closure.clone()))));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.borrow_mut().define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => {}
            Err(ControlFlow::Signal(Signal::Return(value))) => {
                if self.is_initializer {
                    return self.closure.borrow().get_at(0, &this_token());
                }
                return Ok(value);
            }
            Err(ControlFlow::Error(error)) => return Err(error),
            Err(ControlFlow::Signal(Signal::Break | Signal::Continue)) => {
                unreachable!("resolver rejects break/continue outside a loop")
            }
        }

        if self.is_initializer {
            return self.closure.borrow().get_at(0, &this_token());
        }

        Ok(Value::Nil)
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

fn this_token() -> Token {
    Token::from_identifier("this")
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// A builtin installed by the host (spec.md §4.8 "Pluggable natives"). Boxed
/// as `Rc<dyn Fn>` rather than a bare function pointer so natives can close
/// over configuration (e.g. which builtins are disabled).
pub struct NativeFunction {
    name: String,
    arity: usize,
    function: Rc<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        function: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        NativeFunction { name: name.into(), arity, function: Rc::new(function) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Callable for NativeFunction {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.function)(interpreter, arguments)
    }

    fn arity(&self) -> usize {
        self.arity
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Type;

    fn stmt(name: &str, params: Vec<&str>) -> Rc<FunctionStmt> {
        Rc::new(FunctionStmt {
            name: Token::new(Type::Identifier, name.to_string(), None, 1),
            params: params
                .into_iter()
                .map(|p| Token::new(Type::Identifier, p.to_string(), None, 1))
                .collect(),
            body: Vec::new(),
        })
    }

    #[test]
    fn arity_matches_declared_params() {
        let closure = Rc::new(RefCell::new(Environment::new(None)));
        let function = Function::new(stmt("f", vec!["a", "b"]), closure, false);
        assert_eq!(function.arity(), 2);
    }

    #[test]
    fn bind_defines_this_in_a_fresh_frame_without_mutating_the_original() {
        let closure = Rc::new(RefCell::new(Environment::new(None)));
        let method = Function::new(stmt("greet", vec![]), closure.clone(), false);
        let bound = method.bind(Value::from("an instance"));

        assert_eq!(bound.closure.borrow().get(&this_token()).unwrap(), Value::from("an instance"));
        assert!(closure.borrow().get(&this_token()).is_err());
    }

    #[test]
    fn display_matches_expected_form() {
        let closure = Rc::new(RefCell::new(Environment::new(None)));
        let function = Function::new(stmt("greet", vec![]), closure, false);
        assert_eq!(function.to_string(), "<fn greet>");
    }
}
