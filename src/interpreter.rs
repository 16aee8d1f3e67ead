//! The tree-walking evaluator (spec.md §4.5): executes a resolved AST
//! against a chain of lexical environments.

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{ControlFlow, ErrorSink, ExecResult, RuntimeError, Signal};
use crate::expr::{BinaryExpr, CallExpr, Expr, ExprId, LiteralValue, SuperExpr};
use crate::function::Function;
use crate::object::Value;
use crate::stmt::Stmt;
use crate::token::{Token, Type};

pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new(None)));
        Interpreter { globals: globals.clone(), environment: globals, locals: HashMap::new() }
    }

    /// Records that the expression identified by `id` resolves `depth`
    /// frames out from wherever it executes (populated by the resolver).
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    /// Executes every top-level statement. A runtime error aborts the rest
    /// of the program and is reported through `sink`; a stray control-flow
    /// signal at the top level is a resolver bug, not a user error.
    pub fn interpret(&mut self, statements: &[Stmt], sink: &mut dyn ErrorSink) {
        for statement in statements {
            if let Err(control_flow) = self.execute(statement) {
                if let ControlFlow::Error(error) = control_flow {
                    sink.runtime_error(&error);
                }
                return;
            }
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{value}");
                Ok(())
            }
            Stmt::Var(var) => {
                let value = match &var.initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(&var.name.lexeme, value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let environment =
                    Rc::new(RefCell::new(Environment::new(Some(self.environment.clone()))));
                self.execute_block(statements, environment)
            }
            Stmt::If(if_stmt) => {
                if self.evaluate(&if_stmt.condition)?.is_truthy() {
                    self.execute(&if_stmt.then_branch)
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While(while_stmt) => {
                while self.evaluate(&while_stmt.condition)?.is_truthy() {
                    match self.execute(&while_stmt.body) {
                        Ok(()) => {}
                        Err(ControlFlow::Signal(Signal::Break)) => break,
                        Err(ControlFlow::Signal(Signal::Continue)) => {
                            if let Some(increment) = &while_stmt.increment {
                                self.evaluate(increment)?;
                            }
                            continue;
                        }
                        Err(other) => return Err(other),
                    }
                    if let Some(increment) = &while_stmt.increment {
                        self.evaluate(increment)?;
                    }
                }
                Ok(())
            }
            Stmt::Break(_) => Err(ControlFlow::Signal(Signal::Break)),
            Stmt::Continue(_) => Err(ControlFlow::Signal(Signal::Continue)),
            Stmt::Return(return_stmt) => {
                let value = match &return_stmt.value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(ControlFlow::Signal(Signal::Return(value)))
            }
            Stmt::Function(function_stmt) => {
                let function = Function::new(function_stmt.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&function_stmt.name.lexeme, Value::Function(Rc::new(function)));
                Ok(())
            }
            Stmt::Class(class_stmt) => self.execute_class(class_stmt),
        }
    }

    fn execute_class(&mut self, class_stmt: &crate::stmt::ClassStmt) -> ExecResult {
        self.environment.borrow_mut().define(&class_stmt.name.lexeme, Value::Nil);

        let superclass = match &class_stmt.superclass {
            Some(expr) => {
                let value = self.evaluate(expr)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        let token = expr.token().cloned().unwrap_or_else(|| class_stmt.name.clone());
                        return Err(RuntimeError::new(token, "Superclass must be a class").into());
                    }
                }
            }
            None => None,
        };

        let previous_environment = self.environment.clone();
        if let Some(superclass) = &superclass {
            self.environment =
                Rc::new(RefCell::new(Environment::new(Some(previous_environment.clone()))));
            self.environment.borrow_mut().define("super", Value::Class(superclass.clone()));
        }

        let mut methods = HashMap::new();
        for method in &class_stmt.methods {
            let is_initializer = method.name.lexeme == "init";
            let function = Function::new(method.clone(), self.environment.clone(), is_initializer);
            methods.insert(method.name.lexeme.clone(), function);
        }

        if superclass.is_some() {
            self.environment = previous_environment;
        }

        let class = Value::Class(Rc::new(RefCell::new(Class::new(
            class_stmt.name.lexeme.clone(),
            superclass,
            methods,
        ))));
        self.environment.borrow_mut().assign(&class_stmt.name, class)?;
        Ok(())
    }

    /// Installs `environment` as current for the duration of `statements`,
    /// restoring the previous frame on every exit path (spec.md §5 "Scoped
    /// acquisition").
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> ExecResult {
        let previous = mem::replace(&mut self.environment, environment);

        let mut result = Ok(());
        for statement in statements {
            if let Err(error) = self.execute(statement) {
                result = Err(error);
                break;
            }
        }

        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_to_value(literal)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary(unary) => {
                let right = self.evaluate(&unary.right)?;
                match unary.operator.r#type {
                    Type::Minus => Ok(Value::Number(-expect_number(&unary.operator, &right)?)),
                    Type::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("scanner/parser only produce '-' and '!' as unary operators"),
                }
            }
            Expr::Binary(binary) => self.evaluate_binary(binary),
            Expr::Logical(logical) => {
                let left = self.evaluate(&logical.left)?;
                match logical.operator.r#type {
                    Type::Or if left.is_truthy() => Ok(left),
                    Type::And if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(&logical.right),
                }
            }
            Expr::Variable(variable) => self.look_up_variable(variable.id, &variable.name),
            Expr::Assign(assign) => {
                let value = self.evaluate(&assign.value)?;
                self.assign_variable(assign.id, &assign.name, value.clone())?;
                Ok(value)
            }
            Expr::Call(call) => self.evaluate_call(call),
            Expr::Get(get) => {
                let object = self.evaluate(&get.object)?;
                match object {
                    Value::Instance(instance) => {
                        let this = Value::Instance(instance.clone());
                        instance.borrow().get(&get.name, this)
                    }
                    _ => Err(RuntimeError::new(get.name.clone(), "Only instances have properties")),
                }
            }
            Expr::Set(set) => {
                let object = self.evaluate(&set.object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::new(set.name.clone(), "Only instances have fields"));
                };
                let value = self.evaluate(&set.value)?;
                instance.borrow_mut().set(&set.name, value.clone());
                Ok(value)
            }
            Expr::This(this) => self.look_up_variable(this.id, &this.keyword),
            Expr::Super(super_expr) => self.evaluate_super(super_expr),
        }
    }

    fn evaluate_binary(&mut self, binary: &BinaryExpr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        let op = &binary.operator;

        match op.r#type {
            Type::Greater => Ok(Value::Bool(expect_number(op, &left)? > expect_number(op, &right)?)),
            Type::GreaterEqual => Ok(Value::Bool(expect_number(op, &left)? >= expect_number(op, &right)?)),
            Type::Less => Ok(Value::Bool(expect_number(op, &left)? < expect_number(op, &right)?)),
            Type::LessEqual => Ok(Value::Bool(expect_number(op, &left)? <= expect_number(op, &right)?)),
            Type::Slash => Ok(Value::Number(expect_number(op, &left)? / expect_number(op, &right)?)),
            Type::Star => Ok(Value::Number(expect_number(op, &left)? * expect_number(op, &right)?)),
            Type::Minus => Ok(Value::Number(expect_number(op, &left)? - expect_number(op, &right)?)),
            Type::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::from(format!("{left}{right}"))),
                _ => Err(RuntimeError::new(op.clone(), "Operands must be numbers or strings")),
            },
            Type::EqualEqual => Ok(Value::Bool(left == right)),
            Type::BangEqual => Ok(Value::Bool(left != right)),
            _ => unreachable!("parser only produces comparison/arithmetic operators here"),
        }
    }

    fn evaluate_call(&mut self, call: &CallExpr) -> Result<Value, RuntimeError> {
        let callee = self.evaluate(&call.callee)?;

        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let Some(callable) = callee.as_callable() else {
            return Err(RuntimeError::new(call.paren.clone(), "Can only call functions and classes"));
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                call.paren.clone(),
                format!("Expected {} arguments but got {}", callable.arity(), arguments.len()),
            ));
        }

        callable.call(self, arguments)
    }

    fn evaluate_super(&mut self, super_expr: &SuperExpr) -> Result<Value, RuntimeError> {
        let depth = *self
            .locals
            .get(&super_expr.id)
            .expect("resolver always assigns 'super' a depth");

        let superclass = self.environment.borrow().get_at(depth, &super_expr.keyword)?;
        let Value::Class(superclass) = superclass else {
            unreachable!("'super' always resolves to a class value")
        };

        let this = self.environment.borrow().get_at(depth - 1, &this_token())?;

        let method = superclass.borrow().find_method(&super_expr.method.lexeme).ok_or_else(|| {
            RuntimeError::new(
                super_expr.method.clone(),
                format!("Undefined property '{}'", super_expr.method.lexeme),
            )
        })?;

        Ok(Value::Function(Rc::new(method.bind(this))))
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&depth) => self.environment.borrow().get_at(depth, name),
            None => self.globals.borrow().get(name),
        }
    }

    fn assign_variable(&mut self, id: ExprId, name: &Token, value: Value) -> Result<(), RuntimeError> {
        match self.locals.get(&id) {
            Some(&depth) => {
                self.environment.borrow_mut().assign_at(depth, name, value);
                Ok(())
            }
            None => self.globals.borrow_mut().assign(name, value),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn this_token() -> Token {
    Token::from_identifier("this")
}

fn literal_to_value(literal: &LiteralValue) -> Value {
    match literal {
        LiteralValue::Nil => Value::Nil,
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::from(s.clone()),
    }
}

fn expect_number(token: &Token, value: &Value) -> Result<f64, RuntimeError> {
    value.as_number().ok_or_else(|| RuntimeError::new(token.clone(), "Operands must be numbers"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::expr::{BinaryExpr, UnaryExpr};
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    #[test]
    fn evaluate_literal() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Literal(LiteralValue::Number(12.0));
        assert_eq!(interpreter.evaluate(&expr).unwrap(), Value::Number(12.0));
    }

    #[test]
    fn evaluate_unary_minus() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Unary(UnaryExpr {
            operator: Token::new(Type::Minus, "-".to_string(), None, 1),
            right: Box::new(Expr::Literal(LiteralValue::Number(12.0))),
        });
        assert_eq!(interpreter.evaluate(&expr).unwrap(), Value::Number(-12.0));
    }

    #[test]
    fn evaluate_binary_subtraction() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::Literal(LiteralValue::Number(6.0))),
            operator: Token::new(Type::Minus, "-".to_string(), None, 1),
            right: Box::new(Expr::Literal(LiteralValue::Number(2.0))),
        });
        assert_eq!(interpreter.evaluate(&expr).unwrap(), Value::Number(4.0));
    }

    #[test]
    fn plus_concatenates_when_either_side_is_a_string() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::Literal(LiteralValue::String("count: ".to_string()))),
            operator: Token::new(Type::Plus, "+".to_string(), None, 1),
            right: Box::new(Expr::Literal(LiteralValue::Number(3.0))),
        });
        assert_eq!(interpreter.evaluate(&expr).unwrap(), Value::from("count: 3"));
    }

    #[test]
    fn plus_on_non_numeric_non_string_operands_is_a_runtime_error() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::Literal(LiteralValue::Bool(true))),
            operator: Token::new(Type::Plus, "+".to_string(), None, 1),
            right: Box::new(Expr::Literal(LiteralValue::Bool(false))),
        });
        assert!(interpreter.evaluate(&expr).is_err());
    }

    #[test]
    fn comparison_requires_numbers() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::Literal(LiteralValue::String("a".to_string()))),
            operator: Token::new(Type::Less, "<".to_string(), None, 1),
            right: Box::new(Expr::Literal(LiteralValue::Number(1.0))),
        });
        assert!(interpreter.evaluate(&expr).is_err());
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let mut interpreter = Interpreter::new();
        let expr = Expr::variable(Token::from_identifier("missing"));
        assert!(interpreter.evaluate(&expr).is_err());
    }

    fn run(source: &str) -> (Interpreter, Diagnostics) {
        let mut sink = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let statements = Parser::new(tokens).parse(&mut sink);
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve(&statements, &mut sink);
        if !sink.had_error() {
            interpreter.interpret(&statements, &mut sink);
        }
        (interpreter, sink)
    }

    fn global(interpreter: &Interpreter, name: &str) -> Value {
        interpreter.globals.borrow().get(&Token::from_identifier(name)).unwrap()
    }

    #[test]
    fn closure_shares_mutable_state_across_calls() {
        let (interpreter, sink) = run(
            "fun make() { var i = 0; fun tick() { i = i + 1; return i; } return tick; }
             var t = make();
             var a = t();
             var b = t();
             var c = t();",
        );
        assert!(!sink.had_error() && !sink.had_runtime_error());
        assert_eq!(global(&interpreter, "a"), Value::Number(1.0));
        assert_eq!(global(&interpreter, "b"), Value::Number(2.0));
        assert_eq!(global(&interpreter, "c"), Value::Number(3.0));
    }

    #[test]
    fn initializer_sets_fields_and_returns_the_instance() {
        let (interpreter, sink) = run(
            "class Point { init(x, y) { this.x = x; this.y = y; } }
             var p = Point(1, 2);
             var total = p.x + p.y;",
        );
        assert!(!sink.had_error() && !sink.had_runtime_error());
        assert_eq!(global(&interpreter, "total"), Value::Number(3.0));
    }

    #[test]
    fn super_dispatches_to_the_overridden_parent_method() {
        let (interpreter, sink) = run(
            "class A { greet() { return \"from A\"; } }
             class B < A { greet() { return super.greet() + \" and B\"; } }
             var b = B();
             var result = b.greet();",
        );
        assert!(!sink.had_error() && !sink.had_runtime_error());
        assert_eq!(global(&interpreter, "result"), Value::from("from A and B"));
    }

    #[test]
    fn break_and_continue_affect_loop_accumulation() {
        let (interpreter, sink) = run(
            "var total = 0;
             for (var i = 0; i < 5; i = i + 1) {
               if (i == 2) continue;
               if (i == 4) break;
               total = total + i;
             }",
        );
        assert!(!sink.had_error() && !sink.had_runtime_error());
        assert_eq!(global(&interpreter, "total"), Value::Number(4.0));
    }

    #[test]
    fn and_or_return_the_determining_operand_value_not_a_bool() {
        let (interpreter, sink) = run("var a = nil or \"fallback\"; var b = 0 and \"unused\";");
        assert!(!sink.had_error() && !sink.had_runtime_error());
        assert_eq!(global(&interpreter, "a"), Value::from("fallback"));
        assert_eq!(global(&interpreter, "b"), Value::Number(0.0));
    }

    #[test]
    fn runtime_error_sets_the_runtime_flag_not_the_static_one() {
        let (_, sink) = run("undefined_name;");
        assert!(!sink.had_error());
        assert!(sink.had_runtime_error());
    }
}
