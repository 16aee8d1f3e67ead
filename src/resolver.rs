//! Static scope resolution (spec.md §4.9): walks the parsed AST once before
//! execution, pairing every variable-resolving expression with the number of
//! environment frames to walk at runtime, and catching scope/class/loop
//! misuse that would otherwise only surface as a runtime error.

use std::collections::HashMap;
use std::mem;

use crate::error::{ErrorSink, ResolveError};
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionStmt, Stmt};
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Whether the resolver is currently inside a loop body, so `break`/
/// `continue` outside one can be rejected before the interpreter ever runs
/// (spec.md §4.2 "break/continue must be lexically inside a loop").
#[derive(Clone, Copy, PartialEq)]
enum LoopType {
    None,
    Loop,
}

pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    current_class: ClassType,
    current_loop: LoopType,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            current_loop: LoopType::None,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt], sink: &mut dyn ErrorSink) {
        for statement in statements {
            self.resolve_stmt(statement, sink);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt, sink: &mut dyn ErrorSink) {
        match stmt {
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr, sink),
            Stmt::Var(var) => {
                self.declare(&var.name, sink);
                if let Some(initializer) = &var.initializer {
                    self.resolve_expr(initializer, sink);
                }
                self.define(&var.name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve(statements, sink);
                self.end_scope();
            }
            Stmt::If(if_stmt) => {
                self.resolve_expr(&if_stmt.condition, sink);
                self.resolve_stmt(&if_stmt.then_branch, sink);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.resolve_stmt(else_branch, sink);
                }
            }
            Stmt::While(while_stmt) => {
                self.resolve_expr(&while_stmt.condition, sink);
                let enclosing_loop = mem::replace(&mut self.current_loop, LoopType::Loop);
                self.resolve_stmt(&while_stmt.body, sink);
                self.current_loop = enclosing_loop;
                if let Some(increment) = &while_stmt.increment {
                    self.resolve_expr(increment, sink);
                }
            }
            Stmt::Break(keyword) => {
                if self.current_loop == LoopType::None {
                    sink.resolve_error(&ResolveError {
                        token: keyword.clone(),
                        message: "Cannot break outside of a loop".to_string(),
                    });
                }
            }
            Stmt::Continue(keyword) => {
                if self.current_loop == LoopType::None {
                    sink.resolve_error(&ResolveError {
                        token: keyword.clone(),
                        message: "Cannot continue outside of a loop".to_string(),
                    });
                }
            }
            Stmt::Return(return_stmt) => {
                if self.current_function == FunctionType::None {
                    sink.resolve_error(&ResolveError {
                        token: return_stmt.keyword.clone(),
                        message: "Cannot return from top-level code".to_string(),
                    });
                }

                if let Some(value) = &return_stmt.value {
                    if self.current_function == FunctionType::Initializer {
                        sink.resolve_error(&ResolveError {
                            token: return_stmt.keyword.clone(),
                            message: "Cannot return a value from an initializer".to_string(),
                        });
                        return;
                    }
                    self.resolve_expr(value, sink);
                }
            }
            Stmt::Function(function) => {
                self.declare(&function.name, sink);
                self.define(&function.name);
                self.resolve_function(function, FunctionType::Function, sink);
            }
            Stmt::Class(class_stmt) => {
                let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

                self.declare(&class_stmt.name, sink);
                self.define(&class_stmt.name);

                let has_superclass = class_stmt.superclass.is_some();
                if let Some(superclass) = &class_stmt.superclass {
                    if let Expr::Variable(variable) = superclass {
                        if variable.name.lexeme == class_stmt.name.lexeme {
                            sink.resolve_error(&ResolveError {
                                token: variable.name.clone(),
                                message: "A class cannot inherit from itself".to_string(),
                            });
                        }
                    }

                    self.current_class = ClassType::Subclass;
                    self.resolve_expr(superclass, sink);

                    self.begin_scope();
                    self.scopes.last_mut().expect("scope just pushed").insert("super".to_string(), true);
                }

                self.begin_scope();
                self.scopes.last_mut().expect("scope just pushed").insert("this".to_string(), true);

                for method in &class_stmt.methods {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, kind, sink);
                }

                self.end_scope();
                if has_superclass {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr, sink: &mut dyn ErrorSink) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Grouping(inner) => self.resolve_expr(inner, sink),
            Expr::Unary(unary) => self.resolve_expr(&unary.right, sink),
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.left, sink);
                self.resolve_expr(&binary.right, sink);
            }
            Expr::Logical(logical) => {
                self.resolve_expr(&logical.left, sink);
                self.resolve_expr(&logical.right, sink);
            }
            Expr::Variable(variable) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&variable.name.lexeme) == Some(&false) {
                        sink.resolve_error(&ResolveError {
                            token: variable.name.clone(),
                            message: "Cannot read local variable in its own initializer".to_string(),
                        });
                    }
                }
                self.resolve_local(variable.id, &variable.name);
            }
            Expr::Assign(assign) => {
                self.resolve_expr(&assign.value, sink);
                self.resolve_local(assign.id, &assign.name);
            }
            Expr::Call(call) => {
                self.resolve_expr(&call.callee, sink);
                for argument in &call.arguments {
                    self.resolve_expr(argument, sink);
                }
            }
            Expr::Get(get) => self.resolve_expr(&get.object, sink),
            Expr::Set(set) => {
                self.resolve_expr(&set.value, sink);
                self.resolve_expr(&set.object, sink);
            }
            Expr::This(this) => {
                if self.current_class == ClassType::None {
                    sink.resolve_error(&ResolveError {
                        token: this.keyword.clone(),
                        message: "Cannot use 'this' outside of a class".to_string(),
                    });
                    return;
                }
                self.resolve_local(this.id, &this.keyword);
            }
            Expr::Super(super_expr) => {
                match self.current_class {
                    ClassType::Subclass => {}
                    ClassType::None => sink.resolve_error(&ResolveError {
                        token: super_expr.keyword.clone(),
                        message: "Cannot use 'super' outside of a class".to_string(),
                    }),
                    ClassType::Class => sink.resolve_error(&ResolveError {
                        token: super_expr.keyword.clone(),
                        message: "Cannot use 'super' in a class with no superclass".to_string(),
                    }),
                }
                self.resolve_local(super_expr.id, &super_expr.keyword);
            }
        }
    }

    fn resolve_function(&mut self, function: &FunctionStmt, kind: FunctionType, sink: &mut dyn ErrorSink) {
        let enclosing_function = mem::replace(&mut self.current_function, kind);
        let enclosing_loop = mem::replace(&mut self.current_loop, LoopType::None);

        self.begin_scope();
        for param in &function.params {
            self.declare(param, sink);
            self.define(param);
        }
        self.resolve(&function.body, sink);
        self.end_scope();

        self.current_function = enclosing_function;
        self.current_loop = enclosing_loop;
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token, sink: &mut dyn ErrorSink) {
        let Some(scope) = self.scopes.last_mut() else { return };

        if scope.contains_key(&name.lexeme) {
            sink.resolve_error(&ResolveError {
                token: name.clone(),
                message: format!(
                    "A variable is already defined with name '{}' in this scope",
                    name.lexeme
                ),
            });
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: crate::expr::ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, depth);
                return;
            }
        }
        // Not found in any scope: treated as global, looked up at call time.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve_source(source: &str) -> Diagnostics {
        let mut sink = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let statements = Parser::new(tokens).parse(&mut sink);
        let mut interpreter = Interpreter::new();
        Resolver::new(&mut interpreter).resolve(&statements, &mut sink);
        sink
    }

    #[test]
    fn break_outside_loop_is_a_resolve_error() {
        assert!(resolve_source("break;").had_error());
    }

    #[test]
    fn break_inside_loop_is_fine() {
        assert!(!resolve_source("while (true) { break; }").had_error());
    }

    #[test]
    fn return_outside_function_is_a_resolve_error() {
        assert!(resolve_source("return 1;").had_error());
    }

    #[test]
    fn this_outside_class_is_a_resolve_error() {
        assert!(resolve_source("print this;").had_error());
    }

    #[test]
    fn self_referential_initializer_is_a_resolve_error() {
        assert!(resolve_source("var a = 1; { var a = a; }").had_error());
    }

    #[test]
    fn class_cannot_inherit_from_itself() {
        assert!(resolve_source("class Oops < Oops {}").had_error());
    }
}
