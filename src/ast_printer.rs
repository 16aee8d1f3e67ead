//! Parenthesized-prefix pretty-printer for the AST (spec.md §8's round-trip
//! testable property: a printed expression re-parses to a structurally
//! equivalent tree). The distilled original only printed expressions
//! (`plox/ast_printer.py`); extended here to statements so `--ast` can dump
//! a whole program.

use crate::expr::{Expr, LiteralValue};
use crate::object::format_number;
use crate::stmt::Stmt;

pub fn print_program(statements: &[Stmt]) -> String {
    statements.iter().map(print_stmt).collect::<Vec<_>>().join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => parenthesize("expr-stmt", &[print_expr(expr)]),
        Stmt::Print(expr) => parenthesize("print", &[print_expr(expr)]),
        Stmt::Var(var) => match &var.initializer {
            Some(initializer) => parenthesize("var", &[var.name.lexeme.clone(), print_expr(initializer)]),
            None => parenthesize("var", &[var.name.lexeme.clone()]),
        },
        Stmt::Block(statements) => {
            parenthesize("block", &statements.iter().map(print_stmt).collect::<Vec<_>>())
        }
        Stmt::If(if_stmt) => {
            let mut parts = vec![print_expr(&if_stmt.condition), print_stmt(&if_stmt.then_branch)];
            if let Some(else_branch) = &if_stmt.else_branch {
                parts.push(print_stmt(else_branch));
            }
            parenthesize("if", &parts)
        }
        Stmt::While(while_stmt) => {
            let mut parts = vec![print_expr(&while_stmt.condition), print_stmt(&while_stmt.body)];
            if let Some(increment) = &while_stmt.increment {
                parts.push(print_expr(increment));
            }
            parenthesize("while", &parts)
        }
        Stmt::Break(_) => "(break)".to_string(),
        Stmt::Continue(_) => "(continue)".to_string(),
        Stmt::Return(return_stmt) => match &return_stmt.value {
            Some(value) => parenthesize("return", &[print_expr(value)]),
            None => "(return)".to_string(),
        },
        Stmt::Function(function) => {
            let mut parts = vec![function.name.lexeme.clone()];
            parts.push(format!("({})", function.params.iter().map(|p| p.lexeme.clone()).collect::<Vec<_>>().join(" ")));
            parts.extend(function.body.iter().map(print_stmt));
            parenthesize("fun", &parts)
        }
        Stmt::Class(class_stmt) => {
            let mut parts = vec![class_stmt.name.lexeme.clone()];
            if let Some(superclass) = &class_stmt.superclass {
                parts.push(print_expr(superclass));
            }
            parts.extend(class_stmt.methods.iter().map(|m| print_stmt(&Stmt::Function(m.clone()))));
            parenthesize("class", &parts)
        }
    }
}

pub fn print_expr(expr: &Expr) -> String {
    match expr {
        Expr::Literal(literal) => print_literal(literal),
        Expr::Grouping(inner) => parenthesize("group", &[print_expr(inner)]),
        Expr::Unary(unary) => parenthesize(&unary.operator.lexeme, &[print_expr(&unary.right)]),
        Expr::Binary(binary) => {
            parenthesize(&binary.operator.lexeme, &[print_expr(&binary.left), print_expr(&binary.right)])
        }
        Expr::Logical(logical) => {
            parenthesize(&logical.operator.lexeme, &[print_expr(&logical.left), print_expr(&logical.right)])
        }
        Expr::Variable(variable) => variable.name.lexeme.clone(),
        Expr::Assign(assign) => parenthesize("=", &[assign.name.lexeme.clone(), print_expr(&assign.value)]),
        Expr::Call(call) => {
            let mut parts = vec![print_expr(&call.callee)];
            parts.extend(call.arguments.iter().map(print_expr));
            parenthesize("call", &parts)
        }
        Expr::Get(get) => parenthesize("get", &[print_expr(&get.object), get.name.lexeme.clone()]),
        Expr::Set(set) => {
            parenthesize("set", &[print_expr(&set.object), set.name.lexeme.clone(), print_expr(&set.value)])
        }
        Expr::This(_) => "this".to_string(),
        Expr::Super(super_expr) => parenthesize("super", &[super_expr.method.lexeme.clone()]),
    }
}

fn print_literal(literal: &LiteralValue) -> String {
    match literal {
        LiteralValue::Nil => "nil".to_string(),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::String(s) => format!("\"{s}\""),
    }
}

fn parenthesize(name: &str, parts: &[String]) -> String {
    if parts.is_empty() {
        format!("({name})")
    } else {
        format!("({name} {})", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, Type};

    fn token(r#type: Type, lexeme: &str) -> Token {
        Token::new(r#type, lexeme.to_string(), None, 1)
    }

    #[test]
    fn prints_unary_and_grouping_in_prefix_form() {
        let expr = Expr::Binary(crate::expr::BinaryExpr {
            left: Box::new(Expr::Unary(crate::expr::UnaryExpr {
                operator: token(Type::Minus, "-"),
                right: Box::new(Expr::Literal(LiteralValue::Number(123.0))),
            })),
            operator: token(Type::Star, "*"),
            right: Box::new(Expr::Grouping(Box::new(Expr::Literal(LiteralValue::Number(45.67))))),
        });
        assert_eq!(print_expr(&expr), "(* (- 123) (group 45.67))");
    }

    #[test]
    fn prints_a_var_declaration_without_an_initializer() {
        let stmt = Stmt::Var(crate::stmt::VarStmt { name: token(Type::Identifier, "x"), initializer: None });
        assert_eq!(print_stmt(&stmt), "(var x)");
    }

    #[test]
    fn prints_string_literals_quoted() {
        let expr = Expr::Literal(LiteralValue::String("hi".to_string()));
        assert_eq!(print_expr(&expr), "\"hi\"");
    }
}
