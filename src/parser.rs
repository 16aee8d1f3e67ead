//! Recursive-descent parser (spec.md §4.2): turns a token stream into a
//! `Vec<Stmt>`, synchronizing past a malformed statement on parse error
//! rather than aborting the whole parse.
//!
//! - Program     -> Declaration* EOF ;
//! - Block       -> "{" Declaration* "}" ;
//! - Declaration -> ClassDecl | FunDecl | VarDecl | Statement ;
//! - ClassDecl   -> "class" IDENTIFIER ( "<" IDENTIFIER )? "{" Function* "}" ;
//! - FunDecl     -> "fun" Function ;
//! - VarDecl     -> "var" IDENTIFIER ( "=" Expression )? ";" ;
//! - Function    -> IDENTIFIER "(" Parameters? ")" Block ;
//! - Parameters  -> IDENTIFIER ( "," IDENTIFIER )* ;
//! - Statement   -> ExprStmt | ForStmt | IfStmt | PrintStmt | ReturnStmt
//!                  | WhileStmt | BreakStmt | ContinueStmt | Block ;
//! - ExprStmt    -> Expression ";" ;
//! - ForStmt     -> "for" "(" ( VarDecl | ExprStmt | ";" ) Expression? ";" Expression? ")" Statement ;
//! - IfStmt      -> "if" "(" Expression ")" Statement ( "else" Statement )? ;
//! - PrintStmt   -> "print" Expression ";" ;
//! - ReturnStmt  -> "return" Expression? ";" ;
//! - WhileStmt   -> "while" "(" Expression ")" Statement ;
//! - BreakStmt   -> "break" ";" ;
//! - ContinueStmt -> "continue" ";" ;
//! - Expression  -> Assignment ;
//! - Assignment  -> ( Call "." )? IDENTIFIER "=" Assignment | LogicOr ;
//! - LogicOr     -> LogicAnd ( "or" LogicAnd )* ;
//! - LogicAnd    -> Equality ( "and" Equality )* ;
//! - Equality    -> Comparison ( ( "!=" | "==" ) Comparison )* ;
//! - Comparison  -> Term ( ( ">" | ">=" | "<" | "<=" ) Term )* ;
//! - Term        -> Factor ( ( "+" | "-" ) Factor )* ;
//! - Factor      -> Unary ( ( "*" | "/" ) Unary )* ;
//! - Unary       -> ( "!" | "-" ) Unary | Call ;
//! - Call        -> Primary ( "(" Arguments? ")" | "." IDENTIFIER )* ;
//! - Arguments   -> Expression ( "," Expression )* ;
//! - Primary     -> NUMBER | STRING | "false" | "true" | "nil" | "this"
//!                  | "(" Expression ")" | IDENTIFIER | "super" "." IDENTIFIER ;

use std::rc::Rc;

use crate::error::ErrorSink;
use crate::error::ParseError;
use crate::expr::{Expr, LiteralValue};
use crate::stmt::{ClassStmt, FunctionStmt, IfStmt, ReturnStmt, Stmt, VarStmt, WhileStmt};
use crate::token::{Token, Type};

type ParseResult<T> = Result<T, ParseError>;

/// Returns whether the next token is any of the given types, consuming it if so.
macro_rules! match_any {
    ( $self:ident, $( $type:expr ),+ ) => {
        {
            if $( $self.check($type) )||* {
                $self.advance();
                true
            } else {
                false
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, current: 0 }
    }

    /// Parses every declaration in the token stream, reporting each malformed
    /// statement through `sink` and continuing from the next one.
    pub fn parse(&mut self, sink: &mut dyn ErrorSink) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration(sink) {
                statements.push(stmt);
            }
        }

        statements
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().r#type == Type::Eof
    }

    fn check(&self, r#type: Type) -> bool {
        !self.is_at_end() && self.peek().r#type == r#type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn consume(&mut self, r#type: Type, message: &str) -> ParseResult<&Token> {
        if self.check(r#type) {
            return Ok(self.advance());
        }

        Err(ParseError { token: self.peek().clone(), message: message.to_string() })
    }

    fn declaration(&mut self, sink: &mut dyn ErrorSink) -> Option<Stmt> {
        let result = if match_any!(self, Type::Class) {
            self.class_declaration(sink)
        } else if match_any!(self, Type::Fun) {
            self.function("function", sink).map(|f| Stmt::Function(Rc::new(f)))
        } else if match_any!(self, Type::Var) {
            self.var_declaration()
        } else {
            self.statement(sink)
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                sink.parse_error(&error);
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect class name")?.clone();

        let superclass = if match_any!(self, Type::Less) {
            self.consume(Type::Identifier, "Expect superclass name")?;
            Some(Expr::variable(self.previous().clone()))
        } else {
            None
        };

        self.consume(Type::LeftBrace, "Expect '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method", sink)?));
        }

        self.consume(Type::RightBrace, "Expect '}' after class body")?;

        Ok(Stmt::Class(ClassStmt { name, superclass, methods }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect variable name")?.clone();

        let initializer = if match_any!(self, Type::Equal) { Some(self.expression()?) } else { None };

        self.consume(Type::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Stmt::Var(VarStmt { name, initializer }))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn statement(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Stmt> {
        if match_any!(self, Type::For) {
            return self.for_statement(sink);
        }
        if match_any!(self, Type::If) {
            return self.if_statement(sink);
        }
        if match_any!(self, Type::Print) {
            return self.print_statement();
        }
        if match_any!(self, Type::Return) {
            return self.return_statement();
        }
        if match_any!(self, Type::While) {
            return self.while_statement(sink);
        }
        if match_any!(self, Type::Break) {
            let keyword = self.previous().clone();
            self.consume(Type::Semicolon, "Expect ';' after 'break'")?;
            return Ok(Stmt::Break(keyword));
        }
        if match_any!(self, Type::Continue) {
            let keyword = self.previous().clone();
            self.consume(Type::Semicolon, "Expect ';' after 'continue'")?;
            return Ok(Stmt::Continue(keyword));
        }
        if match_any!(self, Type::LeftBrace) {
            return Ok(Stmt::Block(self.block(sink)?));
        }

        self.expression_statement()
    }

    fn for_statement(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'for'")?;

        let initializer = if match_any!(self, Type::Semicolon) {
            None
        } else if match_any!(self, Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition =
            if !self.check(Type::Semicolon) { Some(self.expression()?) } else { None };
        self.consume(Type::Semicolon, "Expect ';' after loop condition")?;

        let increment =
            if !self.check(Type::RightParen) { Some(self.expression()?) } else { None };
        self.consume(Type::RightParen, "Expect ')' after loop clauses")?;

        let body = self.statement(sink)?;

        let mut body = Stmt::While(WhileStmt {
            condition: condition.unwrap_or(Expr::Literal(LiteralValue::Bool(true))),
            body: Box::new(body),
            increment,
        });

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.statement(sink)?);
        let else_branch =
            if match_any!(self, Type::Else) { Some(Box::new(self.statement(sink)?)) } else { None };

        Ok(Stmt::If(IfStmt { condition, then_branch, else_branch }))
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after value")?;
        Ok(Stmt::Print(expr))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(Type::Semicolon) { Some(self.expression()?) } else { None };

        self.consume(Type::Semicolon, "Expect ';' after return value")?;
        Ok(Stmt::Return(ReturnStmt { keyword, value }))
    }

    fn while_statement(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after condition")?;
        let body = Box::new(self.statement(sink)?);

        Ok(Stmt::While(WhileStmt { condition, body, increment: None }))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn function(&mut self, kind: &str, sink: &mut dyn ErrorSink) -> ParseResult<FunctionStmt> {
        let name = self.consume(Type::Identifier, &format!("Expect {kind} name"))?.clone();

        self.consume(Type::LeftParen, &format!("Expect '(' after {kind} name"))?;

        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= 255 {
                    return Err(ParseError {
                        token: self.peek().clone(),
                        message: "Cannot have more than 255 parameters".to_string(),
                    });
                }

                params.push(self.consume(Type::Identifier, "Expect parameter name")?.clone());

                if !match_any!(self, Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Expect ')' after parameters")?;
        self.consume(Type::LeftBrace, &format!("Expect '{{' before {kind} body"))?;

        let body = self.block(sink)?;

        Ok(FunctionStmt { name, params, body })
    }

    /// Declarations inside a block that fail to parse are reported through
    /// `sink` and skipped, same as top-level declarations (spec.md §4.2).
    fn block(&mut self, sink: &mut dyn ErrorSink) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration(sink) {
                statements.push(stmt);
            }
        }

        self.consume(Type::RightBrace, "Expect '}' after block")?;

        Ok(statements)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if match_any!(self, Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable(variable) => Ok(Expr::assign(variable.name, value)),
                Expr::Get(get) => Ok(Expr::Set(crate::expr::SetExpr {
                    object: get.object,
                    name: get.name,
                    value: Box::new(value),
                })),
                _ => Err(ParseError { token: equals, message: "Invalid assignment target".to_string() }),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while match_any!(self, Type::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(crate::expr::LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while match_any!(self, Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(crate::expr::LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while match_any!(self, Type::BangEqual, Type::EqualEqual) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while match_any!(self, Type::Greater, Type::GreaterEqual, Type::Less, Type::LessEqual) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while match_any!(self, Type::Minus, Type::Plus) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while match_any!(self, Type::Slash, Type::Star) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = binary(expr, operator, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if match_any!(self, Type::Bang, Type::Minus) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(crate::expr::UnaryExpr { operator, right: Box::new(right) }));
        }

        self.call()
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(Type::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    return Err(ParseError {
                        token: self.peek().clone(),
                        message: "Cannot have more than 255 arguments".to_string(),
                    });
                }

                arguments.push(self.expression()?);

                if !match_any!(self, Type::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(Type::RightParen, "Expect ')' after arguments")?.clone();

        Ok(Expr::Call(crate::expr::CallExpr { callee: Box::new(callee), paren, arguments }))
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if match_any!(self, Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if match_any!(self, Type::Dot) {
                let name = self.consume(Type::Identifier, "Expect property name after '.'")?.clone();
                expr = Expr::Get(crate::expr::GetExpr { object: Box::new(expr), name });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if match_any!(self, Type::False) {
            return Ok(Expr::Literal(LiteralValue::Bool(false)));
        }
        if match_any!(self, Type::True) {
            return Ok(Expr::Literal(LiteralValue::Bool(true)));
        }
        if match_any!(self, Type::Nil) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        if match_any!(self, Type::Number, Type::String) {
            let literal = self
                .previous()
                .literal
                .clone()
                .expect("number or string token to carry a literal");
            return Ok(Expr::Literal(literal.into()));
        }

        if match_any!(self, Type::Super) {
            let keyword = self.previous().clone();
            self.consume(Type::Dot, "Expect '.' after 'super'")?;
            let method = self.consume(Type::Identifier, "Expect superclass method name")?.clone();
            return Ok(Expr::super_(keyword, method));
        }

        if match_any!(self, Type::This) {
            return Ok(Expr::this(self.previous().clone()));
        }

        if match_any!(self, Type::Identifier) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if match_any!(self, Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(ParseError { token: self.peek().clone(), message: "Expect expression".to_string() })
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().r#type == Type::Semicolon {
                return;
            }

            match self.peek().r#type {
                Type::Class
                | Type::Fun
                | Type::Var
                | Type::For
                | Type::If
                | Type::While
                | Type::Print
                | Type::Return => return,
                _ => {
                    self.advance();
                }
            };
        }
    }
}

fn binary(left: Expr, operator: Token, right: Expr) -> Expr {
    Expr::Binary(crate::expr::BinaryExpr { left: Box::new(left), operator, right: Box::new(right) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let mut sink = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let statements = Parser::new(tokens).parse(&mut sink);
        (statements, sink)
    }

    #[test]
    fn parses_a_var_declaration() {
        let (statements, sink) = parse("var a = 1 + 2;");
        assert!(!sink.had_error());
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0], Stmt::Var(_)));
    }

    #[test]
    fn for_loop_desugars_to_a_block_with_a_while() {
        let (statements, sink) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(!sink.had_error());
        assert_eq!(statements.len(), 1);
        let Stmt::Block(block) = &statements[0] else { panic!("expected a block") };
        assert_eq!(block.len(), 2);
        let Stmt::While(while_stmt) = &block[1] else { panic!("expected a while") };
        assert!(while_stmt.increment.is_some());
    }

    #[test]
    fn break_and_continue_statements_parse() {
        let (statements, sink) = parse("while (true) { break; continue; }");
        assert!(!sink.had_error());
        let Stmt::While(while_stmt) = &statements[0] else { panic!("expected while") };
        assert!(while_stmt.increment.is_none());
        let Stmt::Block(body) = while_stmt.body.as_ref() else { panic!("expected block body") };
        assert!(matches!(body[0], Stmt::Break(_)));
        assert!(matches!(body[1], Stmt::Continue(_)));
    }

    #[test]
    fn invalid_assignment_target_is_a_parse_error() {
        let (_, sink) = parse("1 = 2;");
        assert!(sink.had_error());
    }

    #[test]
    fn unterminated_block_reports_a_parse_error() {
        let (_, sink) = parse("{ var a = 1;");
        assert!(sink.had_error());
    }
}
