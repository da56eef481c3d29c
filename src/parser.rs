/*!
Recursive-descent parser for Brio.

Grammar (EBNF - condensed)
--------------------------

```text
program        → declaration* EOF ;
declaration    → classDecl | funDecl | varDecl | statement ;
classDecl      → "class" IDENT ( "<" IDENT )? "{" method* "}" ;
method         → IDENT "(" parameters? ")" block ;
funDecl        → "fun" IDENT "(" parameters? ")" block ;
varDecl        → "var" IDENT ( "=" expression )? ";" ;
statement      → exprStmt | forStmt | ifStmt | whileStmt
               | returnStmt | block ;
exprStmt       → expression ";" ;
forStmt        → "for" "(" ( varDecl | exprStmt | ";" )
                 expression? ";" expression? ")" statement ;
ifStmt         → "if" "(" expression ")" statement ( "else" statement )? ;
whileStmt      → "while" "(" expression ")" statement ;
returnStmt     → "return" expression? ";" ;
block          → "{" declaration* "}" ;
parameters     → IDENT ( "," IDENT )* ;
expression     → assignment ;
assignment     → ( call "." )? IDENT "=" assignment | logic_or ;
logic_or       → logic_and ( "or" logic_and )* ;
logic_and      → equality  ( "and" equality )* ;
equality       → comparison ( ( "!=" | "==" ) comparison )* ;
comparison     → addition ( ( ">" | ">=" | "<" | "<=" ) addition )* ;
addition       → multiplication ( ( "-" | "+" ) multiplication )* ;
multiplication → unary ( ( "/" | "*" ) unary )* ;
unary          → ( "!" | "-" ) unary | call ;
call           → primary ( "(" arguments? ")" | "." IDENT )* ;
arguments      → expression ( "," expression )* ;
primary        → INTEGER | REAL | STRING | "true" | "false" | "nil"
               | "this" | "super" "." IDENT | IDENT | "(" expression ")" ;
```

`for` has no statement node of its own: it is desugared here into a block
holding the optional initializer and a `while` whose body runs the original
body and then the increment, so evaluation order matches a native for-loop
exactly.

Error recovery is panic-mode: a broken declaration is reported through the
diagnostic sink, tokens are discarded until a `;` has passed or a
statement-starting keyword is next, and `Stmt::Empty` takes the statement's
place - one diagnostic per broken statement, and the parse continues.
*/

use std::rc::Rc;

use crate::diagnostics::Diagnostics;
use crate::error::{BrioError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

use log::{debug, info};

/// Top-level parser over an immutable slice of tokens.  Syntax errors are
/// reported through the [`Diagnostics`] sink; the parser itself never
/// aborts.
pub struct Parser<'t, 'd> {
    tokens: &'t [Token],
    current: usize,
    next_id: ExprId,
    diagnostics: &'d mut Diagnostics,
}

impl<'t, 'd> Parser<'t, 'd> {
    /// Construct a new parser.
    pub fn new(tokens: &'t [Token], diagnostics: &'d mut Diagnostics) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            next_id: 0,
            diagnostics,
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list.
    pub fn parse(&mut self) -> Vec<Stmt> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration());
        }

        statements
    }

    /// Parse the input as a single expression (the `--ast` debug dump).
    pub fn parse_expression(&mut self) -> Option<Expr> {
        match self.expression() {
            Ok(expr) => Some(expr),
            Err(error) => {
                self.diagnostics.report(&error);
                None
            }
        }
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Stmt {
        debug!("Entering declaration");

        let result = if self.matches(&TokenType::CLASS) {
            self.class_declaration()
        } else if self.matches(&TokenType::FUN) {
            self.function("function").map(|decl| Stmt::Function(Rc::new(decl)))
        } else if self.matches(&TokenType::VAR) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => stmt,
            Err(error) => {
                self.diagnostics.report(&error);
                self.synchronize();
                Stmt::Empty
            }
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expected class name.")?;

        let superclass: Option<Expr> = if self.matches(&TokenType::LESS) {
            let superclass_name =
                self.consume(&TokenType::IDENTIFIER, "Expected superclass name.")?;
            Some(Expr::Variable(self.next_id(), superclass_name))
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "Expected '{' before class body.")?;

        let mut methods: Vec<Rc<FunctionDecl>> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method")?));
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after class body.")?;

        Ok(Stmt::Class(name, superclass, methods))
    }

    fn function(&mut self, kind: &str) -> Result<FunctionDecl> {
        let name: Token =
            self.consume(&TokenType::IDENTIFIER, &format!("Expected {} name.", kind))?;

        self.consume(
            &TokenType::LEFT_PAREN,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let mut params: Vec<Token> = Vec::new();
        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= 255 {
                    // Reported but non-fatal; parsing continues.
                    let at = self.peek().clone();
                    self.diagnostics
                        .report(&BrioError::parse(&at, "Cannot have more than 255 parameters."));
                }

                params.push(self.consume(&TokenType::IDENTIFIER, "Expected parameter name.")?);

                if !self.matches(&TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after parameters.")?;

        self.consume(
            &TokenType::LEFT_BRACE,
            &format!("Expected '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: Token = self.consume(&TokenType::IDENTIFIER, "Expected variable name.")?;

        let initializer: Expr = if self.matches(&TokenType::EQUAL) {
            self.expression()?
        } else {
            Expr::Empty
        };

        self.consume(
            &TokenType::SEMICOLON,
            "Expected ';' after variable declaration.",
        )?;
        Ok(Stmt::Var(name, initializer))
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.matches(&TokenType::FOR) {
            self.for_statement()
        } else if self.matches(&TokenType::IF) {
            self.if_statement()
        } else if self.matches(&TokenType::WHILE) {
            self.while_statement()
        } else if self.matches(&TokenType::RETURN) {
            self.return_statement()
        } else if self.matches(&TokenType::LEFT_BRACE) {
            Ok(Stmt::Block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'for'.")?;

        let initializer: Stmt = if self.matches(&TokenType::SEMICOLON) {
            Stmt::Empty
        } else if self.matches(&TokenType::VAR) {
            self.var_declaration()?
        } else {
            self.expression_statement()?
        };

        let condition: Expr = if !self.check(&TokenType::SEMICOLON) {
            self.expression()?
        } else {
            Expr::Literal(LiteralValue::True)
        };
        self.consume(&TokenType::SEMICOLON, "Expected ';' after loop condition.")?;

        let increment: Expr = if !self.check(&TokenType::RIGHT_PAREN) {
            self.expression()?
        } else {
            Expr::Empty
        };
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after for clauses.")?;

        let mut body: Stmt = self.statement()?;

        if !matches!(increment, Expr::Empty) {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let mut desugared = Stmt::While(condition, Box::new(body));

        if !matches!(initializer, Stmt::Empty) {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }

        Ok(desugared)
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr: Expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "Expected ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'if'.")?;
        let condition: Expr = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;

        let then_branch: Stmt = self.statement()?;
        let else_branch: Stmt = if self.matches(&TokenType::ELSE) {
            self.statement()?
        } else {
            Stmt::Empty
        };

        Ok(Stmt::If(
            condition,
            Box::new(then_branch),
            Box::new(else_branch),
        ))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "Expected '(' after 'while'.")?;
        let condition: Expr = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after condition.")?;
        let body: Stmt = self.statement()?;

        Ok(Stmt::While(condition, Box::new(body)))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: Token = self.previous().clone();
        let value: Expr = if !self.check(&TokenType::SEMICOLON) {
            self.expression()?
        } else {
            Expr::Empty
        };

        self.consume(&TokenType::SEMICOLON, "Expected ';' after return value.")?;
        Ok(Stmt::Return(keyword, value))
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration());
        }

        self.consume(&TokenType::RIGHT_BRACE, "Expected '}' after block.")?;
        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr: Expr = self.logical_or()?;

        if self.matches(&TokenType::EQUAL) {
            let equals: Token = self.previous().clone();
            let value: Expr = self.assignment()?;

            return Ok(match expr {
                Expr::Variable(_, name) => {
                    Expr::Assign(self.next_id(), name, Box::new(value))
                }

                Expr::Get(object, name) => Expr::Set(object, name, Box::new(value)),

                other => {
                    // Reported but non-fatal; the left-hand side stands.
                    self.diagnostics
                        .report(&BrioError::parse(&equals, "Invalid assignment target."));
                    other
                }
            });
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.logical_and()?;

        while self.matches(&TokenType::OR) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.logical_and()?;

            expr = Expr::Logical(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.equality()?;

        while self.matches(&TokenType::AND) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.equality()?;

            expr = Expr::Logical(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.comparison()?;

        while self.matches(&TokenType::BANG_EQUAL) || self.matches(&TokenType::EQUAL_EQUAL) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.comparison()?;

            expr = Expr::Binary(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.addition()?;

        while self.matches(&TokenType::GREATER)
            || self.matches(&TokenType::GREATER_EQUAL)
            || self.matches(&TokenType::LESS)
            || self.matches(&TokenType::LESS_EQUAL)
        {
            let operator: Token = self.previous().clone();
            let right: Expr = self.addition()?;
            expr = Expr::Binary(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn addition(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.multiplication()?;

        while self.matches(&TokenType::MINUS) || self.matches(&TokenType::PLUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.multiplication()?;
            expr = Expr::Binary(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn multiplication(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.unary()?;

        while self.matches(&TokenType::STAR) || self.matches(&TokenType::SLASH) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            expr = Expr::Binary(Box::new(expr), operator, Box::new(right));
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.matches(&TokenType::BANG) || self.matches(&TokenType::MINUS) {
            let operator: Token = self.previous().clone();
            let right: Expr = self.unary()?;
            return Ok(Expr::Unary(operator, Box::new(right)));
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.matches(&TokenType::LEFT_PAREN) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&TokenType::DOT) {
                let name: Token =
                    self.consume(&TokenType::IDENTIFIER, "Expected property name after '.'.")?;

                expr = Expr::Get(Box::new(expr), name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments: Vec<Expr> = Vec::new();
        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= 255 {
                    // Reported but non-fatal; parsing continues.
                    let at = self.peek().clone();
                    self.diagnostics
                        .report(&BrioError::parse(&at, "Cannot have more than 255 arguments."));
                }

                arguments.push(self.expression()?);

                if !self.matches(&TokenType::COMMA) {
                    break;
                }
            }
        }

        let paren: Token = self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after arguments.")?;

        Ok(Expr::Call(Box::new(callee), paren, arguments))
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.matches(&TokenType::FALSE) {
            return Ok(Expr::Literal(LiteralValue::False));
        }
        if self.matches(&TokenType::TRUE) {
            return Ok(Expr::Literal(LiteralValue::True));
        }
        if self.matches(&TokenType::NIL) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }

        match &self.peek().token_type {
            TokenType::INTEGER(n) => {
                let n: i64 = *n;
                self.advance();
                return Ok(Expr::Literal(LiteralValue::Integer(n)));
            }

            TokenType::REAL(n) => {
                let n: f64 = *n;
                self.advance();
                return Ok(Expr::Literal(LiteralValue::Real(n)));
            }

            TokenType::STRING(s) => {
                let s: String = s.clone();
                self.advance();
                return Ok(Expr::Literal(LiteralValue::Str(s)));
            }

            _ => {}
        }

        if self.matches(&TokenType::IDENTIFIER) {
            let name: Token = self.previous().clone();
            return Ok(Expr::Variable(self.next_id(), name));
        }

        if self.matches(&TokenType::THIS) {
            let keyword: Token = self.previous().clone();
            return Ok(Expr::This(self.next_id(), keyword));
        }

        if self.matches(&TokenType::SUPER) {
            let keyword: Token = self.previous().clone();
            self.consume(&TokenType::DOT, "Expected '.' after 'super'.")?;
            let method: Token =
                self.consume(&TokenType::IDENTIFIER, "Expected superclass method name.")?;
            return Ok(Expr::Super(self.next_id(), keyword, method));
        }

        if self.matches(&TokenType::LEFT_PAREN) {
            let expr: Expr = self.expression()?;

            self.consume(&TokenType::RIGHT_PAREN, "Expected ')' after expression.")?;

            return Ok(Expr::Grouping(Box::new(expr)));
        }

        Err(BrioError::parse(self.peek(), "Expected expression."))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Allocate the next stable expression-node id.
    #[inline(always)]
    fn next_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline(always)]
    fn matches(&mut self, ttype: &TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: &TokenType, message: &str) -> Result<Token> {
        if self.check(ttype) {
            return Ok(self.advance().clone());
        }

        Err(BrioError::parse(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == *ttype
    }

    #[inline(always)]
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline(always)]
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Discards tokens until it thinks it is at a statement boundary.
    fn synchronize(&mut self) {
        self.advance(); // skip the token that caused the error

        while !self.is_at_end() {
            if matches!(self.previous().token_type, TokenType::SEMICOLON) {
                return;
            }

            match self.peek().token_type {
                TokenType::CLASS
                | TokenType::FUN
                | TokenType::VAR
                | TokenType::FOR
                | TokenType::IF
                | TokenType::WHILE
                | TokenType::RETURN => return,
                _ => {}
            }

            self.advance();
        }
    }
}
