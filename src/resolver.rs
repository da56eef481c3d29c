//! Static resolver pass for the **Brio** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward-read in initializer,
//!    invalid `return`/`this`/`super`) through the diagnostic sink - the
//!    pass keeps going after each one so diagnostics accumulate.
//! 3. Record, for each variable occurrence it can see the declaration of,
//!    the binding distance into the interpreter's table (keyed by the
//!    node's [`ExprId`]).  Occurrences with no visible declaration are left
//!    unrecorded and resolve against the globals at run time.
//!
//! `this` and `super` resolve exactly like ordinary names through synthetic
//! scopes pushed around class bodies.  A `return` at top level is the one
//! place where resolution touches the evaluator: its value is evaluated on
//! the spot and becomes the process exit status.

use crate::diagnostics::Diagnostics;
use crate::error::BrioError;
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;
use crate::value::Value;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body are we inside?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances into the interpreter's table.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    diagnostics: &'a mut Diagnostics,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
}

impl<'a> Resolver<'a> {
    /// Create a new resolver bound to the given interpreter and sink.
    pub fn new(interpreter: &'a mut Interpreter, diagnostics: &'a mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            diagnostics,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }

    /// Walk all top-level statements.
    ///
    /// The program itself gets a scope, so self-reference-in-initializer and
    /// duplicate declarations are caught at top level too.  Names used
    /// before their top-level declaration are simply left unbound here and
    /// fall back to dynamic global lookup, which is what permits forward
    /// references among globals.
    pub fn resolve(&mut self, statements: &[Stmt]) {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.begin_scope();
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
        self.end_scope();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Empty => {}

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var(name, initializer) => {
                // declare → resolve initializer → define, so the name is
                // visible-but-unusable inside its own initializer
                self.declare(name);
                self.resolve_expr(initializer);
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // a function name is visible inside its own body
                self.declare(&declaration.name);
                self.define(&declaration.name);
                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If(condition, then_branch, else_branch) => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                self.resolve_stmt(else_branch);
            }

            Stmt::While(condition, body) => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return(keyword, value) => self.resolve_return(keyword, value),

            Stmt::Class(name, superclass, methods) => {
                self.resolve_class(name, superclass.as_ref(), methods);
            }
        }
    }

    /// `return` validity depends on the enclosing function kind.  Top-level
    /// `return` terminates the process with the value as exit status; at
    /// that point the globals hold only the native functions.
    fn resolve_return(&mut self, keyword: &Token, value: &Expr) {
        match self.current_function {
            FunctionType::None => match self.interpreter.evaluate(value) {
                Ok(Value::Integer(code)) => {
                    info!("Top-level return: exiting with status {}", code);
                    std::process::exit(code as i32);
                }

                Ok(Value::Real(code)) => {
                    info!("Top-level return: exiting with status {}", code);
                    std::process::exit(code as i32);
                }

                Ok(_) => self.diagnostics.report(&BrioError::resolve(
                    keyword,
                    "Return from top-level code only accepts numbers.",
                )),

                Err(error) => self.diagnostics.report(&error),
            },

            FunctionType::Initializer => {
                if !matches!(value, Expr::Empty) {
                    self.diagnostics.report(&BrioError::resolve(
                        keyword,
                        "Cannot return a value from an initializer.",
                    ));
                }
                self.resolve_expr(value);
            }

            _ => self.resolve_expr(value),
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass_expr) = superclass {
            if let Expr::Variable(_, superclass_name) = superclass_expr {
                if superclass_name.lexeme == name.lexeme {
                    self.diagnostics.report(&BrioError::resolve(
                        superclass_name,
                        "A class cannot inherit from itself.",
                    ));
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass_expr);

            // methods of a subclass see `super` one scope out
            self.begin_scope();
            if let Some(scope) = self.scopes.last_mut() {
                scope.insert("super".to_string(), true);
            }
        }

        self.begin_scope();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert("this".to_string(), true);
        }

        for method in methods {
            let declaration_type = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(method, declaration_type);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Empty | Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary(_, right) => {
                self.resolve_expr(right);
            }

            Expr::Binary(left, _, right) | Expr::Logical(left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable(id, name) => {
                // Cannot read a name inside its own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.diagnostics.report(&BrioError::resolve(
                            name,
                            "Cannot read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(*id, name);
            }

            Expr::Assign(id, name, value) => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call(callee, _, arguments) => {
                self.resolve_expr(callee);
                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get(object, _) => self.resolve_expr(object),

            Expr::Set(object, _, value) => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This(id, keyword) => {
                if self.current_class == ClassType::None {
                    self.diagnostics.report(&BrioError::resolve(
                        keyword,
                        "Cannot use 'this' outside of a class.",
                    ));
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super(id, keyword, _) => {
                match self.current_class {
                    ClassType::None => self.diagnostics.report(&BrioError::resolve(
                        keyword,
                        "Cannot use 'super' outside of a class.",
                    )),

                    ClassType::Class => self.diagnostics.report(&BrioError::resolve(
                        keyword,
                        "Cannot use 'super' in a class with no superclass.",
                    )),

                    ClassType::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    fn resolve_function(&mut self, declaration: &FunctionDecl, function_type: FunctionType) {
        let enclosing = self.current_function;
        self.current_function = function_type;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.diagnostics.report(&BrioError::resolve(
                    name,
                    "Variable with this name already declared in this scope.",
                ));
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the distance of the innermost
    /// scope declaring it; leave it unrecorded (global) otherwise.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.note_local(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
