//! Tree-walking evaluator for Brio.
//!
//! Executes resolved statements against a chain of lexical environments.
//! Control flow for `return` is threaded as an explicit [`Flow`] result
//! checked after every statement rather than unwinding through the host
//! stack; runtime errors are ordinary `Err` values that propagate to the
//! statement-execution boundary and halt the program.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::{BrioError, Result};
use crate::expr::{Expr, ExprId, LiteralValue};
use crate::function::Function;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing a statement: either it ran to completion, or a
/// `return` is propagating towards the enclosing call frame carrying its
/// value.
#[derive(Debug)]
pub enum Flow {
    Completed,
    Returning(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
}

impl Interpreter {
    /// Creates a new Interpreter with the globals pre-seeded with the two
    /// native functions, `clock` and `print`.
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Real(timestamp))
                },
            },
        );

        globals.borrow_mut().define(
            "print",
            Value::NativeFunction {
                name: "print".to_string(),
                arity: 1,
                func: |args: &[Value]| match args {
                    [value] => {
                        println!("{}", value);
                        Ok(Value::Nil)
                    }
                    _ => Err("print takes exactly one argument.".to_string()),
                },
            },
        );

        Self {
            environment: globals.clone(),
            globals,
            locals: HashMap::new(),
        }
    }

    /// The global environment.  Shared with closures that capture it.
    pub fn globals(&self) -> Rc<RefCell<Environment>> {
        self.globals.clone()
    }

    /// Record a binding distance for an expression node.  Called by the
    /// resolver; absence of an entry means "assume global".
    pub fn note_local(&mut self, id: ExprId, depth: usize) {
        debug!("Binding expr #{} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// The binding table, keyed by expression-node id.
    pub fn bindings(&self) -> &HashMap<ExprId, usize> {
        &self.locals
    }

    /// Interprets a list of statements (a "program").
    ///
    /// A `Returning` flow cannot surface here: the resolver either rejected
    /// the top-level `return` or already exited the process on it.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Empty => Ok(Flow::Completed),

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(Flow::Completed)
            }

            Stmt::Var(name, initializer) => {
                let value = self.evaluate(initializer)?;

                debug!("Variable '{}' defined with value: {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Completed)
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(self.environment.clone());
                self.execute_block(statements, Rc::new(RefCell::new(environment)))
            }

            Stmt::If(condition, then_branch, else_branch) => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else {
                    self.execute(else_branch)
                }
            }

            Stmt::While(condition, body) => {
                while is_truthy(&self.evaluate(condition)?) {
                    if let Flow::Returning(value) = self.execute(body)? {
                        return Ok(Flow::Returning(value));
                    }
                }
                Ok(Flow::Completed)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                // Capture the environment active at declaration time.
                let function =
                    Function::new(declaration.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
                Ok(Flow::Completed)
            }

            Stmt::Return(_keyword, value) => {
                let value = self.evaluate(value)?;

                debug!("Returning value: {}", value);

                Ok(Flow::Returning(value))
            }

            Stmt::Class(name, superclass, methods) => {
                self.execute_class(name, superclass.as_ref(), methods)
            }
        }
    }

    /// Executes statements in a fresh environment, restoring the previous
    /// one on every exit path - completion, a propagating return, and
    /// errors alike.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<Flow> {
        debug!("Entering block with {} statements", statements.len());

        let previous = std::mem::replace(&mut self.environment, environment);

        let mut flow = Flow::Completed;
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Completed) => {}
                Ok(returning) => {
                    flow = returning;
                    break;
                }
                Err(error) => {
                    self.environment = previous;
                    return Err(error);
                }
            }
        }

        self.environment = previous;
        Ok(flow)
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass_expr: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<Flow> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<Class>> = match superclass_expr {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let at = match expr {
                        Expr::Variable(_, token) => token,
                        _ => name,
                    };
                    return Err(BrioError::runtime(at, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

        // Methods of a subclass close over one extra scope binding `super`.
        let method_closure: Rc<RefCell<Environment>> = match &superclass {
            Some(class) => {
                let mut environment = Environment::with_enclosing(self.environment.clone());
                environment.define("super", Value::Class(class.clone()));
                Rc::new(RefCell::new(environment))
            }
            None => self.environment.clone(),
        };

        let mut method_table: HashMap<String, Function> = HashMap::new();
        for declaration in methods {
            let is_initializer = declaration.name.lexeme == "init";
            method_table.insert(
                declaration.name.lexeme.clone(),
                Function::new(declaration.clone(), method_closure.clone(), is_initializer),
            );
        }

        let class = Value::Class(Rc::new(Class::new(&name.lexeme, superclass, method_table)));
        self.environment.borrow_mut().assign(name, class)?;

        Ok(Flow::Completed)
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Empty => Ok(Value::Nil),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Integer(n) => Value::Integer(*n),
                LiteralValue::Real(n) => Value::Real(*n),
                LiteralValue::Str(s) => Value::Str(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary(operator, right) => self.evaluate_unary(operator, right),

            Expr::Binary(left, operator, right) => self.evaluate_binary(left, operator, right),

            Expr::Logical(left, operator, right) => {
                let left_val = self.evaluate(left)?;

                match operator.token_type {
                    TokenType::OR => {
                        if is_truthy(&left_val) {
                            return Ok(left_val);
                        }
                    }
                    _ => {
                        // AND
                        if !is_truthy(&left_val) {
                            return Ok(left_val);
                        }
                    }
                }

                self.evaluate(right)
            }

            Expr::Variable(id, name) => self.lookup_variable(name, *id),

            Expr::Assign(id, name, value_expr) => {
                let value = self.evaluate(value_expr)?;

                match self.locals.get(id) {
                    Some(distance) => {
                        Environment::assign_at(&self.environment, *distance, name, value.clone());
                    }
                    None => {
                        self.globals.borrow_mut().assign(name, value.clone())?;
                    }
                }

                Ok(value)
            }

            Expr::Call(callee_expr, paren, arguments) => {
                debug!("Evaluating call expression");

                let callee = self.evaluate(callee_expr)?;

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.invoke_callable(callee, paren, args)
            }

            Expr::Get(object, name) => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(BrioError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set(object, name, value_expr) => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value_expr)?;
                    instance.borrow_mut().set(name, value.clone());
                    Ok(value)
                }
                _ => Err(BrioError::runtime(name, "Only instances have fields.")),
            },

            Expr::This(id, keyword) => self.lookup_variable(keyword, *id),

            Expr::Super(id, keyword, method) => self.evaluate_super(*id, keyword, method),
        }
    }

    /// Variable read: distance-indexed when the resolver fixed a binding,
    /// otherwise straight against the globals (permitting forward references
    /// among top-level declarations).
    fn lookup_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(distance) => Ok(Environment::get_at(
                &self.environment,
                *distance,
                &name.lexeme,
            )),
            None => self.globals.borrow().get(name),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, expr: &Expr) -> Result<Value> {
        let right = self.evaluate(expr)?;

        match operator.token_type {
            TokenType::MINUS => match right {
                Value::Integer(n) => Ok(Value::Integer(-n)),
                Value::Real(n) => Ok(Value::Real(-n)),
                _ => Err(BrioError::runtime(operator, "Operand must be a number.")),
            },
            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),
            _ => Err(BrioError::runtime(operator, "Invalid unary operator.")),
        }
    }

    fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> Result<Value> {
        let left_val = self.evaluate(left)?;
        let right_val = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (&left_val, &right_val) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
                (Value::Str(_), _) | (_, Value::Str(_)) => {
                    Ok(Value::Str(format!("{}{}", left_val, right_val)))
                }
                _ => match numeric_pair(&left_val, &right_val) {
                    Some((a, b)) => Ok(Value::Real(a + b)),
                    None => Err(BrioError::runtime(
                        operator,
                        "Operands must be two numbers or at least one string.",
                    )),
                },
            },

            TokenType::MINUS => match (&left_val, &right_val) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a - b)),
                _ => match numeric_pair(&left_val, &right_val) {
                    Some((a, b)) => Ok(Value::Real(a - b)),
                    None => Err(BrioError::runtime(operator, "Operands must be numbers.")),
                },
            },

            TokenType::STAR => match (&left_val, &right_val) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
                _ => match numeric_pair(&left_val, &right_val) {
                    Some((a, b)) => Ok(Value::Real(a * b)),
                    None => Err(BrioError::runtime(operator, "Operands must be numbers.")),
                },
            },

            TokenType::SLASH => match (&left_val, &right_val) {
                (Value::Integer(a), Value::Integer(b)) => {
                    if *b == 0 {
                        Err(BrioError::runtime(operator, "Division by zero."))
                    } else {
                        Ok(Value::Integer(a / b))
                    }
                }
                _ => match numeric_pair(&left_val, &right_val) {
                    Some((a, b)) => Ok(Value::Real(a / b)),
                    None => Err(BrioError::runtime(operator, "Operands must be numbers.")),
                },
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_val == right_val)),
            TokenType::BANG_EQUAL => Ok(Value::Bool(left_val != right_val)),

            TokenType::GREATER => self.compare(operator, &left_val, &right_val, |a, b| a > b),
            TokenType::GREATER_EQUAL => {
                self.compare(operator, &left_val, &right_val, |a, b| a >= b)
            }
            TokenType::LESS => self.compare(operator, &left_val, &right_val, |a, b| a < b),
            TokenType::LESS_EQUAL => self.compare(operator, &left_val, &right_val, |a, b| a <= b),

            _ => Err(BrioError::runtime(operator, "Invalid binary operator.")),
        }
    }

    /// Ordering comparisons require numeric operands and always compare in
    /// the real domain.
    fn compare(
        &self,
        operator: &Token,
        left: &Value,
        right: &Value,
        op: fn(f64, f64) -> bool,
    ) -> Result<Value> {
        match numeric_pair(left, right) {
            Some((a, b)) => Ok(Value::Bool(op(a, b))),
            None => Err(BrioError::runtime(operator, "Operands must be numbers.")),
        }
    }

    /// Invokes a callable value: a native function, a user function, or a
    /// class (construction).
    fn invoke_callable(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(paren, arity, arguments.len())?;
                func(&arguments).map_err(|msg| BrioError::runtime(paren, msg))
            }

            Value::Function(function) => {
                check_arity(paren, function.arity(), arguments.len())?;
                function.call(self, arguments)
            }

            Value::Class(class) => {
                check_arity(paren, class.arity(), arguments.len())?;
                Class::instantiate(&class, self, arguments)
            }

            _ => Err(BrioError::runtime(
                paren,
                "Can only call functions and classes.",
            )),
        }
    }

    /// `super.method`: find the method starting one level above the class
    /// that defined the executing method, and bind it to the current `this`.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance = *self.locals.get(&id).ok_or_else(|| {
            BrioError::runtime(keyword, "Cannot use 'super' outside of a class.")
        })?;

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Value::Class(class) => class,
            _ => return Err(BrioError::runtime(keyword, "Superclass lookup failed.")),
        };

        // `this` lives in the scope immediately inside the `super` scope.
        let object = Environment::get_at(&self.environment, distance - 1, "this");

        let found = superclass.find_method(&method.lexeme).ok_or_else(|| {
            BrioError::runtime(method, format!("Undefined property '{}'.", method.lexeme))
        })?;

        Ok(Value::Function(Rc::new(found.bind(object))))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Nil and `false` are falsy; every other value (including integer 0, the
/// empty string, and instances) is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Promote both operands to the real domain, if both are numeric.
fn numeric_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    let a = match left {
        Value::Integer(n) => *n as f64,
        Value::Real(n) => *n,
        _ => return None,
    };
    let b = match right {
        Value::Integer(n) => *n as f64,
        Value::Real(n) => *n,
        _ => return None,
    };

    Some((a, b))
}

fn check_arity(paren: &Token, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(BrioError::runtime(
            paren,
            format!("Expected {} arguments but got {}.", expected, got),
        ));
    }

    Ok(())
}
