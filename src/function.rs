use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user-defined function value: the shared AST declaration, the
/// environment captured at definition time, and whether this is a class
/// initializer.
///
/// A fresh `Function` is created every time a declaration executes and every
/// time a method is bound to an instance; all of them share the declaration
/// through the `Rc`.
#[derive(Debug)]
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Function {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose closure has `this` bound to
    /// `instance`.  Method access does this on every lookup.
    pub fn bind(&self, instance: Value) -> Function {
        let mut environment = Environment::with_enclosing(self.closure.clone());
        environment.define("this", instance);

        Function {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function.  The caller has already checked arity.
    ///
    /// A `Returning` flow raised anywhere in the body unwinds exactly to
    /// this frame.  Initializers always yield the constructed instance (the
    /// `this` binding of their own closure), no matter what the body
    /// returned.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value> {
        debug!("Calling <fn {}> with {} args", self.name(), arguments.len());

        let mut environment = Environment::with_enclosing(self.closure.clone());

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let flow = interpreter
            .execute_block(&self.declaration.body, Rc::new(RefCell::new(environment)))?;

        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, "this"));
        }

        Ok(match flow {
            Flow::Returning(value) => value,
            Flow::Completed => Value::Nil,
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}
