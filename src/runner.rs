//! Pipeline wiring: source bytes through
//! Scanner → Parser → Resolver → Interpreter.
//!
//! A `Runner` owns the interpreter and diagnostic sink, so a REPL can reuse
//! one runner across lines and keep its globals.  Resolution and
//! interpretation are skipped entirely when scanning or parsing reported
//! anything; a runtime error is reported once and stops the program.

use log::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Runner {
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl Runner {
    pub fn new() -> Self {
        Runner {
            interpreter: Interpreter::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Execute one program.
    pub fn run(&mut self, source: &[u8]) {
        info!("Running {} bytes of source", source.len());

        let mut tokens: Vec<Token> = Vec::new();
        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => self.diagnostics.report(&error),
            }
        }

        let statements = {
            let mut parser = Parser::new(&tokens, &mut self.diagnostics);
            parser.parse()
        };

        if self.diagnostics.had_error() {
            debug!("Static errors during scan/parse; skipping resolve and interpret");
            return;
        }

        Resolver::new(&mut self.interpreter, &mut self.diagnostics).resolve(&statements);

        if self.diagnostics.had_error() {
            debug!("Resolution errors; skipping interpret");
            return;
        }

        if let Err(error) = self.interpreter.interpret(&statements) {
            self.diagnostics.report(&error);
        }
    }

    pub fn had_error(&self) -> bool {
        self.diagnostics.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.diagnostics.had_runtime_error()
    }

    /// Forget previous errors (between REPL lines).
    pub fn reset_errors(&mut self) {
        self.diagnostics.reset();
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}
