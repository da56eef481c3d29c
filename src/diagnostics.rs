//! The diagnostic sink shared by every pass.
//!
//! Errors are *reported* here as a pure side effect on stderr - they are
//! never thrown across the pass boundary.  Two sticky flags record whether
//! anything static or dynamic went wrong, so the CLI can pick an exit
//! status (65 for compile-time errors, 70 for runtime errors) and the
//! runner can skip resolution/interpretation after a bad scan or parse.

use log::debug;

use crate::error::BrioError;

#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the error and set the matching sticky flag.
    pub fn report(&mut self, error: &BrioError) {
        debug!("Reporting diagnostic: {}", error);

        eprintln!("{}", error);

        match error {
            BrioError::Runtime { .. } => self.had_runtime_error = true,
            _ => self.had_error = true,
        }
    }

    /// Did any static (scan/parse/resolve) error occur?
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// Did a runtime error occur?
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Forget previous errors.  The REPL calls this between lines so one bad
    /// entry does not poison the session.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
