use std::fmt;

use log::Level;

/// Where a component sends its log output. Handed in at construction.
pub trait Diagnostics {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);
}

/// Forwards to the `log` facade under a fixed target
#[derive(Debug, Clone)]
pub struct LogDiagnostics {
    target: String,
}

impl LogDiagnostics {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Diagnostics for LogDiagnostics {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: &self.target, level, "{}", args);
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::cell::RefCell;

    use super::*;

    /// Keeps every line for inspection
    #[derive(Default)]
    pub struct Captured {
        pub lines: RefCell<Vec<(Level, String)>>,
    }

    impl Captured {
        pub fn messages(&self, level: Level) -> Vec<String> {
            self.lines
                .borrow()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }
    }

    impl Diagnostics for Captured {
        fn log(&self, level: Level, args: fmt::Arguments<'_>) {
            self.lines.borrow_mut().push((level, args.to_string()));
        }
    }
}
