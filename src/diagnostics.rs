//! Accumulated build diagnostics.
//!
//! Expected error conditions never unwind across module boundaries. They are
//! pushed here instead, the pipeline keeps going so that one invocation
//! surfaces as many problems as possible, and the *saw-error* flag decides
//! the exit status at the end.

use std::fmt;

use tracing::{error, warn};

use crate::error::GenError;
use crate::output::Printer;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single recorded diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Short machine-readable code (e.g. "missing-field").
    pub code: String,
    pub message: String,
    pub help: Option<String>,
    /// Where the problem was found (file, or `file:line:col`), if known.
    pub location: Option<String>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            help: None,
            location: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            message: message.into(),
            help: None,
            location: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<&GenError> for Diagnostic {
    fn from(err: &GenError) -> Self {
        let help = match err {
            GenError::Config { help, .. } | GenError::Build { help, .. } => help.clone(),
            _ => None,
        };
        Diagnostic {
            severity: Severity::Error,
            code: err.code().to_string(),
            message: err.to_string(),
            help,
            location: None,
        }
    }
}

/// Collects diagnostics for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    saw_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic. Errors set the saw-error flag.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                self.saw_error = true;
                error!(code = %diagnostic.code, "{}", diagnostic.message);
            }
            Severity::Warning => warn!(code = %diagnostic.code, "{}", diagnostic.message),
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(code, message));
    }

    pub fn warning(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(code, message));
    }

    /// Record a non-fatal error value.
    pub fn report(&mut self, err: &GenError) {
        self.push(Diagnostic::from(err));
    }

    /// Record a non-fatal error value with a location prefix.
    pub fn report_at(&mut self, location: impl Into<String>, err: &GenError) {
        self.push(Diagnostic::from(err).at(location));
    }

    /// Record `result`'s error if it has one, or pass fatal errors through.
    ///
    /// Returns `Ok(Some(value))` on success, `Ok(None)` when a non-fatal error
    /// was recorded.
    pub fn absorb<T>(&mut self, result: Result<T, GenError>) -> Result<Option<T>, GenError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.report(&err);
                Ok(None)
            }
        }
    }

    /// The saw-error flag.
    pub fn saw_error(&self) -> bool {
        self.saw_error
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Whether any recorded diagnostic carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    /// Print every diagnostic and a summary line to stderr.
    pub fn print(&self, printer: &Printer) {
        for d in &self.diagnostics {
            let label = printer.severity(&d.severity.to_string(), d.severity == Severity::Error);
            match &d.location {
                Some(location) => eprintln!(
                    "{}[{}]: {}: {}",
                    label,
                    d.code,
                    printer.bold(&location.to_string()),
                    d.message
                ),
                None => eprintln!("{}[{}]: {}", label, d.code, d.message),
            }
            if let Some(help) = &d.help {
                eprintln!("  {} {}", printer.dim("help:"), help);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_diagnostics() {
        let diags = Diagnostics::new();
        assert!(diags.is_empty());
        assert!(!diags.saw_error());
    }

    #[test]
    fn test_warning_does_not_set_flag() {
        let mut diags = Diagnostics::new();
        diags.warning("unused", "nothing uses this");
        assert!(!diags.saw_error());
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn test_error_sets_flag() {
        let mut diags = Diagnostics::new();
        diags.error("asset-not-found", "grass.png");
        assert!(diags.saw_error());
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_code("asset-not-found"));
    }

    #[test]
    fn test_absorb_records_non_fatal() {
        let mut diags = Diagnostics::new();
        let result: Result<u32, GenError> = Err(GenError::UnknownMod {
            name: "x".to_string(),
        });
        assert!(matches!(diags.absorb(result), Ok(None)));
        assert!(diags.saw_error());
    }

    #[test]
    fn test_absorb_passes_fatal_through() {
        let mut diags = Diagnostics::new();
        let result: Result<u32, GenError> = Err(GenError::OversizedBox {
            width: 5,
            height: 5,
            page_width: 4,
            page_height: 4,
        });
        assert!(diags.absorb(result).is_err());
        assert!(!diags.saw_error());
    }
}
