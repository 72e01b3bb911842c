//! Diagnostics emitted by the duplication detectors.
//!
//! A diagnostic carries an opaque kind code, the source span it is
//! anchored to and positional message arguments; formatting beyond
//! [`Diagnostic::message`] belongs to the consuming reporting layer.

use std::fmt;
use std::sync::Mutex;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    DuplicateIfBranches,
    DuplicateSeqIfs,
    DuplicateExprs,
    DuplicateBlocks,
    DuplicateSequence,
    SimilarToFunction,
    SimilarToLoop,
    IfToTernary,
    IfToVariables,
    IfIntoBlock,
}

impl DiagnosticKind {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateIfBranches => "duplicate-if-branches",
            DiagnosticKind::DuplicateSeqIfs => "duplicate-seq-ifs",
            DiagnosticKind::DuplicateExprs => "duplicate-exprs",
            DiagnosticKind::DuplicateBlocks => "duplicate-blocks",
            DiagnosticKind::DuplicateSequence => "duplicate-sequence",
            DiagnosticKind::SimilarToFunction => "similar-to-function",
            DiagnosticKind::SimilarToLoop => "similar-to-loop",
            DiagnosticKind::IfToTernary => "if-to-ternary",
            DiagnosticKind::IfToVariables => "if-to-variables",
            DiagnosticKind::IfIntoBlock => "if-into-block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub args: Vec<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, span: Span, args: Vec<String>) -> Self {
        Diagnostic { kind, span, args }
    }

    /// Human-readable message with the positional arguments filled in.
    pub fn message(&self) -> String {
        let arg = |i: usize| self.args.get(i).map(String::as_str).unwrap_or("?");
        match self.kind {
            DiagnosticKind::DuplicateIfBranches => format!(
                "Identical code inside all if's branches, move {} lines {} the if.",
                arg(0),
                arg(1)
            ),
            DiagnosticKind::DuplicateSeqIfs => format!(
                "Identical code inside {} consecutive ifs, join their conditions using 'or'.",
                arg(0)
            ),
            DiagnosticKind::DuplicateExprs => format!(
                "A complex expression '{}' used repeatedly (on lines {}). Extract it to a \
                 local variable or create a helper function.",
                arg(0),
                arg(1)
            ),
            DiagnosticKind::DuplicateBlocks => format!(
                "Duplicate blocks starting on lines {}. Extract the code to a helper function.",
                arg(0)
            ),
            DiagnosticKind::DuplicateSequence => format!(
                "Duplicate sequence of {} repetitions of {} lines of code. Use a loop to \
                 avoid this.",
                arg(0),
                arg(1)
            ),
            DiagnosticKind::SimilarToFunction => "Extract to a common function.".to_string(),
            DiagnosticKind::SimilarToLoop => format!(
                "Extract code into loop ({} repetitions of {} statements).",
                arg(0),
                arg(1)
            ),
            DiagnosticKind::IfToTernary => {
                "Identical branches up to a few values, rewrite as a conditional expression."
                    .to_string()
            }
            DiagnosticKind::IfToVariables => {
                "Identical branches up to a few values, extract the differences to variables."
                    .to_string()
            }
            DiagnosticKind::IfIntoBlock => {
                "Identical branches up to a nested region, move the if inside the block."
                    .to_string()
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.kind.code(), self.span, self.message())
    }
}

/// Trait for consuming diagnostics; allows dependency injection and
/// testing with collecting handlers.
pub trait DiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic);

    fn count(&self) -> usize;

    fn get_diagnostics(&self) -> Vec<Diagnostic>;
}

/// Collects diagnostics in order, without printing.
#[derive(Default)]
pub struct CollectingDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticHandler for CollectingDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn count(&self) -> usize {
        self.diagnostics.lock().unwrap().len()
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

/// Prints each diagnostic to stderr as it is reported, keeping a copy.
#[derive(Default)]
pub struct ConsoleDiagnosticHandler {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl ConsoleDiagnosticHandler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticHandler for ConsoleDiagnosticHandler {
    fn report(&self, diagnostic: Diagnostic) {
        eprintln!("{}", diagnostic);
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    fn count(&self) -> usize {
        self.diagnostics.lock().unwrap().len()
    }

    fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_formatting() {
        let diag = Diagnostic::new(
            DiagnosticKind::DuplicateSequence,
            Span::new(3, 0, 10, 0),
            vec!["4".to_string(), "2".to_string()],
        );
        assert_eq!(
            diag.message(),
            "Duplicate sequence of 4 repetitions of 2 lines of code. Use a loop to avoid this."
        );
    }

    #[test]
    fn test_collecting_handler_preserves_order() {
        let handler = CollectingDiagnosticHandler::new();
        handler.report(Diagnostic::new(
            DiagnosticKind::DuplicateExprs,
            Span::line(1),
            vec![],
        ));
        handler.report(Diagnostic::new(
            DiagnosticKind::DuplicateBlocks,
            Span::line(2),
            vec![],
        ));
        let collected = handler.get_diagnostics();
        assert_eq!(handler.count(), 2);
        assert_eq!(collected[0].kind, DiagnosticKind::DuplicateExprs);
        assert_eq!(collected[1].kind, DiagnosticKind::DuplicateBlocks);
    }
}
