use std::collections::VecDeque;
use std::fmt;

use crate::span::Span;

/// A single message produced by the toolchain.
///
/// Diagnostics carry the non-fatal output of compilation and linkage:
/// errors that will fail the run, warnings about suspect code, and notes
/// such as optimizer reports. Each diagnostic includes the message text,
/// a severity, and where it came from.
///
/// # Examples
///
/// ```rust
/// use seedc_core::{Diagnostic, DiagnosticKind, Span};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::Warning,
///     message: "unreachable statement removed".to_string(),
///     section: Some("main.c".to_string()),
///     span: Span::new(4, 3, 9),
/// };
///
/// assert_eq!(diagnostic.to_string(), "main.c:4:3: warning: unreachable statement removed");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The severity level of this diagnostic
    pub kind: DiagnosticKind,
    /// The diagnostic message text
    pub message: String,
    /// The source file or module name this diagnostic refers to, if known
    pub section: Option<String>,
    /// The source position this diagnostic refers to; a zero line means
    /// the diagnostic has no position (e.g. link-time messages)
    pub span: Span,
}

/// The severity level of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An error that fails the operation that produced it.
    Error,
    /// A potential problem that does not stop the operation.
    Warning,
    /// An informational note, e.g. an optimizer report.
    Info,
}

impl DiagnosticKind {
    fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Info => "info",
        }
    }
}

/// An ordered collection of diagnostics.
///
/// The pipeline threads one `Diagnostics` through parsing, optimization,
/// code generation, and linkage; each phase appends and the caller decides
/// afterwards what to print. The error state is tracked as messages are
/// added, so `has_errors()` is a flag check rather than a scan.
///
/// # Examples
///
/// ```rust
/// use seedc_core::{Diagnostics, Span};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.warning("unused variable 'x'", Some("main.c"), Span::new(2, 7, 1));
///
/// assert!(!diagnostics.has_errors());
/// assert_eq!(diagnostics.warning_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    /// Creates a new, empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a diagnostic to the collection.
    ///
    /// If the diagnostic is an error, the internal error flag is set.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    /// Records an error.
    pub fn error(&mut self, message: impl Into<String>, section: Option<&str>, span: Span) {
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Error,
            message: message.into(),
            section: section.map(str::to_string),
            span,
        });
    }

    /// Records a warning.
    pub fn warning(&mut self, message: impl Into<String>, section: Option<&str>, span: Span) {
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Warning,
            message: message.into(),
            section: section.map(str::to_string),
            span,
        });
    }

    /// Records an informational note.
    pub fn info(&mut self, message: impl Into<String>, section: Option<&str>, span: Span) {
        self.add_diagnostic(Diagnostic {
            kind: DiagnosticKind::Info,
            message: message.into(),
            section: section.map(str::to_string),
            span,
        });
    }

    /// Returns `true` if the collection contains any error diagnostics.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Returns `true` if the collection contains any warning diagnostics.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Returns `true` if the collection contains no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Removes all diagnostics and resets the error flag.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    /// Returns an iterator over all diagnostics, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Returns an iterator over only the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Error)
    }

    /// Returns an iterator over only the warning diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Returns the total number of diagnostics in the collection.
    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns the number of error diagnostics in the collection.
    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Returns the number of warning diagnostics in the collection.
    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Returns the number of info diagnostics in the collection.
    pub fn info_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Info)
            .count()
    }

    /// Writes all diagnostics to the provided writer, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails.
    pub fn emit<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(writer, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    /// Formats a diagnostic for display.
    ///
    /// The format is `section:line:col: kind: message`, dropping the pieces
    /// that are absent: a missing section omits the leading name, a zero
    /// line omits the position entirely.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.as_str();
        match (&self.section, self.span.line) {
            (Some(section), 0) => write!(f, "{}: {}: {}", section, kind, self.message),
            (Some(section), _) => {
                write!(f, "{}:{}: {}: {}", section, self.span, kind, self.message)
            }
            (None, 0) => write!(f, "{}: {}", kind, self.message),
            (None, _) => write!(f, "{}: {}: {}", self.span, kind, self.message),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_flag_tracks_added_errors() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.has_errors());

        diagnostics.warning("suspicious", None, Span::point(1, 1));
        assert!(!diagnostics.has_errors());

        diagnostics.error("broken", None, Span::point(1, 2));
        assert!(diagnostics.has_errors());

        diagnostics.clear();
        assert!(!diagnostics.has_errors());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn display_includes_section_and_position() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("expected ';'", Some("main.c"), Span::new(3, 14, 1));
        let line = diagnostics.errors().next().map(|d| d.to_string());
        assert_eq!(line.as_deref(), Some("main.c:3:14: error: expected ';'"));
    }

    #[test]
    fn display_omits_missing_position() {
        let diagnostic = Diagnostic {
            kind: DiagnosticKind::Warning,
            message: "import 'put_char' unresolved".to_string(),
            section: Some("game".to_string()),
            span: Span::point(0, 0),
        };
        assert_eq!(
            diagnostic.to_string(),
            "game: warning: import 'put_char' unresolved"
        );
    }

    #[test]
    fn counts_split_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("e", None, Span::point(1, 1));
        diagnostics.warning("w1", None, Span::point(1, 1));
        diagnostics.warning("w2", None, Span::point(1, 1));
        diagnostics.info("n", None, Span::point(1, 1));

        assert_eq!(diagnostics.count(), 4);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 2);
        assert_eq!(diagnostics.info_count(), 1);

        let mut out = Vec::new();
        diagnostics.emit(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 4);
    }
}
