use crate::span::Span;

/// A compiler diagnostic.
///
/// Errors abort the stage that raised them; warnings (a redefined variable,
/// for instance) are reported and the stage proceeds. Drivers decide the
/// exit code from [`render_diagnostics`], which tells them whether anything
/// fatal was among the batch.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Whether diagnostics of this severity fail the pipeline stage.
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Error)
    }

    fn report_kind(self) -> ariadne::ReportKind<'static> {
        match self {
            Severity::Error => ariadne::ReportKind::Error,
            Severity::Warning => ariadne::ReportKind::Warning,
        }
    }

    fn color(self) -> ariadne::Color {
        match self {
            Severity::Error => ariadne::Color::Red,
            Severity::Warning => ariadne::Color::Yellow,
        }
    }
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self::new(Severity::Error, message, span)
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self::new(Severity::Warning, message, span)
    }

    fn new(severity: Severity, message: String, span: Span) -> Self {
        Self {
            severity,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    /// Render the diagnostic to stderr as an ariadne report against the
    /// source it points into.
    pub fn render(&self, filename: &str, source: &str) {
        use ariadne::{Label, Report, Source};

        let range = self.span.start as usize..self.span.end as usize;
        let mut report = Report::build(self.severity.report_kind(), filename, range.start)
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(&self.message)
                    .with_color(self.severity.color()),
            );
        for note in &self.notes {
            report = report.with_note(note);
        }
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }
        report
            .finish()
            .eprint((filename, Source::from(source)))
            .ok();
    }
}

/// Render a batch of diagnostics raised against one input file.
///
/// Fatal diagnostics are followed by a one-line summary on the error
/// channel (the form the drivers' exit message takes). Returns true when
/// any diagnostic in the batch was fatal, so callers can report warnings
/// without failing the build.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) -> bool {
    let mut fatal = 0usize;
    for diag in diagnostics {
        diag.render(filename, source);
        if diag.severity.is_fatal() {
            fatal += 1;
        }
    }
    if fatal > 0 {
        eprintln!(
            "error: could not process '{}': {} error{}",
            filename,
            fatal,
            if fatal == 1 { "" } else { "s" }
        );
    }
    fatal > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let span = Span::new(10, 15);
        let d = Diagnostic::error("unterminated string constant".to_string(), span);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "unterminated string constant");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
    }

    #[test]
    fn test_warning_is_not_fatal() {
        let d = Diagnostic::warning("variable 'x' is already defined".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.severity.is_fatal());
        assert!(Severity::Error.is_fatal());
    }

    #[test]
    fn test_with_note() {
        let d = Diagnostic::error("unexpected token".to_string(), Span::dummy())
            .with_note("expected ';'".to_string())
            .with_note("found ')'".to_string());
        assert_eq!(d.notes.len(), 2);
        assert_eq!(d.notes[0], "expected ';'");
        assert_eq!(d.notes[1], "found ')'");
    }

    #[test]
    fn test_with_help() {
        let d = Diagnostic::error("unknown segment 'heap'".to_string(), Span::dummy())
            .with_help(
                "valid segments are constant, argument, local, static, this, that, pointer, temp"
                    .to_string(),
            );
        assert!(d.help.as_deref().unwrap().contains("pointer"));
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::warning("hint".to_string(), Span::new(0, 5))
            .with_note("note 1".to_string())
            .with_help("help text".to_string())
            .with_note("note 2".to_string());
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.notes.len(), 2);
        assert!(d.help.is_some());
    }

    #[test]
    fn test_render_does_not_panic() {
        let source = "push constant 7\npop heap 0\n";
        let d = Diagnostic::error("unknown segment 'heap'".to_string(), Span::new(20, 24))
            .with_note("in a pop command".to_string());
        // Render to stderr — just verify it doesn't panic
        d.render("test.vm", source);
    }

    #[test]
    fn test_batch_of_warnings_is_not_fatal() {
        let source = "class C { static int x; field int x; }";
        let warnings = vec![
            Diagnostic::warning("variable 'x' is already defined".to_string(), Span::new(34, 35)),
        ];
        assert!(!render_diagnostics(&warnings, "C.jack", source));
    }

    #[test]
    fn test_batch_with_error_is_fatal() {
        let source = "bogus\npush heap 0\n";
        let diagnostics = vec![
            Diagnostic::error("unknown VM command 'bogus'".to_string(), Span::new(0, 5)),
            Diagnostic::warning("odd spacing".to_string(), Span::new(6, 17)),
            Diagnostic::error("unknown segment 'heap'".to_string(), Span::new(11, 15)),
        ];
        assert!(render_diagnostics(&diagnostics, "Bad.vm", source));
    }
}
