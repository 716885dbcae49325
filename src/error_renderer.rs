//! Diagnostic rendering using ariadne
//!
//! Diagnostics that point into a listing are shown with the listing snippet and a
//! label under the offending token. The rest are printed as a single headline.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

/// Render a diagnostic with formatting to stderr
pub fn render_diagnostic(diagnostic: &Diagnostic) {
    render_to_writer(diagnostic, &mut std::io::stderr(), true).ok();
}

/// Render a fatal error to stderr
pub fn render_error(error: &Error) {
    render_diagnostic(&error.to_diagnostic());
}

/// Render a diagnostic to a specific writer
pub fn render_diagnostic_to(diagnostic: &Diagnostic, writer: &mut dyn Write) -> std::io::Result<()> {
    render_to_writer(diagnostic, writer, true)
}

/// Render a diagnostic to a String
pub fn render_diagnostic_to_string(diagnostic: &Diagnostic) -> String {
    let mut buf = Vec::new();
    render_to_writer(diagnostic, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render a diagnostic to a String without color codes (useful for tests)
pub fn render_diagnostic_to_string_no_color(diagnostic: &Diagnostic) -> String {
    let mut buf = Vec::new();
    render_to_writer(diagnostic, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_to_writer(
    diagnostic: &Diagnostic,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let (Some(span), Some(source)) = (&diagnostic.span, &diagnostic.source) else {
        writeln!(writer, "{}", diagnostic)?;
        for help in &diagnostic.help {
            writeln!(writer, "  help: {}", help)?;
        }
        return Ok(());
    };

    let name = diagnostic.function.as_deref().unwrap_or("<listing>");
    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };

    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let mut report = Report::build(kind, (name, span.0.clone()))
        .with_message(&diagnostic.message)
        .with_config(ariadne::Config::default().with_color(use_color));

    if let Some(code) = &diagnostic.code {
        report = report.with_code(code);
    }

    report = report.with_label(
        Label::new((name, span.0.clone()))
            .with_message(&diagnostic.message)
            .with_color(colors.next()),
    );

    for help in &diagnostic.help {
        report = report.with_help(help);
    }

    report.finish().write((name, Source::from(source)), &mut *writer)
}
