//! Error reporting and `-v` progress lines (spec §7: "a single line to
//! standard error with the stage and the line number, then exit code 1. No
//! partial output is written.").
//!
//! Colored output follows `raya-cli`'s `output.rs` (`termcolor`,
//! `NO_COLOR`-respecting `ColorChoice::Auto`) for the mandatory one-liner;
//! [`report_source_snippet`] additionally renders a `raya-checker`-style
//! `codespan_reporting` snippet with a caret under the offending span, for
//! the two stages (parse, codegen) that have one to show.

use cc_ast::Span;
use codespan_reporting::diagnostic::{Diagnostic as CsDiagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{self, termcolor::ColorChoice as CsColorChoice};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Which pass produced an error, for the "stage" half of spec §7's
/// one-line report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Lex,
    Parse,
    Codegen,
    Emit,
}

impl Stage {
    fn label(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Lex => "lex",
            Stage::Parse => "parse",
            Stage::Codegen => "codegen",
            Stage::Emit => "emit",
        }
    }
}

/// Writes `ccvm: <stage>:<line>: <message>` to stderr in red, then returns
/// — the caller still owns picking the process exit code.
pub fn report_error(stage: Stage, line: Option<u32>, message: &str) {
    let mut stderr = StandardStream::stderr(resolve_color_choice());
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    let _ = stderr.set_color(&spec);
    let _ = match line {
        Some(line) => write!(stderr, "ccvm: {}:{}: ", stage.label(), line),
        None => write!(stderr, "ccvm: {}: ", stage.label()),
    };
    let _ = stderr.reset();
    let _ = writeln!(stderr, "{}", message);
}

/// `-v`'s one-line-per-stage progress report, in cyan to distinguish it
/// from an error.
pub fn report_progress(message: &str) {
    let mut stdout = StandardStream::stdout(resolve_color_choice());
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Cyan));
    let _ = stdout.set_color(&spec);
    let _ = write!(stdout, "ccvm: ");
    let _ = stdout.reset();
    let _ = writeln!(stdout, "{}", message);
}

/// Renders a source snippet with a caret under the offending span, on top
/// of (not instead of) spec §7's mandatory one-line report — a TTY-only
/// enrichment in the same spirit as `raya-checker::diagnostic::Diagnostic`,
/// scaled down to the one-label case a parse/codegen error actually needs.
pub fn report_source_snippet(path: &str, source: &str, span: Span, message: &str) {
    let mut files = SimpleFiles::new();
    let file_id = files.add(path, source);
    let range = span.start as usize..span.end as usize;
    let diagnostic = CsDiagnostic::error().with_message(message).with_labels(vec![Label::primary(file_id, range)]);
    let mut writer = term::termcolor::StandardStream::stderr(resolve_cs_color_choice());
    let config = term::Config::default();
    let _ = term::emit(&mut writer, &config, &files, &diagnostic);
}

fn resolve_cs_color_choice() -> CsColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        CsColorChoice::Never
    } else {
        CsColorChoice::Auto
    }
}

fn resolve_color_choice() -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    }
}
