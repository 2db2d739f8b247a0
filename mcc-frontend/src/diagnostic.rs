//! Diagnostics.
//!
//! Every pass collects its user-facing problems as [`Diagnostic`] values and
//! keeps going; nothing in the frontend prints or aborts on its own. The
//! [`DiagnosticContext`] renders a diagnostic the way a C compiler does:
//!
//! ```text
//! main.c:2:10: Error: use of undeclared identifier 'b'
//! 2 |   return b;
//!   |          ^
//! ```
//!
//! with a tilde underline extending under multi-byte ranges.

use core::fmt::Write;

use crate::lines::LineTable;
use crate::srcloc::SourceRange;

/// A single user-facing problem, anchored to a source range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable description.
    pub message: String,
    /// The offending source region.
    pub range: SourceRange,
}

impl Diagnostic {
    /// Create a diagnostic.
    pub fn new(message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Everything needed to render diagnostics for one file.
pub struct DiagnosticContext<'a> {
    /// Path shown in the `path:line:col:` prefix.
    pub path: &'a str,
    /// The file's full contents.
    pub source: &'a str,
    /// The file's line table.
    pub lines: &'a LineTable,
}

impl DiagnosticContext<'_> {
    fn line_bounds(&self, line: u32) -> (u32, u32) {
        let begin = self.lines.line_start(line).unwrap_or(self.source.len() as u32);
        let end = self
            .lines
            .line_start(line + 1)
            .unwrap_or(self.source.len() as u32);
        (begin, end)
    }

    /// Render one diagnostic with its source excerpt and underline.
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let range = diagnostic.range;
        let begin = self.lines.line_and_column(range.begin);
        let end = self.lines.line_and_column(range.end);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}:{}:{}: Error: {}",
            self.path, begin.line, begin.column, diagnostic.message
        );

        // A range ending at column 1 stops at the previous line's newline.
        let last_line = if end.column == 1 && end.line > begin.line {
            end.line - 1
        } else {
            end.line
        };

        for line in begin.line..=last_line {
            let (line_begin, line_end) = self.line_bounds(line);
            let text = &self.source[line_begin as usize..line_end as usize];
            let _ = write!(out, "{} | {}", line, text);
            if !text.ends_with('\n') {
                out.push('\n');
            }

            out.push_str("  | ");
            let lo = range.begin.max(line_begin);
            let hi = range.end.min(line_end);
            for _ in line_begin..lo {
                out.push(' ');
            }
            out.push('^');
            for _ in lo.saturating_add(1)..hi {
                out.push('~');
            }
            out.push('\n');
        }

        out
    }

    /// Render a batch of diagnostics, in order.
    pub fn render_all(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics.iter().map(|d| self.render(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context<'a>(source: &'a str, lines: &'a LineTable) -> DiagnosticContext<'a> {
        DiagnosticContext {
            path: "main.c",
            source,
            lines,
        }
    }

    #[test]
    fn caret_points_at_the_range() {
        let source = "int main(void) {\n  return b;\n}\n";
        let lines = LineTable::compute(source);
        let ctx = context(source, &lines);
        // The range of `b`.
        let offset = source.find('b').unwrap() as u32;
        let diag = Diagnostic::new(
            "use of undeclared identifier 'b'",
            SourceRange::new(offset, offset + 1),
        );
        let rendered = ctx.render(&diag);
        assert_eq!(
            rendered,
            "main.c:2:10: Error: use of undeclared identifier 'b'\n\
             2 |   return b;\n  |          ^\n"
        );
    }

    #[test]
    fn tildes_underline_wider_ranges() {
        let source = "return abcd;\n";
        let lines = LineTable::compute(source);
        let ctx = context(source, &lines);
        let diag = Diagnostic::new("bad", SourceRange::new(7, 11));
        let rendered = ctx.render(&diag);
        assert!(rendered.contains("1 | return abcd;\n"));
        assert!(rendered.contains("  |        ^~~~\n"));
    }

    #[test]
    fn missing_trailing_newline_is_handled() {
        let source = "return";
        let lines = LineTable::compute(source);
        let ctx = context(source, &lines);
        let diag = Diagnostic::new("expected expression", SourceRange::new(6, 6));
        let rendered = ctx.render(&diag);
        assert!(rendered.starts_with("main.c:1:7: Error: expected expression\n"));
        assert!(rendered.contains("1 | return\n"));
    }
}
