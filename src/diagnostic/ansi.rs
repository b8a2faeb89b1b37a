use super::{Diagnostic, Severity, SourceMap};

pub struct AnsiRenderer {
    pub use_color: bool,
}

impl AnsiRenderer {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color { format!("\x1b[{code}m{s}\x1b[0m") } else { s.to_string() }
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }

    fn bold_red(&self, s: &str) -> String {
        self.paint("1;31", s)
    }

    fn cyan(&self, s: &str) -> String {
        self.paint("36", s)
    }

    fn dim(&self, s: &str) -> String {
        self.paint("2", s)
    }

    pub fn render(&self, d: &Diagnostic) -> String {
        let mut out = String::new();

        // "error[LOX-C001]: message"
        let severity = match d.severity {
            Severity::Error => "error",
        };
        let head = match d.code {
            Some(code) => format!("{severity}[{code}]"),
            None => severity.to_string(),
        };
        out.push_str(&format!("{}: {}\n", self.bold_red(&head), self.bold(&d.message)));

        if let Some(source) = &d.source {
            self.render_snippet(&mut out, d, source);
        } else if let Some(line) = d.line {
            out.push_str(&format!("  {} line {line}\n", self.cyan("-->")));
        }

        for note in &d.notes {
            out.push_str(&format!("  {} note: {note}\n", self.dim("=")));
        }
        if let Some(suggestion) = &d.suggestion {
            out.push_str(&format!("  {} help: {suggestion}\n", self.dim("=")));
        }
        out
    }

    /// The offending source line with a gutter, plus carets under the label
    /// span when there is one. Diagnostics with neither span nor line get no
    /// snippet.
    fn render_snippet(&self, out: &mut String, d: &Diagnostic, source: &str) {
        let map = SourceMap::new(source);
        let (line, col) = match (&d.label, d.line) {
            (Some(label), _) => {
                let (line, col) = map.lookup(label.span.start);
                (line, Some(col))
            }
            (None, Some(line)) => (line, None),
            (None, None) => return,
        };

        match col {
            Some(col) => out.push_str(&format!("  {} {line}:{col}\n", self.cyan("-->"))),
            None => out.push_str(&format!("  {} line {line}\n", self.cyan("-->"))),
        }

        let gutter = line.to_string().len();
        let pad = " ".repeat(gutter);
        let pipe = self.cyan("|");
        let line_num = self.cyan(&format!("{line:>gutter$}"));

        out.push_str(&format!("{pad} {pipe}\n"));
        out.push_str(&format!("{line_num} {pipe} {}\n", map.line_text(line)));

        if let (Some(label), Some(col)) = (&d.label, col) {
            let indent = " ".repeat(col - 1);
            let width = map.width(label.span.start, label.span.end);
            let carets = self.bold_red(&"^".repeat(width.max(1)));
            if label.message.is_empty() {
                out.push_str(&format!("{pad} {pipe} {indent}{carets}\n"));
            } else {
                let message = self.bold_red(&label.message);
                out.push_str(&format!("{pad} {pipe} {indent}{carets} {message}\n"));
            }
        }
        out.push_str(&format!("{pad} {pipe}\n"));
    }
}
