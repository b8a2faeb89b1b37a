use serde::Serialize;

use super::{Diagnostic, Severity, SourceMap};

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<JsonLabel<'a>>,
    notes: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonLabel<'a> {
    start: usize,
    end: usize,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

/// One diagnostic as a single-line JSON object.
pub fn render(d: &Diagnostic) -> String {
    let map = d.source.as_deref().map(SourceMap::new);
    let label = d.label.as_ref().map(|l| JsonLabel {
        start: l.span.start,
        end: l.span.end,
        message: &l.message,
        col: map.as_ref().map(|m| m.lookup(l.span.start).1),
    });

    let json = JsonDiagnostic {
        severity: d.severity,
        code: d.code,
        message: &d.message,
        line: d.line,
        label,
        notes: &d.notes,
        suggestion: d.suggestion.as_deref(),
    };

    serde_json::to_string(&json).unwrap_or_else(|_| {
        r#"{"severity":"error","message":"internal error serializing diagnostic"}"#.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Span;

    fn parse_json(s: &str) -> serde_json::Value {
        serde_json::from_str(s).expect("valid JSON")
    }

    #[test]
    fn basic_error() {
        let v = parse_json(&render(&Diagnostic::error("Stack overflow.").with_code("LOX-R005")));
        assert_eq!(v["severity"], "error");
        assert_eq!(v["code"], "LOX-R005");
        assert_eq!(v["message"], "Stack overflow.");
        assert!(v.get("label").is_none());
        assert!(v.get("suggestion").is_none());
        assert!(v["notes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn label_gets_column_from_source() {
        let d = Diagnostic::error("Expect expression.")
            .with_line(2)
            .with_span(Span { start: 13, end: 14 }, "at ';'")
            .with_source("print 1;\nvar ;");
        let v = parse_json(&render(&d));
        assert_eq!(v["line"], 2);
        assert_eq!(v["label"]["start"], 13);
        assert_eq!(v["label"]["end"], 14);
        assert_eq!(v["label"]["message"], "at ';'");
        assert_eq!(v["label"]["col"], 5);
    }

    #[test]
    fn label_without_source_has_no_column() {
        let d = Diagnostic::error("bad").with_span(Span { start: 5, end: 8 }, "here");
        let v = parse_json(&render(&d));
        assert!(v["label"].get("col").is_none());
    }

    #[test]
    fn single_line_even_with_newlines_in_text() {
        let d = Diagnostic::error("a\nb").with_note("x\ny").with_suggestion("fix \"it\"");
        let out = render(&d);
        assert!(!out.contains('\n'));
        let v = parse_json(&out);
        assert_eq!(v["message"], "a\nb");
        assert_eq!(v["suggestion"], "fix \"it\"");
    }
}
