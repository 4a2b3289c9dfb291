use std::io::{self, Write};

use aid_graph::{Reporter, ResultRecord};
use serde_json::Value;
use tracing::warn;

/// Progress goes to stderr, the final record to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn render(&self, record: &ResultRecord) -> String {
        if self.json {
            render_json(record)
        } else {
            render_text(record)
        }
    }

    pub fn write_to<W: Write>(&self, out: &mut W, record: &ResultRecord) -> io::Result<()> {
        writeln!(out, "{}", self.render(record))?;
        out.flush()
    }

    /// Prints the final record to stdout.
    pub fn emit(&self, record: &ResultRecord) -> io::Result<()> {
        self.write_to(&mut io::stdout().lock(), record)
    }
}

impl Reporter for ConsoleReporter {
    fn progress(&self, message: &str) {
        // Under --json stderr stays free for logs only.
        if !self.json {
            eprintln!("... {message}");
        }
    }

    fn finish(&self, record: &ResultRecord) {
        if let Err(err) = self.emit(record) {
            warn!(error = %err, "failed to write the result record");
        }
    }
}

pub fn render_json(record: &ResultRecord) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| "{}".into())
}

/// One `key: value` line per field. Lists print one compact JSON item per
/// indented line.
pub fn render_text(record: &ResultRecord) -> String {
    let mut lines = Vec::new();
    for (field, value) in record.fields() {
        match value {
            Value::Array(items) if items.is_empty() => lines.push(format!("{field}: (none)")),
            Value::Array(items) => {
                lines.push(format!("{field}:"));
                lines.extend(items.iter().map(|item| format!("  - {}", scalar(item))));
            }
            other => lines.push(format!("{field}: {}", scalar(other))),
        }
    }
    lines.join("\n")
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "-".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn removed() -> ResultRecord {
        ResultRecord::new()
            .with("appObjectId", "app-1")
            .with("value", "write.all")
            .with("steps", json!(["disable", "omit"]))
            .with("scopeId", Value::Null)
    }

    #[test]
    fn text_lists_fields_in_name_order() {
        insta::assert_snapshot!(render_text(&removed()), @r"
        appObjectId: app-1
        scopeId: -
        steps:
          - disable
          - omit
        value: write.all
        ");
    }

    #[test]
    fn text_marks_empty_lists_and_inlines_objects() {
        let record = ResultRecord::new()
            .with("count", 0)
            .with("uris", json!([]))
            .with("first", json!({"id": "1"}));
        assert_eq!(render_text(&record), "count: 0\nfirst: {\"id\":\"1\"}\nuris: (none)");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_reach_the_caller() {
        let err = ConsoleReporter::new(false)
            .write_to(&mut ClosedPipe, &removed())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        let mut out = Vec::new();
        ConsoleReporter::new(false).write_to(&mut out, &removed()).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("value: write.all\n"));
    }

    #[test]
    fn json_output_is_the_record_itself() {
        let rendered = ConsoleReporter::new(true).render(&removed());
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["steps"], json!(["disable", "omit"]));
        assert_eq!(parsed["scopeId"], Value::Null);
    }
}
