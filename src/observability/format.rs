//! JSON line encoder for the file sink.
//!
//! Every event becomes one object with `time`, `level`, `caller` and `msg`
//! first, followed by the event's own fields in recording order.

use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Event formatter producing one JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLines;

impl<S, N> FormatEvent<S, N> for JsonLines
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        let mut time = String::new();
        SystemTime.format_time(&mut Writer::new(&mut time))?;

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut record = Map::new();
        record.insert("time".to_string(), Value::String(time));
        record.insert("level".to_string(), Value::String(meta.level().to_string()));
        if let Some(caller) = short_caller(meta.file(), meta.line()) {
            record.insert("caller".to_string(), Value::String(caller));
        }
        record.insert(
            "msg".to_string(),
            Value::String(fields.message.unwrap_or_default()),
        );
        record.extend(fields.values);

        writeln!(writer, "{}", Value::Object(record))
    }
}

/// Render a source location as `parent/file.rs:line`.
pub fn short_caller(file: Option<&str>, line: Option<u32>) -> Option<String> {
    let file = file?;
    let mut parts = file.rsplit(['/', '\\']);
    let name = parts.next()?;
    let short = match parts.next() {
        Some(dir) if !dir.is_empty() => format!("{dir}/{name}"),
        _ => name.to_string(),
    };

    Some(match line {
        Some(line) => format!("{short}:{line}"),
        None => short,
    })
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(text) => text,
                other => other.to_string(),
            });
        } else {
            self.values.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_caller() {
        assert_eq!(
            short_caller(Some("src/http/middleware/access_log.rs"), Some(42)).as_deref(),
            Some("middleware/access_log.rs:42")
        );
        assert_eq!(
            short_caller(Some("main.rs"), Some(7)).as_deref(),
            Some("main.rs:7")
        );
        assert_eq!(
            short_caller(Some(r"src\observability\format.rs"), None).as_deref(),
            Some("observability/format.rs")
        );
        assert_eq!(short_caller(None, Some(1)), None);
    }
}
