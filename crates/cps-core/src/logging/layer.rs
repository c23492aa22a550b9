//! Tracing layer that writes one JSON object per event.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::events::Level;

/// Collects event fields, lifting the correlation keys out of `fields`.
#[derive(Default)]
struct JsonFieldVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
    run_id: Option<String>,
    stage: Option<String>,
}

impl JsonFieldVisitor {
    fn put(&mut self, name: &str, value: serde_json::Value) {
        self.fields.insert(name.to_string(), value);
    }

    fn put_string(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = Some(value),
            "run_id" => self.run_id = Some(value),
            "stage" => self.stage = Some(value),
            _ => self.put(name, serde_json::Value::String(value)),
        }
    }
}

impl Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put_string(field.name(), value.to_string());
    }

    // `%value` and `?value` both arrive here.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put_string(field.name(), format!("{:?}", value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field.name(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field.name(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field.name(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field.name(), serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer; stderr by default.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber,
    W: Write + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let ts = Utc::now();

        let mut visitor = JsonFieldVisitor::default();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut obj = serde_json::Map::new();
        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );
        if let Some(id) = visitor.run_id {
            obj.insert("run_id".to_string(), serde_json::json!(id));
        }
        if let Some(stage) = visitor.stage {
            obj.insert("stage".to_string(), serde_json::json!(stage));
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{event_names, LogContext, Stage};
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture<F: FnOnce()>(f: F) -> Vec<serde_json::Value> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let output = buffer.lock().unwrap();
        String::from_utf8_lossy(&output)
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid json line"))
            .collect()
    }

    #[test]
    fn writes_level_message_and_target() {
        let lines = capture(|| {
            tracing::warn!(target: "materialize.out_of_range", message = "ignored 3 keys");
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "warn");
        assert_eq!(lines[0]["event"], "materialize.out_of_range");
        assert_eq!(lines[0]["message"], "ignored 3 keys");
        assert!(lines[0]["ts"].is_string());
    }

    #[test]
    fn numeric_and_bool_fields_keep_their_type() {
        let lines = capture(|| {
            tracing::info!(target: "t", rows = 42u64, offset = -3i64, ratio = 0.5, flagged = true, message = "x");
        });
        let fields = &lines[0]["fields"];
        assert_eq!(fields["rows"], 42);
        assert_eq!(fields["offset"], -3);
        assert_eq!(fields["ratio"], 0.5);
        assert_eq!(fields["flagged"], true);
    }

    #[test]
    fn log_event_macro_lifts_correlation_keys() {
        let ctx = LogContext::new("run-feedfacecafe");
        let lines = capture(|| {
            crate::log_event!(ctx, INFO, event_names::NORMALIZE_FINISHED, Stage::Normalize,
                "rows normalized", kept = 7u64, column = %"DateCreated");
        });
        let line = &lines[0];
        assert_eq!(line["event"], "normalize.finished");
        assert_eq!(line["run_id"], "run-feedfacecafe");
        assert_eq!(line["stage"], "normalize");
        assert_eq!(line["message"], "rows normalized");
        assert_eq!(line["fields"]["kept"], 7);
        assert_eq!(line["fields"]["column"], "DateCreated");
        assert!(line["fields"].get("run_id").is_none());
    }
}
