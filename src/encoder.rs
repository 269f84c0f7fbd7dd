//! Record encoders.
//!
//! Two `tracing-subscriber` event formatters share one field collector:
//! - [`HumanFormat`]: `ts \t LEVEL \t msg \t {fields}` for the file sinks
//! - [`JsonFormat`]: one JSON object per line for the console
//!
//! Field names are fixed (`msg`, `level`, `ts`, `file`, `logid`), levels are
//! uppercase and timestamps are local time at second precision.

use std::fmt;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::level::Severity;

pub const MESSAGE_KEY: &str = "msg";
pub const LEVEL_KEY: &str = "level";
pub const TIME_KEY: &str = "ts";
pub const CALLER_KEY: &str = "file";
pub const LOGID_KEY: &str = "logid";

/// `strftime` pattern of the `ts` field.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render a duration field value as integer milliseconds.
pub fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn timestamp() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// Collects the message and the typed fields of one event.
#[derive(Default)]
pub(crate) struct RecordVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl RecordVisitor {
    fn collect(event: &Event<'_>) -> Self {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        visitor
    }

    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for RecordVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.insert(field, Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}

/// Plain-text, tab-separated encoder for the file sinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanFormat;

impl<S, N> FormatEvent<S, N> for HumanFormat
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
        let record = RecordVisitor::collect(event);
        let level = Severity::of(event.metadata());

        write!(writer, "{}\t{}\t{}", timestamp(), level, record.message)?;
        if !record.fields.is_empty() {
            let fields = serde_json::to_string(&record.fields).map_err(|_| fmt::Error)?;
            write!(writer, "\t{fields}")?;
        }
        writeln!(writer)
    }
}

/// Field-tagged JSON encoder for the console.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl<S, N> FormatEvent<S, N> for JsonFormat
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
        let record = RecordVisitor::collect(event);
        let level = Severity::of(event.metadata());

        let mut object = Map::with_capacity(record.fields.len() + 3);
        object.insert(LEVEL_KEY.to_string(), Value::from(level.as_str()));
        object.insert(TIME_KEY.to_string(), Value::from(timestamp()));
        object.insert(MESSAGE_KEY.to_string(), Value::from(record.message));
        object.extend(record.fields);

        let line = serde_json::to_string(&object).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
