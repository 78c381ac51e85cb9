//! In-memory capture layer
//!
//! Keeps the most recent events in a bounded ring so they can be read back
//! through a [`LogBuffer`] handle, e.g. to check which warnings a writer
//! emitted during a training run.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// A captured event
#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: SystemTime,
    pub level: Level,
    /// Module path the event came from
    pub target: String,
    pub message: String,
    /// Structured fields other than the message, in recording order
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Value of a structured field, rendered as text
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}

/// Layer appending every event to a bounded buffer
pub struct LogBufferLayer {
    buffer: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
}

impl LogBufferLayer {
    /// Create a layer holding at most `capacity` entries, plus its read handle
    pub fn new(capacity: usize) -> (Self, LogBuffer) {
        let buffer = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let handle = LogBuffer {
            buffer: Arc::clone(&buffer),
        };
        (Self { buffer, capacity }, handle)
    }
}

impl<S> Layer<S> for LogBufferLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.capacity == 0 {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            timestamp: SystemTime::now(),
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        };

        if let Ok(mut buffer) = self.buffer.lock() {
            if buffer.len() >= self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(entry);
        }
    }
}

/// Read handle for a [`LogBufferLayer`]
#[derive(Clone)]
pub struct LogBuffer {
    buffer: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("entries", &self.len())
            .finish()
    }
}

impl LogBuffer {
    fn collect<F>(&self, keep: F) -> Vec<LogEntry>
    where
        F: Fn(&LogEntry) -> bool,
    {
        self.buffer
            .lock()
            .map(|guard| guard.iter().filter(|e| keep(e)).cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every buffered entry, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.collect(|_| true)
    }

    /// The most recent `count` entries
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries();
        let skip = entries.len().saturating_sub(count);
        entries.into_iter().skip(skip).collect()
    }

    /// Entries at `min_level` or more severe
    pub fn filter_by_level(&self, min_level: Level) -> Vec<LogEntry> {
        self.collect(|e| e.level <= min_level)
    }

    /// Entries whose message contains `query`, case-insensitively
    pub fn search(&self, query: &str) -> Vec<LogEntry> {
        let query = query.to_lowercase();
        self.collect(|e| e.message.to_lowercase().contains(&query))
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.buffer.lock() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
