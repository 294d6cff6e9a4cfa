//! Notification sink boundary.
//!
//! The pipeline emits a [`NotificationEvent`] after every page, frame or
//! document conversion step, and once more at the end when a container
//! yielded zero documents. Delivery is best-effort; events for a single
//! document arrive in page order, events across documents are unordered.
//!
//! The default [`TracingSink`] logs each event. [`MemorySink`] records them
//! for assertions in tests and for embedders that want to drain them.

use base64::Engine;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// One conversion-step announcement.
///
/// Document-level fields are filled by the orchestrator before dispatch;
/// page-level fields are filled by the conversion strategy per page/frame.
/// `page_content` is empty when the page failed to convert.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationEvent {
    pub job_id: Uuid,
    pub document_name: String,
    pub document_path: String,
    pub document_index: usize,
    pub document_count: usize,
    pub page_index: usize,
    pub page_count: usize,
    pub page_file_name: String,
    pub page_width: u32,
    pub page_height: u32,
    /// Base64-encoded page bytes, or the empty string on failure.
    pub page_content: String,
    pub meta: serde_json::Value,
}

impl NotificationEvent {
    /// Document-level template; page fields start zeroed.
    pub fn for_document(
        job_id: Uuid,
        document_name: impl Into<String>,
        document_path: impl Into<String>,
        document_index: usize,
        document_count: usize,
        meta: serde_json::Value,
    ) -> Self {
        Self {
            job_id,
            document_name: document_name.into(),
            document_path: document_path.into(),
            document_index,
            document_count,
            page_index: 0,
            page_count: 0,
            page_file_name: String::new(),
            page_width: 0,
            page_height: 0,
            page_content: String::new(),
            meta,
        }
    }

    /// Copy of this event carrying one successfully converted page.
    pub fn with_page(
        &self,
        page_index: usize,
        page_count: usize,
        page_file_name: impl Into<String>,
        width: u32,
        height: u32,
        content: &[u8],
    ) -> Self {
        let mut event = self.clone();
        event.page_index = page_index;
        event.page_count = page_count;
        event.page_file_name = page_file_name.into();
        event.page_width = width;
        event.page_height = height;
        event.page_content = base64::engine::general_purpose::STANDARD.encode(content);
        event
    }

    /// Copy of this event marking one page that failed to convert.
    pub fn with_empty_page(&self, page_index: usize, page_count: usize) -> Self {
        let mut event = self.clone();
        event.page_index = page_index;
        event.page_count = page_count;
        event.page_file_name = String::new();
        event.page_width = 0;
        event.page_height = 0;
        event.page_content = String::new();
        event
    }
}

/// Downstream delivery channel for conversion events.
///
/// Implementations must not panic; delivery failures are theirs to log.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, destination: Option<&str>, event: &NotificationEvent);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn NotificationSink>;

/// Sink that emits a structured log line per event.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, destination: Option<&str>, event: &NotificationEvent) {
        tracing::info!(
            job_id = %event.job_id,
            destination = destination.unwrap_or("-"),
            document = %event.document_name,
            page = event.page_index,
            pages = event.page_count,
            bytes = event.page_content.len(),
            "conversion step completed"
        );
    }
}

/// Sink that records `(destination, event)` pairs in memory, for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: parking_lot::Mutex<Vec<(Option<String>, NotificationEvent)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Option<String>, NotificationEvent)> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<(Option<String>, NotificationEvent)> {
        std::mem::take(&mut self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, destination: Option<&str>, event: &NotificationEvent) {
        self.events.lock().push((destination.map(str::to_string), event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> NotificationEvent {
        NotificationEvent::for_document(Uuid::new_v4(), "scan", "dir/scan.png", 0, 1, serde_json::Value::Null)
    }

    #[test]
    fn test_with_page_encodes_content() {
        let event = template().with_page(2, 5, "scan_2.png", 640, 480, b"pixels");
        assert_eq!(event.page_index, 2);
        assert_eq!(event.page_count, 5);
        assert_eq!(event.page_width, 640);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&event.page_content)
            .unwrap();
        assert_eq!(decoded, b"pixels");
    }

    #[test]
    fn test_with_empty_page_clears_content() {
        let event = template().with_page(0, 3, "p.png", 10, 10, b"x").with_empty_page(1, 3);
        assert_eq!(event.page_index, 1);
        assert!(event.page_content.is_empty());
        assert_eq!(event.page_width, 0);
    }

    #[test]
    fn test_memory_sink_records_destination_and_event() {
        let sink = MemorySink::new();
        sink.notify(Some("queue://out"), &template());
        sink.notify(None, &template());

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].0.as_deref(), Some("queue://out"));
        assert!(events[1].0.is_none());
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }
}
