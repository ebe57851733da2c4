use parking_lot::Mutex;
use permit_rs_protocol::{EventSink, QueueEvent, QueueEventPayload};

/// Event sink that keeps every emitted event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<QueueEvent>>,
}

impl RecordingSink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event emitted so far.
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().clone()
    }

    /// Payloads of every event emitted so far.
    pub fn payloads(&self) -> Vec<QueueEventPayload> {
        self.events
            .lock()
            .iter()
            .map(|event| event.payload.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: QueueEvent) {
        self.events.lock().push(event);
    }
}
