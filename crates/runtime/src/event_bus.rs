use foundation::time::Millis;

/// Minimal event type for traceability.
///
/// Structured text keyed by the playback tick that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub tick: u64,
    pub at: Millis,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
    capacity: Option<usize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            capacity: None,
        }
    }

    /// Keeps only the newest `capacity` events.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity: Some(capacity.max(1)),
        }
    }

    pub fn emit(&mut self, tick: u64, at: Millis, kind: &'static str, message: impl Into<String>) {
        self.events.push(Event {
            tick,
            at,
            kind,
            message: message.into(),
        });
        if let Some(cap) = self.capacity {
            let overflow = self.events.len().saturating_sub(cap);
            if overflow > 0 {
                self.events.drain(..overflow);
            }
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(|e| e.kind).collect()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
