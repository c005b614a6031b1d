//! Event sink adapter
//!
//! Implements the EventSink port by buffering every published event.

use crate::events::ConsensusEvent;
use crate::ports::EventSink;

/// In-memory event sink
pub struct InMemoryEventSink {
    events: parking_lot::RwLock<Vec<ConsensusEvent>>,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::RwLock::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<ConsensusEvent> {
        self.events.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Events whose variant is `name`.
    pub fn events_named(&self, name: &str) -> Vec<ConsensusEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl Default for InMemoryEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&self, event: ConsensusEvent) -> Result<(), String> {
        self.events.write().push(event);
        Ok(())
    }
}
