//! Progress events for scheduling batches
//!
//! Events go out on a `tokio::sync::broadcast` channel. Emitting never
//! blocks: with no subscribers the event is dropped, and a lagging
//! subscriber misses the oldest events.
//!
//! ```
//! use libcivicast::service::events::{Event, EventBus};
//!
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//! bus.emit(Event::BatchStarted { total: 3 });
//! assert!(matches!(receiver.try_recv(), Ok(Event::BatchStarted { total: 3 })));
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::Platform;

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BatchStarted {
        total: usize,
    },
    ItemScheduled {
        index: usize,
        platform: Platform,
        post_id: String,
        external_post_id: Option<String>,
    },
    ItemFailed {
        index: usize,
        platform: Platform,
        error: String,
    },
    BatchCompleted {
        succeeded: usize,
        failed: usize,
    },
}
