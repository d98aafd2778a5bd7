//! Request-scoped event bus.
//!
//! Components queue events while handling an action; the dispatcher flushes
//! them afterwards and fans each one out to the addressed components.
//! In-process listeners can also subscribe by event name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

pub type Listener = Box<dyn Fn(&Event)>;

#[derive(Default)]
pub struct EventBus {
    queue: Vec<Event>,
    listeners: FxHashMap<String, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for delivery after the current action.
    pub fn queue(&mut self, event: Event) {
        crate::debug!("event"; "queued `{}`", event.name);
        self.queue.push(event);
    }

    /// Take every queued event, leaving the queue empty.
    pub fn flush(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.queue)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Subscribe an in-process listener to an event name.
    pub fn listen(&mut self, name: impl Into<String>, listener: impl Fn(&Event) + 'static) {
        self.listeners
            .entry(name.into())
            .or_default()
            .push(Box::new(listener));
    }

    /// Invoke listeners for `event` synchronously; returns how many ran.
    pub fn dispatch(&self, event: &Event) -> usize {
        let Some(listeners) = self.listeners.get(&event.name) else {
            return 0;
        };
        for listener in listeners {
            listener(event);
        }
        listeners.len()
    }
}
