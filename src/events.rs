/// Event surface for host/UI code
///
/// Controls and the simulation loop queue events during a tick; the queue
/// is dispatched to listeners at the end of that tick and recorded in an
/// `EventLog` for inspection or replay.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::assembly::ObjectId;
use crate::controls::Gesture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    DragStart,
    Drag,
    DragEnd,
    RotateStart,
    Rotate,
    RotateEnd,
    /// At least one of the component's links became satisfied
    Linked,
    /// None of the component's links are satisfied any more
    Unlinked,
}

impl EventKind {
    pub fn start(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Drag => EventKind::DragStart,
            Gesture::Rotate => EventKind::RotateStart,
        }
    }

    pub fn moved(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Drag => EventKind::Drag,
            Gesture::Rotate => EventKind::Rotate,
        }
    }

    pub fn end(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Drag => EventKind::DragEnd,
            Gesture::Rotate => EventKind::RotateEnd,
        }
    }
}

/// Something that happened to a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyEvent {
    pub kind: EventKind,
    pub component: ObjectId,
    pub name: String,
}

impl AssemblyEvent {
    pub fn new(kind: EventKind, component: ObjectId, name: impl Into<String>) -> Self {
        Self {
            kind,
            component,
            name: name.into(),
        }
    }
}

/// Handle returned by `EventBus::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&AssemblyEvent)>;

/// Callback registry plus the queue of events raised during the current tick
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    pending: Vec<AssemblyEvent>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&AssemblyEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the listener was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue an event for the end of the tick
    pub fn push(&mut self, event: AssemblyEvent) {
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[AssemblyEvent] {
        &self.pending
    }

    /// Drop queued events without delivering them
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Deliver queued events in order, recording each in `log`
    pub fn dispatch(&mut self, tick: u64, log: &mut EventLog) -> usize {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
            log.record(tick, event.clone());
        }
        events.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub tick: u64,
    #[serde(flatten)]
    pub event: AssemblyEvent,
}

/// Bounded history of dispatched events
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LoggedEvent>,
    capacity: usize,
}

impl EventLog {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, tick: u64, event: AssemblyEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LoggedEvent { tick, event });
    }

    pub fn entries(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.entries.iter()
    }

    /// Count of recorded events of one kind
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.event.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Save events to JSON file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load events from JSON file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let entries: VecDeque<LoggedEvent> = serde_json::from_str(&json)?;
        let capacity = entries.len().max(Self::DEFAULT_CAPACITY);
        Ok(Self { entries, capacity })
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_dispatch_in_order() {
        let mut bus = EventBus::new();
        let mut log = EventLog::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |e| sink.borrow_mut().push(e.kind));

        bus.push(AssemblyEvent::new(EventKind::DragStart, 1, "peg"));
        bus.push(AssemblyEvent::new(EventKind::Drag, 1, "peg"));
        assert!(seen.borrow().is_empty());

        assert_eq!(bus.dispatch(7, &mut log), 2);
        assert_eq!(*seen.borrow(), vec![EventKind::DragStart, EventKind::Drag]);
        assert!(bus.pending().is_empty());
        assert_eq!(log.entries().next().unwrap().tick, 7);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let mut log = EventLog::default();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let id = bus.subscribe(move |_| *sink.borrow_mut() += 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.push(AssemblyEvent::new(EventKind::Rotate, 0, "cap"));
        bus.dispatch(0, &mut log);
        assert_eq!(*count.borrow(), 0);
        assert_eq!(log.count(EventKind::Rotate), 1);
    }

    #[test]
    fn test_clear_pending_drops_events() {
        let mut bus = EventBus::new();
        let mut log = EventLog::default();
        bus.push(AssemblyEvent::new(EventKind::DragEnd, 0, "peg"));
        bus.clear_pending();
        assert_eq!(bus.dispatch(0, &mut log), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_log_is_bounded() {
        let mut log = EventLog::new(2);
        for tick in 0..5 {
            log.record(tick, AssemblyEvent::new(EventKind::Drag, 0, "peg"));
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries().next().unwrap().tick, 3);
    }

    #[test]
    fn test_save_load() {
        let mut log = EventLog::default();
        log.record(3, AssemblyEvent::new(EventKind::Linked, 2, "cap"));

        let path = std::env::temp_dir().join("assembly_engine_events_test.json");
        let path = path.to_str().unwrap();
        log.save_to_file(path).unwrap();

        let loaded = EventLog::load_from_file(path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.count(EventKind::Linked), 1);

        std::fs::remove_file(path).ok();
    }
}
