//! Event emitters
//!
//! Listeners subscribe to one kind of event (or to all of them) and are
//! called synchronously, in subscription order, when a matching event is
//! emitted. Emission works on a snapshot of the listener list, so listeners
//! may subscribe or unsubscribe from inside a callback. A listener removed
//! mid-emission is not called for the remainder of that emission.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Handle returned by [`EventEmitter::on`], used to unsubscribe
    pub struct ListenerId;
}

/// Events that can be filtered by kind
pub trait EventKind {
    type Kind: Copy + PartialEq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Rc<dyn Fn(&E)>;

struct Listener<E: EventKind> {
    /// `None` receives every event
    filter: Option<E::Kind>,
    handler: Handler<E>,
}

struct Listeners<E: EventKind> {
    entries: SlotMap<ListenerId, Listener<E>>,
    order: SmallVec<[ListenerId; 4]>,
}

/// Single-threaded event emitter
pub struct EventEmitter<E: EventKind> {
    listeners: RefCell<Listeners<E>>,
}

impl<E: EventKind> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Listeners {
                entries: SlotMap::with_key(),
                order: SmallVec::new(),
            }),
        }
    }

    /// Subscribe to events of one kind
    pub fn on<F>(&self, kind: E::Kind, handler: F) -> ListenerId
    where
        F: Fn(&E) + 'static,
    {
        self.subscribe(Some(kind), Rc::new(handler))
    }

    /// Subscribe to every event
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&E) + 'static,
    {
        self.subscribe(None, Rc::new(handler))
    }

    fn subscribe(&self, filter: Option<E::Kind>, handler: Handler<E>) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.entries.insert(Listener { filter, handler });
        listeners.order.push(id);
        id
    }

    /// Unsubscribe. Returns false if the listener was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.entries.remove(id).is_none() {
            return false;
        }
        listeners.order.retain(|entry| *entry != id);
        true
    }

    /// Dispatch `event` to every matching listener.
    ///
    /// Returns the number of listeners called.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();
        let snapshot: SmallVec<[(ListenerId, Handler<E>); 4]> = {
            let listeners = self.listeners.borrow();
            listeners
                .order
                .iter()
                .filter_map(|id| {
                    let listener = listeners.entries.get(*id)?;
                    match listener.filter {
                        Some(filter) if filter != kind => None,
                        _ => Some((*id, listener.handler.clone())),
                    }
                })
                .collect()
        };

        let mut called = 0;
        for (id, handler) in snapshot {
            if !self.listeners.borrow().entries.contains_key(id) {
                continue;
            }
            handler(event);
            called += 1;
        }
        called
    }

    /// Number of subscribed listeners
    pub fn len(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every listener
    pub fn clear(&self) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.entries.clear();
        listeners.order.clear();
    }
}

impl<E: EventKind> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EventKind> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Ping {
        Short,
        Long(u32),
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum PingKind {
        Short,
        Long,
    }

    impl EventKind for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::Short => PingKind::Short,
                Ping::Long(_) => PingKind::Long,
            }
        }
    }

    #[test]
    fn test_kind_filtering() {
        let emitter = EventEmitter::<Ping>::new();
        let shorts = Rc::new(Cell::new(0));
        let total = Rc::new(Cell::new(0));

        let counter = shorts.clone();
        emitter.on(PingKind::Short, move |_| counter.set(counter.get() + 1));
        let counter = total.clone();
        emitter.on_any(move |_| counter.set(counter.get() + 1));

        emitter.emit(&Ping::Short);
        emitter.emit(&Ping::Long(3));
        emitter.emit(&Ping::Short);

        assert_eq!(shorts.get(), 2);
        assert_eq!(total.get(), 3);
    }

    #[test]
    fn test_subscription_order() {
        let emitter = EventEmitter::<Ping>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = order.clone();
            emitter.on_any(move |_| order.borrow_mut().push(label));
        }

        emitter.emit(&Ping::Short);
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_off_during_emit() {
        let emitter = Rc::new(EventEmitter::<Ping>::new());
        let later_calls = Rc::new(Cell::new(0));
        let later_id = Rc::new(Cell::new(None));

        let handle = emitter.clone();
        let target = later_id.clone();
        emitter.on_any(move |_| {
            if let Some(id) = target.get() {
                handle.off(id);
            }
        });
        let counter = later_calls.clone();
        later_id.set(Some(
            emitter.on_any(move |_| counter.set(counter.get() + 1)),
        ));

        assert_eq!(emitter.emit(&Ping::Long(1)), 1);
        assert_eq!(later_calls.get(), 0);
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_off_unknown_listener() {
        let emitter = EventEmitter::<Ping>::new();
        let id = emitter.on_any(|_| {});
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        assert!(emitter.is_empty());
    }
}
