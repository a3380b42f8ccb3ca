//! Change notifications for presentation layers.
//!
//! Subscribers register a handler per [`EventKind`] and keep the returned
//! [`SubscriptionId`] to unsubscribe. Handlers run synchronously inside the
//! command or tick that caused the change.

use hecs::Entity;
use slotmap::SlotMap;

use crate::components::{JobId, RoomId, StackId, TileCoord};

slotmap::new_key_type! {
    pub struct SubscriptionId;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    TileChanged(TileCoord),
    FurnitureCreated {
        entity: Entity,
        kind: String,
        anchor: TileCoord,
    },
    FurnitureChanged(Entity),
    FurnitureRemoved {
        entity: Entity,
        kind: String,
        anchor: TileCoord,
    },
    CharacterCreated(Entity),
    CharacterChanged(Entity),
    InventoryCreated(StackId),
    /// Size or owner changed, or the stack was used up.
    InventoryChanged(StackId),
    JobCreated {
        job: JobId,
        tile: TileCoord,
        kind: Option<String>,
    },
    JobWorked(JobId),
    JobCompleted(JobId),
    JobStopped(JobId),
    RoomCreated(RoomId),
    RoomDeleted(RoomId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TileChanged,
    FurnitureCreated,
    FurnitureChanged,
    FurnitureRemoved,
    CharacterCreated,
    CharacterChanged,
    InventoryCreated,
    InventoryChanged,
    JobCreated,
    JobWorked,
    JobCompleted,
    JobStopped,
    RoomCreated,
    RoomDeleted,
}

impl SimEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SimEvent::TileChanged(_) => EventKind::TileChanged,
            SimEvent::FurnitureCreated { .. } => EventKind::FurnitureCreated,
            SimEvent::FurnitureChanged(_) => EventKind::FurnitureChanged,
            SimEvent::FurnitureRemoved { .. } => EventKind::FurnitureRemoved,
            SimEvent::CharacterCreated(_) => EventKind::CharacterCreated,
            SimEvent::CharacterChanged(_) => EventKind::CharacterChanged,
            SimEvent::InventoryCreated(_) => EventKind::InventoryCreated,
            SimEvent::InventoryChanged(_) => EventKind::InventoryChanged,
            SimEvent::JobCreated { .. } => EventKind::JobCreated,
            SimEvent::JobWorked(_) => EventKind::JobWorked,
            SimEvent::JobCompleted(_) => EventKind::JobCompleted,
            SimEvent::JobStopped(_) => EventKind::JobStopped,
            SimEvent::RoomCreated(_) => EventKind::RoomCreated,
            SimEvent::RoomDeleted(_) => EventKind::RoomDeleted,
        }
    }
}

type Handler = Box<dyn FnMut(&SimEvent)>;

struct Subscription {
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
pub struct EventBus {
    subscriptions: SlotMap<SubscriptionId, Subscription>,
    emitted: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        kind: EventKind,
        handler: impl FnMut(&SimEvent) + 'static,
    ) -> SubscriptionId {
        self.subscriptions.insert(Subscription {
            kind,
            handler: Box::new(handler),
        })
    }

    /// Returns false when the handle was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscriptions
            .values()
            .filter(|s| s.kind == kind)
            .count()
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.emitted += 1;
        let kind = event.kind();
        for sub in self.subscriptions.values_mut() {
            if sub.kind == kind {
                (sub.handler)(&event);
            }
        }
    }

    /// Total events emitted since creation.
    pub fn emitted_count(&self) -> u64 {
        self.emitted
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscriptions.len())
            .field("emitted", &self.emitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_and_emit() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(EventKind::TileChanged, move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(SimEvent::TileChanged(TileCoord::new(1, 2)));
        bus.emit(SimEvent::RoomCreated(RoomId(3)));

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], SimEvent::TileChanged(TileCoord::new(1, 2)));
        assert_eq!(bus.emitted_count(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let id = bus.subscribe(EventKind::RoomDeleted, move |_| *c.borrow_mut() += 1);
        assert_eq!(bus.subscriber_count(EventKind::RoomDeleted), 1);

        bus.emit(SimEvent::RoomDeleted(RoomId(1)));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(SimEvent::RoomDeleted(RoomId(2)));

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.subscriber_count(EventKind::RoomDeleted), 0);
    }
}
