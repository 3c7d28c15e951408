use serde::Serialize;

use crate::commerce::QuantityAction;
use crate::overlay::OverlayRevealState;
use crate::selection::Direction;

/// Everything the session announces to hosts and observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SelectionChanged { index: usize, key: String },
    NavigationRejected { direction: Direction },
    QuantityChanged { key: String, quantity: u32, balance: f64 },
    QuantityBlocked { key: String, action: QuantityAction },
    PurchaseConfirmed { key: String },
    OverlayPhaseChanged { phase: OverlayRevealState },
    ShopkeeperLine { text: String, complete: bool },
    ShopkeeperHidden,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SessionEvent)>;

/// Synchronous observer list. Listeners run in subscription order on the
/// publishing thread.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, event: &SessionEvent) {
        log::trace!("event {:?}", event);
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            bus.subscribe(move |event| log.borrow_mut().push((tag, event.clone())));
        }
        bus.publish(&SessionEvent::Disposed);
        let seen = log.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "first");
        assert_eq!(seen[1].0, "second");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let id = {
            let count = Rc::clone(&count);
            bus.subscribe(move |_| *count.borrow_mut() += 1)
        };
        bus.publish(&SessionEvent::ShopkeeperHidden);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&SessionEvent::ShopkeeperHidden);
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_string(&SessionEvent::NavigationRejected {
            direction: Direction::Next,
        })
        .expect("serialize");
        assert_eq!(json, r#"{"event":"navigation_rejected","direction":"Next"}"#);
    }
}
