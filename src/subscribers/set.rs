//! # Subscriber fan-out.
//!
//! [`SubscriberSet`] delivers each event to every registered subscriber in
//! registration order. Delivery is sequential on the listener task; a
//! subscriber that misbehaves delays the others but can never affect the
//! control loop, which publishes fire-and-forget through the bus.

use std::sync::Arc;

use crate::events::Event;
use crate::subscribers::Subscriber;

/// Ordered set of event subscribers.
pub struct SubscriberSet {
    subs: Vec<Arc<dyn Subscriber>>,
}

impl SubscriberSet {
    /// Creates a set from the given subscribers.
    pub fn new(subs: Vec<Arc<dyn Subscriber>>) -> Self {
        Self { subs }
    }

    /// Returns the number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Returns `true` when no subscribers are registered.
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Delivers one event to every subscriber, in order.
    pub async fn emit(&self, ev: &Event) {
        for sub in &self.subs {
            sub.handle(ev).await;
        }
    }
}
