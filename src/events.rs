//! Pointer-click delivery with scoped subscriptions.
//!
//! A subscription is live from [`ClickBus::subscribe`] until the returned
//! [`ClickSubscription`] is dropped; clicks published while no subscription
//! is live are discarded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct BusInner {
    next_id: u64,
    /// Pending click count per live subscription.
    queues: HashMap<u64, usize>,
}

/// Single-threaded click channel the host publishes into.
#[derive(Debug, Clone, Default)]
pub struct ClickBus {
    inner: Rc<RefCell<BusInner>>,
}

impl ClickBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ClickSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.queues.insert(id, 0);
        log::debug!("Click subscription {} acquired", id);
        ClickSubscription {
            id,
            bus: Rc::clone(&self.inner),
        }
    }

    /// Deliver one click to every live subscription.
    pub fn publish(&self) {
        for pending in self.inner.borrow_mut().queues.values_mut() {
            *pending += 1;
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().queues.len()
    }
}

/// A live subscription; unregisters itself on drop.
#[derive(Debug)]
pub struct ClickSubscription {
    id: u64,
    bus: Rc<RefCell<BusInner>>,
}

impl ClickSubscription {
    /// Take the clicks received since the last drain.
    pub fn drain(&self) -> usize {
        self.bus
            .borrow_mut()
            .queues
            .get_mut(&self.id)
            .map(std::mem::take)
            .unwrap_or(0)
    }
}

impl Drop for ClickSubscription {
    fn drop(&mut self) {
        self.bus.borrow_mut().queues.remove(&self.id);
        log::debug!("Click subscription {} released", self.id);
    }
}
