//! FIFO buffer for events that arrive while a bulk sync is in flight.

use crate::models::Event;
use std::collections::VecDeque;

/// Growable FIFO bounded by a safety threshold. Exceeding the threshold
/// drops everything buffered so far; continuity is already lost at that
/// point, so the owner must force another resync after the swap.
#[derive(Debug)]
pub(crate) struct EventCache {
    events: VecDeque<Event>,
    capacity: usize,
    overflowed: bool,
}

impl EventCache {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            overflowed: false,
        }
    }

    /// Buffers an event in arrival order. Returns false once the cache has
    /// overflowed; from then on events are discarded until `drain`.
    pub(crate) fn push(&mut self, event: Event) -> bool {
        if self.overflowed {
            return false;
        }

        if self.events.len() >= self.capacity {
            self.events.clear();
            self.overflowed = true;
            return false;
        }

        self.events.push_back(event);
        true
    }

    pub(crate) fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }
}
