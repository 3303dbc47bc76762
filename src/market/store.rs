//! In-memory view of every event seen on the odds stream.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use super::types::{EventId, EventUpdate};
use crate::metrics;

/// Event id -> merged snapshot.
///
/// Writers go through [`EventStore::apply_update`], which holds the entry's
/// exclusive lock for the whole read-modify-write of each delta. Readers get
/// cloned snapshots and never observe a half-merged event.
#[derive(Debug, Default)]
pub struct EventStore {
    events: DashMap<EventId, EventUpdate>,
}

impl EventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a batch of deltas, in order.
    ///
    /// Unknown ids are inserted verbatim. For known ids the price list is
    /// always replaced, while description and live state are replaced only
    /// when the delta carries them.
    #[instrument(skip_all, fields(deltas = updates.len()))]
    pub fn apply_update(&self, updates: &[EventUpdate]) -> usize {
        let mut applied = 0;

        for delta in updates {
            match self.events.entry(delta.event_id) {
                Entry::Vacant(slot) => {
                    debug!(event_id = delta.event_id, "New event");
                    slot.insert(delta.clone());
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    existing.prices = delta.prices.clone();

                    if let Some(desc) = &delta.event_description {
                        existing.event_description = Some(desc.clone());
                    }

                    if let Some(live) = &delta.live {
                        existing.live = Some(live.clone());
                    }
                }
            }
            applied += 1;
        }

        metrics::inc_updates_applied(applied as u64);
        applied
    }

    /// Snapshot of one event.
    pub fn get(&self, event_id: EventId) -> Option<EventUpdate> {
        self.events.get(&event_id).map(|e| e.clone())
    }

    /// Number of events known.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events are known.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Snapshots of every event, in no particular order.
    pub fn snapshot(&self) -> Vec<EventUpdate> {
        self.events.iter().map(|e| e.value().clone()).collect()
    }

    /// Pick an event worth betting on.
    ///
    /// Prefers an in-play event with prices, then any event with prices.
    pub fn pick_event(&self) -> Option<EventUpdate> {
        let events = self.snapshot();

        events
            .iter()
            .find(|e| e.is_inplay() && e.has_prices())
            .or_else(|| events.iter().find(|e| e.has_prices()))
            .cloned()
    }

    /// Count events currently in play.
    pub fn inplay_count(&self) -> usize {
        self.events.iter().filter(|e| e.is_inplay()).count()
    }
}
