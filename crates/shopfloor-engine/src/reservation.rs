//! Reservation bookkeeping for delivery destinations.
//!
//! A reservation is a temporary claim a worker holds on an empty
//! destination slot while a dangling delivery or transport is in flight.
//! It prevents two deliveries from targeting the same slot. At most one
//! worker holds a reservation on any given storage at any time.

use std::collections::BTreeMap;

use serde::Serialize;
use shopfloor_types::{StorageId, WorkerId};

/// Tracks which destination slots are spoken for, and by whom.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ReservationTracker {
    claims: BTreeMap<StorageId, WorkerId>,
}

impl ReservationTracker {
    /// Create an empty tracker.
    pub const fn new() -> Self {
        Self {
            claims: BTreeMap::new(),
        }
    }

    /// Claim a slot for a worker.
    ///
    /// Returns `false` (and changes nothing) if another worker already
    /// holds the slot. Re-claiming by the same holder is a no-op success.
    pub fn reserve(&mut self, storage: StorageId, worker: WorkerId) -> bool {
        match self.claims.get(&storage) {
            Some(holder) => *holder == worker,
            None => {
                self.claims.insert(storage, worker);
                true
            }
        }
    }

    /// Release the claim on a slot, if any. Returns the previous holder.
    pub fn release(&mut self, storage: StorageId) -> Option<WorkerId> {
        self.claims.remove(&storage)
    }

    /// Release every claim held by a worker. Returns the freed slots.
    pub fn release_all_for(&mut self, worker: WorkerId) -> Vec<StorageId> {
        let freed: Vec<StorageId> = self
            .claims
            .iter()
            .filter(|(_, holder)| **holder == worker)
            .map(|(storage, _)| *storage)
            .collect();
        for storage in &freed {
            self.claims.remove(storage);
        }
        freed
    }

    /// The worker currently holding a slot, if any.
    pub fn holder(&self, storage: StorageId) -> Option<WorkerId> {
        self.claims.get(&storage).copied()
    }

    /// Whether any worker holds the slot.
    pub fn is_reserved(&self, storage: StorageId) -> bool {
        self.claims.contains_key(&storage)
    }

    /// All claims in ascending storage-id order.
    pub const fn claims(&self) -> &BTreeMap<StorageId, WorkerId> {
        &self.claims
    }
}
