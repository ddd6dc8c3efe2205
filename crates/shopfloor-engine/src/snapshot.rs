//! Serializable point-in-time view of the whole engine.
//!
//! The snapshot is a deep clone into plain `BTreeMap`s, so serializing it
//! twice from the same state yields byte-identical output. Hosts use it
//! for save games, debugging overlays, and test assertions.

use std::collections::BTreeMap;

use serde::Serialize;

use shopfloor_types::{ItemId, StorageId, WorkerId, WorkstationId};

use crate::engine::Engine;
use crate::registry::{Storage, Worker, Workstation};
use crate::routing::DanglingItem;

/// Everything the engine knows, frozen at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    /// All storage slots by id.
    pub storages: BTreeMap<StorageId, Storage>,
    /// All workers by id.
    pub workers: BTreeMap<WorkerId, Worker>,
    /// All workstations by id.
    pub workstations: BTreeMap<WorkstationId, Workstation>,
    /// Destination slots reserved by in-flight deliveries.
    pub reservations: BTreeMap<StorageId, WorkerId>,
    /// Loose items awaiting or under delivery.
    pub dangling_items: BTreeMap<ItemId, DanglingItem>,
    /// Source slots with a transport started but not yet picked up.
    pub pending_transports: BTreeMap<StorageId, WorkerId>,
}

impl Engine {
    /// Capture the current state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            storages: self.registry.storages.clone(),
            workers: self.registry.workers.clone(),
            workstations: self.registry.workstations.clone(),
            reservations: self.reservations.claims().clone(),
            dangling_items: self.dangling.clone(),
            pending_transports: self.transports.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hooks::NullSink;
    use shopfloor_types::{ItemKind, StorageConfig, StorageRole, WorkerConfig};

    #[test]
    fn snapshot_serializes_deterministically() {
        let mut engine = Engine::new();
        let mut sink = NullSink;
        engine
            .add_storage(
                StorageId(10),
                StorageConfig::of_role(StorageRole::ExternalInput),
                &mut sink,
            )
            .unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), ItemKind(1), &mut sink);

        let first = serde_json::to_string(&engine.snapshot()).unwrap();
        let second = serde_json::to_string(&engine.snapshot()).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("\"reservations\""));
    }
}
