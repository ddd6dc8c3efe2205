//! Inbound notification handling.
//!
//! [`Engine::handle`] is the single entry point for everything the host
//! reports. Each notification is validated against current state; a
//! violation (unknown id, wrong step, role mismatch) is logged, rejected
//! with `false`, and leaves the engine untouched. Every accepted
//! notification ends with a scheduling pass, so any work the change made
//! possible starts before `handle` returns.

use tracing::{debug, warn};

use shopfloor_types::{
    Hook, ItemKind, Notification, StorageId, StorageRole, WorkerId, WorkerState, WorkstationId,
};

use crate::engine::Engine;
use crate::hooks::HookSink;

impl Engine {
    /// Apply one notification from the host.
    ///
    /// Returns `true` if the notification was accepted. All hooks caused
    /// by the resulting transitions are dispatched into `sink` before
    /// this returns.
    pub fn handle(&mut self, event: Notification, sink: &mut dyn HookSink) -> bool {
        debug!(?event, "notification");
        let accepted = match event {
            Notification::ItemAdded { storage, kind } => self.on_item_added(storage, kind, sink),
            Notification::ItemRemoved { storage } => self.on_item_removed(storage, true, sink),
            Notification::StorageCleared { storage } => self.on_storage_cleared(storage, sink),
            Notification::WorkerAvailable { worker } => self.on_worker_available(worker),
            Notification::WorkerUnavailable { worker } => self.on_worker_unavailable(worker, sink),
            Notification::WorkerRemoved { worker } => self.remove_worker(worker, sink),
            Notification::WorkstationEnabled { workstation } => {
                self.on_workstation_enabled(workstation, sink)
            }
            Notification::WorkstationDisabled { workstation } => {
                self.on_workstation_disabled(workstation, sink)
            }
            Notification::WorkstationRemoved { workstation } => {
                self.remove_workstation(workstation, sink)
            }
            Notification::PickupCompleted { worker } => self.on_pickup_completed(worker, sink),
            Notification::WorkCompleted { workstation } => {
                self.on_work_completed(workstation, sink)
            }
            Notification::StoreCompleted { worker } => self.on_store_completed(worker, sink),
            Notification::TransportPickupCompleted { worker } => {
                self.on_transport_pickup_completed(worker, sink)
            }
            Notification::TransportDeliveryCompleted { worker } => {
                self.on_transport_delivery_completed(worker, sink)
            }
        };
        if accepted {
            self.try_assign_workers(sink);
        }
        accepted
    }

    // -----------------------------------------------------------------------
    // Storage contents
    // -----------------------------------------------------------------------

    fn on_item_added(&mut self, id: StorageId, kind: ItemKind, sink: &mut dyn HookSink) -> bool {
        let Some(slot) = self.registry.storage(id) else {
            warn!(storage = %id, "item added to unknown storage");
            return false;
        };
        if slot.has_item {
            // A slot filled by a finishing process carries no kind until
            // the host names the produced item; this is that second phase.
            if slot.kind.is_none() {
                if !slot.takes(kind) {
                    warn!(storage = %id, ?kind, "produced item named with unaccepted kind");
                    return false;
                }
                if let Some(slot) = self.registry.storage_mut(id) {
                    slot.kind = Some(kind);
                }
                return true;
            }
            warn!(storage = %id, "item added to occupied storage");
            return false;
        }
        if !slot.takes(kind) {
            warn!(storage = %id, ?kind, "item of unaccepted kind");
            return false;
        }
        // An in-flight delivery has claimed this slot as its destination.
        if self.reservations.is_reserved(id) {
            warn!(storage = %id, "item added to reserved storage");
            return false;
        }
        let standalone = slot.role == StorageRole::Standalone;
        if let Some(slot) = self.registry.storage_mut(id) {
            slot.fill(Some(kind));
        }
        if standalone {
            sink.dispatch(&Hook::StandaloneItemAdded { storage: id, kind });
        }
        self.reevaluate_users(id, sink);
        true
    }

    fn on_item_removed(
        &mut self,
        id: StorageId,
        empty_is_violation: bool,
        sink: &mut dyn HookSink,
    ) -> bool {
        let Some(slot) = self.registry.storage(id) else {
            warn!(storage = %id, "item removed from unknown storage");
            return false;
        };
        if !slot.has_item {
            if empty_is_violation {
                warn!(storage = %id, "item removed from empty storage");
                return false;
            }
            return true;
        }
        let standalone = slot.role == StorageRole::Standalone;
        // A transport still waiting to pick up from this slot has lost
        // its load.
        if let Some(worker) = self.transports.get(&id).copied() {
            self.cancel_transport(worker, sink, true);
        }
        if let Some(slot) = self.registry.storage_mut(id) {
            slot.clear();
        }
        if standalone {
            sink.dispatch(&Hook::StandaloneItemRemoved { storage: id });
        }
        self.reevaluate_users(id, sink);
        true
    }

    fn on_storage_cleared(&mut self, id: StorageId, sink: &mut dyn HookSink) -> bool {
        self.on_item_removed(id, false, sink)
    }

    // -----------------------------------------------------------------------
    // Worker availability
    // -----------------------------------------------------------------------

    fn on_worker_available(&mut self, id: WorkerId) -> bool {
        let Some(worker) = self.registry.worker(id) else {
            warn!(worker = %id, "availability for unknown worker");
            return false;
        };
        match worker.state {
            WorkerState::Idle => true,
            WorkerState::Working => {
                warn!(worker = %id, "availability for a working worker");
                false
            }
            WorkerState::Unavailable => {
                if let Some(worker) = self.registry.worker_mut(id) {
                    worker.state = WorkerState::Idle;
                }
                self.registry.mark_idle(id);
                true
            }
        }
    }

    fn on_worker_unavailable(&mut self, id: WorkerId, sink: &mut dyn HookSink) -> bool {
        let Some(worker) = self.registry.worker(id) else {
            warn!(worker = %id, "unavailability for unknown worker");
            return false;
        };
        match worker.state {
            WorkerState::Unavailable => true,
            WorkerState::Idle => {
                self.registry.clear_idle(id);
                if let Some(worker) = self.registry.worker_mut(id) {
                    worker.state = WorkerState::Unavailable;
                }
                true
            }
            WorkerState::Working => {
                self.unwind_worker(id, sink);
                if let Some(worker) = self.registry.worker_mut(id) {
                    worker.state = WorkerState::Unavailable;
                }
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // Workstation service state
    // -----------------------------------------------------------------------

    fn on_workstation_enabled(&mut self, id: WorkstationId, sink: &mut dyn HookSink) -> bool {
        let Some(station) = self.registry.workstation(id) else {
            warn!(workstation = %id, "enable of unknown workstation");
            return false;
        };
        if station.enabled {
            return true;
        }
        if let Some(station) = self.registry.workstation_mut(id) {
            station.enabled = true;
        }
        self.evaluate_readiness(id, sink);
        true
    }

    fn on_workstation_disabled(&mut self, id: WorkstationId, sink: &mut dyn HookSink) -> bool {
        let Some(station) = self.registry.workstation(id) else {
            warn!(workstation = %id, "disable of unknown workstation");
            return false;
        };
        if !station.enabled {
            return true;
        }
        let occupied = station.worker.is_some();
        if let Some(station) = self.registry.workstation_mut(id) {
            station.enabled = false;
        }
        if occupied {
            // Mid-cycle interruption: the step is preserved, so the cycle
            // resumes where it stopped once re-enabled and re-staffed.
            self.release_assignment(id, sink);
        } else {
            self.evaluate_readiness(id, sink);
        }
        true
    }
}
