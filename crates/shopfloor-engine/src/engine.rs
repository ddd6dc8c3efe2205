//! The engine instance: construction, registration API, and queries.
//!
//! An [`Engine`] is owned and driven entirely by its host. It tracks only
//! abstract workflow state; the host owns every concrete entity and calls
//! [`Engine::handle`] for each real-world change. There is no global
//! instance anywhere -- the host passes the engine and a hook sink
//! explicitly into every call.
//!
//! Registration is id-keyed upsert. Removal cascades: a removed
//! workstation releases its worker, a removed worker unwinds its task and
//! reservations, a removed storage is detached from every workstation
//! referencing it.

use std::collections::BTreeMap;

use tracing::warn;

use shopfloor_types::{
    Hook, ItemId, ItemKind, Step, StorageConfig, StorageId, StorageRole, WorkerConfig, WorkerId,
    WorkerState, WorkstationConfig, WorkstationId, WorkstationStatus,
};

use crate::error::ConfigError;
use crate::hooks::{FirstAvailable, HookSink, WorkerSelector};
use crate::registry::{Registry, Storage, Worker, Workstation};
use crate::reservation::ReservationTracker;
use crate::routing::DanglingItem;

/// The orchestration engine.
///
/// Single-threaded and purely synchronous: every call runs to completion
/// before returning, and every outbound hook is dispatched from within
/// the call that caused the transition.
pub struct Engine {
    pub(crate) registry: Registry,
    pub(crate) reservations: ReservationTracker,
    /// Loose items awaiting delivery, keyed by host item id.
    pub(crate) dangling: BTreeMap<ItemId, DanglingItem>,
    /// External outputs with a transport started but not yet picked up,
    /// mapped to the transporting worker. Guards against offering the
    /// same source twice.
    pub(crate) transports: BTreeMap<StorageId, WorkerId>,
    pub(crate) selector: Box<dyn WorkerSelector>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an empty engine with the first-available worker selector.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            reservations: ReservationTracker::new(),
            dangling: BTreeMap::new(),
            transports: BTreeMap::new(),
            selector: Box::new(FirstAvailable),
        }
    }

    /// Replace the worker-selection strategy used by the scheduler.
    pub fn set_worker_selector(&mut self, selector: Box<dyn WorkerSelector>) {
        self.selector = selector;
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register or update a storage slot.
    ///
    /// Upsert keeps the current fill state; `accepts` and `priority` are
    /// overwritten. Changing the role of an existing storage is a
    /// configuration error.
    pub fn add_storage(
        &mut self,
        id: StorageId,
        config: StorageConfig,
        sink: &mut dyn HookSink,
    ) -> Result<(), ConfigError> {
        if let Some(existing) = self.registry.storage(id) {
            if existing.role != config.role {
                return Err(ConfigError::RoleChange {
                    storage: id,
                    from: existing.role,
                    to: config.role,
                });
            }
        }
        if let Some(existing) = self.registry.storage_mut(id) {
            existing.accepts = config.accepts;
            existing.priority = config.priority;
        } else {
            self.registry.storages.insert(
                id,
                Storage {
                    role: config.role,
                    accepts: config.accepts,
                    priority: config.priority,
                    has_item: false,
                    kind: None,
                },
            );
        }
        self.reevaluate_users(id, sink);
        self.try_assign_workers(sink);
        Ok(())
    }

    /// Register or update a worker.
    ///
    /// A new worker starts in the pool when `config.available` is set;
    /// toggling availability on an existing worker behaves like the
    /// corresponding availability notifications.
    pub fn add_worker(&mut self, id: WorkerId, config: WorkerConfig, sink: &mut dyn HookSink) {
        if self.registry.worker(id).is_none() {
            self.registry.workers.insert(
                id,
                Worker {
                    state: WorkerState::Unavailable,
                    assignment: None,
                    dangling: None,
                    transport: None,
                },
            );
        }
        let state = self.registry.worker(id).map(|w| w.state);
        if config.available {
            if state == Some(WorkerState::Unavailable) {
                if let Some(worker) = self.registry.worker_mut(id) {
                    worker.state = WorkerState::Idle;
                }
                self.registry.mark_idle(id);
                self.try_assign_workers(sink);
            }
        } else {
            match state {
                Some(WorkerState::Idle) => {
                    self.registry.clear_idle(id);
                    if let Some(worker) = self.registry.worker_mut(id) {
                        worker.state = WorkerState::Unavailable;
                    }
                }
                Some(WorkerState::Working) => {
                    self.unwind_worker(id, sink);
                    if let Some(worker) = self.registry.worker_mut(id) {
                        worker.state = WorkerState::Unavailable;
                    }
                    self.try_assign_workers(sink);
                }
                _ => {}
            }
        }
    }

    /// Register or replace a workstation.
    ///
    /// Validates the configuration against the registered storages: every
    /// listed slot must exist with the matching role, internal inputs
    /// require at least one external input, and internal outputs require
    /// at least one external output. Replacing an existing workstation
    /// first releases its worker and detaches its old slots.
    pub fn add_workstation(
        &mut self,
        id: WorkstationId,
        config: WorkstationConfig,
        sink: &mut dyn HookSink,
    ) -> Result<(), ConfigError> {
        self.validate_workstation(id, &config)?;

        if self.registry.workstation(id).is_some() {
            self.detach_workstation(id, sink);
        }

        let station = Workstation {
            status: WorkstationStatus::Blocked,
            worker: None,
            step: Step::Pickup,
            cycles_completed: 0,
            priority: config.priority,
            enabled: true,
            eis: config.eis,
            iis: config.iis,
            ios: config.ios,
            eos: config.eos,
            selected_eis: None,
            selected_eos: None,
        };
        let slots: Vec<StorageId> = station.all_slots().collect();
        self.registry.workstations.insert(id, station);
        for slot in slots {
            self.registry.link_storage(slot, id);
        }
        self.evaluate_readiness(id, sink);
        self.try_assign_workers(sink);
        Ok(())
    }

    /// Late-bind an already-registered storage to a workstation.
    ///
    /// The storage joins the slot list matching its role. Attaching the
    /// same storage twice is a no-op.
    pub fn attach_storage(
        &mut self,
        workstation: WorkstationId,
        storage: StorageId,
        sink: &mut dyn HookSink,
    ) -> Result<(), ConfigError> {
        let role = self
            .registry
            .storage(storage)
            .map(|s| s.role)
            .ok_or(ConfigError::UnknownStorage(storage))?;
        let Some(station) = self.registry.workstation(workstation) else {
            return Err(ConfigError::UnknownWorkstation(workstation));
        };
        match role {
            StorageRole::Standalone => {
                return Err(ConfigError::StandaloneInWorkstation(storage));
            }
            StorageRole::InternalInput if station.eis.is_empty() => {
                return Err(ConfigError::MissingExternalInput(workstation));
            }
            StorageRole::InternalOutput if station.eos.is_empty() => {
                return Err(ConfigError::MissingExternalOutput(workstation));
            }
            _ => {}
        }
        if let Some(station) = self.registry.workstation_mut(workstation) {
            let list = match role {
                StorageRole::ExternalInput => &mut station.eis,
                StorageRole::InternalInput => &mut station.iis,
                StorageRole::InternalOutput => &mut station.ios,
                StorageRole::ExternalOutput | StorageRole::Standalone => &mut station.eos,
            };
            if !list.contains(&storage) {
                list.push(storage);
            }
        }
        self.registry.link_storage(storage, workstation);
        self.evaluate_readiness(workstation, sink);
        self.try_assign_workers(sink);
        Ok(())
    }

    /// Register a loose item awaiting delivery to a compatible slot.
    ///
    /// Returns `false` if the item is already tracked.
    pub fn add_dangling_item(
        &mut self,
        item: ItemId,
        kind: ItemKind,
        sink: &mut dyn HookSink,
    ) -> bool {
        if self.dangling.contains_key(&item) {
            warn!(%item, "dangling item already registered");
            return false;
        }
        self.dangling.insert(item, DanglingItem { kind, worker: None });
        self.try_assign_workers(sink);
        true
    }

    /// Forget a dangling item, cancelling any delivery in flight.
    pub fn remove_dangling_item(&mut self, item: ItemId, sink: &mut dyn HookSink) -> bool {
        let Some(entry) = self.dangling.get(&item) else {
            warn!(%item, "unknown dangling item");
            return false;
        };
        if let Some(worker) = entry.worker {
            self.cancel_dangling(worker, sink, true);
        }
        self.dangling.remove(&item);
        self.try_assign_workers(sink);
        true
    }

    // -----------------------------------------------------------------------
    // Removal (cascading)
    // -----------------------------------------------------------------------

    /// Remove a storage slot, detaching it from every workstation and
    /// cancelling tasks that source from or target it.
    pub fn remove_storage(&mut self, id: StorageId, sink: &mut dyn HookSink) -> bool {
        if self.registry.storage(id).is_none() {
            warn!(storage = %id, "remove of unknown storage");
            return false;
        }
        // A delivery reserved this slot as its destination.
        if let Some(holder) = self.reservations.holder(id) {
            let targets_dangling = self
                .registry
                .worker(holder)
                .and_then(|w| w.dangling)
                .is_some_and(|task| task.target == id);
            if targets_dangling {
                self.cancel_dangling(holder, sink, true);
            } else {
                self.cancel_transport(holder, sink, true);
            }
        }
        // A transport was about to pick up from this slot.
        if let Some(worker) = self.transports.get(&id).copied() {
            self.cancel_transport(worker, sink, true);
        }
        self.reservations.release(id);

        let users = self.registry.users_of(id);
        for ws_id in &users {
            if let Some(station) = self.registry.workstation_mut(*ws_id) {
                station.eis.retain(|s| *s != id);
                station.iis.retain(|s| *s != id);
                station.ios.retain(|s| *s != id);
                station.eos.retain(|s| *s != id);
                if station.selected_eis == Some(id) {
                    station.selected_eis = None;
                }
                if station.selected_eos == Some(id) {
                    station.selected_eos = None;
                }
            }
            self.registry.unlink_storage(id, *ws_id);
        }
        self.registry.storages.remove(&id);
        for ws_id in users {
            self.evaluate_readiness(ws_id, sink);
        }
        self.try_assign_workers(sink);
        true
    }

    /// Remove a worker, unwinding any in-flight task first.
    pub fn remove_worker(&mut self, id: WorkerId, sink: &mut dyn HookSink) -> bool {
        let Some(worker) = self.registry.worker(id) else {
            warn!(worker = %id, "remove of unknown worker");
            return false;
        };
        if worker.state == WorkerState::Working {
            self.unwind_worker(id, sink);
        }
        self.registry.clear_idle(id);
        self.reservations.release_all_for(id);
        self.registry.workers.remove(&id);
        self.try_assign_workers(sink);
        true
    }

    /// Remove a workstation, releasing its worker and pruning all
    /// bookkeeping that references it.
    pub fn remove_workstation(&mut self, id: WorkstationId, sink: &mut dyn HookSink) -> bool {
        if self.registry.workstation(id).is_none() {
            warn!(workstation = %id, "remove of unknown workstation");
            return false;
        }
        self.detach_workstation(id, sink);
        self.registry.workstations.remove(&id);
        self.try_assign_workers(sink);
        true
    }

    // -----------------------------------------------------------------------
    // Queries (read-only)
    // -----------------------------------------------------------------------

    /// Look up a storage record.
    pub fn storage(&self, id: StorageId) -> Option<&Storage> {
        self.registry.storage(id)
    }

    /// Look up a worker record.
    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.registry.worker(id)
    }

    /// Look up a workstation record.
    pub fn workstation(&self, id: WorkstationId) -> Option<&Workstation> {
        self.registry.workstation(id)
    }

    /// The worker currently holding a reservation on a slot, if any.
    pub fn reservation_holder(&self, storage: StorageId) -> Option<WorkerId> {
        self.reservations.holder(storage)
    }

    /// Number of registered storage slots.
    pub fn storage_count(&self) -> usize {
        self.registry.storages.len()
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.registry.workers.len()
    }

    /// Number of registered workstations.
    pub fn workstation_count(&self) -> usize {
        self.registry.workstations.len()
    }

    /// Number of dangling items awaiting or under delivery.
    pub fn dangling_count(&self) -> usize {
        self.dangling.len()
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Unbind a worker from everything it is doing, without returning it
    /// to the pool. Used when the worker itself goes away.
    pub(crate) fn unwind_worker(&mut self, worker_id: WorkerId, sink: &mut dyn HookSink) {
        let assignment = self.registry.worker(worker_id).and_then(|w| w.assignment);
        if let Some(ws_id) = assignment {
            if let Some(station) = self.registry.workstation_mut(ws_id) {
                station.worker = None;
                station.selected_eis = None;
                station.selected_eos = None;
            }
            if let Some(worker) = self.registry.worker_mut(worker_id) {
                worker.assignment = None;
            }
            sink.dispatch(&Hook::WorkerReleased {
                worker: worker_id,
                workstation: ws_id,
            });
            self.evaluate_readiness(ws_id, sink);
        }
        self.cancel_dangling(worker_id, sink, false);
        self.cancel_transport(worker_id, sink, false);
    }

    /// Release a workstation's worker (if any), drop it from the queue,
    /// and detach its slots from the reverse index. The record itself is
    /// left to the caller.
    fn detach_workstation(&mut self, id: WorkstationId, sink: &mut dyn HookSink) {
        let worker_id = self.registry.workstation(id).and_then(|ws| ws.worker);
        if let Some(worker_id) = worker_id {
            if let Some(worker) = self.registry.worker_mut(worker_id) {
                worker.assignment = None;
                worker.state = WorkerState::Idle;
            }
            self.registry.mark_idle(worker_id);
            if let Some(station) = self.registry.workstation_mut(id) {
                station.worker = None;
            }
            sink.dispatch(&Hook::WorkerReleased {
                worker: worker_id,
                workstation: id,
            });
        }
        self.registry.dequeue(id);
        let slots: Vec<StorageId> = self
            .registry
            .workstation(id)
            .map(|ws| ws.all_slots().collect())
            .unwrap_or_default();
        for slot in slots {
            self.registry.unlink_storage(slot, id);
        }
    }

    fn validate_workstation(
        &self,
        id: WorkstationId,
        config: &WorkstationConfig,
    ) -> Result<(), ConfigError> {
        self.validate_slot_list(&config.eis, StorageRole::ExternalInput)?;
        self.validate_slot_list(&config.iis, StorageRole::InternalInput)?;
        self.validate_slot_list(&config.ios, StorageRole::InternalOutput)?;
        self.validate_slot_list(&config.eos, StorageRole::ExternalOutput)?;
        if !config.iis.is_empty() && config.eis.is_empty() {
            return Err(ConfigError::MissingExternalInput(id));
        }
        if !config.ios.is_empty() && config.eos.is_empty() {
            return Err(ConfigError::MissingExternalOutput(id));
        }
        Ok(())
    }

    fn validate_slot_list(
        &self,
        ids: &[StorageId],
        expected: StorageRole,
    ) -> Result<(), ConfigError> {
        for id in ids {
            let Some(storage) = self.registry.storage(*id) else {
                return Err(ConfigError::UnknownStorage(*id));
            };
            if storage.role != expected {
                return Err(ConfigError::RoleMismatch {
                    storage: *id,
                    expected,
                    actual: storage.role,
                });
            }
        }
        Ok(())
    }
}
