//! Entity records and the id-keyed registries the engine scans.
//!
//! The [`Registry`] owns all abstract workflow state: storage, worker and
//! workstation records, the reverse index from storage to the
//! workstations referencing it, the idle-worker set, and the
//! insertion-ordered queue of ready workstations. Everything is keyed by
//! typed IDs in `BTreeMap`s so bulk scans are deterministic.
//!
//! Fill state has a single source of truth: the storage record. Derived
//! views (are all of a workstation's inputs staged?) are recomputed on
//! demand through the accessor helpers here rather than mirrored into
//! per-workstation bitsets that could drift.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use shopfloor_types::{
    ItemId, ItemKind, Priority, Step, StorageId, StorageRole, WorkerId, WorkerState,
    WorkstationId, WorkstationStatus,
};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single-item storage slot.
///
/// Invariant: `has_item == false` implies `kind == None`. The one
/// exception is an internal output immediately after its process
/// finishes: it is marked filled while the concrete kind stays `None`
/// until the host reports it via `ItemAdded`.
#[derive(Debug, Clone, Serialize)]
pub struct Storage {
    /// The slot's pipeline role; immutable after registration.
    pub role: StorageRole,
    /// The only kind this slot accepts, or `None` for any.
    pub accepts: Option<ItemKind>,
    /// Priority when competing for transport service.
    pub priority: Priority,
    /// Whether an item currently occupies the slot.
    pub has_item: bool,
    /// The occupying item's kind, when known.
    pub kind: Option<ItemKind>,
}

impl Storage {
    /// Whether the slot would accept an item of the given kind.
    pub fn takes(&self, kind: ItemKind) -> bool {
        self.accepts.is_none_or(|only| only == kind)
    }

    /// Fill the slot.
    pub const fn fill(&mut self, kind: Option<ItemKind>) {
        self.has_item = true;
        self.kind = kind;
    }

    /// Empty the slot.
    pub const fn clear(&mut self) {
        self.has_item = false;
        self.kind = None;
    }
}

/// A delivery of a loose item to a reserved destination slot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DanglingTask {
    /// The host-owned item entity being carried.
    pub item: ItemId,
    /// The item's kind.
    pub kind: ItemKind,
    /// The reserved destination slot.
    pub target: StorageId,
}

/// A slot-to-slot move of a finished item.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TransportTask {
    /// The source external output slot.
    pub from: StorageId,
    /// The reserved destination slot.
    pub to: StorageId,
    /// The kind being moved.
    pub kind: ItemKind,
    /// Whether the worker already lifted the item out of `from`.
    pub picked_up: bool,
}

/// A worker.
///
/// Invariant: at most one of `assignment`, `dangling`, `transport` is set
/// at a time, and `state == Working` exactly while one of them is.
#[derive(Debug, Clone, Serialize)]
pub struct Worker {
    /// Availability state.
    pub state: WorkerState,
    /// The workstation this worker is serving, if any.
    pub assignment: Option<WorkstationId>,
    /// An in-flight dangling-item delivery, if any.
    pub dangling: Option<DanglingTask>,
    /// An in-flight transport, if any.
    pub transport: Option<TransportTask>,
}

impl Worker {
    /// Whether the worker holds no task of any kind.
    pub const fn is_unoccupied(&self) -> bool {
        self.assignment.is_none() && self.dangling.is_none() && self.transport.is_none()
    }
}

/// A multi-step workstation.
///
/// Invariant: `status == Active` if and only if `worker` is set.
#[derive(Debug, Clone, Serialize)]
pub struct Workstation {
    /// Readiness status.
    pub status: WorkstationStatus,
    /// The assigned worker, while Active.
    pub worker: Option<WorkerId>,
    /// The current step of the cycle.
    pub step: Step,
    /// Completed Pickup -> Process -> Store traversals.
    pub cycles_completed: u32,
    /// Scheduling priority.
    pub priority: Priority,
    /// Whether the host currently allows this workstation to run.
    pub enabled: bool,
    /// External input slots, in pickup order.
    pub eis: Vec<StorageId>,
    /// Internal input slots, in fill order.
    pub iis: Vec<StorageId>,
    /// Internal output slots, in store order.
    pub ios: Vec<StorageId>,
    /// External output slots, in selection order.
    pub eos: Vec<StorageId>,
    /// The external input chosen for the pickup currently under way.
    pub selected_eis: Option<StorageId>,
    /// The external output chosen for the store currently under way.
    pub selected_eos: Option<StorageId>,
}

impl Workstation {
    /// A producer draws no inputs: it has neither external nor internal
    /// input slots and starts its cycle directly at Process.
    pub fn is_producer(&self) -> bool {
        self.eis.is_empty() && self.iis.is_empty()
    }

    /// All slot lists chained, for reverse-index maintenance.
    pub fn all_slots(&self) -> impl Iterator<Item = StorageId> + '_ {
        self.eis
            .iter()
            .chain(&self.iis)
            .chain(&self.ios)
            .chain(&self.eos)
            .copied()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// The engine's entity registries and tracking sets.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) storages: BTreeMap<StorageId, Storage>,
    pub(crate) workers: BTreeMap<WorkerId, Worker>,
    pub(crate) workstations: BTreeMap<WorkstationId, Workstation>,
    /// Which workstations reference each storage, for O(1) fan-out on
    /// storage changes.
    storage_users: BTreeMap<StorageId, BTreeSet<WorkstationId>>,
    /// Workers currently in the available pool.
    idle_workers: BTreeSet<WorkerId>,
    /// Ready workstations in the order they became ready. Insertion order
    /// is the tie-break for equal priorities.
    queued: Vec<WorkstationId>,
}

impl Registry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            storages: BTreeMap::new(),
            workers: BTreeMap::new(),
            workstations: BTreeMap::new(),
            storage_users: BTreeMap::new(),
            idle_workers: BTreeSet::new(),
            queued: Vec::new(),
        }
    }

    // --- storages ---

    /// Look up a storage record.
    pub fn storage(&self, id: StorageId) -> Option<&Storage> {
        self.storages.get(&id)
    }

    /// Look up a storage record mutably.
    pub fn storage_mut(&mut self, id: StorageId) -> Option<&mut Storage> {
        self.storages.get_mut(&id)
    }

    /// All storages in ascending id order.
    pub fn storages(&self) -> impl Iterator<Item = (StorageId, &Storage)> {
        self.storages.iter().map(|(id, s)| (*id, s))
    }

    /// Whether the slot exists and holds an item.
    pub fn is_filled(&self, id: StorageId) -> bool {
        self.storage(id).is_some_and(|s| s.has_item)
    }

    /// Whether the slot exists and is empty.
    pub fn is_vacant(&self, id: StorageId) -> bool {
        self.storage(id).is_some_and(|s| !s.has_item)
    }

    /// Whether every listed slot holds an item.
    pub fn all_filled(&self, ids: &[StorageId]) -> bool {
        ids.iter().all(|id| self.is_filled(*id))
    }

    /// Whether every listed slot is empty.
    pub fn all_vacant(&self, ids: &[StorageId]) -> bool {
        ids.iter().all(|id| self.is_vacant(*id))
    }

    /// The first listed slot holding an item.
    pub fn first_filled(&self, ids: &[StorageId]) -> Option<StorageId> {
        ids.iter().copied().find(|id| self.is_filled(*id))
    }

    // --- workers ---

    /// Look up a worker record.
    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    /// Look up a worker record mutably.
    pub fn worker_mut(&mut self, id: WorkerId) -> Option<&mut Worker> {
        self.workers.get_mut(&id)
    }

    /// Add a worker to the available pool.
    pub fn mark_idle(&mut self, id: WorkerId) {
        self.idle_workers.insert(id);
    }

    /// Remove a worker from the available pool.
    pub fn clear_idle(&mut self, id: WorkerId) {
        self.idle_workers.remove(&id);
    }

    /// Whether the worker is in the available pool.
    pub fn is_idle(&self, id: WorkerId) -> bool {
        self.idle_workers.contains(&id)
    }

    /// Snapshot of the available pool in ascending id order.
    pub fn idle_snapshot(&self) -> Vec<WorkerId> {
        self.idle_workers.iter().copied().collect()
    }

    /// The lowest-id idle worker, if any.
    pub fn first_idle(&self) -> Option<WorkerId> {
        self.idle_workers.first().copied()
    }

    /// Whether the available pool is empty.
    pub fn no_idle_workers(&self) -> bool {
        self.idle_workers.is_empty()
    }

    // --- workstations ---

    /// Look up a workstation record.
    pub fn workstation(&self, id: WorkstationId) -> Option<&Workstation> {
        self.workstations.get(&id)
    }

    /// Look up a workstation record mutably.
    pub fn workstation_mut(&mut self, id: WorkstationId) -> Option<&mut Workstation> {
        self.workstations.get_mut(&id)
    }

    // --- queue ---

    /// Append a workstation to the ready queue if not already present.
    pub fn enqueue(&mut self, id: WorkstationId) {
        if !self.queued.contains(&id) {
            self.queued.push(id);
        }
    }

    /// Drop a workstation from the ready queue.
    pub fn dequeue(&mut self, id: WorkstationId) {
        self.queued.retain(|queued| *queued != id);
    }

    /// Snapshot of the ready queue in insertion order.
    pub fn queue_snapshot(&self) -> Vec<WorkstationId> {
        self.queued.clone()
    }

    // --- reverse index ---

    /// Record that a workstation references a storage.
    pub fn link_storage(&mut self, storage: StorageId, workstation: WorkstationId) {
        self.storage_users.entry(storage).or_default().insert(workstation);
    }

    /// Drop one workstation's claim on a storage.
    pub fn unlink_storage(&mut self, storage: StorageId, workstation: WorkstationId) {
        if let Some(users) = self.storage_users.get_mut(&storage) {
            users.remove(&workstation);
            if users.is_empty() {
                self.storage_users.remove(&storage);
            }
        }
    }

    /// Snapshot of the workstations referencing a storage.
    pub fn users_of(&self, storage: StorageId) -> Vec<WorkstationId> {
        self.storage_users
            .get(&storage)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }
}
