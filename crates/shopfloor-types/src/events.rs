//! The bidirectional event protocol between the engine and its host.
//!
//! The engine communicates through exactly two typed channels:
//!
//! - [`Notification`] -- inbound. The host reports every real-world change
//!   (an item appeared, a worker finished walking, a process timer fired)
//!   by passing one of these to `Engine::handle`.
//! - [`Hook`] -- outbound. The engine announces every completed internal
//!   transition so the host can perform the matching concrete mutation
//!   (move a sprite, spawn an output entity, play an animation).
//!
//! The engine never runs its own clock: all passage of time arrives as
//! notifications, and every hook is dispatched synchronously from within
//! the `handle` call that caused it.

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, ItemKind, StorageId, WorkerId, WorkstationId};

// ---------------------------------------------------------------------------
// Inbound notifications
// ---------------------------------------------------------------------------

/// An inbound event from the host.
///
/// `Engine::handle` returns `false` when a notification violates the
/// protocol (unknown id, wrong step, role mismatch); state is left
/// untouched in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// An item of the given kind was placed into a storage slot.
    ItemAdded {
        /// The slot that received the item.
        storage: StorageId,
        /// The item's type tag.
        kind: ItemKind,
    },
    /// The item in a storage slot was taken out by the host.
    ItemRemoved {
        /// The slot that lost its item.
        storage: StorageId,
    },
    /// A storage slot was emptied; clearing an already-empty slot is a
    /// no-op rather than a violation.
    StorageCleared {
        /// The slot to clear.
        storage: StorageId,
    },
    /// A worker (re)joined the available pool.
    WorkerAvailable {
        /// The worker.
        worker: WorkerId,
    },
    /// A worker was withdrawn; any in-flight task is unwound.
    WorkerUnavailable {
        /// The worker.
        worker: WorkerId,
    },
    /// A worker was destroyed; cascades like unavailability, then the
    /// record is dropped.
    WorkerRemoved {
        /// The worker.
        worker: WorkerId,
    },
    /// A workstation may participate in scheduling again.
    WorkstationEnabled {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A workstation is taken out of service; an assigned worker is
    /// released.
    WorkstationDisabled {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A workstation was destroyed; its worker is released and all
    /// bookkeeping referencing it is pruned.
    WorkstationRemoved {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// The worker finished walking to the external input selected for the
    /// current pickup; the engine performs the slot transfer.
    PickupCompleted {
        /// The worker that arrived.
        worker: WorkerId,
    },
    /// The host's process timer or animation finished for a workstation
    /// currently in its Process step.
    WorkCompleted {
        /// The workstation whose work finished.
        workstation: WorkstationId,
    },
    /// The worker finished carrying one output to the selected external
    /// output slot.
    StoreCompleted {
        /// The worker that arrived.
        worker: WorkerId,
    },
    /// A transporting worker picked the item out of the source slot.
    TransportPickupCompleted {
        /// The worker that picked up.
        worker: WorkerId,
    },
    /// A transporting or dangling-delivery worker dropped its item into
    /// the reserved destination slot.
    TransportDeliveryCompleted {
        /// The worker that delivered.
        worker: WorkerId,
    },
}

// ---------------------------------------------------------------------------
// Outbound hooks
// ---------------------------------------------------------------------------

/// An outbound event dispatched by the engine to its host.
///
/// Exactly one hook is dispatched per internal transition, synchronously,
/// through the hook sink passed to `Engine::handle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hook {
    /// A worker should walk to an external input and pick up an item.
    PickupStarted {
        /// The assigned worker.
        worker: WorkerId,
        /// The workstation being served.
        workstation: WorkstationId,
        /// The external input slot to pick from.
        storage: StorageId,
        /// The kind of item sitting in that slot.
        kind: ItemKind,
    },
    /// All inputs are staged; the host should start the actual work
    /// (timer, animation) and answer with `WorkCompleted`.
    ProcessStarted {
        /// The workstation.
        workstation: WorkstationId,
        /// The assigned worker.
        worker: WorkerId,
    },
    /// The work finished and every internal output slot was marked filled.
    ProcessCompleted {
        /// The workstation.
        workstation: WorkstationId,
        /// The assigned worker.
        worker: WorkerId,
    },
    /// A worker should carry one produced item to the selected external
    /// output slot.
    StoreStarted {
        /// The assigned worker.
        worker: WorkerId,
        /// The workstation being served.
        workstation: WorkstationId,
        /// The destination external output slot.
        storage: StorageId,
        /// The kind being carried; `None` while the internal output's
        /// concrete type is still deferred to the host.
        kind: Option<ItemKind>,
    },
    /// The scheduler bound a worker to a workstation.
    WorkerAssigned {
        /// The worker.
        worker: WorkerId,
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A worker was unbound from a workstation and returned to the pool.
    WorkerReleased {
        /// The worker.
        worker: WorkerId,
        /// The workstation it was serving.
        workstation: WorkstationId,
    },
    /// A workstation can no longer run a cycle.
    WorkstationBlocked {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A workstation became ready and is waiting for a worker.
    WorkstationQueued {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A workstation received a worker and its cycle is starting.
    WorkstationActivated {
        /// The workstation.
        workstation: WorkstationId,
    },
    /// A full Pickup -> Process -> Store traversal finished.
    CycleCompleted {
        /// The workstation.
        workstation: WorkstationId,
        /// Total cycles completed since registration.
        cycles_completed: u32,
    },
    /// A worker should move an item from a filled external output onward.
    TransportStarted {
        /// The transporting worker.
        worker: WorkerId,
        /// The source external output slot.
        from: StorageId,
        /// The reserved destination slot.
        to: StorageId,
        /// The kind being moved.
        kind: ItemKind,
    },
    /// A transport delivery landed in its destination slot.
    TransportCompleted {
        /// The transporting worker.
        worker: WorkerId,
        /// The destination slot.
        to: StorageId,
    },
    /// An in-flight transport or dangling delivery was aborted; any
    /// reservation it held was released.
    TransportCancelled {
        /// The worker whose task was aborted.
        worker: WorkerId,
    },
    /// A worker should walk to a dangling item and carry it to the
    /// reserved destination slot.
    PickupDanglingStarted {
        /// The delivering worker.
        worker: WorkerId,
        /// The host-owned item entity.
        item: ItemId,
        /// The reserved destination slot.
        target: StorageId,
    },
    /// A dangling item landed in its destination slot.
    ItemDelivered {
        /// The delivering worker.
        worker: WorkerId,
        /// The destination slot.
        storage: StorageId,
        /// The delivered item entity, when the delivery originated from a
        /// dangling item rather than a slot-to-slot transport.
        item: Option<ItemId>,
    },
    /// One staged input was consumed by a finishing process.
    InputConsumed {
        /// The workstation that consumed it.
        workstation: WorkstationId,
        /// The internal input slot that was cleared.
        storage: StorageId,
        /// The kind that was consumed.
        kind: ItemKind,
    },
    /// An item landed in a standalone slot.
    StandaloneItemAdded {
        /// The standalone slot.
        storage: StorageId,
        /// The item's kind.
        kind: ItemKind,
    },
    /// The item in a standalone slot went away.
    StandaloneItemRemoved {
        /// The standalone slot.
        storage: StorageId,
    },
}
