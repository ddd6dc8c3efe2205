//! Enumeration types for the Shopfloor orchestration engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Storage roles
// ---------------------------------------------------------------------------

/// The role a storage slot plays in a workstation's four-stage pipeline.
///
/// A storage's role is fixed at registration and never changes. External
/// slots are shared with the outside world (other workstations, dangling
/// deliveries); internal slots belong to a single workstation's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StorageRole {
    /// Raw input delivered from outside; workers pick up from here.
    ExternalInput,
    /// Staging slot holding an input while a workstation processes it.
    InternalInput,
    /// Staging slot holding a freshly produced output.
    InternalOutput,
    /// Finished output handed back to the outside world.
    ExternalOutput,
    /// A free-standing slot not attached to any workstation, used as a
    /// fallback destination for deliveries.
    Standalone,
}

// ---------------------------------------------------------------------------
// Worker state
// ---------------------------------------------------------------------------

/// The coarse availability state of a worker.
///
/// `Working` holds exactly while one of the worker's three task slots
/// (workstation assignment, dangling delivery, transport) is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkerState {
    /// Available and waiting for the scheduler to hand out a task.
    Idle,
    /// Executing a task (assignment, dangling delivery, or transport).
    Working,
    /// Withdrawn by the host; not considered by the scheduler.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Workstation status
// ---------------------------------------------------------------------------

/// The readiness status of a workstation.
///
/// `Active` holds if and only if a worker is assigned. Unassigned
/// workstations are `Queued` when their storages allow a cycle to run and
/// `Blocked` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkstationStatus {
    /// Cannot run: missing inputs, no free output slot, or disabled.
    Blocked,
    /// Ready to run and waiting for a worker.
    Queued,
    /// A worker is assigned and the step cycle is in progress.
    Active,
}

// ---------------------------------------------------------------------------
// Cycle step
// ---------------------------------------------------------------------------

/// The current step of a workstation's Pickup -> Process -> Store cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    /// Moving items from external inputs into internal input slots.
    Pickup,
    /// Waiting for the host to report the work itself as finished.
    Process,
    /// Moving produced items from internal outputs to an external output.
    Store,
}
