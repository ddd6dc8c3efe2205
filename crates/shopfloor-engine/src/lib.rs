//! Embedded orchestration engine for worker/workstation/storage floors.
//!
//! The engine tracks an abstract model of a production floor -- workers,
//! multi-step workstations, and single-item storage slots -- and decides
//! who should do what next. It owns no concrete entities, runs no clock,
//! and spawns no threads: the host feeds it [`Notification`]s about the
//! real world and receives [`Hook`]s telling it what to animate, spawn,
//! or start timing.
//!
//! Modules:
//!
//! - `engine` -- the [`Engine`] type, registration API, and queries
//! - `dispatch` -- inbound notification handling
//! - `registry` -- entity records and tracking sets
//! - `readiness` -- Blocked vs Queued evaluation
//! - `scheduler` -- matching idle workers to pending work
//! - `cycle` -- the Pickup -> Process -> Store state machine
//! - `routing` -- dangling-item deliveries and transports
//! - `reservation` -- destination-slot claims
//! - `snapshot` -- serializable point-in-time state
//! - `hooks` -- the [`HookSink`] and [`WorkerSelector`] seams
//! - `error` -- configuration errors
//!
//! [`Notification`]: shopfloor_types::Notification
//! [`Hook`]: shopfloor_types::Hook

mod cycle;
mod dispatch;
mod engine;
mod error;
mod hooks;
mod readiness;
mod registry;
mod reservation;
mod routing;
mod scheduler;
mod snapshot;

pub use engine::Engine;
pub use error::ConfigError;
pub use hooks::{FirstAvailable, HookSink, NullSink, RecordingSink, WorkerSelector};
pub use registry::{DanglingTask, Storage, TransportTask, Worker, Workstation};
pub use reservation::ReservationTracker;
pub use routing::DanglingItem;
pub use snapshot::EngineSnapshot;
