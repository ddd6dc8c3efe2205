//! Shared type definitions for the Shopfloor orchestration engine.
//!
//! This crate is the single source of truth for all types crossing the
//! engine/host boundary: identifiers, enumerations, the bidirectional
//! event protocol, and registration configuration.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe `u64` wrappers for host-assigned identifiers
//! - [`enums`] -- Enumeration types (roles, states, statuses, cycle steps)
//! - [`events`] -- The inbound [`Notification`] and outbound [`Hook`] unions
//! - [`config`] -- Registration configuration structs

pub mod config;
pub mod enums;
pub mod events;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use config::{StorageConfig, WorkerConfig, WorkstationConfig};
pub use enums::{Step, StorageRole, WorkerState, WorkstationStatus};
pub use events::{Hook, Notification};
pub use ids::{ItemId, ItemKind, Priority, StorageId, WorkerId, WorkstationId};
