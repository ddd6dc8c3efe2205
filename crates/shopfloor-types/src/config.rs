//! Registration configuration structs.
//!
//! The host describes each entity once at registration time. Everything
//! that can change afterwards (fill state, assignments, status) lives in
//! the engine's own records, not here.

use serde::{Deserialize, Serialize};

use crate::enums::StorageRole;
use crate::ids::{ItemKind, Priority, StorageId};

/// Configuration for a storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// The slot's pipeline role; immutable after registration.
    pub role: StorageRole,
    /// The only item kind the slot accepts, or `None` for any.
    pub accepts: Option<ItemKind>,
    /// Scheduling priority when competing for transport service.
    pub priority: Priority,
}

impl StorageConfig {
    /// A slot of the given role accepting any kind at default priority.
    pub const fn of_role(role: StorageRole) -> Self {
        Self {
            role,
            accepts: None,
            priority: Priority(0),
        }
    }
}

/// Configuration for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker starts in the available pool.
    pub available: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { available: true }
    }
}

/// Configuration for a workstation.
///
/// The four lists are ordered: slot selection during pickup and store
/// walks them front to back. All referenced storages must already be
/// registered with the matching role, and the pipeline must be coherent:
/// internal inputs require at least one external input, internal outputs
/// require at least one external output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkstationConfig {
    /// Scheduling priority; higher runs first, ties keep queue order.
    pub priority: Priority,
    /// External input slots.
    pub eis: Vec<StorageId>,
    /// Internal input slots.
    pub iis: Vec<StorageId>,
    /// Internal output slots.
    pub ios: Vec<StorageId>,
    /// External output slots.
    pub eos: Vec<StorageId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_config_of_role_accepts_anything() {
        let cfg = StorageConfig::of_role(StorageRole::Standalone);
        assert!(cfg.accepts.is_none());
        assert_eq!(cfg.priority, Priority(0));
    }

    #[test]
    fn worker_config_defaults_to_available() {
        assert!(WorkerConfig::default().available);
    }

    #[test]
    fn workstation_config_default_is_empty() {
        let cfg = WorkstationConfig::default();
        assert!(cfg.eis.is_empty() && cfg.iis.is_empty());
        assert!(cfg.ios.is_empty() && cfg.eos.is_empty());
    }
}
