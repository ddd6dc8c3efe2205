//! Error types for the `shopfloor-engine` crate.
//!
//! Only configuration errors surface as values: they indicate a
//! programming mistake on the host side and fail the registration call
//! that caused them. Runtime protocol violations are not errors in this
//! sense -- `Engine::handle` reports them by returning `false` after
//! logging a diagnostic, leaving state untouched.

use shopfloor_types::{StorageId, StorageRole, WorkstationId};

/// Integrity violations detected at registration time.
///
/// These are fatal to the registration call: the entity is not (re)written
/// and the engine's state is unchanged. A host receiving one of these has
/// a bug in its setup code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A workstation configuration referenced an unregistered storage.
    #[error("unknown storage in workstation config: {0}")]
    UnknownStorage(StorageId),

    /// A storage was listed under a slot list that does not match its
    /// registered role.
    #[error("storage {storage} has role {actual:?}, expected {expected:?}")]
    RoleMismatch {
        /// The misplaced storage.
        storage: StorageId,
        /// The role the slot list requires.
        expected: StorageRole,
        /// The role the storage was registered with.
        actual: StorageRole,
    },

    /// A storage was re-registered with a different role. Roles are
    /// immutable after registration.
    #[error("storage {storage} role cannot change from {from:?} to {to:?}")]
    RoleChange {
        /// The storage being re-registered.
        storage: StorageId,
        /// The existing role.
        from: StorageRole,
        /// The rejected new role.
        to: StorageRole,
    },

    /// A workstation listed internal inputs but no external input to feed
    /// them from.
    #[error("workstation {0} has internal inputs but no external input")]
    MissingExternalInput(WorkstationId),

    /// A workstation listed internal outputs but no external output to
    /// store into.
    #[error("workstation {0} has internal outputs but no external output")]
    MissingExternalOutput(WorkstationId),

    /// A standalone storage cannot be attached to a workstation.
    #[error("standalone storage {0} cannot join a workstation")]
    StandaloneInWorkstation(StorageId),

    /// The workstation targeted by an attach call does not exist.
    #[error("unknown workstation: {0}")]
    UnknownWorkstation(WorkstationId),
}
