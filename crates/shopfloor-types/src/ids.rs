//! Type-safe identifier wrappers around `u64`.
//!
//! Every entity the engine tracks has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. The host owns entity
//! identity: it assigns the numeric values and passes them in through the
//! registration API and the event protocol. The engine never generates IDs
//! of its own.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Return the inner numeric value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a storage slot.
    StorageId
}

define_id! {
    /// Unique identifier for a worker.
    WorkerId
}

define_id! {
    /// Unique identifier for a workstation.
    WorkstationId
}

define_id! {
    /// Unique identifier for a concrete item entity owned by the host.
    ///
    /// The engine only sees item IDs for dangling items awaiting delivery;
    /// items sitting in storage slots are tracked by [`ItemKind`] alone.
    ItemId
}

define_id! {
    /// An opaque host-defined item type tag.
    ///
    /// The engine compares kinds for slot-acceptance checks but attaches no
    /// meaning to the numeric value.
    ItemKind
}

/// Scheduling priority for workstations and storages.
///
/// Higher values are served first. Ties keep their original order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Priority(pub i32);

impl Priority {
    /// Return the inner numeric value.
    pub const fn into_inner(self) -> i32 {
        self.0
    }
}

impl core::fmt::Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}
