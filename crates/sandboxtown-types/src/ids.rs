//! Type-safe identifier wrappers.
//!
//! Agents are identified by a sequential [`AgentId`] assigned when the roster
//! is built. Ascending id order is the canonical processing order for every
//! step, so the id must be stable and reproducible across runs.
//!
//! Runs are tagged with a [`RunId`] (UUID v7, time-ordered). The run id only
//! labels telemetry output and never feeds back into simulation state.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_uuid_id! {
    /// Unique identifier for one simulation run (labels its telemetry).
    RunId
}

/// Stable identifier for an agent within a run.
///
/// Assigned sequentially from 0 when the roster is created. Ordering by
/// `AgentId` is the deterministic agent processing order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AgentId(pub u32);

impl AgentId {
    /// Create an agent id from its roster index.
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the raw index value.
    pub const fn into_inner(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for AgentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

impl From<u32> for AgentId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
