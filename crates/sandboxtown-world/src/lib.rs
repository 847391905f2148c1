//! Shared environment and zones for the SandboxTown simulation.
//!
//! # Modules
//!
//! - [`environment`] -- Density controller (`Dense -> Calm` downshift) and
//!   the opt-in all-stable upshift policy.
//! - [`error`] -- Error types for zone catalogue operations.
//! - [`zones`] -- Validated, ordered zone catalogue.

pub mod environment;
pub mod error;
pub mod zones;

// Re-export primary types at crate root.
pub use environment::{
    EnvironmentPolicy, EnvironmentState, update_environment, upshift_if_all_stable,
};
pub use error::WorldError;
pub use zones::{DEFAULT_ZONES, ZoneCatalogue};
