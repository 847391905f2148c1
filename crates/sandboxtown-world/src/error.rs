//! Error types for the `sandboxtown-world` crate.

use sandboxtown_types::Zone;

/// Errors that can occur while building or querying the zone catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A zone name was empty or whitespace only.
    #[error("zone name must not be empty")]
    EmptyZoneName,

    /// The same zone was listed twice.
    #[error("duplicate zone: {0}")]
    DuplicateZone(Zone),

    /// A catalogue needs at least one zone.
    #[error("zone catalogue is empty")]
    EmptyCatalogue,

    /// A zone that is not part of the catalogue was referenced.
    #[error("unknown zone: {0}")]
    UnknownZone(Zone),
}
