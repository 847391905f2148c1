//! Zone catalogue.
//!
//! The catalogue is the fixed, ordered list of zones a run knows about. It
//! is validated once at startup; signal sources pick zones from it.

use std::collections::BTreeSet;

use sandboxtown_types::Zone;

use crate::error::WorldError;

/// Zones of the default town, in display order.
pub const DEFAULT_ZONES: [&str; 4] = ["Library", "Park", "Transition", "Rest"];

/// Ordered set of known zones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneCatalogue {
    zones: Vec<Zone>,
}

impl ZoneCatalogue {
    /// Build a catalogue from zone names, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyCatalogue`] for an empty list,
    /// [`WorldError::EmptyZoneName`] for a blank name, and
    /// [`WorldError::DuplicateZone`] for a repeated one.
    pub fn new<I, S>(names: I) -> Result<Self, WorldError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let mut zones = Vec::new();

        for name in names {
            let name: String = name.into();
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(WorldError::EmptyZoneName);
            }
            let zone = Zone::new(trimmed);
            if !seen.insert(zone.clone()) {
                return Err(WorldError::DuplicateZone(zone));
            }
            zones.push(zone);
        }

        if zones.is_empty() {
            return Err(WorldError::EmptyCatalogue);
        }
        Ok(Self { zones })
    }

    /// The default four-zone town.
    pub fn default_town() -> Self {
        Self {
            zones: DEFAULT_ZONES.iter().map(|&name| Zone::from(name)).collect(),
        }
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Always false: a catalogue holds at least one zone.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Whether `zone` is part of the catalogue.
    pub fn contains(&self, zone: &Zone) -> bool {
        self.zones.contains(zone)
    }

    /// Fail with [`WorldError::UnknownZone`] unless `zone` is catalogued.
    pub fn require(&self, zone: &Zone) -> Result<(), WorldError> {
        if self.contains(zone) {
            Ok(())
        } else {
            Err(WorldError::UnknownZone(zone.clone()))
        }
    }

    /// Zones in catalogue order.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// The first zone, used as the starting zone for every agent.
    pub fn first(&self) -> Option<&Zone> {
        self.zones.first()
    }
}
