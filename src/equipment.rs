//! Equipment id remapping
//!
//! Some client builds report region- or version-specific equipment ids.
//! The remap table translates those onto the canonical id space before a
//! player update is committed. Ids without an entry pass through unchanged.

use std::path::Path;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Equipment descriptor carried in player updates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub head: u16,
    pub upper: u16,
    pub lower: u16,
    pub weapon: u16,
}

/// Id remap table, loaded once at startup
#[derive(Debug, Default)]
pub struct EquipmentMap {
    mappings: HashMap<u16, u16>,
}

impl EquipmentMap {
    pub fn new(mappings: HashMap<u16, u16>) -> Self {
        Self { mappings }
    }

    /// Load the table from a JSON object of zero-padded 3-digit id strings
    /// (e.g. `{"005": "112"}`). A missing or unreadable file yields the
    /// empty identity map so the server still starts.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "Could not read equipment map {}: {}, ids pass through unmapped",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        let raw: HashMap<String, String> = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    "Could not parse equipment map {}: {}, ids pass through unmapped",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        let mut mappings = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            match (key.parse::<u16>(), value.parse::<u16>()) {
                (Ok(from), Ok(to)) => {
                    mappings.insert(from, to);
                }
                _ => tracing::warn!("Skipping malformed equipment mapping {} -> {}", key, value),
            }
        }

        tracing::info!(
            "Loaded {} equipment mappings from {}",
            mappings.len(),
            path.display()
        );
        Self { mappings }
    }

    /// Look up the canonical id for a client-submitted id
    pub fn lookup(&self, id: u16) -> Option<u16> {
        self.mappings.get(&id).copied()
    }

    /// Remap every field of an equipment descriptor, leaving ids without
    /// an entry unchanged.
    pub fn remap(&self, equipment: Equipment) -> Equipment {
        Equipment {
            head: self.lookup(equipment.head).unwrap_or(equipment.head),
            upper: self.lookup(equipment.upper).unwrap_or(equipment.upper),
            lower: self.lookup(equipment.lower).unwrap_or(equipment.lower),
            weapon: self.lookup(equipment.weapon).unwrap_or(equipment.weapon),
        }
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
