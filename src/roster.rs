//! Roster store: which creatures the player may pick

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Creatures unlocked from the start. They stay selectable even when the
/// catalog fails to load.
pub const STARTERS: [&str; 3] = ["bulbasaur", "charmander", "squirtle"];

/// Split the plain-text catalog (`<index>:<id>` per line) into ids.
pub fn parse_catalog(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim().split(':').nth(1))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Roster {
    catalog: Vec<String>,
    unlocked: BTreeSet<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self::from_catalog(Vec::new())
    }
}

impl Roster {
    pub fn from_catalog(catalog: Vec<String>) -> Self {
        Self {
            catalog,
            unlocked: STARTERS.iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Replace the catalog, keeping everything already unlocked.
    pub fn load_catalog(&mut self, catalog: Vec<String>) {
        self.catalog = catalog;
    }

    pub fn list_all(&self) -> &[String] {
        &self.catalog
    }

    /// Dex tiles in display order: the catalog, then any starter it lacks.
    pub fn entries(&self) -> Vec<&str> {
        let mut entries: Vec<&str> = self.catalog.iter().map(String::as_str).collect();
        for starter in STARTERS {
            if !entries.contains(&starter) {
                entries.push(starter);
            }
        }
        entries
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    pub fn is_starter(id: &str) -> bool {
        STARTERS.contains(&id)
    }

    /// Returns true when `id` was not unlocked before.
    pub fn unlock(&mut self, id: &str) -> bool {
        let newly = self.unlocked.insert(id.to_string());
        if newly {
            tracing::info!(creature = id, "creature unlocked");
        }
        newly
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }
}
