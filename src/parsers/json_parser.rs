use serde::Deserialize;
use std::path::Path;

use crate::error::Result;
use crate::parsers::{open_file, ParsedRegistry, RegistryDataParser};
use crate::types::*;

#[derive(Debug, Deserialize)]
struct RegistrySnapshot {
    #[serde(default)]
    donors: Vec<Donor>,
    #[serde(default)]
    donations: Vec<Donation>,
}

/// JSON parser for registry snapshots: `{ "donors": [...], "donations": [...] }`
pub struct JsonRegistryParser;

impl JsonRegistryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRegistry> {
        let reader = open_file(path)?;
        let snapshot: RegistrySnapshot = serde_json::from_reader(reader)?;

        Ok(ParsedRegistry {
            source: path.to_string_lossy().to_string(),
            donors: snapshot.donors,
            donations: snapshot.donations,
        })
    }
}

impl Default for JsonRegistryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryDataParser for JsonRegistryParser {
    fn parse(&self, path: &Path) -> Result<ParsedRegistry> {
        self.parse(path)
    }
}
