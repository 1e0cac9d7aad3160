use flate2::read::GzDecoder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{BloodBankError, Result};
use crate::inventory::DEFAULT_SHELF_LIFE_DAYS;
use crate::types::*;

pub mod csv_parser;
pub mod json_parser;

pub use csv_parser::CsvRegistryParser;
pub use json_parser::JsonRegistryParser;

/// Registry file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFormat {
    Csv,
    Json,
}

impl RegistryFormat {
    /// Detect the format from the file name, looking through a trailing `.gz`
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);

        if name.ends_with(".csv") {
            Some(RegistryFormat::Csv)
        } else if name.ends_with(".json") {
            Some(RegistryFormat::Json)
        } else {
            None
        }
    }
}

/// Donors and donations loaded from one or more registry files
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedRegistry {
    pub source: String,
    pub donors: Vec<Donor>,
    pub donations: Vec<Donation>,
}

impl ParsedRegistry {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: ParsedRegistry) {
        if self.source.is_empty() {
            self.source = other.source;
        } else if !other.source.is_empty() {
            self.source = format!("{}, {}", self.source, other.source);
        }
        self.donors.extend(other.donors);
        self.donations.extend(other.donations);
    }

    pub fn is_empty(&self) -> bool {
        self.donors.is_empty() && self.donations.is_empty()
    }

    pub fn donor(&self, id: u64) -> Option<&Donor> {
        self.donors.iter().find(|d| d.id == id)
    }

    /// Fail on the first donation whose donor is not in the registry
    pub fn check_donors(&self) -> Result<()> {
        let known: HashSet<u64> = self.donors.iter().map(|d| d.id).collect();
        match self.donations.iter().find(|d| !known.contains(&d.donor_id)) {
            Some(orphan) => Err(BloodBankError::UnknownDonor {
                donation_id: orphan.id,
                donor_id: orphan.donor_id,
            }),
            None => Ok(()),
        }
    }

    /// Drop donations whose donor is not in the registry, returning how many
    /// were dropped. Registries without any donors are left untouched.
    pub fn retain_known_donors(&mut self) -> usize {
        if self.donors.is_empty() {
            return 0;
        }

        let known: HashSet<u64> = self.donors.iter().map(|d| d.id).collect();
        let before = self.donations.len();
        self.donations.retain(|donation| {
            let found = known.contains(&donation.donor_id);
            if !found {
                warn!(
                    "Skipping donation {}: donor {} not found",
                    donation.id, donation.donor_id
                );
            }
            found
        });
        before - self.donations.len()
    }

    /// Validate donations and fill in missing validity dates
    pub(crate) fn finalize(&mut self, shelf_life_days: i64) -> Result<()> {
        for donation in &mut self.donations {
            donation.validate()?;
            donation.apply_shelf_life(shelf_life_days)?;
        }
        Ok(())
    }
}

/// Common interface of the per-format parsers
pub trait RegistryDataParser {
    fn parse(&self, path: &Path) -> Result<ParsedRegistry>;
}

/// Open a registry file, transparently decompressing `.gz`
pub fn open_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;

    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);

    if is_gzip {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Dispatches registry files to the parser for their format
pub struct RegistryParser {
    shelf_life_days: i64,
}

impl Default for RegistryParser {
    fn default() -> Self {
        Self::new(DEFAULT_SHELF_LIFE_DAYS)
    }
}

impl RegistryParser {
    pub fn new(shelf_life_days: i64) -> Self {
        Self { shelf_life_days }
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRegistry> {
        let format = RegistryFormat::from_path(path)
            .ok_or_else(|| BloodBankError::UnrecognizedRegistry(path.display().to_string()))?;

        debug!("Parsing {} as {:?}", path.display(), format);

        let parser: Box<dyn RegistryDataParser> = match format {
            RegistryFormat::Csv => Box::new(CsvRegistryParser::new()),
            RegistryFormat::Json => Box::new(JsonRegistryParser::new()),
        };
        let mut registry = parser.parse(path)?;
        registry.finalize(self.shelf_life_days)?;

        debug!(
            "{}: {} donor(s), {} donation(s)",
            path.display(),
            registry.donors.len(),
            registry.donations.len()
        );
        Ok(registry)
    }

    /// Parse files in parallel and merge them in input order.
    /// Files that fail to parse are logged and skipped, as are donations
    /// from a donor missing from the merged registry.
    pub fn parse_many(&self, paths: &[PathBuf]) -> ParsedRegistry {
        let parsed: Vec<ParsedRegistry> = paths
            .par_iter()
            .filter_map(|path| match self.parse(path) {
                Ok(registry) => Some(registry),
                Err(e) => {
                    warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        let mut merged = ParsedRegistry::default();
        for registry in parsed {
            merged.merge(registry);
        }
        merged.retain_known_donors();
        merged
    }
}
