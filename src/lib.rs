//! # Blood Compatibility Toolkit
//!
//! Blood-type compatibility classification and stock tooling for blood banks.
//!
//! ## Features
//!
//! - Donor/recipient compatibility checks over the eight ABO/Rh types
//! - Full 8x8 compatibility matrix and per-selection tables
//! - Compatible donor search over donor registries (parallel)
//! - Blood stock accounting: bag conversion, low-stock alerts, donation expiry
//! - Registry loading from CSV and JSON files, optionally gzip-compressed
//! - Report export as CSV, TSV or JSON

pub mod compatibility;
pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod matching;
pub mod output;
pub mod parsers;
pub mod types;

// Re-export key types
pub use compatibility::{
    accepted_donors, build_compatibility_matrix, check_compatibility, compatible_recipients,
    evaluate_pair, is_compatible, selection_table,
};
pub use config::AppConfig;
pub use discovery::RegistryDiscovery;
pub use error::{BloodBankError, Result};
pub use inventory::{Inventory, InventorySettings};
pub use matching::DonorMatcher;
pub use output::{CompatibilityReport, ReportFormat, ReportGenerator};
pub use parsers::{ParsedRegistry, RegistryParser};
pub use types::*;
