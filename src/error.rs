use chrono::NaiveDate;
use thiserror::Error;

use crate::types::BloodType;

#[derive(Error, Debug)]
pub enum BloodBankError {
    #[error("Invalid blood type: {0}")]
    InvalidBloodType(String),

    #[error("Invalid donation quantity: {0} ml")]
    InvalidQuantity(f64),

    #[error("Donation {0} is not available")]
    DonationUnavailable(u64),

    #[error("Donation {id} has {quantity_ml} ml, below the volume of a single bag")]
    InsufficientVolume { id: u64, quantity_ml: f64 },

    #[error("Not enough {blood_type} stock: requested {requested} bags, {available} available")]
    InsufficientStock {
        blood_type: BloodType,
        requested: u32,
        available: u32,
    },

    #[error("{blood_type} stock cannot hold {bags} more bag(s)")]
    StockOverflow { blood_type: BloodType, bags: f64 },

    #[error("Donation {id} donated on {donated_on} has no representable validity date")]
    ValidityOutOfRange { id: u64, donated_on: NaiveDate },

    #[error("Donation {donation_id} references unknown donor {donor_id}")]
    UnknownDonor { donation_id: u64, donor_id: u64 },

    #[error("No donor with document {0}")]
    DocumentNotFound(String),

    #[error("Unrecognized registry file: {0}")]
    UnrecognizedRegistry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type Result<T> = std::result::Result<T, BloodBankError>;
