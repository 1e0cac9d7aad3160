use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{BloodBankError, Result};

/// ABO/Rh blood type
///
/// Variants are declared in the canonical display order, so the derived
/// `Ord` sorts maps and tables the same way the reference grid does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodType {
    APos,
    ANeg,
    BPos,
    BNeg,
    AbPos,
    AbNeg,
    OPos,
    ONeg,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APos,
        BloodType::ANeg,
        BloodType::BPos,
        BloodType::BNeg,
        BloodType::AbPos,
        BloodType::AbNeg,
        BloodType::OPos,
        BloodType::ONeg,
    ];

    /// Canonical code, e.g. `AB_NEG`
    pub fn code(&self) -> &'static str {
        match self {
            BloodType::APos => "A_POS",
            BloodType::ANeg => "A_NEG",
            BloodType::BPos => "B_POS",
            BloodType::BNeg => "B_NEG",
            BloodType::AbPos => "AB_POS",
            BloodType::AbNeg => "AB_NEG",
            BloodType::OPos => "O_POS",
            BloodType::ONeg => "O_NEG",
        }
    }

    /// Clinical symbol, e.g. `AB-`
    pub fn symbol(&self) -> &'static str {
        match self {
            BloodType::APos => "A+",
            BloodType::ANeg => "A-",
            BloodType::BPos => "B+",
            BloodType::BNeg => "B-",
            BloodType::AbPos => "AB+",
            BloodType::AbNeg => "AB-",
            BloodType::OPos => "O+",
            BloodType::ONeg => "O-",
        }
    }

    pub fn is_rh_positive(&self) -> bool {
        matches!(
            self,
            BloodType::APos | BloodType::BPos | BloodType::AbPos | BloodType::OPos
        )
    }
}

impl FromStr for BloodType {
    type Err = BloodBankError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        BloodType::ALL
            .into_iter()
            .find(|t| t.code().eq_ignore_ascii_case(wanted) || t.symbol().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| BloodBankError::InvalidBloodType(s.to_string()))
    }
}

impl TryFrom<String> for BloodType {
    type Error = BloodBankError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BloodType> for String {
    fn from(value: BloodType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One cell of the donor x recipient grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityEntry {
    pub donor: BloodType,
    pub recipient: BloodType,
    pub compatible: bool,
}

/// Verdict for a single selected donor/recipient pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairVerdict {
    pub donor: BloodType,
    pub recipient: BloodType,
    pub compatible: bool,
}

impl PairVerdict {
    pub fn message(&self) -> &'static str {
        if self.compatible {
            "COMPATIBLE - the donation can proceed"
        } else {
            "INCOMPATIBLE - the donation is not safe"
        }
    }
}

/// Row of the selection table: how one blood type relates to the selected pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRow {
    pub blood_type: BloodType,
    /// Whether this type may receive blood from the selected donor
    pub receives_from_donor: bool,
    /// Whether this type may donate to the selected recipient
    pub donates_to_recipient: bool,
}

/// Registered donor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donor {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub blood_type: Option<BloodType>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl Donor {
    pub fn location(&self) -> String {
        match (&self.city, &self.state) {
            (Some(city), Some(state)) => format!("{}/{}", city, state),
            (Some(city), None) => city.clone(),
            (None, Some(state)) => state.clone(),
            (None, None) => "Location not provided".to_string(),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DonationStatus {
    #[default]
    Available,
    Used,
    Expired,
}

/// A single collected donation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Donation {
    pub id: u64,
    pub donor_id: u64,
    pub blood_type: BloodType,
    pub quantity_ml: f64,
    pub donated_on: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: DonationStatus,
}

/// An empty status cell means the same as a missing one
fn status_or_default<'de, D>(deserializer: D) -> std::result::Result<DonationStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<DonationStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// `donated_on` plus the shelf life, `None` when the date is out of range
pub fn expiry_date(donated_on: NaiveDate, shelf_life_days: i64) -> Option<NaiveDate> {
    let days = u64::try_from(shelf_life_days).ok()?;
    donated_on.checked_add_days(Days::new(days))
}

impl Donation {
    pub fn new(
        id: u64,
        donor_id: u64,
        blood_type: BloodType,
        quantity_ml: f64,
        donated_on: NaiveDate,
        shelf_life_days: i64,
    ) -> Self {
        Self {
            id,
            donor_id,
            blood_type,
            quantity_ml,
            donated_on,
            valid_until: expiry_date(donated_on, shelf_life_days),
            status: DonationStatus::Available,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.quantity_ml.is_finite() || self.quantity_ml <= 0.0 {
            return Err(BloodBankError::InvalidQuantity(self.quantity_ml));
        }
        Ok(())
    }

    /// Fill in `valid_until` from the shelf life when the record has none
    pub fn apply_shelf_life(&mut self, shelf_life_days: i64) -> Result<()> {
        if self.valid_until.is_none() {
            let valid_until = expiry_date(self.donated_on, shelf_life_days).ok_or(
                BloodBankError::ValidityOutOfRange {
                    id: self.id,
                    donated_on: self.donated_on,
                },
            )?;
            self.valid_until = Some(valid_until);
        }
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.status == DonationStatus::Available
    }
}

/// Stock held for one blood type, counted in bags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    pub blood_type: BloodType,
    pub bags: u32,
    pub minimum_bags: u32,
    pub updated_on: NaiveDate,
}

impl StockLevel {
    pub fn is_low(&self) -> bool {
        self.bags <= self.minimum_bags
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockSituation {
    Normal,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub low_stock: Vec<BloodType>,
    pub types_in_alert: usize,
    pub total_bags: u64,
    pub situation: StockSituation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStatistics {
    pub total_bags: u64,
    pub total_donations: usize,
    pub available_donations: usize,
    pub available_by_type: BTreeMap<BloodType, usize>,
}
