use rayon::prelude::*;

use crate::compatibility::{accepted_donors, is_compatible};
use crate::error::{BloodBankError, Result};
use crate::types::*;

/// Finds donors and stocked donations usable for a given recipient type
pub struct DonorMatcher {
    recipient: BloodType,
}

impl DonorMatcher {
    pub fn new(recipient: BloodType) -> Self {
        Self { recipient }
    }

    pub fn recipient(&self) -> BloodType {
        self.recipient
    }

    /// Blood types this matcher will accept
    pub fn accepted_types(&self) -> &'static [BloodType] {
        accepted_donors(self.recipient)
    }

    /// Donors whose blood type the recipient accepts, in registry order.
    /// Donors without a recorded blood type never match.
    pub fn find(&self, donors: &[Donor]) -> Vec<Donor> {
        donors
            .par_iter()
            .filter(|donor| {
                donor
                    .blood_type
                    .map(|t| is_compatible(t, self.recipient))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Available donations of an accepted blood type
    pub fn available_units(&self, donations: &[Donation]) -> Vec<Donation> {
        donations
            .par_iter()
            .filter(|d| d.is_available() && is_compatible(d.blood_type, self.recipient))
            .cloned()
            .collect()
    }
}

/// Case-insensitive substring search on donor names
pub fn find_by_name(donors: &[Donor], fragment: &str) -> Vec<Donor> {
    let needle = fragment.trim().to_lowercase();
    donors
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn find_by_blood_type(donors: &[Donor], blood_type: &str) -> Result<Vec<Donor>> {
    let wanted: BloodType = blood_type.parse()?;
    Ok(donors
        .iter()
        .filter(|d| d.blood_type == Some(wanted))
        .cloned()
        .collect())
}

/// Donations given by one donor, in registry order
pub fn donations_for_donor(donations: &[Donation], donor_id: u64) -> Vec<Donation> {
    donations
        .iter()
        .filter(|d| d.donor_id == donor_id)
        .cloned()
        .collect()
}

/// Donations of the donor holding `document`.
///
/// Fails with `DocumentNotFound` when no donor carries that document.
pub fn donations_for_document(
    donors: &[Donor],
    donations: &[Donation],
    document: &str,
) -> Result<Vec<Donation>> {
    let wanted = document.trim();
    let donor = donors
        .iter()
        .find(|d| d.document.as_deref().map(str::trim) == Some(wanted))
        .ok_or_else(|| BloodBankError::DocumentNotFound(wanted.to_string()))?;

    Ok(donations_for_donor(donations, donor.id))
}

/// Available donations of exactly `blood_type`
pub fn available_of_type(donations: &[Donation], blood_type: BloodType) -> Vec<Donation> {
    donations
        .iter()
        .filter(|d| d.is_available() && d.blood_type == blood_type)
        .cloned()
        .collect()
}

pub fn donations_by_status(donations: &[Donation], status: DonationStatus) -> Vec<Donation> {
    donations
        .iter()
        .filter(|d| d.status == status)
        .cloned()
        .collect()
}
