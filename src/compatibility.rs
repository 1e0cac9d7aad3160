//! Blood-type compatibility classification.
//!
//! The recipient -> accepted donors table is defined once in
//! [`accepted_donors`]; every other query (single pair, selection table,
//! full matrix) is derived from it.

use crate::error::Result;
use crate::types::{BloodType, CompatibilityEntry, PairVerdict, SelectionRow};

use crate::types::BloodType::*;

/// Donor types a recipient may safely receive, in canonical order
pub fn accepted_donors(recipient: BloodType) -> &'static [BloodType] {
    match recipient {
        APos => &[APos, ANeg, OPos, ONeg],
        ANeg => &[ANeg, ONeg],
        BPos => &[BPos, BNeg, OPos, ONeg],
        BNeg => &[BNeg, ONeg],
        // Universal recipient
        AbPos => &BloodType::ALL,
        AbNeg => &[ANeg, BNeg, AbNeg, ONeg],
        OPos => &[OPos, ONeg],
        ONeg => &[ONeg],
    }
}

/// True iff `donor` blood may be transfused into `recipient`
pub fn is_compatible(donor: BloodType, recipient: BloodType) -> bool {
    accepted_donors(recipient).contains(&donor)
}

/// String-facing variant of [`is_compatible`].
///
/// Unknown input is an `InvalidBloodType` error rather than a silent
/// "incompatible".
pub fn check_compatibility(donor: &str, recipient: &str) -> Result<bool> {
    let donor: BloodType = donor.parse()?;
    let recipient: BloodType = recipient.parse()?;
    Ok(is_compatible(donor, recipient))
}

/// Recipient types that may receive from `donor`, in canonical order
pub fn compatible_recipients(donor: BloodType) -> Vec<BloodType> {
    BloodType::ALL
        .into_iter()
        .filter(|&recipient| is_compatible(donor, recipient))
        .collect()
}

pub fn evaluate_pair(donor: BloodType, recipient: BloodType) -> PairVerdict {
    PairVerdict {
        donor,
        recipient,
        compatible: is_compatible(donor, recipient),
    }
}

/// For every blood type: can it receive from `donor`, can it donate to `recipient`
pub fn selection_table(donor: BloodType, recipient: BloodType) -> Vec<SelectionRow> {
    BloodType::ALL
        .into_iter()
        .map(|blood_type| SelectionRow {
            blood_type,
            receives_from_donor: is_compatible(donor, blood_type),
            donates_to_recipient: is_compatible(blood_type, recipient),
        })
        .collect()
}

/// Full 8x8 grid, donor-major: rows are donors, columns are recipients.
pub fn build_compatibility_matrix() -> Vec<CompatibilityEntry> {
    BloodType::ALL
        .into_iter()
        .flat_map(|donor| {
            BloodType::ALL
                .into_iter()
                .map(move |recipient| CompatibilityEntry {
                    donor,
                    recipient,
                    compatible: is_compatible(donor, recipient),
                })
        })
        .collect()
}
