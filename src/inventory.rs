use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{BloodBankError, Result};
use crate::types::*;

/// Volume of one stock bag in millilitres
pub const BAG_VOLUME_ML: f64 = 450.0;
/// Stock at or below this many bags raises an alert
pub const DEFAULT_MINIMUM_BAGS: u32 = 10;
/// Days a donation stays usable after collection
pub const DEFAULT_SHELF_LIFE_DAYS: i64 = 42;
/// Longest configurable shelf life (frozen red cells keep for ten years)
pub const MAX_SHELF_LIFE_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub bag_volume_ml: f64,
    pub minimum_bags: u32,
    pub shelf_life_days: i64,
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            bag_volume_ml: BAG_VOLUME_ML,
            minimum_bags: DEFAULT_MINIMUM_BAGS,
            shelf_life_days: DEFAULT_SHELF_LIFE_DAYS,
        }
    }
}

/// Number of whole bags a volume fills, rounding half away from zero.
///
/// `None` when the volume is too large to count in bags.
pub fn bags_for_volume(quantity_ml: f64, bag_volume_ml: f64) -> Option<u32> {
    let bags = (quantity_ml / bag_volume_ml).round().max(0.0);
    (bags <= f64::from(u32::MAX)).then_some(bags as u32)
}

/// In-memory blood stock, one level per blood type that has ever been stocked
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    settings: InventorySettings,
    levels: BTreeMap<BloodType, StockLevel>,
}

impl Inventory {
    pub fn new(settings: InventorySettings) -> Self {
        Self {
            settings,
            levels: BTreeMap::new(),
        }
    }

    pub fn settings(&self) -> &InventorySettings {
        &self.settings
    }

    pub fn level(&self, blood_type: BloodType) -> Option<&StockLevel> {
        self.levels.get(&blood_type)
    }

    pub fn levels(&self) -> impl Iterator<Item = &StockLevel> {
        self.levels.values()
    }

    /// Convert an available donation into bags and mark it used.
    ///
    /// Returns the number of bags added.
    pub fn add_donation(&mut self, donation: &mut Donation, today: NaiveDate) -> Result<u32> {
        if !donation.is_available() {
            return Err(BloodBankError::DonationUnavailable(donation.id));
        }

        let bags = bags_for_volume(donation.quantity_ml, self.settings.bag_volume_ml).ok_or(
            BloodBankError::StockOverflow {
                blood_type: donation.blood_type,
                bags: (donation.quantity_ml / self.settings.bag_volume_ml).round(),
            },
        )?;
        if bags == 0 {
            return Err(BloodBankError::InsufficientVolume {
                id: donation.id,
                quantity_ml: donation.quantity_ml,
            });
        }

        let current = self.levels.get(&donation.blood_type).map(|l| l.bags).unwrap_or(0);
        let stocked = current
            .checked_add(bags)
            .ok_or(BloodBankError::StockOverflow {
                blood_type: donation.blood_type,
                bags: f64::from(bags),
            })?;

        let minimum_bags = self.settings.minimum_bags;
        let level = self
            .levels
            .entry(donation.blood_type)
            .or_insert_with(|| StockLevel {
                blood_type: donation.blood_type,
                bags: 0,
                minimum_bags,
                updated_on: today,
            });
        level.bags = stocked;
        level.updated_on = today;

        donation.status = DonationStatus::Used;

        debug!(
            "Donation {} added {} {} bag(s), stock now {}",
            donation.id, bags, donation.blood_type, level.bags
        );
        Ok(bags)
    }

    /// Remove bags from stock, returning what remains
    pub fn withdraw(&mut self, blood_type: BloodType, bags: u32, today: NaiveDate) -> Result<u32> {
        let available = self.levels.get(&blood_type).map(|l| l.bags).unwrap_or(0);

        match self.levels.get_mut(&blood_type) {
            Some(level) if level.bags >= bags => {
                level.bags -= bags;
                level.updated_on = today;
                Ok(level.bags)
            }
            _ => Err(BloodBankError::InsufficientStock {
                blood_type,
                requested: bags,
                available,
            }),
        }
    }

    /// Bags per blood type, covering all eight types
    pub fn stock_by_type(&self) -> BTreeMap<BloodType, u32> {
        BloodType::ALL
            .into_iter()
            .map(|t| (t, self.levels.get(&t).map(|l| l.bags).unwrap_or(0)))
            .collect()
    }

    /// Stocked types at or below their minimum
    pub fn low_stock_types(&self) -> Vec<BloodType> {
        self.levels
            .values()
            .filter(|l| l.is_low())
            .map(|l| l.blood_type)
            .collect()
    }

    pub fn total_bags(&self) -> u64 {
        self.levels.values().map(|l| u64::from(l.bags)).sum()
    }

    pub fn alerts(&self) -> StockAlert {
        let low_stock = self.low_stock_types();
        let situation = if low_stock.is_empty() {
            StockSituation::Normal
        } else {
            StockSituation::Alert
        };

        StockAlert {
            types_in_alert: low_stock.len(),
            low_stock,
            total_bags: self.total_bags(),
            situation,
        }
    }

    pub fn statistics(&self, donations: &[Donation]) -> InventoryStatistics {
        let mut available_by_type: BTreeMap<BloodType, usize> =
            BloodType::ALL.into_iter().map(|t| (t, 0)).collect();

        for donation in donations.iter().filter(|d| d.is_available()) {
            *available_by_type.entry(donation.blood_type).or_default() += 1;
        }

        InventoryStatistics {
            total_bags: self.total_bags(),
            total_donations: donations.len(),
            available_donations: available_by_type.values().sum(),
            available_by_type,
        }
    }
}

/// Mark available donations past their validity date as expired
pub fn expire_donations(donations: &mut [Donation], today: NaiveDate) -> usize {
    let mut expired = 0;

    for donation in donations.iter_mut() {
        let past_validity = donation.valid_until.map(|d| d < today).unwrap_or(false);
        if donation.is_available() && past_validity {
            donation.status = DonationStatus::Expired;
            expired += 1;
        }
    }

    if expired > 0 {
        info!("Expired {} donation(s) as of {}", expired, today);
    }
    expired
}

/// Summed volume of available donations per blood type
pub fn available_volume_by_type(donations: &[Donation]) -> BTreeMap<BloodType, f64> {
    let mut volumes: BTreeMap<BloodType, f64> =
        BloodType::ALL.into_iter().map(|t| (t, 0.0)).collect();

    for donation in donations.iter().filter(|d| d.is_available()) {
        *volumes.entry(donation.blood_type).or_default() += donation.quantity_ml;
    }

    volumes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn donation(id: u64, blood_type: BloodType, quantity_ml: f64) -> Donation {
        Donation::new(id, 100 + id, blood_type, quantity_ml, day(1), DEFAULT_SHELF_LIFE_DAYS)
    }

    #[test]
    fn test_bags_for_volume() {
        assert_eq!(bags_for_volume(450.0, BAG_VOLUME_ML), Some(1));
        assert_eq!(bags_for_volume(224.0, BAG_VOLUME_ML), Some(0));
        assert_eq!(bags_for_volume(225.0, BAG_VOLUME_ML), Some(1));
        assert_eq!(bags_for_volume(900.0, BAG_VOLUME_ML), Some(2));
        assert_eq!(bags_for_volume(1100.0, BAG_VOLUME_ML), Some(2));
        assert_eq!(bags_for_volume(1.0e13, BAG_VOLUME_ML), None);
    }

    #[test]
    fn test_oversized_donations_do_not_overflow_stock() {
        let mut inventory = Inventory::default();

        let mut huge = donation(1, BloodType::ONeg, 1.0e13);
        assert!(matches!(
            inventory.add_donation(&mut huge, day(2)),
            Err(BloodBankError::StockOverflow { blood_type: BloodType::ONeg, .. })
        ));
        assert_eq!(huge.status, DonationStatus::Available);
        assert!(inventory.level(BloodType::ONeg).is_none());

        let near_max = f64::from(u32::MAX) * BAG_VOLUME_ML;
        let mut first = donation(2, BloodType::ONeg, near_max);
        assert_eq!(inventory.add_donation(&mut first, day(2)).unwrap(), u32::MAX);

        let mut second = donation(3, BloodType::ONeg, 450.0);
        assert!(matches!(
            inventory.add_donation(&mut second, day(3)),
            Err(BloodBankError::StockOverflow { .. })
        ));
        assert_eq!(second.status, DonationStatus::Available);
        assert_eq!(inventory.level(BloodType::ONeg).unwrap().bags, u32::MAX);

        let mut other = donation(4, BloodType::APos, near_max);
        inventory.add_donation(&mut other, day(3)).unwrap();
        assert_eq!(inventory.total_bags(), 2 * u64::from(u32::MAX));
    }

    #[test]
    fn test_add_donation_updates_stock_and_status() {
        let mut inventory = Inventory::default();
        let mut first = donation(1, BloodType::ONeg, 450.0);
        let mut second = donation(2, BloodType::ONeg, 900.0);

        assert_eq!(inventory.add_donation(&mut first, day(2)).unwrap(), 1);
        assert_eq!(inventory.add_donation(&mut second, day(3)).unwrap(), 2);

        let level = inventory.level(BloodType::ONeg).unwrap();
        assert_eq!(level.bags, 3);
        assert_eq!(level.minimum_bags, DEFAULT_MINIMUM_BAGS);
        assert_eq!(level.updated_on, day(3));
        assert_eq!(first.status, DonationStatus::Used);
        assert_eq!(second.status, DonationStatus::Used);
    }

    #[test]
    fn test_add_donation_rejects_used_and_small_donations() {
        let mut inventory = Inventory::default();

        let mut used = donation(1, BloodType::APos, 450.0);
        used.status = DonationStatus::Used;
        assert!(matches!(
            inventory.add_donation(&mut used, day(2)),
            Err(BloodBankError::DonationUnavailable(1))
        ));

        let mut small = donation(2, BloodType::APos, 200.0);
        assert!(matches!(
            inventory.add_donation(&mut small, day(2)),
            Err(BloodBankError::InsufficientVolume { id: 2, .. })
        ));
        assert_eq!(small.status, DonationStatus::Available);
        assert!(inventory.level(BloodType::APos).is_none());
    }

    #[test]
    fn test_withdraw() {
        let mut inventory = Inventory::default();
        let mut unit = donation(1, BloodType::BNeg, 1350.0);
        inventory.add_donation(&mut unit, day(2)).unwrap();

        assert_eq!(inventory.withdraw(BloodType::BNeg, 2, day(4)).unwrap(), 1);
        assert!(matches!(
            inventory.withdraw(BloodType::BNeg, 5, day(4)),
            Err(BloodBankError::InsufficientStock { requested: 5, available: 1, .. })
        ));
        assert!(matches!(
            inventory.withdraw(BloodType::AbNeg, 1, day(4)),
            Err(BloodBankError::InsufficientStock { available: 0, .. })
        ));
    }

    #[test]
    fn test_stock_by_type_covers_all_types() {
        let mut inventory = Inventory::default();
        let mut unit = donation(1, BloodType::AbPos, 450.0);
        inventory.add_donation(&mut unit, day(2)).unwrap();

        let stock = inventory.stock_by_type();
        assert_eq!(stock.len(), 8);
        assert_eq!(stock[&BloodType::AbPos], 1);
        assert_eq!(stock[&BloodType::ONeg], 0);
        assert_eq!(inventory.total_bags(), 1);
    }

    #[test]
    fn test_alerts() {
        let settings = InventorySettings {
            minimum_bags: 2,
            ..InventorySettings::default()
        };
        let mut inventory = Inventory::new(settings);
        assert_eq!(inventory.alerts().situation, StockSituation::Normal);

        let mut plenty = donation(1, BloodType::OPos, 1800.0);
        let mut scarce = donation(2, BloodType::ANeg, 450.0);
        inventory.add_donation(&mut plenty, day(2)).unwrap();
        inventory.add_donation(&mut scarce, day(2)).unwrap();

        let alert = inventory.alerts();
        assert_eq!(alert.low_stock, vec![BloodType::ANeg]);
        assert_eq!(alert.types_in_alert, 1);
        assert_eq!(alert.total_bags, 5);
        assert_eq!(alert.situation, StockSituation::Alert);
    }

    #[test]
    fn test_expire_donations() {
        let mut donations = vec![
            donation(1, BloodType::APos, 450.0),
            donation(2, BloodType::APos, 450.0),
            donation(3, BloodType::APos, 450.0),
        ];
        donations[1].status = DonationStatus::Used;
        donations[2].valid_until = Some(day(20));

        // valid_until for the default donations is 2024-04-12
        let today = NaiveDate::from_ymd_opt(2024, 4, 12).unwrap();
        assert_eq!(expire_donations(&mut donations, today), 1);
        assert_eq!(donations[0].status, DonationStatus::Available);
        assert_eq!(donations[1].status, DonationStatus::Used);
        assert_eq!(donations[2].status, DonationStatus::Expired);

        let later = NaiveDate::from_ymd_opt(2024, 4, 13).unwrap();
        assert_eq!(expire_donations(&mut donations, later), 1);
        assert_eq!(donations[0].status, DonationStatus::Expired);
    }

    #[test]
    fn test_statistics_and_volumes() {
        let mut donations = vec![
            donation(1, BloodType::OPos, 450.0),
            donation(2, BloodType::OPos, 500.0),
            donation(3, BloodType::BPos, 450.0),
        ];
        let mut inventory = Inventory::default();
        inventory.add_donation(&mut donations[2], day(2)).unwrap();

        let stats = inventory.statistics(&donations);
        assert_eq!(stats.total_bags, 1);
        assert_eq!(stats.total_donations, 3);
        assert_eq!(stats.available_donations, 2);
        assert_eq!(stats.available_by_type[&BloodType::OPos], 2);
        assert_eq!(stats.available_by_type[&BloodType::BPos], 0);

        let volumes = available_volume_by_type(&donations);
        assert_eq!(volumes[&BloodType::OPos], 950.0);
        assert_eq!(volumes[&BloodType::BPos], 0.0);
    }
}
