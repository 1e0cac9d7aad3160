use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

use crate::error::{BloodBankError, Result};
use crate::parsers::{open_file, ParsedRegistry, RegistryDataParser};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Donors,
    Donations,
}

/// CSV parser for donor and donation registries.
///
/// The header row decides what a file holds: a `quantity_ml` column means
/// donations, otherwise a `name` column means donors.
pub struct CsvRegistryParser;

impl CsvRegistryParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<ParsedRegistry> {
        let reader = open_file(path)?;
        let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let headers: StringRecord = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let kind = self
            .detect_kind(&headers)
            .ok_or_else(|| BloodBankError::UnrecognizedRegistry(path.display().to_string()))?;
        rdr.set_headers(headers);

        let mut registry = ParsedRegistry::new(path.to_string_lossy());

        match kind {
            RecordKind::Donors => {
                for record in rdr.deserialize::<Donor>() {
                    registry.donors.push(record?);
                }
            }
            RecordKind::Donations => {
                for record in rdr.deserialize::<Donation>() {
                    registry.donations.push(record?);
                }
            }
        }

        Ok(registry)
    }

    fn detect_kind(&self, headers: &StringRecord) -> Option<RecordKind> {
        let has = |column: &str| headers.iter().any(|h| h == column);

        if has("quantity_ml") {
            Some(RecordKind::Donations)
        } else if has("name") {
            Some(RecordKind::Donors)
        } else {
            None
        }
    }
}

impl Default for CsvRegistryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryDataParser for CsvRegistryParser {
    fn parse(&self, path: &Path) -> Result<ParsedRegistry> {
        self.parse(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_parse_donor_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("donors.csv");
        std::fs::write(
            &path,
            "ID, Name, Blood_Type, City, State\n\
             1, Ana Souza, A-, Curitiba, PR\n\
             2, Rafael Dias, ,,\n\
             3, Beatriz Alves, AB_POS, Recife, PE\n",
        )?;

        let registry = CsvRegistryParser::new().parse(&path)?;
        assert_eq!(registry.donors.len(), 3);
        assert!(registry.donations.is_empty());

        assert_eq!(registry.donors[0].blood_type, Some(BloodType::ANeg));
        assert_eq!(registry.donors[0].location(), "Curitiba/PR");
        assert_eq!(registry.donors[1].blood_type, None);
        assert_eq!(registry.donors[1].city, None);
        assert_eq!(registry.donors[2].blood_type, Some(BloodType::AbPos));
        Ok(())
    }

    #[test]
    fn test_parse_donation_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("donations.csv");
        std::fs::write(
            &path,
            "id,donor_id,blood_type,quantity_ml,donated_on,valid_until,status\n\
             1,7,O+,450,2024-02-01,2024-03-01,AVAILABLE\n\
             2,8,B-,500.5,2024-02-03,,USED\n",
        )?;

        let registry = CsvRegistryParser::new().parse(&path)?;
        assert_eq!(registry.donations.len(), 2);

        let first = &registry.donations[0];
        assert_eq!(first.blood_type, BloodType::OPos);
        assert_eq!(first.valid_until, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(first.status, DonationStatus::Available);

        let second = &registry.donations[1];
        assert_eq!(second.quantity_ml, 500.5);
        assert_eq!(second.valid_until, None);
        assert_eq!(second.status, DonationStatus::Used);
        Ok(())
    }

    #[test]
    fn test_empty_status_cell_means_available() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("donations.csv");
        std::fs::write(
            &path,
            "id,donor_id,blood_type,quantity_ml,donated_on,valid_until,status\n\
             1,7,O+,450,2024-02-01,,\n\
             2,7,O+,450,2024-02-02,, \n\
             3,8,A-,450,2024-02-03,,EXPIRED\n",
        )?;

        let registry = CsvRegistryParser::new().parse(&path)?;
        let statuses: Vec<DonationStatus> = registry.donations.iter().map(|d| d.status).collect();
        assert_eq!(
            statuses,
            vec![
                DonationStatus::Available,
                DonationStatus::Available,
                DonationStatus::Expired
            ]
        );
        Ok(())
    }

    #[test]
    fn test_invalid_blood_type_fails_the_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("donors.csv");
        std::fs::write(&path, "id,name,blood_type\n1,Ana,Q+\n")?;

        let result = CsvRegistryParser::new().parse(&path);
        assert!(matches!(result, Err(BloodBankError::Csv(_))));
        Ok(())
    }

    #[test]
    fn test_unknown_header_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("stock.csv");
        std::fs::write(&path, "blood_type,bags\nA+,3\n")?;

        let result = CsvRegistryParser::new().parse(&path);
        assert!(matches!(result, Err(BloodBankError::UnrecognizedRegistry(_))));
        Ok(())
    }
}
