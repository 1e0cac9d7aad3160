use blood_compatibility::{
    compatibility::*, discovery::RegistryDiscovery, inventory::*, matching::DonorMatcher,
    output::*, parsers::RegistryParser, types::*,
};
use chrono::NaiveDate;
use std::fs;
use tempfile::TempDir;

fn write_registry(dir: &std::path::Path) {
    fs::write(
        dir.join("donors.csv"),
        "id,name,blood_type,city,state\n\
         1,Ana Souza,A-,Curitiba,PR\n\
         2,Bruno Castro,AB+,Salvador,BA\n\
         3,Clara Reis,O-,Manaus,AM\n\
         4,Diego Faria,,Recife,PE\n",
    )
    .unwrap();

    let nested = dir.join("2024");
    fs::create_dir(&nested).unwrap();
    fs::write(
        nested.join("donations.json"),
        r#"{
            "donations": [
                { "id": 10, "donor_id": 1, "blood_type": "A_NEG", "quantity_ml": 450,
                  "donated_on": "2024-05-01" },
                { "id": 11, "donor_id": 3, "blood_type": "O_NEG", "quantity_ml": 900,
                  "donated_on": "2024-05-20" },
                { "id": 12, "donor_id": 3, "blood_type": "O_NEG", "quantity_ml": 450,
                  "donated_on": "2024-01-02" },
                { "id": 13, "donor_id": 2, "blood_type": "AB_POS", "quantity_ml": 150,
                  "donated_on": "2024-05-25" }
            ]
        }"#,
    )
    .unwrap();
}

#[test]
fn test_registry_to_stock_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    write_registry(temp_dir.path());

    let files = RegistryDiscovery::new(true)
        .discover(&[temp_dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(files.len(), 2);

    let mut registry = RegistryParser::new(DEFAULT_SHELF_LIFE_DAYS).parse_many(&files);
    assert_eq!(registry.donors.len(), 4);
    assert_eq!(registry.donations.len(), 4);

    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    assert_eq!(expire_donations(&mut registry.donations, today), 1);

    let mut inventory = Inventory::new(InventorySettings {
        minimum_bags: 1,
        ..InventorySettings::default()
    });
    let mut rejected = Vec::new();
    for donation in registry.donations.iter_mut().filter(|d| d.is_available()) {
        if inventory.add_donation(donation, today).is_err() {
            rejected.push(donation.id);
        }
    }
    assert_eq!(rejected, vec![13]);

    let stock = inventory.stock_by_type();
    assert_eq!(stock[&BloodType::ANeg], 1);
    assert_eq!(stock[&BloodType::ONeg], 2);
    assert_eq!(inventory.total_bags(), 3);

    let alert = inventory.alerts();
    assert_eq!(alert.low_stock, vec![BloodType::ANeg]);
    assert_eq!(alert.situation, StockSituation::Alert);

    let stats = inventory.statistics(&registry.donations);
    assert_eq!(stats.total_donations, 4);
    assert_eq!(stats.available_donations, 1);
    assert_eq!(stats.available_by_type[&BloodType::AbPos], 1);
}

#[test]
fn test_matching_from_registry_files() {
    let temp_dir = TempDir::new().unwrap();
    write_registry(temp_dir.path());

    let registry = RegistryParser::default().parse(&temp_dir.path().join("donors.csv")).unwrap();

    let for_a_pos: Vec<u64> = DonorMatcher::new(BloodType::APos)
        .find(&registry.donors)
        .iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(for_a_pos, vec![1, 3]);

    let for_o_neg = DonorMatcher::new(BloodType::ONeg).find(&registry.donors);
    assert_eq!(for_o_neg.len(), 1);
    assert_eq!(for_o_neg[0].name, "Clara Reis");
}

#[test]
fn test_report_generation() {
    let temp_dir = TempDir::new().unwrap();
    let generator = ReportGenerator::new(&temp_dir.path().join("out")).unwrap();

    let report = CompatibilityReport::new().with_pair(BloodType::BPos, BloodType::AbNeg);
    assert_eq!(report.pair.map(|p| p.compatible), Some(false));

    let files = generator.generate(&report, ReportFormat::Csv).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.exists()));
}

#[test]
fn test_string_boundary_rejects_unknown_types() {
    assert!(check_compatibility("O-", "AB+").unwrap());
    assert!(!check_compatibility("AB-", "O-").unwrap());
    assert!(matches!(
        check_compatibility("O", "AB+"),
        Err(blood_compatibility::BloodBankError::InvalidBloodType(_))
    ));
}
