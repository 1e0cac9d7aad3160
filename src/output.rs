use chrono::{DateTime, Local};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use serde_json::to_string_pretty;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::compatibility::{build_compatibility_matrix, evaluate_pair, selection_table};
use crate::error::Result;
use crate::inventory::Inventory;
use crate::types::*;

/// Supported report formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    Tsv,
    #[default]
    Json,
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    pub levels: BTreeMap<BloodType, u32>,
    pub alert: StockAlert,
    pub statistics: InventoryStatistics,
}

/// Everything a report run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompatibilityReport {
    pub generated_at: DateTime<Local>,
    pub pair: Option<PairVerdict>,
    pub selection: Vec<SelectionRow>,
    pub matrix: Vec<CompatibilityEntry>,
    pub compatible_donors: Vec<Donor>,
    pub stock: Option<StockReport>,
}

impl CompatibilityReport {
    pub fn new() -> Self {
        Self {
            generated_at: Local::now(),
            pair: None,
            selection: Vec::new(),
            matrix: build_compatibility_matrix(),
            compatible_donors: Vec::new(),
            stock: None,
        }
    }

    pub fn with_pair(mut self, donor: BloodType, recipient: BloodType) -> Self {
        self.pair = Some(evaluate_pair(donor, recipient));
        self.selection = selection_table(donor, recipient);
        self
    }

    pub fn with_donors(mut self, donors: Vec<Donor>) -> Self {
        self.compatible_donors = donors;
        self
    }

    pub fn with_stock(mut self, inventory: &Inventory, donations: &[Donation]) -> Self {
        self.stock = Some(StockReport {
            levels: inventory.stock_by_type(),
            alert: inventory.alerts(),
            statistics: inventory.statistics(donations),
        });
        self
    }
}

impl Default for CompatibilityReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes reports into an output directory
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: &Path) -> Result<Self> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Generate reports in the requested format(s), returning the files written
    pub fn generate(
        &self,
        report: &CompatibilityReport,
        format: ReportFormat,
    ) -> Result<Vec<PathBuf>> {
        let timestamp = report.generated_at.format("%Y-%m-%d_%H-%M-%S").to_string();
        let mut written = Vec::new();

        match format {
            ReportFormat::Csv => self.generate_delimited(report, &timestamp, b',', "csv", &mut written)?,
            ReportFormat::Tsv => self.generate_delimited(report, &timestamp, b'\t', "tsv", &mut written)?,
            ReportFormat::Json => written.push(self.generate_json(report, &timestamp)?),
            ReportFormat::All => {
                self.generate_delimited(report, &timestamp, b',', "csv", &mut written)?;
                self.generate_delimited(report, &timestamp, b'\t', "tsv", &mut written)?;
                written.push(self.generate_json(report, &timestamp)?);
            }
        }

        info!(
            "Wrote {} report file(s) to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    fn report_path(&self, name: &str, timestamp: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", name, timestamp, extension))
    }

    fn generate_json(&self, report: &CompatibilityReport, timestamp: &str) -> Result<PathBuf> {
        let path = self.report_path("report", timestamp, "json");
        fs::write(&path, to_string_pretty(report)?)?;
        Ok(path)
    }

    fn generate_delimited(
        &self,
        report: &CompatibilityReport,
        timestamp: &str,
        delimiter: u8,
        extension: &str,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let path = self.report_path("compatibility_matrix", timestamp, extension);
        self.write_matrix(&report.matrix, &path, delimiter)?;
        written.push(path);

        if let Some(pair) = &report.pair {
            let path = self.report_path("selection", timestamp, extension);
            self.write_selection(pair, &report.selection, &path, delimiter)?;
            written.push(path);
        }

        if !report.compatible_donors.is_empty() {
            let path = self.report_path("compatible_donors", timestamp, extension);
            self.write_donors(&report.compatible_donors, &path, delimiter)?;
            written.push(path);
        }

        if let Some(stock) = &report.stock {
            let path = self.report_path("stock", timestamp, extension);
            self.write_stock(stock, &path, delimiter)?;
            written.push(path);
        }

        Ok(())
    }

    fn write_matrix(&self, matrix: &[CompatibilityEntry], path: &Path, delimiter: u8) -> Result<()> {
        let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;

        wtr.write_record(["donor", "recipient", "compatible"])?;
        for entry in matrix {
            wtr.write_record([
                entry.donor.code(),
                entry.recipient.code(),
                if entry.compatible { "true" } else { "false" },
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn write_selection(
        &self,
        pair: &PairVerdict,
        rows: &[SelectionRow],
        path: &Path,
        delimiter: u8,
    ) -> Result<()> {
        let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;

        let receives_header = format!("receives_from_{}", pair.donor.code().to_lowercase());
        let donates_header = format!("donates_to_{}", pair.recipient.code().to_lowercase());
        wtr.write_record(["blood_type", receives_header.as_str(), donates_header.as_str()])?;

        for row in rows {
            wtr.write_record([
                row.blood_type.code(),
                if row.receives_from_donor { "true" } else { "false" },
                if row.donates_to_recipient { "true" } else { "false" },
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn write_donors(&self, donors: &[Donor], path: &Path, delimiter: u8) -> Result<()> {
        let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;

        wtr.write_record(["id", "name", "blood_type", "location"])?;
        for donor in donors {
            wtr.write_record([
                donor.id.to_string(),
                donor.name.clone(),
                donor.blood_type.map(|t| t.code().to_string()).unwrap_or_default(),
                donor.location(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn write_stock(&self, stock: &StockReport, path: &Path, delimiter: u8) -> Result<()> {
        let mut wtr = WriterBuilder::new().delimiter(delimiter).from_path(path)?;

        wtr.write_record(["blood_type", "bags", "available_donations", "low_stock"])?;
        for (blood_type, bags) in &stock.levels {
            let available = stock
                .statistics
                .available_by_type
                .get(blood_type)
                .copied()
                .unwrap_or(0);
            let low = stock.alert.low_stock.contains(blood_type);

            wtr.write_record([
                blood_type.code().to_string(),
                bags.to_string(),
                available.to_string(),
                low.to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}
