use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::{generate, Shell};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blood_compatibility::compatibility::{
    accepted_donors, build_compatibility_matrix, compatible_recipients, evaluate_pair,
    selection_table,
};
use blood_compatibility::inventory::{expire_donations, Inventory, InventorySettings};
use blood_compatibility::matching::{
    available_of_type, donations_by_status, donations_for_document, donations_for_donor,
};
use blood_compatibility::{
    AppConfig, BloodType, CompatibilityReport, DonationStatus, DonorMatcher, ParsedRegistry,
    RegistryDiscovery, RegistryParser, ReportFormat, ReportGenerator, StockSituation,
};

/// Blood-type compatibility and stock toolkit for blood banks
#[derive(Parser, Debug)]
#[command(
    name = "blood-compat",
    version,
    about = "Blood-type compatibility checks, donor matching and stock reports",
    long_about = r#"
A blood bank toolkit for:
- Checking whether a donor blood type can be transfused into a recipient
- Printing the full 8x8 donor/recipient compatibility matrix
- Finding compatible donors in donor registry files
- Tracking blood stock, expired donations and low-stock alerts
- Exporting reports as CSV, TSV or JSON

Blood types are accepted as codes (A_POS, AB_NEG, ...) or symbols (A+, AB-, ...).
Registry files are CSV or JSON, optionally gzip-compressed.
"#
)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Configuration file (TOML)
    #[arg(
        long,
        global = true,
        env = "BLOOD_COMPAT_CONFIG",
        value_name = "FILE",
        value_hint = ValueHint::FilePath
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a single donor/recipient pair
    Check {
        /// Donor blood type
        donor: BloodType,
        /// Recipient blood type
        recipient: BloodType,
    },
    /// Print the full compatibility matrix
    Matrix,
    /// List the donor types a recipient accepts
    DonorsFor { recipient: BloodType },
    /// List the recipient types a donor can give to
    RecipientsFor { donor: BloodType },
    /// Find compatible donors in registry files
    Match {
        recipient: BloodType,
        /// Registry files or directories
        #[arg(required = true, num_args = 1.., value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
        /// Recursively search directories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Stock up available donations and show levels and alerts
    Stock {
        #[arg(required = true, num_args = 1.., value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        recursive: bool,
        /// Evaluate expiry as of this date (YYYY-MM-DD, default today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// List donations, filtered by donor, type or status
    Donations {
        #[arg(required = true, num_args = 1.., value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        recursive: bool,
        /// Only donations of this donor id
        #[arg(long, conflicts_with = "document")]
        donor_id: Option<u64>,
        /// Only donations of the donor holding this document
        #[arg(long)]
        document: Option<String>,
        /// Only available donations of exactly this blood type
        #[arg(long, conflicts_with = "status")]
        blood_type: Option<BloodType>,
        #[arg(long, value_enum)]
        status: Option<DonationStatus>,
        /// Evaluate expiry as of this date (YYYY-MM-DD, default today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Export compatibility, donor and stock reports
    Report {
        #[arg(num_args = 0.., value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        recursive: bool,
        /// Donor type of the pair verdict (needs --recipient)
        #[arg(long, requires = "recipient")]
        donor: Option<BloodType>,
        /// Recipient type of the pair verdict; also selects matched donors
        #[arg(long)]
        recipient: Option<BloodType>,
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Pick donor and recipient types from a list
    Interactive,
    /// List blood types
    Types,
    /// Generate shell completions
    Completions { shell: Shell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }

    init_thread_pool(config.threads)?;

    match cli.command {
        Commands::Check { donor, recipient } => print_pair(donor, recipient),
        Commands::Matrix => print_matrix(),
        Commands::DonorsFor { recipient } => {
            print_type_list(
                &format!("{} can receive from", recipient),
                accepted_donors(recipient),
            );
        }
        Commands::RecipientsFor { donor } => {
            print_type_list(
                &format!("{} can donate to", donor),
                &compatible_recipients(donor),
            );
        }
        Commands::Match {
            recipient,
            paths,
            recursive,
        } => run_match(&config, recipient, &paths, recursive)?,
        Commands::Stock {
            paths,
            recursive,
            today,
        } => run_stock(&config, &paths, recursive, today.unwrap_or_else(today_local))?,
        Commands::Donations {
            paths,
            recursive,
            donor_id,
            document,
            blood_type,
            status,
            today,
        } => {
            let filter = DonationFilter {
                donor_id,
                document,
                blood_type,
                status,
            };
            let today = today.unwrap_or_else(today_local);
            run_donations(&config, &paths, recursive, &filter, today)?;
        }
        Commands::Report {
            paths,
            recursive,
            donor,
            recipient,
            format,
            output,
            today,
        } => {
            let format = format.unwrap_or(config.output.format);
            let output = output.unwrap_or_else(|| config.output.dir.clone());
            let today = today.unwrap_or_else(today_local);
            run_report(&config, &paths, recursive, donor, recipient, format, output, today)?;
        }
        Commands::Interactive => run_interactive_mode()?,
        Commands::Types => list_types(),
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("blood_compatibility={0},blood_compat={0}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn init_thread_pool(threads: usize) -> Result<()> {
    let num_threads = if threads == 0 {
        num_cpus::get()
    } else {
        threads
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| anyhow::anyhow!("Failed to initialize thread pool: {}", e))?;

    Ok(())
}

fn list_types() {
    println!("{}", style("Blood Types:").bold().cyan());
    println!();

    for blood_type in BloodType::ALL {
        println!(
            "  {:<4} {}",
            style(blood_type.symbol()).green().bold(),
            style(blood_type.code()).yellow()
        );
    }
}

fn mark(ok: bool) -> console::StyledObject<&'static str> {
    if ok {
        style("✓").green()
    } else {
        style("✗").red()
    }
}

fn print_pair(donor: BloodType, recipient: BloodType) {
    let verdict = evaluate_pair(donor, recipient);
    let message = if verdict.compatible {
        style(verdict.message()).green().bold()
    } else {
        style(verdict.message()).red().bold()
    };

    println!("Donor: {}   Recipient: {}", style(donor).cyan(), style(recipient).cyan());
    println!("{}", message);
    println!();
    println!(
        "{:<6} {:^22} {:^22}",
        style("Type").bold(),
        style(format!("Receives from {}", donor)).bold(),
        style(format!("Donates to {}", recipient)).bold()
    );

    for row in selection_table(donor, recipient) {
        println!(
            "{:<6} {:^22} {:^22}",
            row.blood_type.symbol(),
            mark(row.receives_from_donor),
            mark(row.donates_to_recipient)
        );
    }
}

fn print_matrix() {
    println!("{}", style("Compatibility matrix (rows: donor, columns: recipient)").bold().cyan());
    println!();

    let mut header = format!("{:<5}", "");
    for recipient in BloodType::ALL {
        header.push_str(&format!("{:^5}", recipient.symbol()));
    }
    println!("{}", style(header).bold());

    let matrix = build_compatibility_matrix();
    for row in matrix.chunks(BloodType::ALL.len()) {
        print!("{:<5}", style(row[0].donor.symbol()).bold());
        for entry in row {
            print!("{:^5}", mark(entry.compatible));
        }
        println!();
    }
}

fn print_type_list(title: &str, types: &[BloodType]) {
    let symbols: Vec<&str> = types.iter().map(|t| t.symbol()).collect();
    println!("{}: {}", style(title).bold(), style(symbols.join(", ")).green());
}

fn load_registry(config: &AppConfig, paths: &[PathBuf], recursive: bool) -> Result<ParsedRegistry> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Discovering registry files...");
    let files = RegistryDiscovery::new(recursive).discover(paths)?;
    info!("Found {} registry file(s)", files.len());

    spinner.set_message(format!("Parsing {} registry file(s)...", files.len()));
    let parser = RegistryParser::new(config.inventory.shelf_life_days);
    let registry = parser.parse_many(&files);

    spinner.finish_and_clear();
    info!(
        "Loaded {} donor(s) and {} donation(s)",
        registry.donors.len(),
        registry.donations.len()
    );
    Ok(registry)
}

/// Expire stale donations, then move every available one into stock
fn build_inventory(
    settings: InventorySettings,
    registry: &mut ParsedRegistry,
    today: NaiveDate,
) -> Inventory {
    expire_donations(&mut registry.donations, today);

    let mut inventory = Inventory::new(settings);
    for donation in registry.donations.iter_mut().filter(|d| d.is_available()) {
        if let Err(e) = inventory.add_donation(donation, today) {
            warn!("Donation {} not stocked: {}", donation.id, e);
        }
    }
    inventory
}

fn run_match(
    config: &AppConfig,
    recipient: BloodType,
    paths: &[PathBuf],
    recursive: bool,
) -> Result<()> {
    let registry = load_registry(config, paths, recursive)?;
    let matcher = DonorMatcher::new(recipient);
    let donors = matcher.find(&registry.donors);

    print_type_list(&format!("{} accepts", recipient), matcher.accepted_types());
    println!();

    if donors.is_empty() {
        println!("{}", style("No compatible donors found").yellow());
        return Ok(());
    }

    println!(
        "{}",
        style(format!("{} compatible donor(s):", donors.len())).bold()
    );
    for donor in &donors {
        let blood_type = donor.blood_type.map(|t| t.symbol()).unwrap_or("?");
        println!(
            "  {:>5}  {:<4} {:<30} {}",
            donor.id,
            style(blood_type).green(),
            donor.name,
            style(donor.location()).dim()
        );
    }

    let units = matcher.available_units(&registry.donations);
    if !units.is_empty() {
        println!();
        println!("{} available compatible donation(s)", style(units.len()).bold());
    }

    Ok(())
}

fn run_stock(config: &AppConfig, paths: &[PathBuf], recursive: bool, today: NaiveDate) -> Result<()> {
    let mut registry = load_registry(config, paths, recursive)?;
    let inventory = build_inventory(config.inventory, &mut registry, today);
    let alert = inventory.alerts();
    let statistics = inventory.statistics(&registry.donations);

    println!("{}", style(format!("Blood stock as of {}", today)).bold().cyan());
    println!();
    for (blood_type, bags) in inventory.stock_by_type() {
        let line = format!("  {:<4} {:>5} bag(s)", blood_type.symbol(), bags);
        if alert.low_stock.contains(&blood_type) {
            println!("{} {}", style(line).red(), style("LOW").red().bold());
        } else {
            println!("{}", line);
        }
    }

    println!();
    println!("Total bags:          {}", statistics.total_bags);
    println!("Donations loaded:    {}", statistics.total_donations);
    println!("Still available:     {}", statistics.available_donations);

    let situation = match alert.situation {
        StockSituation::Normal => style("NORMAL").green().bold(),
        StockSituation::Alert => style("ALERT").red().bold(),
    };
    println!("Situation:           {} ({} type(s) low)", situation, alert.types_in_alert);

    Ok(())
}

#[derive(Debug)]
struct DonationFilter {
    donor_id: Option<u64>,
    document: Option<String>,
    blood_type: Option<BloodType>,
    status: Option<DonationStatus>,
}

fn run_donations(
    config: &AppConfig,
    paths: &[PathBuf],
    recursive: bool,
    filter: &DonationFilter,
    today: NaiveDate,
) -> Result<()> {
    let mut registry = load_registry(config, paths, recursive)?;
    expire_donations(&mut registry.donations, today);

    let mut donations = registry.donations.clone();
    if let Some(donor_id) = filter.donor_id {
        donations = donations_for_donor(&donations, donor_id);
    }
    if let Some(document) = &filter.document {
        donations = donations_for_document(&registry.donors, &donations, document)?;
    }
    if let Some(blood_type) = filter.blood_type {
        donations = available_of_type(&donations, blood_type);
    }
    if let Some(status) = filter.status {
        donations = donations_by_status(&donations, status);
    }

    if donations.is_empty() {
        println!("{}", style("No donations found").yellow());
        return Ok(());
    }

    println!("{}", style(format!("{} donation(s):", donations.len())).bold());
    for donation in &donations {
        let donor = registry
            .donor(donation.donor_id)
            .map(|d| d.name.as_str())
            .unwrap_or("-");
        let valid_until = donation
            .valid_until
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5}  {:<4} {:>7.0} ml  {}  until {}  {:<9} {}",
            donation.id,
            style(donation.blood_type.symbol()).green(),
            donation.quantity_ml,
            donation.donated_on,
            valid_until,
            format!("{:?}", donation.status),
            style(donor).dim()
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_report(
    config: &AppConfig,
    paths: &[PathBuf],
    recursive: bool,
    donor: Option<BloodType>,
    recipient: Option<BloodType>,
    format: ReportFormat,
    output: PathBuf,
    today: NaiveDate,
) -> Result<()> {
    let mut report = CompatibilityReport::new();

    if let (Some(donor), Some(recipient)) = (donor, recipient) {
        report = report.with_pair(donor, recipient);
    }

    if !paths.is_empty() {
        let mut registry = load_registry(config, paths, recursive)?;

        if let Some(recipient) = recipient {
            report = report.with_donors(DonorMatcher::new(recipient).find(&registry.donors));
        }

        if !registry.donations.is_empty() {
            let inventory = build_inventory(config.inventory, &mut registry, today);
            report = report.with_stock(&inventory, &registry.donations);
        }
    }

    let generator = ReportGenerator::new(&output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    let files = generator.generate(&report, format)?;

    println!(
        "\n{} {} report file(s) saved to: {}",
        style("✓").green().bold(),
        files.len(),
        style(output.display()).cyan()
    );

    Ok(())
}

fn run_interactive_mode() -> Result<()> {
    println!(
        "{}",
        style("╔══════════════════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║        Blood Compatibility Check - Interactive Mode          ║")
            .cyan()
            .bold()
    );
    println!(
        "{}",
        style("╚══════════════════════════════════════════════════════════════╝").cyan()
    );
    println!();

    let theme = ColorfulTheme::default();
    let labels: Vec<String> = BloodType::ALL
        .iter()
        .map(|t| format!("{:<4} ({})", t.symbol(), t.code()))
        .collect();

    loop {
        let donor_idx = Select::with_theme(&theme)
            .with_prompt("Donor blood type")
            .default(0)
            .items(&labels)
            .interact()?;

        let recipient_idx = Select::with_theme(&theme)
            .with_prompt("Recipient blood type")
            .default(0)
            .items(&labels)
            .interact()?;

        println!();
        print_pair(BloodType::ALL[donor_idx], BloodType::ALL[recipient_idx]);
        println!();

        let again = Confirm::with_theme(&theme)
            .with_prompt("Check another pair?")
            .default(false)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}
