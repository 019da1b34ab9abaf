use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use shipalloc_core::{AllocationConfig, AllocationModel, Error, Report, ShipmentTotals, Solver, load_shipments, render_svg};
use std::fmt::Display;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shipalloc")]
#[command(about = "Least-cost shipping mode allocation across warehouses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Allocate the observed shipment weight across modes at minimum cost
    Solve {
        /// Shipment dataset (CSV)
        file: PathBuf,
        /// Allocation config (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the allocation chart to this SVG file
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Minimum share of the total weight for every mode
        #[arg(long)]
        min_share: Option<f64>,
        /// Maximum share of the total weight for every mode
        #[arg(long)]
        max_share: Option<f64>,
        /// Warehouse capacity as a multiple of its observed weight
        #[arg(long)]
        capacity_factor: Option<f64>,
        /// Write the linear program as JSON before solving
        #[arg(long)]
        dump_model: Option<PathBuf>,
    },
    /// Load and aggregate a dataset without solving
    Check {
        /// Shipment dataset (CSV)
        file: PathBuf,
    },
    /// Print the default configuration
    Config,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            config,
            chart,
            format,
            min_share,
            max_share,
            capacity_factor,
            dump_model,
        } => {
            let config = load_config(config.as_deref(), min_share, max_share, capacity_factor);
            let output = run_solve(&file, &config, format, chart.as_deref(), dump_model.as_deref())
                .unwrap_or_else(|e| fail("Error", e));
            print!("{}", output);
        }
        Commands::Check { file } => {
            let records = load_shipments(&file).unwrap_or_else(|e| fail("Data error", e));
            let totals = ShipmentTotals::from_records(&records).unwrap_or_else(|e| fail("Data error", e));

            println!("Records: {}", totals.record_count);
            println!("Total weight: {:.3} kg", totals.total_kg);
            println!();
            println!("By warehouse:");
            for warehouse in totals.warehouses() {
                println!("  {:8} {:12.3} kg", warehouse.as_str(), totals.warehouse_kg(warehouse));
            }
            println!();
            println!("By mode:");
            for mode in totals.modes() {
                println!("  {:8} {:12.3} kg", mode.as_str(), totals.mode_kg(mode));
            }
        }
        Commands::Config => {
            let json = AllocationConfig::default()
                .to_json()
                .unwrap_or_else(|e| fail("Config error", e));
            println!("{}", json);
        }
    }
}

fn load_config(
    path: Option<&Path>,
    min_share: Option<f64>,
    max_share: Option<f64>,
    capacity_factor: Option<f64>,
) -> AllocationConfig {
    let config = match path {
        Some(path) => AllocationConfig::load(path).unwrap_or_else(|e| fail("Config error", e)),
        None => AllocationConfig::default(),
    };

    let config = config.with_share_overrides(min_share, max_share);
    match capacity_factor {
        Some(factor) => config.with_capacity_factor(factor),
        None => config,
    }
}

/// Run the pipeline and return the rendered report. Every side effect that
/// can fail (model dump, chart) happens before the report is handed back, so
/// a failed run prints nothing to stdout.
fn run_solve(
    file: &Path,
    config: &AllocationConfig,
    format: Format,
    chart: Option<&Path>,
    dump_model: Option<&Path>,
) -> Result<String, Error> {
    let records = load_shipments(file)?;
    let totals = ShipmentTotals::from_records(&records)?;
    let model = AllocationModel::build(&totals, config)?;

    if let Some(path) = dump_model {
        let json = serde_json::to_string_pretty(model.problem())
            .map_err(|e| Error::Model(format!("cannot encode model: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| Error::Model(format!("cannot write model to {}: {}", path.display(), e)))?;
        info!("Model written to {}", path.display());
    }

    let allocation = model.solve(&Solver::new())?;
    let report = Report::from_allocation(&allocation);

    let output = match format {
        Format::Text => report.to_string(),
        Format::Json => {
            let json = report
                .to_json()
                .map_err(|e| Error::Model(format!("cannot encode report: {}", e)))?;
            format!("{}\n", json)
        }
    };

    if let Some(path) = chart {
        render_svg(&report, path)?;
    }

    Ok(output)
}

fn fail(context: &str, err: impl Display) -> ! {
    eprintln!("{}: {}", context, err);
    std::process::exit(1);
}
