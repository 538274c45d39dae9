use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::info;
use std::collections::BTreeMap;
use std::path::PathBuf;
use vintage_calculator::{
    ColumnMapping, DataLoader, DecompositionEngine, EngineConfig, FailureMode, RetirementPolicy,
};

#[derive(Parser)]
#[command(name = "vintage_calculator")]
#[command(about = "Decompose cumulative capacity statistics into commissioning-year vintages")]
struct Args {
    /// Capacity statistics CSV
    #[arg(short, long)]
    statistics: PathBuf,

    /// Engine configuration (JSON); built-in lifetimes are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regions to decompose (all when omitted)
    #[arg(short, long)]
    region: Vec<String>,

    /// Technologies to decompose (all when omitted)
    #[arg(short, long)]
    technology: Vec<String>,

    /// Column holding the technology; one group per region and technology
    #[arg(long, default_value = "Technology")]
    technology_column: String,

    /// Column holding the fuel type that selects lifetimes; the technology is used where it is absent
    #[arg(long, default_value = "Fueltype")]
    fueltype_column: String,

    /// Report surviving capacity per vintage in this year instead of built capacity
    #[arg(short, long)]
    base_year: Option<i32>,

    /// Override the configured retirement policy
    #[arg(short, long, value_enum)]
    policy: Option<PolicyArg>,

    /// Stop at the first group that fails
    #[arg(long)]
    fail_fast: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum PolicyArg {
    OldestFirst,
    NewestFirst,
    ProRata,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting vintage decomposition");

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(policy) = &args.policy {
        config.retirement = match policy {
            PolicyArg::OldestFirst => RetirementPolicy::OldestFirst,
            PolicyArg::NewestFirst => RetirementPolicy::NewestFirst,
            PolicyArg::ProRata => RetirementPolicy::ProRata,
        };
    }

    let mut loader = DataLoader::new(ColumnMapping {
        technology: args.technology_column.clone(),
        fueltype: Some(args.fueltype_column.clone()),
        ..ColumnMapping::default()
    });
    if !args.region.is_empty() {
        loader = loader.with_regions(args.region.iter().cloned());
    }
    if !args.technology.is_empty() {
        loader = loader.with_technologies(args.technology.iter().cloned());
    }

    let statistics = loader.load_statistics(&args.statistics)?;
    if statistics.is_empty() {
        anyhow::bail!("No statistics found in {}", args.statistics.display());
    }
    info!("Loaded {} statistics", statistics.len());

    let engine = DecompositionEngine::new(config)?;
    let mode = if args.fail_fast {
        FailureMode::Abort
    } else {
        FailureMode::Continue
    };
    let batch = engine.decompose_all(&statistics, mode)?;

    for failure in batch.failures() {
        eprintln!("skipped {}", failure);
    }

    match args.output {
        OutputFormat::Json => {
            let json = match args.base_year {
                Some(year) => serde_json::to_string_pretty(&batch.snapshot(year))?,
                None => serde_json::to_string_pretty(&batch.rows())?,
            };
            println!("{}", json);
        }
        OutputFormat::Csv => match args.base_year {
            Some(year) => {
                println!("Country,Technology,Fueltype,YearCommissioned,BaseYear,Capacity,Set");
                for row in batch.snapshot(year) {
                    println!(
                        "{},{},{},{},{},{:.6},{}",
                        row.region,
                        row.technology,
                        row.fueltype,
                        row.vintage_year,
                        row.base_year,
                        row.surviving_capacity,
                        row.set_label
                    );
                }
            }
            None => {
                println!("Country,Technology,Fueltype,YearCommissioned,Capacity,Set");
                for row in batch.rows() {
                    println!(
                        "{},{},{},{},{:.6},{}",
                        row.region,
                        row.technology,
                        row.fueltype,
                        row.vintage_year,
                        row.built_capacity,
                        row.set_label
                    );
                }
            }
        },
        OutputFormat::Summary => {
            println!("Vintage Decomposition Summary");
            println!("=============================");
            println!("Statistics: {}", args.statistics.display());
            println!("Groups: {} decomposed, {} failed", batch.len(), batch.failures().len());
            println!("Retirement policy: {:?}", engine.config().retirement);
            println!();

            let mut by_fueltype: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
            for group in batch.groups() {
                let entry = by_fueltype
                    .entry(group.fueltype())
                    .or_insert((0, 0.0));
                entry.0 += 1;
                if let Some(year) = args.base_year {
                    entry.1 += group.capacity_at(year);
                }
            }

            println!("Groups by fuel type:");
            for (fueltype, (groups, capacity)) in by_fueltype {
                match args.base_year {
                    Some(year) => println!(
                        "  {}: {} groups, {:.1} MW in service in {}",
                        fueltype, groups, capacity, year
                    ),
                    None => println!("  {}: {} groups", fueltype, groups),
                }
            }

            println!();
            println!("Vintages per group:");
            for group in batch.groups() {
                let rows = group.rows();
                let built: f64 = rows.iter().map(|r| r.built_capacity).sum();
                println!(
                    "  {} [{}] (life {}y, {:?}): {} vintages, {:.1} MW built",
                    group.key(),
                    group.fueltype(),
                    group.lifetime(),
                    group.mode(),
                    rows.len(),
                    built
                );
            }
        }
    }

    Ok(())
}
