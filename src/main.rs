use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use vintage_calculator::{ColumnMapping, DataLoader, EngineConfig};

mod cohort_processor;
mod statistics_quality;

use cohort_processor::CohortProcessor;

/// Every value following `flag` on the command line. A flag without a
/// value is an error.
fn option_values<'a>(args: &'a [String], flag: &str) -> Result<Vec<&'a str>> {
    let mut values = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        if arg != flag {
            continue;
        }
        match args.get(idx + 1) {
            Some(value) if !value.starts_with("--") => values.push(value.as_str()),
            _ => bail!("{} needs a value", flag),
        }
    }
    Ok(values)
}

/// Positional argument at `idx`, unless it is missing or an option.
fn positional(args: &[String], idx: usize) -> Option<&str> {
    args.get(idx)
        .map(String::as_str)
        .filter(|arg| !arg.starts_with("--"))
}

/// Check statistics before decomposing them. Any issue is an error.
fn verify(dir: &Path, columns: ColumnMapping, config: &EngineConfig) -> Result<()> {
    let issues = statistics_quality::verify_statistics(dir, &DataLoader::new(columns), config)?;
    if issues > 0 {
        bail!("statistics verification found {} issues", issues);
    }
    Ok(())
}

fn print_usage() {
    println!("Usage:");
    println!("  capacity_pipeline <statistics_dir> <output_dir> [--base-year YEAR]... [--config FILE] [--technology-column NAME] [--fueltype-column NAME] [--region NAME]...");
    println!("  capacity_pipeline --verify <statistics_dir> [--config FILE] [--technology-column NAME] [--fueltype-column NAME]");
    println!("Example: capacity_pipeline irena_stats vintage_output --base-year 2015");
}

fn main() -> Result<()> {
    env_logger::init();

    // Set Rayon to use all available cores
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
        .context("failed to configure the rayon thread pool")?;

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let config = match option_values(&args, "--config")?.last() {
        Some(path) => EngineConfig::from_json_file(Path::new(path))?,
        None => EngineConfig::default(),
    };

    let mut columns = ColumnMapping::default();
    if let Some(name) = option_values(&args, "--technology-column")?.last() {
        columns.technology = name.to_string();
    }
    if let Some(name) = option_values(&args, "--fueltype-column")?.last() {
        columns.fueltype = Some(name.to_string());
    }

    if args[1] == "--verify" {
        let Some(dir) = positional(&args, 2) else {
            print_usage();
            bail!("--verify needs a statistics directory");
        };

        verify(Path::new(dir), columns, &config)?;
    } else if let (Some(input), Some(output)) = (positional(&args, 1), positional(&args, 2)) {
        let base_years = option_values(&args, "--base-year")?
            .into_iter()
            .map(|y| {
                y.parse::<i32>()
                    .with_context(|| format!("invalid base year '{}'", y))
            })
            .collect::<Result<Vec<_>>>()?;

        let regions = option_values(&args, "--region")?;
        let mut loader = DataLoader::new(columns);
        if !regions.is_empty() {
            loader = loader.with_regions(regions);
        }

        CohortProcessor::new(PathBuf::from(input), PathBuf::from(output), config)
            .with_loader(loader)
            .with_base_years(base_years)
            .process_all()?;
    } else {
        print_usage();
        bail!("expected <statistics_dir> <output_dir> before any option");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_option_values() {
        let args = argv(&["capacity_pipeline", "in", "out", "--base-year", "2015", "--base-year", "2020"]);

        assert_eq!(option_values(&args, "--base-year").unwrap(), vec!["2015", "2020"]);
        assert!(option_values(&args, "--config").unwrap().is_empty());
        assert_eq!(positional(&args, 1), Some("in"));
        assert_eq!(positional(&args, 2), Some("out"));
    }

    #[test]
    fn test_flag_without_value_is_rejected() {
        let trailing = argv(&["capacity_pipeline", "in", "out", "--base-year"]);
        assert!(option_values(&trailing, "--base-year").is_err());

        let followed_by_flag = argv(&["capacity_pipeline", "in", "out", "--config", "--region", "Peru"]);
        assert!(option_values(&followed_by_flag, "--config").is_err());
        assert_eq!(option_values(&followed_by_flag, "--region").unwrap(), vec!["Peru"]);
    }

    #[test]
    fn test_verify_fails_on_issues() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("stats.csv");

        std::fs::write(&file, "Country,Technology,Year,Capacity\nPeru,Wind,2000,10\nPeru,Wind,2001,12\n").unwrap();
        assert!(verify(dir.path(), ColumnMapping::default(), &EngineConfig::default()).is_ok());

        std::fs::write(&file, "Country,Technology,Year,Capacity\nPeru,Wave,2000,10\n").unwrap();
        let err = verify(dir.path(), ColumnMapping::default(), &EngineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("1 issues"));
    }

    #[test]
    fn test_options_are_not_positionals() {
        let args = argv(&["capacity_pipeline", "in", "--base-year", "2015", "out"]);
        assert_eq!(positional(&args, 1), Some("in"));
        assert_eq!(positional(&args, 2), None);
        assert_eq!(positional(&args, 9), None);
    }
}
