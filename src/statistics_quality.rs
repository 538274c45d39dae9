use crate::cohort_processor::find_statistics_files;
use anyhow::Result;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use vintage_calculator::{CapacityStatistic, DataLoader, EngineConfig, GroupKey};

/// Check every statistics file in `dir` before decomposition. Returns the
/// number of issues that would make a group fail.
pub fn verify_statistics(dir: &Path, loader: &DataLoader, config: &EngineConfig) -> Result<usize> {
    println!("\n🔍 Statistics Quality Verification");
    println!("{}", "=".repeat(60));

    let files = find_statistics_files(dir)?;
    let columns = loader.columns();
    let mut total_issues = 0;

    for file in files {
        println!(
            "\n  Verifying: {}",
            file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(file.clone()))?
            .finish()?;

        // Check for duplicate group-years
        let duplicate_check = df
            .clone()
            .lazy()
            .group_by([
                col(columns.region.as_str()),
                col(columns.technology.as_str()),
                col(columns.year.as_str()),
            ])
            .agg([len().alias("count")])
            .filter(col("count").gt(lit(1)))
            .collect()?;

        if duplicate_check.height() > 0 {
            println!("    ❌ Found {} duplicate group-years", duplicate_check.height());
            total_issues += duplicate_check.height();
        } else {
            println!("    ✅ No duplicates found");
        }

        let statistics = loader.statistics_from_frame(&df)?;

        let negative = statistics
            .iter()
            .filter(|s| s.cumulative_capacity < 0.0)
            .count();
        if negative > 0 {
            println!("    ❌ Found {} negative capacities", negative);
            total_issues += negative;
        }

        let missing = missing_lifetimes(&statistics, config);
        if missing.is_empty() {
            println!("    ✅ Every fuel type has a lifetime");
        } else {
            println!("    ❌ No lifetime for: {}", missing.join(", "));
            total_issues += missing.len();
        }

        // Gaps are allowed, only reported
        let gaps = year_gaps(&statistics);
        if gaps.is_empty() {
            println!("    ✅ No gaps in time series");
        } else {
            for (key, years) in &gaps {
                println!("    ℹ️  {} has no statistics for {:?}", key, years);
            }
        }

        println!("    📊 Total records: {}", df.height());
        println!("    📊 Groups: {}", group_count(&statistics));
    }

    println!("\n{}", "=".repeat(60));
    if total_issues == 0 {
        println!("✅ Statistics verification passed! No issues found.");
    } else {
        println!("⚠️  Statistics verification found {} issues", total_issues);
    }

    Ok(total_issues)
}

fn group_years(statistics: &[CapacityStatistic]) -> BTreeMap<GroupKey, Vec<i32>> {
    let mut groups: BTreeMap<GroupKey, Vec<i32>> = BTreeMap::new();
    for stat in statistics {
        groups.entry(stat.group_key()).or_default().push(stat.calendar_year);
    }
    for years in groups.values_mut() {
        years.sort_unstable();
        years.dedup();
    }
    groups
}

fn group_count(statistics: &[CapacityStatistic]) -> usize {
    group_years(statistics).len()
}

/// Missing calendar years between the first and last statistic of each group.
fn year_gaps(statistics: &[CapacityStatistic]) -> Vec<(GroupKey, Vec<i32>)> {
    group_years(statistics)
        .into_iter()
        .filter_map(|(key, years)| {
            let missing: Vec<i32> = years
                .windows(2)
                .flat_map(|w| w[0] + 1..w[1])
                .collect();
            (!missing.is_empty()).then_some((key, missing))
        })
        .collect()
}

fn missing_lifetimes(statistics: &[CapacityStatistic], config: &EngineConfig) -> Vec<String> {
    let mut missing: Vec<String> = statistics
        .iter()
        .filter(|s| config.lifetimes.get(s.category()).is_none())
        .map(|s| s.category().to_string())
        .collect();
    missing.sort();
    missing.dedup();
    missing
}
