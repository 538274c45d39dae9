use anyhow::{Context, Result};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use vintage_calculator::data_loader::{snapshot_frame, vintage_frame};
use vintage_calculator::{
    BatchDecomposition, CapacityStatistic, DataLoader, DecompositionEngine, EngineConfig,
    FailureMode,
};

pub struct CohortProcessor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    config: EngineConfig,
    loader: DataLoader,
    base_years: Vec<i32>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    files: usize,
    statistics: usize,
    groups: usize,
    vintages: usize,
    base_years: Vec<i32>,
    failures: Vec<FailedGroup>,
}

#[derive(Debug, Serialize)]
struct FailedGroup {
    region: String,
    technology: String,
    error: String,
}

impl CohortProcessor {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf, config: EngineConfig) -> Self {
        Self {
            input_dir,
            output_dir,
            config,
            loader: DataLoader::default(),
            base_years: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Also write the surviving vintages of each of these years.
    pub fn with_base_years(mut self, base_years: Vec<i32>) -> Self {
        self.base_years = base_years;
        self
    }

    pub fn process_all(&self) -> Result<()> {
        println!("🚀 Vintage Cohort Pipeline");
        println!("Using {} CPU cores", rayon::current_num_threads());
        println!("{}", "=".repeat(60));

        let files = find_statistics_files(&self.input_dir)?;
        if files.is_empty() {
            println!("⚠️  No statistics files found in {}", self.input_dir.display());
            return Ok(());
        }
        println!("Found {} statistics files", files.len());

        fs::create_dir_all(&self.output_dir)?;

        let statistics = self.load_statistics(&files)?;
        println!("📊 Loaded {} statistics", statistics.len());

        let start = std::time::Instant::now();
        let engine = DecompositionEngine::new(self.config.clone())?;
        let batch = engine.decompose_all(&statistics, FailureMode::Continue)?;
        println!(
            "🧮 Decomposed {} groups in {:?}",
            batch.len(),
            start.elapsed()
        );

        for failure in batch.failures() {
            println!("  ❌ {}", failure);
        }

        let vintages = self.save_vintages(&batch)?;
        for &year in &self.base_years {
            self.save_snapshot(&batch, year)?;
        }

        self.save_summary(&RunSummary {
            files: files.len(),
            statistics: statistics.len(),
            groups: batch.len(),
            vintages,
            base_years: self.base_years.clone(),
            failures: batch
                .failures()
                .iter()
                .map(|f| FailedGroup {
                    region: f.group.region.clone(),
                    technology: f.group.technology.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        })?;

        println!("\n✅ Pipeline complete! Output in {}", self.output_dir.display());
        Ok(())
    }

    fn load_statistics(&self, files: &[PathBuf]) -> Result<Vec<CapacityStatistic>> {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?,
        );

        let loaded = files
            .par_iter()
            .map(|file| {
                let statistics = self.loader.load_statistics(file);
                pb.inc(1);
                statistics
            })
            .collect::<Result<Vec<_>>>()?;

        pb.finish_with_message("Statistics loaded");
        Ok(loaded.into_iter().flatten().collect())
    }

    fn save_vintages(&self, batch: &BatchDecomposition) -> Result<usize> {
        let rows = batch.rows();
        println!("\n📅 Saving {} vintages", rows.len());
        let mut df = vintage_frame(&rows)?;
        write_frame(&self.output_dir, "vintages", &mut df)?;
        Ok(rows.len())
    }

    fn save_snapshot(&self, batch: &BatchDecomposition, base_year: i32) -> Result<()> {
        let rows = batch.snapshot(base_year);
        let total: f64 = rows.iter().map(|r| r.surviving_capacity).sum();
        println!(
            "\n📅 Snapshot {}: {} vintages, {:.1} MW in service",
            base_year,
            rows.len(),
            total
        );
        let mut df = snapshot_frame(&rows)?;
        write_frame(&self.output_dir, &format!("snapshot_{}", base_year), &mut df)
    }

    fn save_summary(&self, summary: &RunSummary) -> Result<()> {
        let path = self.output_dir.join("summary.json");
        fs::write(&path, serde_json::to_string_pretty(summary)?)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

pub fn find_statistics_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*.csv");
    let pattern = pattern
        .to_str()
        .context("statistics directory is not valid UTF-8")?;
    let mut files: Vec<PathBuf> = glob(pattern)?.filter_map(Result::ok).collect();
    files.sort();
    Ok(files)
}

fn write_frame(output_dir: &Path, base_name: &str, df: &mut DataFrame) -> Result<()> {
    let csv_path = output_dir.join(format!("{}.csv", base_name));
    println!("  💾 Saving CSV...");
    CsvWriter::new(fs::File::create(&csv_path)?).finish(df)?;

    let parquet_path = output_dir.join(format!("{}.parquet", base_name));
    println!("  📦 Saving Parquet...");
    ParquetWriter::new(fs::File::create(&parquet_path)?).finish(df)?;

    Ok(())
}
