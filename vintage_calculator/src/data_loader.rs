use crate::models::{CapacityStatistic, SnapshotRow, VintageRow};
use anyhow::{Context, Result};
use log::warn;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Column names of a capacity statistics table. The fuel type and set label
/// columns are optional; tables without them still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub region: String,
    pub technology: String,
    pub fueltype: Option<String>,
    pub year: String,
    pub capacity: String,
    pub set_label: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            region: "Country".to_string(),
            technology: "Technology".to_string(),
            fueltype: Some("Fueltype".to_string()),
            year: "Year".to_string(),
            capacity: "Capacity".to_string(),
            set_label: Some("Set".to_string()),
        }
    }
}

pub struct DataLoader {
    columns: ColumnMapping,
    regions: Option<HashSet<String>>,
    technologies: Option<HashSet<String>>,
}

impl DataLoader {
    pub fn new(columns: ColumnMapping) -> Self {
        Self {
            columns,
            regions: None,
            technologies: None,
        }
    }

    pub fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    /// Keep only statistics of these regions.
    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = Some(regions.into_iter().map(Into::into).collect());
        self
    }

    /// Keep only statistics of these technologies.
    pub fn with_technologies<I, S>(mut self, technologies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.technologies = Some(technologies.into_iter().map(Into::into).collect());
        self
    }

    /// Load capacity statistics from a CSV file
    pub fn load_statistics(&self, file_path: &Path) -> Result<Vec<CapacityStatistic>> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
            .finish()
            .with_context(|| format!("failed to read statistics from {}", file_path.display()))?;

        self.statistics_from_frame(&df)
            .with_context(|| format!("unexpected layout in {}", file_path.display()))
    }

    /// Extract statistics from an already loaded frame. Rows with a missing
    /// key field or a year that is not a whole number are skipped.
    pub fn statistics_from_frame(&self, df: &DataFrame) -> Result<Vec<CapacityStatistic>> {
        let regions = df.column(&self.columns.region)?.cast(&DataType::String)?;
        let technologies = df.column(&self.columns.technology)?.cast(&DataType::String)?;
        // read as float so fractional years are seen instead of truncated
        let years = df.column(&self.columns.year)?.cast(&DataType::Float64)?;
        let capacities = df.column(&self.columns.capacity)?.cast(&DataType::Float64)?;
        let fueltypes = optional_string_column(df, self.columns.fueltype.as_deref())?;
        let sets = optional_string_column(df, self.columns.set_label.as_deref())?;

        let regions = regions.str()?;
        let technologies = technologies.str()?;
        let years = years.f64()?;
        let capacities = capacities.f64()?;
        let fueltypes = fueltypes.as_ref().map(|s| s.str()).transpose()?;
        let sets = sets.as_ref().map(|s| s.str()).transpose()?;

        let mut statistics = Vec::with_capacity(df.height());
        let mut skipped = 0usize;
        let mut bad_years = 0usize;

        for idx in 0..df.height() {
            let (Some(region), Some(technology), Some(year), Some(capacity)) = (
                regions.get(idx),
                technologies.get(idx),
                years.get(idx),
                capacities.get(idx),
            ) else {
                skipped += 1;
                continue;
            };

            let Some(year) = whole_year(year) else {
                bad_years += 1;
                continue;
            };

            if !self.accepts(region, technology) {
                continue;
            }

            let mut stat = CapacityStatistic::new(region, technology, year, capacity);
            if let Some(fueltype) = fueltypes.and_then(|f| f.get(idx)) {
                stat = stat.with_fueltype(fueltype);
            }
            if let Some(label) = sets.and_then(|s| s.get(idx)) {
                stat = stat.with_set_label(label);
            }
            statistics.push(stat);
        }

        if skipped > 0 {
            warn!("Skipped {} statistics rows with missing fields", skipped);
        }
        if bad_years > 0 {
            warn!("Skipped {} statistics rows whose year is not a whole number", bad_years);
        }

        Ok(statistics)
    }

    fn accepts(&self, region: &str, technology: &str) -> bool {
        self.regions.as_ref().map_or(true, |r| r.contains(region))
            && self
                .technologies
                .as_ref()
                .map_or(true, |t| t.contains(technology))
    }
}

/// String view of an optional column; `None` when unmapped or absent.
fn optional_string_column(df: &DataFrame, name: Option<&str>) -> PolarsResult<Option<Series>> {
    name.and_then(|name| df.column(name).ok())
        .map(|s| s.cast(&DataType::String))
        .transpose()
}

fn whole_year(year: f64) -> Option<i32> {
    let in_range = year.is_finite() && year >= i32::MIN as f64 && year <= i32::MAX as f64;
    (in_range && year.fract() == 0.0).then_some(year as i32)
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new(ColumnMapping::default())
    }
}

/// Vintage rows as a frame with `YearCommissioned` per cohort.
pub fn vintage_frame(rows: &[VintageRow]) -> PolarsResult<DataFrame> {
    df!(
        "Country" => rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(),
        "Technology" => rows.iter().map(|r| r.technology.as_str()).collect::<Vec<_>>(),
        "Fueltype" => rows.iter().map(|r| r.fueltype.as_str()).collect::<Vec<_>>(),
        "YearCommissioned" => rows.iter().map(|r| r.vintage_year).collect::<Vec<_>>(),
        "Capacity" => rows.iter().map(|r| r.built_capacity).collect::<Vec<_>>(),
        "Set" => rows.iter().map(|r| r.set_label.as_str()).collect::<Vec<_>>()
    )
}

/// Snapshot rows as a frame; `Capacity` is what survives in `BaseYear`.
pub fn snapshot_frame(rows: &[SnapshotRow]) -> PolarsResult<DataFrame> {
    df!(
        "Country" => rows.iter().map(|r| r.region.as_str()).collect::<Vec<_>>(),
        "Technology" => rows.iter().map(|r| r.technology.as_str()).collect::<Vec<_>>(),
        "Fueltype" => rows.iter().map(|r| r.fueltype.as_str()).collect::<Vec<_>>(),
        "YearCommissioned" => rows.iter().map(|r| r.vintage_year).collect::<Vec<_>>(),
        "BaseYear" => rows.iter().map(|r| r.base_year).collect::<Vec<_>>(),
        "Capacity" => rows.iter().map(|r| r.surviving_capacity).collect::<Vec<_>>(),
        "Set" => rows.iter().map(|r| r.set_label.as_str()).collect::<Vec<_>>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const IRENA_SAMPLE: &str = "\
Country,Technology,Year,Capacity,Set
Portugal,Wind,2000,100,PP
Portugal,Wind,2001,120.5,PP
,Wind,2002,130,PP
Portugal,Solar,2000,3,
Ireland,Wind,2000,50,PP
";

    fn sample_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(IRENA_SAMPLE.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_statistics_skips_incomplete_rows() {
        let file = sample_file();
        let stats = DataLoader::default().load_statistics(file.path()).unwrap();

        assert_eq!(stats.len(), 4);
        assert_eq!(stats[1], CapacityStatistic::new("Portugal", "Wind", 2001, 120.5).with_set_label("PP"));
        assert_eq!(stats[2].set_label, None);
    }

    #[test]
    fn test_region_and_technology_filters() {
        let file = sample_file();
        let stats = DataLoader::default()
            .with_regions(["Portugal"])
            .with_technologies(["Wind"])
            .load_statistics(file.path())
            .unwrap();

        assert_eq!(stats.len(), 2);
        assert!(stats.iter().all(|s| s.region == "Portugal" && s.technology == "Wind"));
    }

    #[test]
    fn test_custom_columns_without_set() {
        let df = df!(
            "country" => ["Chile", "Chile"],
            "fueltype" => ["Solar", "Solar"],
            "year" => [2015i64, 2016],
            "mw" => [10i64, 25]
        )
        .unwrap();
        let loader = DataLoader::new(ColumnMapping {
            region: "country".to_string(),
            technology: "fueltype".to_string(),
            fueltype: None,
            year: "year".to_string(),
            capacity: "mw".to_string(),
            set_label: None,
        });

        let stats = loader.statistics_from_frame(&df).unwrap();
        assert_eq!(stats[1], CapacityStatistic::new("Chile", "Solar", 2016, 25.0));
    }

    #[test]
    fn test_fueltype_column() {
        let df = df!(
            "Country" => ["Denmark", "Denmark", "Denmark"],
            "Technology" => ["Onshore", "Offshore", "Solar"],
            "Fueltype" => [Some("Wind"), Some("Wind"), None],
            "Year" => [2000i64, 2000, 2000],
            "Capacity" => [2340.0, 50.0, 1.0]
        )
        .unwrap();

        let stats = DataLoader::default().statistics_from_frame(&df).unwrap();
        assert_eq!(stats[0].technology, "Onshore");
        assert_eq!(stats[0].category(), "Wind");
        assert_eq!(stats[1].category(), "Wind");
        // no fuel type, the technology is the category
        assert_eq!(stats[2].fueltype, None);
        assert_eq!(stats[2].category(), "Solar");
    }

    #[test]
    fn test_fractional_years_are_skipped() {
        let df = df!(
            "Country" => ["Chile", "Chile", "Chile"],
            "Technology" => ["Solar", "Solar", "Solar"],
            "Year" => [2015.0, 2015.7, 2016.0],
            "Capacity" => [10.0, 12.0, 25.0]
        )
        .unwrap();

        let stats = DataLoader::default().statistics_from_frame(&df).unwrap();
        let years: Vec<i32> = stats.iter().map(|s| s.calendar_year).collect();
        assert_eq!(years, vec![2015, 2016]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let df = df!("Country" => ["Chile"]).unwrap();
        assert!(DataLoader::default().statistics_from_frame(&df).is_err());
    }

    #[test]
    fn test_vintage_frame_layout() {
        let rows = vec![VintageRow {
            region: "Chile".to_string(),
            technology: "Solar".to_string(),
            fueltype: "Solar".to_string(),
            vintage_year: 2014,
            built_capacity: 2.5,
            set_label: "PP".to_string(),
        }];
        let df = vintage_frame(&rows).unwrap();

        assert_eq!(df.shape(), (1, 6));
        assert_eq!(df.column("YearCommissioned").unwrap().i32().unwrap().get(0), Some(2014));
        assert_eq!(df.column("Capacity").unwrap().f64().unwrap().get(0), Some(2.5));
    }
}
