use crate::error::{DecompositionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label used for rows whose statistics carry no set label.
pub const DEFAULT_SET_LABEL: &str = "PP";

/// One observed cumulative capacity value for a (region, technology) pair.
///
/// `fueltype` is the category that selects the lifetime and the pre-history
/// shape. Several technologies may share one fuel type (onshore and offshore
/// wind are both `Wind`). Without it the technology itself is the category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityStatistic {
    pub region: String,
    pub technology: String,
    #[serde(default)]
    pub fueltype: Option<String>,
    pub calendar_year: i32,
    pub cumulative_capacity: f64, // MW
    #[serde(default)]
    pub set_label: Option<String>,
}

impl CapacityStatistic {
    pub fn new(
        region: impl Into<String>,
        technology: impl Into<String>,
        calendar_year: i32,
        cumulative_capacity: f64,
    ) -> Self {
        Self {
            region: region.into(),
            technology: technology.into(),
            fueltype: None,
            calendar_year,
            cumulative_capacity,
            set_label: None,
        }
    }

    pub fn with_fueltype(mut self, fueltype: impl Into<String>) -> Self {
        self.fueltype = Some(fueltype.into());
        self
    }

    /// Category used for lifetime and distribution lookups.
    pub fn category(&self) -> &str {
        self.fueltype.as_deref().unwrap_or(&self.technology)
    }

    pub fn with_set_label(mut self, set_label: impl Into<String>) -> Self {
        self.set_label = Some(set_label.into());
        self
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.region.clone(), self.technology.clone())
    }
}

/// Identity of one decomposition run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub region: String,
    pub technology: String,
}

impl GroupKey {
    pub fn new(region: impl Into<String>, technology: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            technology: technology.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.technology)
    }
}

/// Shape of the assumed build rate before the first observed statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMode {
    /// Constant historical build rate
    Flat,
    /// Build rate ramping up linearly towards the first observation
    Triangular,
}

/// A validated, year-ordered statistic series of a single group.
///
/// Construction enforces the input shape: at least one point, a single
/// (region, technology) pair, strictly increasing calendar years, and finite
/// non-negative capacities. Fuel type and set label come from the first
/// statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticSeries {
    key: GroupKey,
    fueltype: String,
    set_label: String,
    points: Vec<(i32, f64)>,
}

impl StatisticSeries {
    /// Build a series from statistics that are already ordered by year.
    /// Out-of-order or duplicated years are rejected.
    pub fn from_sorted(statistics: &[CapacityStatistic]) -> Result<Self> {
        let first = statistics.first().ok_or_else(|| {
            DecompositionError::InputShape("statistic series is empty".to_string())
        })?;
        let key = first.group_key();

        let mut points = Vec::with_capacity(statistics.len());
        for stat in statistics {
            if stat.region != key.region || stat.technology != key.technology {
                return Err(DecompositionError::InputShape(format!(
                    "series for {} contains a statistic of {}/{}",
                    key, stat.region, stat.technology
                )));
            }
            if !stat.cumulative_capacity.is_finite() || stat.cumulative_capacity < 0.0 {
                return Err(DecompositionError::InputShape(format!(
                    "{} has invalid capacity {} in {}",
                    key, stat.cumulative_capacity, stat.calendar_year
                )));
            }
            if let Some(&(previous, _)) = points.last() {
                if stat.calendar_year == previous {
                    return Err(DecompositionError::InputShape(format!(
                        "{} has duplicate statistics for {}",
                        key, stat.calendar_year
                    )));
                }
                if stat.calendar_year < previous {
                    return Err(DecompositionError::InputShape(format!(
                        "{} is not ordered by year: {} follows {}",
                        key, stat.calendar_year, previous
                    )));
                }
            }
            points.push((stat.calendar_year, stat.cumulative_capacity));
        }

        let set_label = first
            .set_label
            .clone()
            .unwrap_or_else(|| DEFAULT_SET_LABEL.to_string());

        Ok(Self {
            key,
            fueltype: first.category().to_string(),
            set_label,
            points,
        })
    }

    /// Sort by calendar year first, then validate. Duplicated years are
    /// still rejected.
    pub fn from_unsorted(mut statistics: Vec<CapacityStatistic>) -> Result<Self> {
        statistics.sort_by_key(|s| s.calendar_year);
        Self::from_sorted(&statistics)
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn fueltype(&self) -> &str {
        &self.fueltype
    }

    pub fn set_label(&self) -> &str {
        &self.set_label
    }

    pub fn points(&self) -> &[(i32, f64)] {
        &self.points
    }

    /// First observed (year, capacity). A series is never empty.
    pub fn first(&self) -> (i32, f64) {
        self.points[0]
    }

    pub fn last_year(&self) -> i32 {
        self.points[self.points.len() - 1].0
    }

    /// Observed capacity in `year`, if a statistic was reported.
    pub fn observed(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |&(y, _)| y)
            .ok()
            .map(|idx| self.points[idx].1)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Capacity commissioned in one vintage year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VintageRow {
    pub region: String,
    pub technology: String,
    pub fueltype: String,
    pub vintage_year: i32,
    pub built_capacity: f64,
    pub set_label: String,
}

/// Surviving capacity of one vintage at a base year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub region: String,
    pub technology: String,
    pub fueltype: String,
    pub vintage_year: i32,
    pub base_year: i32,
    pub surviving_capacity: f64,
    pub set_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(year: i32, capacity: f64) -> CapacityStatistic {
        CapacityStatistic::new("Spain", "Wind", year, capacity)
    }

    #[test]
    fn test_series_from_unsorted_orders_points() {
        let series =
            StatisticSeries::from_unsorted(vec![stat(2003, 30.0), stat(2000, 10.0), stat(2001, 20.0)])
                .unwrap();

        assert_eq!(series.points(), &[(2000, 10.0), (2001, 20.0), (2003, 30.0)]);
        assert_eq!(series.first(), (2000, 10.0));
        assert_eq!(series.last_year(), 2003);
        assert_eq!(series.observed(2002), None);
        assert_eq!(series.observed(2003), Some(30.0));
        assert_eq!(series.set_label(), DEFAULT_SET_LABEL);
    }

    #[test]
    fn test_series_rejects_bad_shapes() {
        assert!(matches!(
            StatisticSeries::from_sorted(&[]),
            Err(DecompositionError::InputShape(_))
        ));
        assert!(matches!(
            StatisticSeries::from_sorted(&[stat(2001, 1.0), stat(2000, 1.0)]),
            Err(DecompositionError::InputShape(_))
        ));
        assert!(matches!(
            StatisticSeries::from_unsorted(vec![stat(2000, 1.0), stat(2000, 2.0)]),
            Err(DecompositionError::InputShape(_))
        ));
        assert!(matches!(
            StatisticSeries::from_sorted(&[stat(2000, -1.0)]),
            Err(DecompositionError::InputShape(_))
        ));

        let mixed = vec![stat(2000, 1.0), CapacityStatistic::new("Spain", "Solar", 2001, 1.0)];
        assert!(matches!(
            StatisticSeries::from_sorted(&mixed),
            Err(DecompositionError::InputShape(_))
        ));
    }

    #[test]
    fn test_set_label_taken_from_first_statistic() {
        let series = StatisticSeries::from_sorted(&[stat(2000, 1.0).with_set_label("CHP")]).unwrap();
        assert_eq!(series.set_label(), "CHP");
        assert_eq!(series.key().to_string(), "Spain/Wind");
    }

    #[test]
    fn test_fueltype_defaults_to_technology() {
        let plain = StatisticSeries::from_sorted(&[stat(2000, 1.0)]).unwrap();
        assert_eq!(plain.fueltype(), "Wind");

        let offshore = CapacityStatistic::new("Spain", "Offshore", 2000, 1.0).with_fueltype("Wind");
        assert_eq!(offshore.category(), "Wind");
        let series = StatisticSeries::from_sorted(&[offshore]).unwrap();
        assert_eq!(series.key().technology, "Offshore");
        assert_eq!(series.fueltype(), "Wind");
    }
}
