use crate::models::GroupKey;
use std::collections::BTreeMap;

/// One vintage and its surviving capacity over the survival window.
#[derive(Debug, Clone, PartialEq)]
pub struct VintageRecord {
    vintage_year: i32,
    built_capacity: f64,
    // survival[i] is the capacity left in vintage_year + i
    survival: Vec<f64>,
}

impl VintageRecord {
    fn new(vintage_year: i32, built_capacity: f64, lifetime: u32) -> Self {
        Self {
            vintage_year,
            built_capacity,
            survival: vec![built_capacity; lifetime as usize],
        }
    }

    pub fn vintage_year(&self) -> i32 {
        self.vintage_year
    }

    pub fn built_capacity(&self) -> f64 {
        self.built_capacity
    }

    /// Last calendar year of the survival window.
    pub fn last_year(&self) -> i32 {
        self.vintage_year + self.survival.len() as i32 - 1
    }

    pub fn in_window(&self, year: i32) -> bool {
        year >= self.vintage_year && year <= self.last_year()
    }

    /// Surviving capacity in `year`; zero outside the window.
    pub fn surviving_at(&self, year: i32) -> f64 {
        if self.in_window(year) {
            self.survival[(year - self.vintage_year) as usize]
        } else {
            0.0
        }
    }

    fn set_from(&mut self, year: i32, value: f64) {
        let start = (year.max(self.vintage_year) - self.vintage_year) as usize;
        for slot in self.survival.iter_mut().skip(start) {
            *slot = value;
        }
    }
}

/// Survival table of every vintage of a single (region, technology) group.
///
/// Vintages are kept in ascending vintage-year order. Each record owns its
/// own window, so surviving capacity outside `[vintage, vintage + life - 1]`
/// is zero by construction.
#[derive(Debug, Clone)]
pub struct CohortLedger {
    key: GroupKey,
    lifetime: u32,
    vintages: BTreeMap<i32, VintageRecord>,
}

impl CohortLedger {
    pub fn new(key: GroupKey, lifetime: u32) -> Self {
        Self {
            key,
            lifetime,
            vintages: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    /// Register a vintage with its full survival window. Registering the same
    /// vintage year twice replaces the earlier record.
    pub fn register(&mut self, vintage_year: i32, built_capacity: f64) {
        debug_assert!(built_capacity >= 0.0, "negative build for {vintage_year}");
        self.vintages.insert(
            vintage_year,
            VintageRecord::new(vintage_year, built_capacity, self.lifetime),
        );
    }

    pub fn surviving(&self, vintage_year: i32, year: i32) -> f64 {
        self.vintages
            .get(&vintage_year)
            .map(|v| v.surviving_at(year))
            .unwrap_or(0.0)
    }

    /// Sum of surviving capacity over all vintages in `year`.
    pub fn survivor_sum(&self, year: i32) -> f64 {
        self.vintages.values().map(|v| v.surviving_at(year)).sum()
    }

    /// Overwrite the surviving capacity of a vintage from `year` to the end of
    /// its window.
    pub fn set_surviving_from(&mut self, vintage_year: i32, year: i32, value: f64) {
        if let Some(record) = self.vintages.get_mut(&vintage_year) {
            record.set_from(year, value.max(0.0));
        }
    }

    /// Vintage years with non-zero surviving capacity in `year`, ascending.
    pub fn alive_at(&self, year: i32) -> Vec<i32> {
        self.vintages
            .values()
            .filter(|v| v.surviving_at(year) > 0.0)
            .map(|v| v.vintage_year)
            .collect()
    }

    pub fn vintages(&self) -> impl Iterator<Item = &VintageRecord> {
        self.vintages.values()
    }

    pub fn get(&self, vintage_year: i32) -> Option<&VintageRecord> {
        self.vintages.get(&vintage_year)
    }

    pub fn len(&self) -> usize {
        self.vintages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vintages.is_empty()
    }
}
