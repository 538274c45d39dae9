use vintage_calculator::{CapacityStatistic, DecompositionEngine, EngineConfig};

fn main() {
    // Default lifetimes: Wind 25 years, triangular pre-history
    let engine = DecompositionEngine::new(EngineConfig::default()).unwrap();

    // Cumulative installed wind capacity, 2005 missing
    let statistics = vec![
        CapacityStatistic::new("Denmark", "Wind", 2000, 2390.0),
        CapacityStatistic::new("Denmark", "Wind", 2001, 2489.0),
        CapacityStatistic::new("Denmark", "Wind", 2002, 2889.0),
        CapacityStatistic::new("Denmark", "Wind", 2003, 3116.0),
        CapacityStatistic::new("Denmark", "Wind", 2004, 3123.0),
        CapacityStatistic::new("Denmark", "Wind", 2006, 3136.0),
        CapacityStatistic::new("Denmark", "Wind", 2007, 3125.0),
    ];

    let result = engine.decompose_group(statistics).unwrap();

    println!("Vintage Decomposition");
    println!("=====================");
    println!("Group: {}", result.key());
    println!("Lifetime: {} years ({:?} pre-history)", result.lifetime(), result.mode());
    println!();

    println!("Built capacity per vintage:");
    for row in result.rows() {
        println!("  {}: {:>8.1} MW", row.vintage_year, row.built_capacity);
    }
    println!();

    println!("Reconciliation:");
    for step in result.steps() {
        println!("  {:?}", step);
    }
    println!();

    for year in [2000, 2007, 2015, 2030] {
        println!("In service {}: {:.1} MW", year, result.capacity_at(year));
    }
}
