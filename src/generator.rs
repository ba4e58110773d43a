// Synthetic row generator - load-testing only, never used by the dashboard
// Appends random rows to the sales CSV. Value ranges match the reference
// generator exactly so golden-file comparisons stay valid.

use crate::dataset::{append_csv, Dataset, Transaction};
use crate::error::{PulseError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn pick<'a, R: Rng>(rng: &mut R, values: &'a [String]) -> &'a str {
    // Pools are guaranteed non-empty by generate_rows
    values.choose(rng).map(String::as_str).unwrap_or_default()
}

/// Distinct categorical values sampled from the existing dataset.
struct Pools {
    product_ids: Vec<String>,
    sales_reps: Vec<String>,
    regions: Vec<String>,
    categories: Vec<String>,
    customer_types: Vec<String>,
    payment_methods: Vec<String>,
    sales_channels: Vec<String>,
}

impl Pools {
    fn from_dataset(dataset: &Dataset) -> Result<Self> {
        if dataset.is_empty() {
            // Nothing to sample categorical values from
            return Err(PulseError::DegenerateAggregate {
                what: "cannot sample categorical values from an empty dataset",
            });
        }

        Ok(Self {
            product_ids: dataset.distinct(|tx| &tx.product_id),
            sales_reps: dataset.distinct(|tx| &tx.sales_rep),
            regions: dataset.distinct(|tx| &tx.region),
            categories: dataset.distinct(|tx| &tx.product_category),
            customer_types: dataset.distinct(|tx| &tx.customer_type),
            payment_methods: dataset.distinct(|tx| &tx.payment_method),
            sales_channels: dataset.distinct(|tx| &tx.sales_channel),
        })
    }
}

fn generate_row<R: Rng>(rng: &mut R, pools: &Pools) -> Transaction {
    let region = pick(rng, &pools.regions).to_string();
    let sales_rep = pick(rng, &pools.sales_reps).to_string();
    let unit_cost = round2(rng.gen_range(100.0..4000.0));

    Transaction {
        product_id: pick(rng, &pools.product_ids).to_string(),
        region_and_sales_rep: format!("{}-{}", region, sales_rep),
        sales_amount: round2(rng.gen_range(3000.0..8000.0)),
        quantity_sold: rng.gen_range(10..=40),
        product_category: pick(rng, &pools.categories).to_string(),
        unit_cost,
        unit_price: round2(unit_cost + rng.gen_range(100.0..300.0)),
        customer_type: pick(rng, &pools.customer_types).to_string(),
        discount: round2(rng.gen_range(0.0..0.30)),
        payment_method: pick(rng, &pools.payment_methods).to_string(),
        sales_channel: pick(rng, &pools.sales_channels).to_string(),
        year: 2024,
        month: rng.gen_range(1..=11),
        day: rng.gen_range(1..=28),
        region,
        sales_rep,
    }
}

/// Build `count` synthetic rows, sampling categorical fields from the
/// distinct values already present in `dataset`.
pub fn generate_rows<R: Rng>(rng: &mut R, dataset: &Dataset, count: usize) -> Result<Vec<Transaction>> {
    let pools = Pools::from_dataset(dataset)?;
    Ok((0..count).map(|_| generate_row(rng, &pools)).collect())
}

/// Generate `count` rows and append them to the CSV at `csv_path`.
/// Returns the generated rows for reporting.
pub fn append_generated(csv_path: &Path, dataset: &Dataset, count: usize) -> Result<Vec<Transaction>> {
    let mut rng = rand::thread_rng();
    let rows = generate_rows(&mut rng, dataset, count)?;
    append_csv(csv_path, &rows)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seed_dataset() -> Dataset {
        let mk = |product_id: &str, rep: &str, region: &str| Transaction {
            product_id: product_id.to_string(),
            sales_rep: rep.to_string(),
            region: region.to_string(),
            sales_amount: 5000.0,
            quantity_sold: 20,
            product_category: "Electronics".to_string(),
            unit_cost: 1000.0,
            unit_price: 1200.0,
            customer_type: "New".to_string(),
            discount: 0.05,
            payment_method: "Card".to_string(),
            sales_channel: "Online".to_string(),
            region_and_sales_rep: format!("{}-{}", region, rep),
            year: 2023,
            month: 3,
            day: 10,
        };
        Dataset::new(vec![
            mk("P1", "Alice", "North"),
            mk("P2", "Bob", "South"),
        ])
    }

    #[test]
    fn test_generated_rows_respect_ranges() {
        let dataset = seed_dataset();
        let mut rng = StdRng::seed_from_u64(7);
        let rows = generate_rows(&mut rng, &dataset, 200).unwrap();

        assert_eq!(rows.len(), 200);
        for row in &rows {
            assert!((3000.0..=8000.0).contains(&row.sales_amount));
            assert!((100.0..=4000.0).contains(&row.unit_cost));
            assert!(row.unit_price >= row.unit_cost + 100.0 - 0.005);
            assert!(row.unit_price <= row.unit_cost + 300.0 + 0.005);
            assert!((0.0..=0.30).contains(&row.discount));
            assert!((10..=40).contains(&row.quantity_sold));
            assert_eq!(row.year, 2024);
            assert!((1..=11).contains(&row.month));
            assert!((1..=28).contains(&row.day));
        }
    }

    #[test]
    fn test_generated_categoricals_come_from_dataset() {
        let dataset = seed_dataset();
        let mut rng = StdRng::seed_from_u64(11);
        let rows = generate_rows(&mut rng, &dataset, 50).unwrap();

        for row in &rows {
            assert!(["P1", "P2"].contains(&row.product_id.as_str()));
            assert!(["Alice", "Bob"].contains(&row.sales_rep.as_str()));
            assert!(["North", "South"].contains(&row.region.as_str()));
            assert_eq!(
                row.region_and_sales_rep,
                format!("{}-{}", row.region, row.sales_rep)
            );
        }
    }

    #[test]
    fn test_generated_rows_pass_schema_validation() {
        let dataset = seed_dataset();
        let mut rng = StdRng::seed_from_u64(23);
        let rows = generate_rows(&mut rng, &dataset, 100).unwrap();

        for row in &rows {
            assert!(row.validate().is_ok(), "generated row failed validation");
        }
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_rows(&mut rng, &Dataset::new(vec![]), 5).is_err());
    }
}
