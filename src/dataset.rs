// Dataset layer - CSV schema, load-time validation, immutable in-memory store
// The dataset is loaded once at process start and never mutated afterwards;
// every query works against a read-only view of it.

use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One sales transaction, deserialized from one CSV row.
/// Field names map 1:1 onto the CSV headers via serde renames.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Transaction {
    #[serde(rename = "Product_ID")]
    pub product_id: String,

    #[serde(rename = "Sales_Rep")]
    pub sales_rep: String,

    #[serde(rename = "Region")]
    pub region: String,

    #[serde(rename = "Sales_Amount")]
    pub sales_amount: f64,

    #[serde(rename = "Quantity_Sold")]
    pub quantity_sold: u32,

    #[serde(rename = "Product_Category")]
    pub product_category: String,

    #[serde(rename = "Unit_Cost")]
    pub unit_cost: f64,

    #[serde(rename = "Unit_Price")]
    pub unit_price: f64,

    #[serde(rename = "Customer_Type")]
    pub customer_type: String,

    #[serde(rename = "Discount")]
    pub discount: f64,

    #[serde(rename = "Payment_Method")]
    pub payment_method: String,

    #[serde(rename = "Sales_Channel")]
    pub sales_channel: String,

    /// Composite key computed at ingestion ("{region}-{rep}"), carried
    /// through verbatim - the aggregator never re-derives it.
    #[serde(rename = "Region_and_Sales_Rep")]
    pub region_and_sales_rep: String,

    #[serde(rename = "YEAR")]
    pub year: i32,

    #[serde(rename = "MONTH")]
    pub month: u32,

    #[serde(rename = "DAY")]
    pub day: u32,
}

impl Transaction {
    /// Schema validation applied at load time, never at query time.
    ///
    /// Calendar validity of year/month/day combinations is deliberately NOT
    /// checked: the upstream generator emits day 29-31 for short months and
    /// that is a known data-quality gap, not something to reject here.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.product_id.is_empty() {
            return Err("Product_ID is empty".to_string());
        }
        if self.sales_rep.is_empty() {
            return Err("Sales_Rep is empty".to_string());
        }
        if self.region.is_empty() {
            return Err("Region is empty".to_string());
        }
        if self.product_category.is_empty() {
            return Err("Product_Category is empty".to_string());
        }
        if self.customer_type.is_empty() {
            return Err("Customer_Type is empty".to_string());
        }
        if self.payment_method.is_empty() {
            return Err("Payment_Method is empty".to_string());
        }
        if self.sales_channel.is_empty() {
            return Err("Sales_Channel is empty".to_string());
        }
        if !self.sales_amount.is_finite() || self.sales_amount < 0.0 {
            return Err(format!(
                "Sales_Amount must be non-negative, got {}",
                self.sales_amount
            ));
        }
        if self.quantity_sold == 0 {
            return Err("Quantity_Sold must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.discount) {
            return Err(format!(
                "Discount must be within [0, 1], got {}",
                self.discount
            ));
        }
        if !(1..=12).contains(&self.month) {
            return Err(format!("MONTH must be within 1-12, got {}", self.month));
        }
        if !(1..=31).contains(&self.day) {
            return Err(format!("DAY must be within 1-31, got {}", self.day));
        }
        Ok(())
    }
}

/// The full transaction set, loaded once per process.
/// Row order is preserved from the source file.
#[derive(Debug, Clone)]
pub struct Dataset {
    transactions: Vec<Transaction>,
}

impl Dataset {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Sorted distinct years present in the dataset.
    /// An empty selection defaults to exactly this set.
    pub fn years(&self) -> BTreeSet<i32> {
        self.transactions.iter().map(|tx| tx.year).collect()
    }

    /// Sorted distinct values of a categorical column, for sampling by the
    /// test-data generator.
    pub fn distinct<'a, F>(&'a self, field: F) -> Vec<String>
    where
        F: Fn(&'a Transaction) -> &'a str,
    {
        let set: BTreeSet<&str> = self.transactions.iter().map(field).collect();
        set.into_iter().map(String::from).collect()
    }
}

/// Load and validate the sales CSV.
///
/// Malformed rows (deserialize failure or schema violation) reject the whole
/// load with `MalformedRow`; queries then only ever see validated data.
pub fn load_csv(csv_path: &Path) -> Result<Dataset> {
    let mut rdr = csv::Reader::from_path(csv_path)?;

    let mut transactions = Vec::new();

    for (idx, result) in rdr.deserialize().enumerate() {
        // Header occupies line 1, so data row N sits on line N + 1
        let line = idx as u64 + 2;

        let transaction: Transaction = result.map_err(|e| {
            // Prefer the line recorded in the error itself when present
            let line = e.position().map(|p| p.line()).unwrap_or(line);
            PulseError::MalformedRow {
                line,
                message: e.to_string(),
            }
        })?;

        transaction
            .validate()
            .map_err(|message| PulseError::MalformedRow { line, message })?;

        transactions.push(transaction);
    }

    Ok(Dataset::new(transactions))
}

/// Append rows to an existing CSV, writing headers only when the file is new.
/// Used by the synthetic row generator; the dashboard itself never writes.
pub fn append_csv(csv_path: &Path, rows: &[Transaction]) -> Result<()> {
    let exists = csv_path.exists();

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);

    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Helper to build a valid test transaction
    fn tx(product_id: &str, rep: &str, year: i32, amount: f64) -> Transaction {
        Transaction {
            product_id: product_id.to_string(),
            sales_rep: rep.to_string(),
            region: "North".to_string(),
            sales_amount: amount,
            quantity_sold: 10,
            product_category: "Electronics".to_string(),
            unit_cost: 100.0,
            unit_price: 150.0,
            customer_type: "Returning".to_string(),
            discount: 0.1,
            payment_method: "Card".to_string(),
            sales_channel: "Online".to_string(),
            region_and_sales_rep: format!("North-{}", rep),
            year,
            month: 6,
            day: 15,
        }
    }

    #[test]
    fn test_validate_accepts_clean_row() {
        assert!(tx("P1", "Alice", 2023, 1000.0).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut t = tx("P1", "Alice", 2023, 1000.0);
        t.quantity_sold = 0;
        let err = t.validate().unwrap_err();
        assert!(err.contains("Quantity_Sold"), "unexpected message: {}", err);
    }

    #[test]
    fn test_validate_rejects_negative_amount() {
        let mut t = tx("P1", "Alice", 2023, 1000.0);
        t.sales_amount = -5.0;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_discount_above_one() {
        let mut t = tx("P1", "Alice", 2023, 1000.0);
        t.discount = 1.5;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_validate_allows_impossible_calendar_date() {
        // Known data-quality gap: day 31 in a 30-day month passes
        let mut t = tx("P1", "Alice", 2023, 1000.0);
        t.month = 2;
        t.day = 31;
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_years_sorted_distinct() {
        let ds = Dataset::new(vec![
            tx("P1", "Alice", 2024, 100.0),
            tx("P2", "Bob", 2022, 100.0),
            tx("P3", "Alice", 2024, 100.0),
        ]);
        let years: Vec<i32> = ds.years().into_iter().collect();
        assert_eq!(years, vec![2022, 2024]);
    }

    #[test]
    fn test_distinct_values() {
        let ds = Dataset::new(vec![
            tx("P1", "Bob", 2023, 100.0),
            tx("P2", "Alice", 2023, 100.0),
            tx("P1", "Alice", 2023, 100.0),
        ]);
        assert_eq!(ds.distinct(|t| &t.product_id), vec!["P1", "P2"]);
        assert_eq!(ds.distinct(|t| &t.sales_rep), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_load_csv_roundtrip() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sales_pulse_test_{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let rows = vec![tx("P1", "Alice", 2023, 1000.0), tx("P2", "Bob", 2024, 2000.0)];
        append_csv(&path, &rows).unwrap();

        let ds = load_csv(&path).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.transactions()[0], rows[0]);
        assert_eq!(ds.transactions()[1], rows[1]);

        // Appending again must not repeat the header row
        append_csv(&path, &rows[..1]).unwrap();
        let ds = load_csv(&path).unwrap();
        assert_eq!(ds.len(), 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_csv_rejects_malformed_measure() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sales_pulse_bad_{}.csv", std::process::id()));

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "Product_ID,Sales_Rep,Region,Sales_Amount,Quantity_Sold,Product_Category,\
             Unit_Cost,Unit_Price,Customer_Type,Discount,Payment_Method,Sales_Channel,\
             Region_and_Sales_Rep,YEAR,MONTH,DAY"
        )
        .unwrap();
        writeln!(
            file,
            "P1,Alice,North,not_a_number,10,Electronics,100,150,Returning,0.1,Card,Online,North-Alice,2023,6,15"
        )
        .unwrap();
        drop(file);

        let err = load_csv(&path).unwrap_err();
        assert!(
            matches!(err, PulseError::MalformedRow { .. }),
            "expected MalformedRow, got {:?}",
            err
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_csv_rejects_schema_violation() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("sales_pulse_schema_{}.csv", std::process::id()));

        // Quantity_Sold = 0 parses fine but fails schema validation
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "Product_ID,Sales_Rep,Region,Sales_Amount,Quantity_Sold,Product_Category,\
             Unit_Cost,Unit_Price,Customer_Type,Discount,Payment_Method,Sales_Channel,\
             Region_and_Sales_Rep,YEAR,MONTH,DAY"
        )
        .unwrap();
        writeln!(
            file,
            "P1,Alice,North,500,0,Electronics,100,150,Returning,0.1,Card,Online,North-Alice,2023,6,15"
        )
        .unwrap();
        drop(file);

        let err = load_csv(&path).unwrap_err();
        match err {
            PulseError::MalformedRow { message, .. } => {
                assert!(message.contains("Quantity_Sold"))
            }
            other => panic!("expected MalformedRow, got {:?}", other),
        }

        let _ = std::fs::remove_file(&path);
    }
}
