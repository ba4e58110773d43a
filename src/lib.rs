// Sales Pulse - Core Library
// Sales analytics over an immutable in-memory CSV dataset: year-scoped
// totals, product/rep rankings, categorical leaders, distribution stats.
// Exposes all modules for use in the CLI, the API server, and tests.

pub mod aggregate;
pub mod dataset;
pub mod error;
pub mod generator;
pub mod ranking;

// Re-export commonly used types
pub use aggregate::{Aggregator, CategoricalLeaders, Distribution, MonthlyRevenue, Summary};
pub use dataset::{append_csv, load_csv, Dataset, Transaction};
pub use error::{PulseError, Result};
pub use generator::{append_generated, generate_rows};
pub use ranking::{average_rank_descending, round4, RankedEntity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default location of the sales CSV, overridable via the SALES_CSV env var.
pub const DEFAULT_CSV_PATH: &str = "data/sales_data.csv";

/// Resolve the CSV path from the environment, falling back to the default.
pub fn csv_path_from_env() -> std::path::PathBuf {
    std::env::var("SALES_CSV")
        .unwrap_or_else(|_| DEFAULT_CSV_PATH.to_string())
        .into()
}
