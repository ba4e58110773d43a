// Error taxonomy for the aggregation pipeline
// Replaces the silent NaN propagation of loosely-typed tabular tools with
// structured, caller-recoverable errors at the library boundary.

use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulseError {
    /// The year selection matched zero rows. Rejected before any reduction
    /// runs, so callers never see NaN-filled summaries.
    #[error("selection {years:?} matches no transactions")]
    EmptySelection { years: BTreeSet<i32> },

    /// A row failed schema validation during CSV load. Loading is the only
    /// place this is produced; queries operate on validated data.
    #[error("malformed row at line {line}: {message}")]
    MalformedRow { line: u64, message: String },

    /// A reduction would divide by zero (e.g. total units sold is zero).
    #[error("degenerate aggregate: {what}")]
    DegenerateAggregate { what: &'static str },

    /// Error reading or writing the CSV file
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PulseError::EmptySelection {
            years: BTreeSet::from([1999]),
        };
        assert!(err.to_string().contains("1999"));

        let err = PulseError::MalformedRow {
            line: 42,
            message: "Quantity_Sold must be positive".to_string(),
        };
        assert!(err.to_string().contains("line 42"));

        let err = PulseError::DegenerateAggregate {
            what: "total units sold is zero",
        };
        assert!(err.to_string().contains("degenerate"));
    }
}
