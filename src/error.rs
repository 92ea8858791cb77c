//! Error taxonomy for ingestion and analysis.
//!
//! Row-level problems (bad amount, missing party, self-transfer) never surface
//! here: those rows are dropped and counted by the ingester.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Required columns could not be matched; resolved by interactive remapping.
    #[error("NEEDS_MAPPING")]
    NeedsMapping {
        /// Headers found in the file.
        headers: Vec<String>,
    },

    #[error("No valid transactions found in the CSV file.")]
    NoValidTransactions,

    /// A confirmed mapping names a header the file does not have.
    #[error("Could not find mapped column '{header}' for field {field}. Please verify your column mapping.")]
    ColumnNotFound { field: &'static str, header: String },

    #[error("Input has no header line")]
    EmptyInput,

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn is_needs_mapping(&self) -> bool {
        matches!(self, AnalysisError::NeedsMapping { .. })
    }
}
