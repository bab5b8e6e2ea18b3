use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryReportError {
    #[error("Failed to fetch {collection}: {message}")]
    FetchFailed { collection: String, message: String },

    #[error("Fetching report inputs timed out after {0} ms")]
    FetchTimeout(u128),

    #[error("Invalid date range: from {from} is after to {to}")]
    InvalidDateRange { from: String, to: String },

    #[error("Invalid month '{0}': expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not authorized to {action} {resource}")]
    Unauthorized { resource: String, action: String },

    #[error("Conservation violation for {product} in {month}: ending {ending} != expected {expected}")]
    ConservationViolation {
        product: String,
        month: String,
        ending: f64,
        expected: f64,
    },

    #[error("Continuity violation for {product} in {month}: beginning {beginning} != previous ending {previous_ending}")]
    ContinuityViolation {
        product: String,
        month: String,
        beginning: f64,
        previous_ending: f64,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InventoryReportError>;
