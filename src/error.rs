use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Xlsx(#[from] calamine::XlsxError),

    #[error("{path:?}: missing column \"{column}\"")]
    MissingColumn { path: PathBuf, column: String },

    #[error("no emission factor for fuel code \"{0}\"")]
    MissingEmissionFactor(String),

    #[error("fuel categories not found in the totals table: {}", .0.join(", "))]
    FuelCategoryMismatch(Vec<String>),

    #[error("no generation reported in baseline year {0}")]
    MissingBaseline(i32),

    #[error("period {0} is missing from the index table")]
    MissingPeriod(String),

    #[error("unrecognized date \"{0}\"")]
    InvalidDate(String),

    #[error("invalid period: year {year}, month {month}")]
    InvalidPeriod { year: i32, month: u32 },
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
