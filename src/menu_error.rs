use thiserror::Error;

/// Everything that can go wrong while turning a menu PDF into a message.
///
/// Only `AllCandidatesExhausted`, `ExtractionError` and the column errors end a
/// run. `FetchFailed` is swallowed by the locator, `SendError` and `Store` are
/// logged by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("no menu document found (last tried: {})", .last_url.as_deref().unwrap_or("none"))]
    AllCandidatesExhausted { last_url: Option<String> },

    #[error("could not extract menu table: {0}")]
    ExtractionError(String),

    #[error("no header cell mentions day {day}")]
    ColumnNotFound { day: u32 },

    #[error("column {column} is outside the table (width {width}), no menu published for that day")]
    OutOfRange { column: usize, width: usize },

    #[error("header of column {column} is {header:?}, expected day {day}")]
    HeaderMismatch {
        column: usize,
        day: u32,
        header: String,
    },

    #[error("failed to send notification: {0}")]
    SendError(String),

    #[error("url cache unavailable: {0}")]
    Store(String),
}
