use std::time::Duration;

use chrono::NaiveDate;

/// Failures while resolving configuration or reaching the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("missing required configuration value: {key}")]
    MissingConfiguration { key: &'static str },

    #[error("invalid configuration value for {key}: {value:?}")]
    InvalidConfiguration { key: &'static str, value: String },

    #[error("timed out after {0:?} waiting for the database to respond")]
    ConnectionTimeout(Duration),

    #[error("unexpected error connecting to the database: {0}")]
    UnexpectedConnectionError(String),
}

/// Failures on the write path. An unacknowledged write is not an error,
/// see `db::insert`.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to connect to collection '{collection}': {source}")]
    ConnectionUnavailable {
        collection: String,
        #[source]
        source: ConnectError,
    },

    #[error("document with this id already exists: {0}")]
    DuplicateKey(String),

    #[error("database operation failed (code {code}): {message}")]
    OperationFailure { code: i32, message: String },

    #[error("invalid document format: {0}")]
    InvalidDocument(String),

    #[error("write did not complete within {0:?}")]
    Timeout(Duration),

    #[error("failed to insert data: {0}")]
    UnexpectedWriteError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("query failed: {0}")]
    Query(String),

    #[error("record {index} has no usable player_id")]
    MalformedRecord { index: usize },
}

/// Input rejected before it reaches the write gateway.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("player id must not be blank")]
    BlankPlayerId,

    #[error("player {0} is not on the roster")]
    UnknownPlayer(String),

    #[error("date {date} is in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },

    #[error("feeling must be between 1 and 5, got {0}")]
    Feeling(i64),

    #[error("sleep hours must be between 0 and 12 in steps of 0.5, got {0}")]
    SleepHours(f64),

    #[error("rpe score must be between 1 and 10, got {0}")]
    RpeScore(i64),

    #[error("training minutes must be between 0 and 120, got {0}")]
    TrainingMinutes(i64),
}
