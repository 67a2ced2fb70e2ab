use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("duplicate key value violates unique constraint of {table:?}")]
    DuplicationError { table: String },
    #[error("foreign key constraint violation")]
    ViolationError(),
    #[error("database unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Query(diesel::result::Error),
}

impl From<diesel::result::Error> for DatabaseError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match e {
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DatabaseError::DuplicationError {
                    table: info.table_name().unwrap_or("unknown").to_string(),
                }
            }
            Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                DatabaseError::ViolationError()
            }
            e => DatabaseError::Query(e),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("request timed out")]
    Timeout,
    #[error("unexpected response status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e)
        }
    }
}

/// Failure of a single batch item. Never aborts sibling items.
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("failed to fetch metadata: {0}")]
    Fetch(#[from] FetchError),
    #[error("bookmark {0} not found")]
    NotFound(i32),
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<diesel::result::Error> for ItemError {
    fn from(e: diesel::result::Error) -> Self {
        ItemError::Database(e.into())
    }
}

/// Failure of a whole batch, reported without partial counts.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("batch concurrency must be at least 1")]
    ZeroConcurrency,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
