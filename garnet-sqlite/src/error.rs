//! Error types for SQLite operations.

use rusqlite::ffi;
use thiserror::Error;

use garnet_query::error::QueryError;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The underlying driver error, if this is one.
    pub fn driver(&self) -> Option<&rusqlite::Error> {
        match self {
            Self::Sqlite(tokio_rusqlite::Error::Rusqlite(e)) => Some(e),
            _ => None,
        }
    }

    /// The extended result code of a constraint violation.
    pub fn constraint_code(&self) -> Option<i32> {
        match self.driver() {
            Some(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Some(e.extended_code)
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

fn constraint_error(extended_code: i32, message: String) -> QueryError {
    match extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            QueryError::unique_violation(message)
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => QueryError::foreign_key_violation(message),
        ffi::SQLITE_CONSTRAINT_NOTNULL => QueryError::not_null_violation(message),
        ffi::SQLITE_CONSTRAINT_CHECK => QueryError::check_violation(message),
        _ => QueryError::database(message),
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        let message = err.to_string();
        if let Some(code) = err.constraint_code() {
            let mapped = constraint_error(code, message);
            return match err {
                SqliteError::Sqlite(tokio_rusqlite::Error::Rusqlite(source)) => {
                    mapped.with_source(source)
                }
                _ => mapped,
            };
        }

        match err {
            SqliteError::Sqlite(tokio_rusqlite::Error::Rusqlite(source)) => {
                let base = if message.contains("syntax error") {
                    QueryError::sql_syntax(message, "")
                } else {
                    QueryError::database(message)
                };
                base.with_source(source)
            }
            SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed) => {
                QueryError::connection(message)
            }
            SqliteError::Sqlite(_) => QueryError::database(message),
            SqliteError::Config(msg) => QueryError::invalid_configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_query::ErrorCode;

    fn failure(extended_code: i32) -> SqliteError {
        rusqlite::Error::SqliteFailure(
            ffi::Error::new(extended_code),
            Some("constraint failed".to_string()),
        )
        .into()
    }

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("invalid path");
        assert_eq!(err.to_string(), "Configuration error: invalid path");
    }

    #[test]
    fn test_constraint_mapping() {
        let cases = [
            (ffi::SQLITE_CONSTRAINT_UNIQUE, ErrorCode::UniqueConstraint),
            (ffi::SQLITE_CONSTRAINT_PRIMARYKEY, ErrorCode::UniqueConstraint),
            (ffi::SQLITE_CONSTRAINT_FOREIGNKEY, ErrorCode::ForeignKeyConstraint),
            (ffi::SQLITE_CONSTRAINT_NOTNULL, ErrorCode::NotNullConstraint),
            (ffi::SQLITE_CONSTRAINT_CHECK, ErrorCode::CheckConstraint),
        ];
        for (code, expected) in cases {
            let err = failure(code);
            assert_eq!(err.constraint_code(), Some(code));
            let mapped: QueryError = err.into();
            assert_eq!(mapped.code, expected);
            assert!(mapped.is_integrity_violation());
            assert!(std::error::Error::source(&mapped).is_some());
        }
    }

    #[test]
    fn test_other_errors() {
        let mapped: QueryError =
            SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed).into();
        assert!(mapped.is_connection_error());

        let mapped: QueryError = SqliteError::config("bad url").into();
        assert!(mapped.is_configuration());

        let mapped: QueryError = failure(ffi::SQLITE_BUSY).into();
        assert_eq!(mapped.code, ErrorCode::DatabaseError);
    }
}
