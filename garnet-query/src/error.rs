//! Error types for model, relation and query operations.
//!
//! Every failure surfaced by this crate (and by execution engines built on
//! it) is a [`QueryError`] carrying an [`ErrorCode`], a message, optional
//! context and an optional source error.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: G{category}{number}
//! - 1xxx: Lookup errors (record not found)
//! - 2xxx: Integrity violations (unique, foreign key, not null, check)
//! - 3xxx: Connection errors
//! - 4xxx: Transaction errors
//! - 5xxx: Execution errors
//! - 6xxx: Data errors (serialization)
//! - 7xxx: Configuration errors (unknown relation, bad path, unknown scope)
//!
//! ```rust
//! use garnet_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_found("User");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().contains("User"));
//!
//! let err = QueryError::unknown_relation("User", "bogus");
//! assert!(err.is_configuration());
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lookup errors (1xxx)
    /// Record not found, or the entity has no key yet (G1001).
    RecordNotFound = 1001,

    // Integrity errors (2xxx)
    /// Unique constraint violation (G2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (G2002).
    ForeignKeyConstraint = 2002,
    /// Check constraint violation (G2003).
    CheckConstraint = 2003,
    /// Not null constraint violation (G2004).
    NotNullConstraint = 2004,

    // Connection errors (3xxx)
    /// Database connection failed (G3001).
    ConnectionFailed = 3001,

    // Transaction errors (4xxx)
    /// Transaction failed (G4001).
    TransactionFailed = 4001,
    /// Transaction already committed/rolled back (G4004).
    TransactionClosed = 4004,

    // Execution errors (5xxx)
    /// SQL syntax error (G5002).
    SqlSyntax = 5002,
    /// General database error (G5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Serialization error (G6002).
    SerializationError = 6002,
    /// Deserialization error (G6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (G7001).
    InvalidConfiguration = 7001,
    /// Relation name not declared on the model (G7004).
    UnknownRelation = 7004,
    /// Malformed or too deep relation path (G7005).
    InvalidRelationPath = 7005,
    /// Scope name not declared on the model (G7006).
    UnknownScope = 7006,
}

impl ErrorCode {
    /// Get the error code string (e.g., "G1001").
    pub fn code(&self) -> String {
        format!("G{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::CheckConstraint => "Check constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::ConnectionFailed => "Database connection failed",
            Self::TransactionFailed => "Transaction failed",
            Self::TransactionClosed => "Transaction already closed",
            Self::SqlSyntax => "SQL syntax error",
            Self::DatabaseError => "Database error",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::UnknownRelation => "Unknown relation",
            Self::InvalidRelationPath => "Invalid relation path",
            Self::UnknownScope => "Unknown scope",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The relation involved.
    pub relation: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the relation.
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.context.relation = Some(relation.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("No {} record found matching the query", model),
        )
        .with_model(&model)
        .with_suggestion("Use find_first() or exec_optional() to get None instead of an error")
    }

    /// Create the error returned when a lifecycle operation needs a key the
    /// entity does not have yet.
    pub fn not_persisted(model: impl Into<String>, operation: impl Into<String>) -> Self {
        let model = model.into();
        let operation = operation.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("Cannot {} a {} that has not been persisted", operation, model),
        )
        .with_model(&model)
        .with_context(operation)
        .with_suggestion("Call insert() or save() first")
    }

    /// Create an unknown relation error.
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("Model {} has no relation named '{}'", model, relation),
        )
        .with_model(&model)
        .with_relation(&relation)
        .with_help("Relations are declared in Model::relations()")
    }

    /// Create an invalid relation path error.
    pub fn invalid_relation_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidRelationPath,
            format!("Invalid relation path '{}': {}", path.into(), reason.into()),
        )
    }

    /// Create an unknown scope error.
    pub fn unknown_scope(model: impl Into<String>, scope: impl Into<String>) -> Self {
        let model = model.into();
        let scope = scope.into();
        Self::new(
            ErrorCode::UnknownScope,
            format!("Model {} has no scope named '{}'", model, scope),
        )
        .with_model(&model)
        .with_help("Scopes are declared in Model::scopes()")
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message)
    }

    /// Create a unique constraint violation error.
    pub fn unique_violation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated: {}", message.into()),
        )
        .with_suggestion("A record with this value already exists")
    }

    /// Create a foreign key violation error.
    pub fn foreign_key_violation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ForeignKeyConstraint,
            format!("Foreign key constraint violated: {}", message.into()),
        )
        .with_suggestion("Ensure the referenced record exists")
    }

    /// Create a not null violation error.
    pub fn not_null_violation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NotNullConstraint,
            format!("Not null constraint violated: {}", message.into()),
        )
    }

    /// Create a check constraint violation error.
    pub fn check_violation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::CheckConstraint,
            format!("Check constraint violated: {}", message.into()),
        )
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Verify the database URL is correct")
    }

    /// Create the error returned when a transaction cannot be finished.
    pub fn transaction(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::TransactionFailed, format!("Transaction error: {}", message))
    }

    /// Create a transaction closed error.
    pub fn transaction_closed() -> Self {
        Self::new(
            ErrorCode::TransactionClosed,
            "Transaction was already committed or rolled back",
        )
    }

    /// Create an SQL syntax error.
    pub fn sql_syntax(message: impl Into<String>, sql: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::SqlSyntax, format!("SQL syntax error: {}", message)).with_sql(sql)
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is an integrity (constraint) violation.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UniqueConstraint
                | ErrorCode::ForeignKeyConstraint
                | ErrorCode::CheckConstraint
                | ErrorCode::NotNullConstraint
        )
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::InvalidConfiguration
                | ErrorCode::UnknownRelation
                | ErrorCode::InvalidRelationPath
                | ErrorCode::UnknownScope
        )
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        self.code == ErrorCode::ConnectionFailed
    }

    /// Check if this is a transaction error.
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::TransactionFailed | ErrorCode::TransactionClosed
        )
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref relation) = self.context.relation {
            output.push_str(&format!("  → Relation: {}\n", relation));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref sql) = self.context.sql {
            let sql_display = match sql.char_indices().nth(200) {
                Some((cut, _)) => format!("{}...", &sql[..cut]),
                None => sql.clone(),
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::serialization(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "G1001");
        assert_eq!(ErrorCode::UniqueConstraint.code(), "G2001");
        assert_eq!(ErrorCode::UnknownRelation.code(), "G7004");
    }

    #[test]
    fn test_not_found_error() {
        let err = QueryError::not_found("User");
        assert!(err.is_not_found());
        assert!(err.message.contains("User"));
        assert!(!err.context.suggestions.is_empty());
    }

    #[test]
    fn test_not_persisted_is_not_found() {
        let err = QueryError::not_persisted("Thing", "remove");
        assert!(err.is_not_found());
        assert_eq!(err.context.operation.as_deref(), Some("remove"));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(QueryError::unknown_relation("User", "bogus").is_configuration());
        assert!(QueryError::invalid_relation_path("a..b", "empty segment").is_configuration());
        assert!(QueryError::unknown_scope("User", "recent").is_configuration());
        assert!(!QueryError::not_found("User").is_configuration());
    }

    #[test]
    fn test_integrity_errors() {
        assert!(QueryError::unique_violation("users.email").is_integrity_violation());
        assert!(QueryError::foreign_key_violation("things.user_id").is_integrity_violation());
        assert!(!QueryError::database("disk I/O error").is_integrity_violation());
    }

    #[test]
    fn test_transaction_errors() {
        let err = QueryError::transaction("COMMIT failed");
        assert!(err.is_transaction_error());
        assert_eq!(err.code.code(), "G4001");
        assert!(QueryError::transaction_closed().is_transaction_error());
        assert!(!QueryError::database("COMMIT failed").is_transaction_error());
    }

    #[test]
    fn test_display_full() {
        let err = QueryError::unknown_relation("User", "bogus").with_context("eager load");

        let output = err.display_full();
        assert!(output.contains("G7004"));
        assert!(output.contains("Relation: bogus"));
        assert!(output.contains("While: eager load"));
    }

    #[test]
    fn test_source_is_kept() {
        let io = std::io::Error::other("boom");
        let err = QueryError::database("wrapped").with_source(io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
