//! Core error types.

use hql_lang::ParseError;
use thiserror::Error;

/// Errors raised by mapping, translation, execution and id generation.
#[derive(Debug, Error)]
pub enum Error {
    /// Static mapping metadata is wrong or incomplete.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// The query is syntactically or semantically invalid.
    #[error("{message} [{query}]")]
    Query { message: String, query: String },

    /// The operation is not supported for this kind of query.
    #[error("{message} [{query}]")]
    QueryExecutionRequest { message: String, query: String },

    /// An identifier could not be produced or interpreted.
    #[error("identifier generation error: {0}")]
    IdentifierGeneration(String),

    /// The database or driver broke its contract.
    #[error("{0}")]
    Persistence(String),

    /// A value could not be converted to the requested type.
    #[error("coercion error: {0}")]
    Coercion(String),

    /// Failure reported by a caller-supplied JDBC boundary.
    #[error("jdbc error: {0}")]
    Jdbc(String),

    /// Invalid configuration setting.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Query error naming the offending query string.
    pub fn query(message: impl Into<String>, query: impl Into<String>) -> Self {
        Error::Query {
            message: message.into(),
            query: query.into(),
        }
    }

    pub fn execution_request(message: impl Into<String>, query: impl Into<String>) -> Self {
        Error::QueryExecutionRequest {
            message: message.into(),
            query: query.into(),
        }
    }

    /// Build a query error from a parse failure, keeping the caret rendering.
    pub fn from_parse(err: &ParseError, query: &str) -> Self {
        let mut message = err.message.clone();
        if let Some(hint) = &err.hint {
            message.push_str(" (");
            message.push_str(hint);
            message.push(')');
        }
        let (line, column) = hql_lang::span::line_and_column(query, err.span.start);
        Error::query(
            format!("{} near line {}, column {}", message, line, column),
            query,
        )
    }

    /// True for query errors, including execution-request errors.
    pub fn is_query_error(&self) -> bool {
        matches!(self, Error::Query { .. } | Error::QueryExecutionRequest { .. })
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
