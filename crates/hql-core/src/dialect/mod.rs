//! SQL dialects.
//!
//! A dialect knows the vendor-specific spelling of sequences, identity
//! retrieval, row limiting and datetime arithmetic. Patterns returned by the
//! `*_pattern` methods use `?1`, `?2`, ... for their arguments; the SQL
//! renderer substitutes the rendered argument expressions in place.

mod h2;
mod mysql;
mod postgresql;

pub use h2::H2Dialect;
pub use mysql::MySQLDialect;
pub use postgresql::PostgreSQLDialect;

use crate::error::{Error, Result};
use crate::sql::TemporalUnit;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub trait Dialect: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_sequences(&self) -> bool {
        true
    }

    /// Expression yielding the next sequence value, usable inside an insert.
    fn sequence_next_value_expression(&self, sequence: &str) -> Result<String>;

    /// Statement selecting the next value of a sequence.
    fn sequence_next_value_string(&self, sequence: &str) -> Result<String>;

    /// Statement selecting the current (last fetched) value of a sequence.
    fn sequence_current_value_string(&self, sequence: &str) -> Result<String>;

    fn create_sequence_strings(
        &self,
        sequence: &str,
        initial_value: i64,
        increment: i64,
    ) -> Result<Vec<String>> {
        if !self.supports_sequences() {
            return Err(self.unsupported("sequences"));
        }
        Ok(vec![format!(
            "create sequence {} start with {} increment by {}",
            sequence, initial_value, increment
        )])
    }

    fn drop_sequence_strings(&self, sequence: &str) -> Result<Vec<String>> {
        if !self.supports_sequences() {
            return Err(self.unsupported("sequences"));
        }
        Ok(vec![format!("drop sequence if exists {}", sequence)])
    }

    fn supports_identity_columns(&self) -> bool {
        true
    }

    /// Statement returning the identity value generated by the last insert.
    fn identity_select_string(&self, table: &str, column: &str) -> Result<String>;

    /// Statement returning a database-generated GUID.
    fn select_guid_string(&self) -> Result<String>;

    /// Strategy `native` resolves to.
    fn native_identifier_generator_strategy(&self) -> &'static str {
        if self.supports_sequences() {
            "sequence"
        } else {
            "identity"
        }
    }

    fn drop_table_string(&self, table: &str) -> String {
        format!("drop table if exists {}", table)
    }

    /// Row limiting suffix and the values to bind for it, in bind order.
    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> (String, Vec<Value>) {
        let offset = offset.filter(|&o| o > 0);
        match (limit, offset) {
            (Some(l), Some(o)) => (
                " limit ? offset ?".to_string(),
                vec![bind_count(l), bind_count(o)],
            ),
            (Some(l), None) => (" limit ?".to_string(), vec![bind_count(l)]),
            (None, Some(o)) => (" offset ?".to_string(), vec![bind_count(o)]),
            (None, None) => (String::new(), Vec::new()),
        }
    }

    /// String concatenation of `?1` and `?2`.
    fn concat_pattern(&self) -> &'static str {
        "(?1||?2)"
    }

    /// Difference `?2 - ?1` expressed in `unit`.
    fn timestampdiff_pattern(&self, unit: TemporalUnit) -> String {
        format!("timestampdiff({},?1,?2)", unit)
    }

    /// `?2` shifted by `?1` units.
    fn timestampadd_pattern(&self, unit: TemporalUnit) -> String {
        format!("timestampadd({},?1,?2)", unit)
    }

    fn unsupported(&self, feature: &str) -> Error {
        Error::Mapping(format!("{} does not support {}", self.name(), feature))
    }
}

pub(crate) fn bind_count(n: u64) -> Value {
    Value::Int64(i64::try_from(n).unwrap_or(i64::MAX))
}

/// The dialects shipped with this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialectKind {
    #[default]
    PostgreSQL,
    MySQL,
    H2,
}

impl DialectKind {
    pub fn create(self) -> Arc<dyn Dialect> {
        match self {
            DialectKind::PostgreSQL => Arc::new(PostgreSQLDialect),
            DialectKind::MySQL => Arc::new(MySQLDialect),
            DialectKind::H2 => Arc::new(H2Dialect),
        }
    }
}

impl FromStr for DialectKind {
    type Err = Error;

    /// Accepts `postgresql`, `PostgreSQLDialect` or
    /// `org.hibernate.dialect.PostgreSQLDialect`, in any case.
    fn from_str(s: &str) -> Result<Self> {
        let simple = s.trim().rsplit('.').next().unwrap_or(s).to_ascii_lowercase();
        let name = simple.strip_suffix("dialect").unwrap_or(&simple);
        match name {
            "postgresql" | "postgres" | "pg" => Ok(DialectKind::PostgreSQL),
            "mysql" => Ok(DialectKind::MySQL),
            "h2" => Ok(DialectKind::H2),
            _ => Err(Error::Config(format!("unknown dialect: {}", s))),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DialectKind::PostgreSQL => "postgresql",
            DialectKind::MySQL => "mysql",
            DialectKind::H2 => "h2",
        })
    }
}
