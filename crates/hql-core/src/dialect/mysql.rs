use super::{bind_count, Dialect};
use crate::error::Result;
use crate::sql::TemporalUnit;
use crate::value::Value;

/// MySQL: identity columns, no sequences.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySQLDialect;

/// Largest row count MySQL accepts, used for offset-only queries.
const MAX_ROWS: u64 = 18_446_744_073_709_551_615;

impl Dialect for MySQLDialect {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn supports_sequences(&self) -> bool {
        false
    }

    fn sequence_next_value_expression(&self, _sequence: &str) -> Result<String> {
        Err(self.unsupported("sequences"))
    }

    fn sequence_next_value_string(&self, _sequence: &str) -> Result<String> {
        Err(self.unsupported("sequences"))
    }

    fn sequence_current_value_string(&self, _sequence: &str) -> Result<String> {
        Err(self.unsupported("sequences"))
    }

    fn identity_select_string(&self, _table: &str, _column: &str) -> Result<String> {
        Ok("select last_insert_id()".to_string())
    }

    fn select_guid_string(&self) -> Result<String> {
        Ok("select uuid()".to_string())
    }

    fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> (String, Vec<Value>) {
        let offset = offset.filter(|&o| o > 0);
        match (limit, offset) {
            (Some(l), Some(o)) => (" limit ?, ?".to_string(), vec![bind_count(o), bind_count(l)]),
            (Some(l), None) => (" limit ?".to_string(), vec![bind_count(l)]),
            (None, Some(o)) => (format!(" limit ?, {}", MAX_ROWS), vec![bind_count(o)]),
            (None, None) => (String::new(), Vec::new()),
        }
    }

    fn concat_pattern(&self) -> &'static str {
        "concat(?1,?2)"
    }

    fn timestampdiff_pattern(&self, unit: TemporalUnit) -> String {
        match unit {
            TemporalUnit::Nanosecond => "timestampdiff(microsecond,?1,?2)*1e3".to_string(),
            _ => format!("timestampdiff({},?1,?2)", unit),
        }
    }

    fn timestampadd_pattern(&self, unit: TemporalUnit) -> String {
        match unit {
            TemporalUnit::Nanosecond => "timestampadd(microsecond,(?1)/1e3,?2)".to_string(),
            _ => format!("timestampadd({},?1,?2)", unit),
        }
    }
}
