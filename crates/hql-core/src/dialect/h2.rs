use super::Dialect;
use crate::error::Result;

/// H2: sequences and a native `timestampdiff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct H2Dialect;

impl Dialect for H2Dialect {
    fn name(&self) -> &'static str {
        "H2"
    }

    fn sequence_next_value_expression(&self, sequence: &str) -> Result<String> {
        Ok(format!("next value for {}", sequence))
    }

    fn sequence_next_value_string(&self, sequence: &str) -> Result<String> {
        Ok(format!("call next value for {}", sequence))
    }

    fn sequence_current_value_string(&self, sequence: &str) -> Result<String> {
        Ok(format!("call current value for {}", sequence))
    }

    fn identity_select_string(&self, _table: &str, _column: &str) -> Result<String> {
        Ok("call identity()".to_string())
    }

    fn select_guid_string(&self) -> Result<String> {
        Ok("call random_uuid()".to_string())
    }
}
