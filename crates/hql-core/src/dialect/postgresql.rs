use super::Dialect;
use crate::error::Result;
use crate::sql::TemporalUnit;

/// PostgreSQL: native sequences, no `timestampdiff`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgreSQLDialect;

impl PostgreSQLDialect {
    fn interval(unit: TemporalUnit) -> &'static str {
        match unit {
            TemporalUnit::Year => "interval '1 year'",
            TemporalUnit::Quarter => "interval '3 month'",
            TemporalUnit::Month => "interval '1 month'",
            TemporalUnit::Week => "interval '7 day'",
            TemporalUnit::Day => "interval '1 day'",
            TemporalUnit::Hour => "interval '1 hour'",
            TemporalUnit::Minute => "interval '1 minute'",
            TemporalUnit::Second => "interval '1 second'",
            TemporalUnit::Nanosecond => "interval '1 microsecond'",
        }
    }
}

impl Dialect for PostgreSQLDialect {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn sequence_next_value_expression(&self, sequence: &str) -> Result<String> {
        Ok(format!("nextval('{}')", sequence))
    }

    fn sequence_next_value_string(&self, sequence: &str) -> Result<String> {
        Ok(format!("select nextval('{}')", sequence))
    }

    fn sequence_current_value_string(&self, sequence: &str) -> Result<String> {
        Ok(format!("select currval('{}')", sequence))
    }

    fn identity_select_string(&self, table: &str, column: &str) -> Result<String> {
        Ok(format!("select currval('{}_{}_seq')", table, column))
    }

    fn select_guid_string(&self) -> Result<String> {
        Ok("select uuid_generate_v4()".to_string())
    }

    /// Computed in the normalized unit of the family, then scaled.
    fn timestampdiff_pattern(&self, unit: TemporalUnit) -> String {
        let normalized = unit.normalized();
        let base = if unit.is_calendar_unit() {
            "(extract(year from age(?2,?1))*12+extract(month from age(?2,?1)))".to_string()
        } else if normalized == TemporalUnit::Nanosecond {
            "(extract(epoch from ?2-?1)*1000000000)".to_string()
        } else {
            "extract(epoch from ?2-?1)".to_string()
        };
        let factor = normalized.conversion_factor(unit).unwrap_or_default();
        if factor.is_empty() {
            format!("trunc({})", base)
        } else {
            format!("trunc({}{})", base, factor)
        }
    }

    fn timestampadd_pattern(&self, unit: TemporalUnit) -> String {
        match unit {
            TemporalUnit::Nanosecond => format!("(?2+(?1)/1e3*{})", Self::interval(unit)),
            _ => format!("(?2+(?1)*{})", Self::interval(unit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sequence_strings() {
        let d = PostgreSQLDialect;
        assert_eq!(d.sequence_next_value_string("seq").unwrap(), "select nextval('seq')");
        assert_eq!(
            d.create_sequence_strings("seq", 1, 1).unwrap(),
            vec!["create sequence seq start with 1 increment by 1".to_string()]
        );
        assert_eq!(d.drop_sequence_strings("seq").unwrap(), vec!["drop sequence if exists seq".to_string()]);
    }

    #[test]
    fn test_timestampdiff_uses_normalized_units() {
        let d = PostgreSQLDialect;
        assert_eq!(
            d.timestampdiff_pattern(TemporalUnit::Year),
            "trunc((extract(year from age(?2,?1))*12+extract(month from age(?2,?1)))/12)"
        );
        assert_eq!(d.timestampdiff_pattern(TemporalUnit::Hour), "trunc(extract(epoch from ?2-?1)/3600)");
        assert_eq!(d.timestampdiff_pattern(TemporalUnit::Second), "trunc(extract(epoch from ?2-?1))");
    }

    #[test]
    fn test_timestampadd_uses_intervals() {
        let d = PostgreSQLDialect;
        assert_eq!(d.timestampadd_pattern(TemporalUnit::Week), "(?2+(?1)*interval '7 day')");
    }
}
