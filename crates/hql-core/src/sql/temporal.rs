//! Temporal units and conversion between them.
//!
//! Units fall into two families. Calendar units (year, quarter, month)
//! normalize to months; clock units normalize to seconds, except nanoseconds
//! which stay as they are. Converting within a family is a multiplication or
//! division by a constant, which dialects without a native `timestampdiff`
//! append to a normalized difference.

use crate::error::{Error, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Nanosecond,
}

const NANOS_PER_SECOND: u64 = 1_000_000_000;

impl TemporalUnit {
    pub const ALL: [TemporalUnit; 9] = [
        TemporalUnit::Year,
        TemporalUnit::Quarter,
        TemporalUnit::Month,
        TemporalUnit::Week,
        TemporalUnit::Day,
        TemporalUnit::Hour,
        TemporalUnit::Minute,
        TemporalUnit::Second,
        TemporalUnit::Nanosecond,
    ];

    /// Parse a unit name, case-insensitively.
    pub fn from_name(name: &str) -> Option<TemporalUnit> {
        TemporalUnit::ALL
            .into_iter()
            .find(|unit| unit.name().eq_ignore_ascii_case(name))
    }

    pub fn name(self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Quarter => "quarter",
            TemporalUnit::Month => "month",
            TemporalUnit::Week => "week",
            TemporalUnit::Day => "day",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second => "second",
            TemporalUnit::Nanosecond => "nanosecond",
        }
    }

    pub fn is_calendar_unit(self) -> bool {
        matches!(
            self,
            TemporalUnit::Year | TemporalUnit::Quarter | TemporalUnit::Month
        )
    }

    /// The unit differences in this unit's family are computed in.
    pub fn normalized(self) -> TemporalUnit {
        match self {
            TemporalUnit::Year | TemporalUnit::Quarter | TemporalUnit::Month => {
                TemporalUnit::Month
            }
            TemporalUnit::Nanosecond => TemporalUnit::Nanosecond,
            _ => TemporalUnit::Second,
        }
    }

    /// Size of one unit: months for calendar units, nanoseconds otherwise.
    fn base_factor(self) -> u64 {
        match self {
            TemporalUnit::Year => 12,
            TemporalUnit::Quarter => 3,
            TemporalUnit::Month => 1,
            TemporalUnit::Week => 7 * 86_400 * NANOS_PER_SECOND,
            TemporalUnit::Day => 86_400 * NANOS_PER_SECOND,
            TemporalUnit::Hour => 3_600 * NANOS_PER_SECOND,
            TemporalUnit::Minute => 60 * NANOS_PER_SECOND,
            TemporalUnit::Second => NANOS_PER_SECOND,
            TemporalUnit::Nanosecond => 1,
        }
    }

    /// SQL suffix converting an amount in this unit into `unit`.
    ///
    /// `YEAR -> MONTH` is `*12`, `SECOND -> HOUR` is `/3600`; the same unit
    /// gives an empty string. Units from different families cannot be
    /// converted.
    pub fn conversion_factor(self, unit: TemporalUnit) -> Result<String> {
        if self == unit {
            return Ok(String::new());
        }
        if self.is_calendar_unit() != unit.is_calendar_unit() {
            return Err(Error::Query {
                message: format!("illegal unit conversion {} to {}", self, unit),
                query: String::new(),
            });
        }
        let from = self.base_factor();
        let to = unit.base_factor();
        if from >= to {
            Ok(format!("*{}", from / to))
        } else {
            Ok(format!("/{}", to / from))
        }
    }
}

impl fmt::Display for TemporalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalizes_by_family() {
        assert_eq!(TemporalUnit::Year.normalized(), TemporalUnit::Month);
        assert_eq!(TemporalUnit::Quarter.normalized(), TemporalUnit::Month);
        assert_eq!(TemporalUnit::Week.normalized(), TemporalUnit::Second);
        assert_eq!(TemporalUnit::Minute.normalized(), TemporalUnit::Second);
        assert_eq!(TemporalUnit::Nanosecond.normalized(), TemporalUnit::Nanosecond);
    }

    #[test]
    fn test_conversion_factors() {
        assert_eq!(TemporalUnit::Year.conversion_factor(TemporalUnit::Month).unwrap(), "*12");
        assert_eq!(TemporalUnit::Month.conversion_factor(TemporalUnit::Quarter).unwrap(), "/3");
        assert_eq!(TemporalUnit::Week.conversion_factor(TemporalUnit::Second).unwrap(), "*604800");
        assert_eq!(TemporalUnit::Second.conversion_factor(TemporalUnit::Hour).unwrap(), "/3600");
        assert_eq!(
            TemporalUnit::Second.conversion_factor(TemporalUnit::Nanosecond).unwrap(),
            "*1000000000"
        );
        assert_eq!(TemporalUnit::Day.conversion_factor(TemporalUnit::Day).unwrap(), "");
    }

    #[test]
    fn test_cross_family_conversion_fails() {
        assert!(TemporalUnit::Month.conversion_factor(TemporalUnit::Day).is_err());
        assert!(TemporalUnit::Second.conversion_factor(TemporalUnit::Year).is_err());
    }

    #[test]
    fn test_parses_names() {
        assert_eq!(TemporalUnit::from_name("DAY"), Some(TemporalUnit::Day));
        assert_eq!(TemporalUnit::from_name("Nanosecond"), Some(TemporalUnit::Nanosecond));
        assert_eq!(TemporalUnit::from_name("fortnight"), None);
    }
}
