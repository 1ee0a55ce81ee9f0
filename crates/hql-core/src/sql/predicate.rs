//! Boolean expression tree of the SQL AST.
//!
//! A predicate is empty when it contributes no SQL. Only a childless
//! [`Junction`], an empty filter fragment, or a wrapper around an empty
//! predicate is empty; a junction of empty children is not, though the
//! renderer emits nothing for it.

use super::ast::{Expression, ParameterSpec, SelectStatement};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Filter(FilterPredicate),
    Grouped(Box<Predicate>),
    InList(InListPredicate),
    InSubQuery(InSubQueryPredicate),
    Junction(Junction),
    Like(LikePredicate),
    Negated(Box<Predicate>),
    Nullness(NullnessPredicate),
    Relational(RelationalPredicate),
}

impl Predicate {
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Filter(filter) => filter.fragment.trim().is_empty(),
            Predicate::Grouped(inner) | Predicate::Negated(inner) => inner.is_empty(),
            Predicate::Junction(junction) => junction.is_empty(),
            Predicate::InList(_)
            | Predicate::InSubQuery(_)
            | Predicate::Like(_)
            | Predicate::Nullness(_)
            | Predicate::Relational(_) => false,
        }
    }

    pub fn relational(lhs: Expression, operator: Operator, rhs: Expression) -> Self {
        Predicate::Relational(RelationalPredicate { lhs, operator, rhs })
    }

    pub fn negated(inner: Predicate) -> Self {
        Predicate::Negated(Box::new(inner))
    }

    /// Conjunction of two predicates, flattening an existing conjunction.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Self {
        match lhs {
            Predicate::Junction(mut junction) if junction.nature == JunctionNature::Conjunction => {
                junction.add(rhs);
                Predicate::Junction(junction)
            }
            lhs => {
                let mut junction = Junction::new(JunctionNature::Conjunction);
                junction.add(lhs);
                junction.add(rhs);
                Predicate::Junction(junction)
            }
        }
    }
}

/// A raw SQL fragment with its own bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub fragment: String,
    pub parameters: Vec<ParameterSpec>,
}

impl FilterPredicate {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InListPredicate {
    pub test: Expression,
    pub list: Vec<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InSubQueryPredicate {
    pub test: Expression,
    pub sub_query: Box<SelectStatement>,
    pub negated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionNature {
    Conjunction,
    Disjunction,
}

impl JunctionNature {
    pub fn sql_text(self) -> &'static str {
        match self {
            JunctionNature::Conjunction => "and",
            JunctionNature::Disjunction => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub nature: JunctionNature,
    predicates: Vec<Predicate>,
}

impl Junction {
    pub fn new(nature: JunctionNature) -> Self {
        Self {
            nature,
            predicates: Vec::new(),
        }
    }

    pub fn add(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LikePredicate {
    pub match_expression: Expression,
    pub pattern: Expression,
    pub escape: Option<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullnessPredicate {
    pub expression: Expression,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationalPredicate {
    pub lhs: Expression,
    pub operator: Operator,
    pub rhs: Expression,
}

/// Comparison operator of a [`RelationalPredicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
    ];

    /// The operator testing the complement: `not (a > b)` is `a <= b`.
    pub fn negate(self) -> Operator {
        match self {
            Operator::Equal => Operator::NotEqual,
            Operator::NotEqual => Operator::Equal,
            Operator::GreaterThan => Operator::LessThanOrEqual,
            Operator::LessThanOrEqual => Operator::GreaterThan,
            Operator::GreaterThanOrEqual => Operator::LessThan,
            Operator::LessThan => Operator::GreaterThanOrEqual,
        }
    }

    /// The operator with operands swapped: `a > b` is `b < a`.
    pub fn invert(self) -> Operator {
        match self {
            Operator::Equal => Operator::Equal,
            Operator::NotEqual => Operator::NotEqual,
            Operator::GreaterThan => Operator::LessThan,
            Operator::LessThan => Operator::GreaterThan,
            Operator::GreaterThanOrEqual => Operator::LessThanOrEqual,
            Operator::LessThanOrEqual => Operator::GreaterThanOrEqual,
        }
    }

    pub fn sql_text(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    #[test]
    fn test_negation_is_an_involution() {
        for op in Operator::ALL {
            assert_eq!(op.negate().negate(), op);
            assert_ne!(op.negate(), op);
            assert_eq!(op.invert().invert(), op);
        }
    }

    #[test]
    fn test_sql_text_is_bijective() {
        let texts: HashSet<&str> = Operator::ALL.iter().map(|op| op.sql_text()).collect();
        let expected: HashSet<&str> = ["=", "<>", ">", ">=", "<", "<="].into_iter().collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn test_junction_emptiness_counts_children_only() {
        let mut junction = Junction::new(JunctionNature::Conjunction);
        assert!(junction.is_empty());
        junction.add(Predicate::Junction(Junction::new(JunctionNature::Disjunction)));
        assert!(!junction.is_empty());
        assert!(!Predicate::Junction(junction).is_empty());
    }

    #[test]
    fn test_wrappers_inherit_emptiness() {
        let empty = Predicate::Junction(Junction::new(JunctionNature::Conjunction));
        assert!(Predicate::Grouped(Box::new(empty.clone())).is_empty());
        assert!(Predicate::negated(empty).is_empty());
        assert!(Predicate::Filter(FilterPredicate::new("  ")).is_empty());

        let test = Predicate::Nullness(NullnessPredicate {
            expression: Expression::Literal(Value::Int32(1)),
            negated: false,
        });
        assert!(!Predicate::negated(test).is_empty());
    }

    #[test]
    fn test_and_flattens_conjunctions() {
        let a = Predicate::Filter(FilterPredicate::new("a=1"));
        let b = Predicate::Filter(FilterPredicate::new("b=1"));
        let c = Predicate::Filter(FilterPredicate::new("c=1"));
        match Predicate::and(Predicate::and(a, b), c) {
            Predicate::Junction(j) => assert_eq!(j.predicates().len(), 3),
            other => panic!("expected junction, got {:?}", other),
        }
    }
}
