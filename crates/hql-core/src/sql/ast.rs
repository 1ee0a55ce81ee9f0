//! Dialect-independent SQL tree produced by the translators.

use super::predicate::Predicate;
use super::temporal::TemporalUnit;
use crate::value::Value;

/// `qualifier.column`, or a bare column in DML statements.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    pub qualifier: Option<String>,
    pub column: String,
}

impl ColumnReference {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            column: column.into(),
        }
    }

    pub fn unqualified(column: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            column: column.into(),
        }
    }
}

/// Where the value of a `?` placeholder comes from at execution time.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterSpec {
    Named(String),
    /// Zero-based position among the query's positional parameters.
    Ordinal(u32),
    /// A value fixed at compile time, such as a limit.
    Fixed(Value),
    /// The owning key of the collection being filtered.
    CollectionKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
}

impl ArithmeticOperator {
    pub fn sql_text(self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Concat => "||",
        }
    }

    pub(crate) fn precedence(self) -> u8 {
        match self {
            ArithmeticOperator::Concat => 0,
            ArithmeticOperator::Add | ArithmeticOperator::Subtract => 1,
            ArithmeticOperator::Multiply | ArithmeticOperator::Divide => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnReference),
    Literal(Value),
    /// Verbatim SQL, e.g. a query substitution.
    Fragment(String),
    Parameter(ParameterSpec),
    SubQuery(Box<SelectStatement>),
    Function {
        name: String,
        distinct: bool,
        args: Vec<Expression>,
    },
    /// `*` in `count(*)`.
    Star,
    Arithmetic {
        op: ArithmeticOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Negated(Box<Expression>),
    TimestampDiff {
        unit: TemporalUnit,
        from: Box<Expression>,
        to: Box<Expression>,
    },
    TimestampAdd {
        unit: TemporalUnit,
        magnitude: Box<Expression>,
        to: Box<Expression>,
    },
}

impl Expression {
    pub fn column(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Expression::Column(ColumnReference::new(qualifier, column))
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            distinct: false,
            args,
        }
    }

    pub fn count_star() -> Self {
        Expression::function("count", vec![Expression::Star])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelection {
    pub expression: Expression,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    pub table: String,
    pub alias: String,
}

impl TableReference {
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinType {
    Inner,
    LeftOuter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableJoin {
    pub join_type: SqlJoinType,
    pub table: TableReference,
    pub predicate: Predicate,
}

/// A root table and the tables joined to it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    pub table: TableReference,
    pub joins: Vec<TableJoin>,
}

impl TableGroup {
    pub fn new(table: TableReference) -> Self {
        Self {
            table,
            joins: Vec::new(),
        }
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.table.alias == alias || self.joins.iter().any(|j| j.table.alias == alias)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub selections: Vec<SqlSelection>,
    pub from: Vec<TableGroup>,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<Expression>,
    pub having: Option<Predicate>,
    pub order_by: Vec<SortSpecification>,
}

impl SelectStatement {
    /// AND `predicate` onto the where clause.
    pub fn restrict(&mut self, predicate: Predicate) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => Predicate::and(existing, predicate),
            None => predicate,
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub where_clause: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl SqlStatement {
    pub fn as_select(&self) -> Option<&SelectStatement> {
        match self {
            SqlStatement::Select(select) => Some(select),
            _ => None,
        }
    }

    /// Tables the statement reads or writes, in order of appearance.
    pub fn tables(&self) -> Vec<String> {
        let mut tables = Vec::new();
        match self {
            SqlStatement::Select(select) => {
                for group in &select.from {
                    tables.push(group.table.table.clone());
                    tables.extend(group.joins.iter().map(|j| j.table.table.clone()));
                }
            }
            SqlStatement::Update(update) => tables.push(update.table.clone()),
            SqlStatement::Delete(delete) => tables.push(delete.table.clone()),
        }
        tables.dedup();
        tables
    }
}
