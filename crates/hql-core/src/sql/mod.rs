//! SQL abstract syntax tree, predicates and rendering.

pub mod ast;
pub mod predicate;
pub mod render;
mod temporal;

pub use ast::{
    ArithmeticOperator, Assignment, ColumnReference, DeleteStatement, Expression, ParameterSpec,
    SelectStatement, SortSpecification, SqlJoinType, SqlSelection, SqlStatement, TableGroup,
    TableJoin, TableReference, UpdateStatement,
};
pub use predicate::{
    FilterPredicate, InListPredicate, InSubQueryPredicate, Junction, JunctionNature,
    LikePredicate, NullnessPredicate, Operator, Predicate, RelationalPredicate,
};
pub use render::{JdbcOperation, SqlAstRenderer};
pub use temporal::TemporalUnit;
