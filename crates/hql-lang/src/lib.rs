//! HQL query language front end.
//!
//! This crate turns HQL text into a syntax tree. It has no knowledge of
//! mappings or SQL; resolution and translation live in `hql-core`.
//!
//! # Syntax
//!
//! ```text
//! from Animal
//! select a.name from Animal a where a.age > :min order by a.name desc
//! select new map(d.name as name, count(k) as kittens) from Dog d left join d.kittens k group by d.name
//! update Dog d set d.name = :name where d.id = ?1
//! delete from Dog where name like 'R%'
//! ```
//!
//! Collection filters omit the `from` clause:
//!
//! ```text
//! where this.age > 3 order by this.name
//! ```
//!
//! # Usage
//!
//! ```rust
//! use hql_lang::{parse, Statement};
//!
//! let stmt = parse("from Dog d where d.name = 'Rex'").unwrap();
//! assert!(matches!(stmt, Statement::Select(_)));
//! ```

pub mod ast;
pub mod collection_properties;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod tokenizer;

pub use ast::{
    ArithmeticOp, Assignment, CompareOp, Condition, DeleteStatement, Expr, ExprKind, FromClause,
    FromRange, InTarget, Join, JoinKind, Literal, NewTarget, OrderItem, Path, SelectClause,
    SelectItem, SelectStatement, Selection, Statement, UpdateStatement,
};
pub use collection_properties::CollectionProperties;
pub use error::ParseError;
pub use span::{Span, Spanned};

/// Parse an HQL statement.
///
/// # Example
///
/// ```rust
/// use hql_lang::parse;
///
/// let stmt = parse("select a from Animal a").unwrap();
/// assert!(!stmt.is_manipulation());
/// ```
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    parser::parse(source)
}

/// Parse a collection filter, which has no `from` clause of its own.
///
/// # Example
///
/// ```rust
/// use hql_lang::parse_filter;
///
/// let filter = parse_filter("where this.age > 1").unwrap();
/// assert!(filter.from.is_none());
/// ```
pub fn parse_filter(source: &str) -> Result<SelectStatement, ParseError> {
    parser::parse_filter(source)
}

/// Tokenize a source string (for debugging/testing).
pub fn tokenize(source: &str) -> Result<Vec<lexer::SpannedToken>, ParseError> {
    lexer::tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let stmt = parse("from Dog").unwrap();
        assert!(matches!(stmt, Statement::Select(_)));
    }

    #[test]
    fn test_parse_manipulation() {
        assert!(parse("delete Dog").unwrap().is_manipulation());
        assert!(parse("update Dog set name = 'x'").unwrap().is_manipulation());
    }

    #[test]
    fn test_error_with_source_context() {
        let source = "from Dog d where d.name = ";
        let err = parse(source).unwrap_err();
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1"));
        assert!(formatted.contains("error"));
    }

    #[test]
    fn test_complex_query() {
        let source = r#"
            select d.name, count(k)
            from Dog d
                left join d.kittens k
            where d.age between 1 and 10
              and (d.name like 'R%' or d.owner is null)
            group by d.name
            having count(k) > 0
            order by d.name
        "#;
        let Statement::Select(s) = parse(source).unwrap() else {
            panic!("expected select");
        };
        assert_eq!(s.from.unwrap().ranges[0].joins.len(), 1);
        assert_eq!(s.group_by.len(), 1);
        assert!(s.having.is_some());
        assert_eq!(s.order_by.len(), 1);
    }

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("from Dog").unwrap();
        assert_eq!(tokens.len(), 2);
    }
}
