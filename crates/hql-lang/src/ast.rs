//! Syntax tree for HQL statements.
//!
//! The tree is purely syntactic: names are not resolved against any mapping
//! and paths are kept as dotted segments. Semantic analysis happens when a
//! translator turns the tree into a SQL AST.

use crate::span::{Span, Spanned};

/// A top-level statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Select(s) => s.span,
            Statement::Update(u) => u.span,
            Statement::Delete(d) => d.span,
        }
    }

    /// True for `update` and `delete`.
    pub fn is_manipulation(&self) -> bool {
        !matches!(self, Statement::Select(_))
    }
}

/// `select ... from ... where ... group by ... having ... order by ...`
///
/// `from` is optional because collection filters have an implicit root.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub select: Option<SelectClause>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Condition>,
    pub group_by: Vec<Expr>,
    pub having: Option<Condition>,
    pub order_by: Vec<OrderItem>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub selection: Selection,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Plain projection list.
    Items(Vec<SelectItem>),
    /// `select new <target>(...)`.
    New {
        target: Spanned<NewTarget>,
        items: Vec<SelectItem>,
    },
}

impl Selection {
    pub fn items(&self) -> &[SelectItem] {
        match self {
            Selection::Items(items) => items,
            Selection::New { items, .. } => items,
        }
    }
}

/// What a `select new` expression builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewTarget {
    Class(String),
    Map,
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub ranges: Vec<FromRange>,
    pub span: Span,
}

/// One root in the `from` clause plus the joins hanging off it.
#[derive(Debug, Clone, PartialEq)]
pub struct FromRange {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub fetch: bool,
    pub path: Spanned<Path>,
    pub alias: Option<Spanned<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
}

/// `update Entity [alias] set ... [where ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Condition>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Spanned<Path>,
    pub value: Expr,
}

/// `delete [from] Entity [alias] [where ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub entity: Spanned<String>,
    pub alias: Option<Spanned<String>>,
    pub where_clause: Option<Condition>,
    pub span: Span,
}

/// A dotted property path such as `a.owner.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub segments: Vec<String>,
}

impl Path {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn first(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    pub fn last(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// Explicit parentheses, kept so that rendering preserves grouping.
    Paren(Box<Condition>),
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
    Like {
        expr: Expr,
        pattern: Expr,
        escape: Option<Expr>,
        negated: bool,
    },
    In {
        expr: Expr,
        target: InTarget,
        negated: bool,
    },
    IsNull {
        expr: Expr,
        negated: bool,
    },
    Between {
        expr: Expr,
        lower: Expr,
        upper: Expr,
        negated: bool,
    },
}

/// Right-hand side of an `in` condition.
#[derive(Debug, Clone, PartialEq)]
pub enum InTarget {
    List(Vec<Expr>),
    SubQuery(Box<SelectStatement>),
    /// `elements(path)`, `indices(path)` or `path.elements`.
    Collection(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Concat,
}

/// A value expression with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match &self.kind {
            ExprKind::Path(path) => Some(path),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Path(Path),
    NamedParam(String),
    PositionalParam(Option<u32>),
    Function {
        name: String,
        distinct: bool,
        /// `count(*)`
        star: bool,
        args: Vec<Expr>,
    },
    Binary {
        op: ArithmeticOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Negate(Box<Expr>),
    SubQuery(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}
