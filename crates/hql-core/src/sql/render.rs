//! SQL text generation.
//!
//! [`SqlAstRenderer`] walks statements, predicates and expressions with a
//! single exhaustive match per node kind, writing SQL and collecting the
//! bind parameters in the order their placeholders appear.

use super::ast::{
    ArithmeticOperator, DeleteStatement, Expression, ParameterSpec, SelectStatement, SqlJoinType,
    SqlStatement, TableGroup, UpdateStatement,
};
use super::predicate::{Junction, Predicate};
use crate::dialect::Dialect;
use crate::value::Value;

/// Rendered SQL plus the parameters to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcOperation {
    pub sql: String,
    pub parameters: Vec<ParameterSpec>,
}

pub struct SqlAstRenderer<'a> {
    dialect: &'a dyn Dialect,
    sql: String,
    parameters: Vec<ParameterSpec>,
}

impl<'a> SqlAstRenderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn render(dialect: &dyn Dialect, statement: &SqlStatement) -> JdbcOperation {
        let mut renderer = SqlAstRenderer::new(dialect);
        match statement {
            SqlStatement::Select(select) => renderer.visit_select(select),
            SqlStatement::Update(update) => renderer.visit_update(update),
            SqlStatement::Delete(delete) => renderer.visit_delete(delete),
        }
        renderer.finish()
    }

    /// Render a select with the dialect's row limiting appended.
    pub fn render_limited(
        dialect: &dyn Dialect,
        select: &SelectStatement,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> JdbcOperation {
        let mut renderer = SqlAstRenderer::new(dialect);
        renderer.visit_select(select);
        let (suffix, values) = dialect.limit_offset(limit, offset);
        renderer.sql.push_str(&suffix);
        renderer
            .parameters
            .extend(values.into_iter().map(ParameterSpec::Fixed));
        renderer.finish()
    }

    pub fn render_predicate(dialect: &dyn Dialect, predicate: &Predicate) -> JdbcOperation {
        let mut renderer = SqlAstRenderer::new(dialect);
        renderer.visit_predicate(predicate);
        renderer.finish()
    }

    pub fn finish(self) -> JdbcOperation {
        JdbcOperation {
            sql: self.sql,
            parameters: self.parameters,
        }
    }

    fn visit_select(&mut self, select: &SelectStatement) {
        self.sql.push_str("select ");
        if select.distinct {
            self.sql.push_str("distinct ");
        }
        for (i, selection) in select.selections.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_expression(&selection.expression);
            if let Some(alias) = &selection.alias {
                self.sql.push_str(" as ");
                self.sql.push_str(alias);
            }
        }

        self.sql.push_str(" from ");
        for (i, group) in select.from.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_table_group(group);
        }

        if let Some(predicate) = &select.where_clause {
            self.clause(" where ", predicate);
        }

        if !select.group_by.is_empty() {
            self.sql.push_str(" group by ");
            self.expression_list(&select.group_by);
        }

        if let Some(predicate) = &select.having {
            self.clause(" having ", predicate);
        }

        if !select.order_by.is_empty() {
            self.sql.push_str(" order by ");
            for (i, sort) in select.order_by.iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.visit_expression(&sort.expression);
                if sort.descending {
                    self.sql.push_str(" desc");
                }
            }
        }
    }

    fn visit_table_group(&mut self, group: &TableGroup) {
        self.sql.push_str(&group.table.table);
        self.sql.push(' ');
        self.sql.push_str(&group.table.alias);
        for join in &group.joins {
            self.sql.push_str(match join.join_type {
                SqlJoinType::Inner => " inner join ",
                SqlJoinType::LeftOuter => " left outer join ",
            });
            self.sql.push_str(&join.table.table);
            self.sql.push(' ');
            self.sql.push_str(&join.table.alias);
            let mark = self.sql.len();
            self.sql.push_str(" on ");
            let start = self.sql.len();
            self.visit_predicate(&join.predicate);
            if self.sql.len() == start {
                self.sql.truncate(mark);
                self.sql.push_str(" on 1=1");
            }
        }
    }

    fn visit_update(&mut self, update: &UpdateStatement) {
        self.sql.push_str("update ");
        self.sql.push_str(&update.table);
        self.sql.push_str(" set ");
        for (i, assignment) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.sql.push_str(&assignment.column);
            self.sql.push('=');
            self.visit_expression(&assignment.value);
        }
        if let Some(predicate) = &update.where_clause {
            self.clause(" where ", predicate);
        }
    }

    fn visit_delete(&mut self, delete: &DeleteStatement) {
        self.sql.push_str("delete from ");
        self.sql.push_str(&delete.table);
        if let Some(predicate) = &delete.where_clause {
            self.clause(" where ", predicate);
        }
    }

    /// Write `keyword predicate`, or nothing if the predicate renders empty.
    fn clause(&mut self, keyword: &str, predicate: &Predicate) {
        if predicate.is_empty() {
            return;
        }
        let mark = self.sql.len();
        self.sql.push_str(keyword);
        let start = self.sql.len();
        self.visit_predicate(predicate);
        if self.sql.len() == start {
            self.sql.truncate(mark);
        }
    }

    /// Write `prefix inner )`, or nothing if `inner` renders empty.
    fn wrapped(&mut self, prefix: &str, inner: &Predicate) {
        let mark = self.sql.len();
        self.sql.push_str(prefix);
        let start = self.sql.len();
        self.visit_predicate(inner);
        if self.sql.len() == start {
            self.sql.truncate(mark);
        } else {
            self.sql.push(')');
        }
    }

    fn visit_predicate(&mut self, predicate: &Predicate) {
        if predicate.is_empty() {
            return;
        }
        match predicate {
            Predicate::Filter(filter) => {
                self.sql.push_str(&filter.fragment);
                self.parameters.extend(filter.parameters.iter().cloned());
            }
            Predicate::Grouped(inner) => self.wrapped("(", inner),
            Predicate::InList(in_list) => {
                if in_list.list.is_empty() {
                    self.sql
                        .push_str(if in_list.negated { "1=1" } else { "1=0" });
                    return;
                }
                self.visit_expression(&in_list.test);
                self.sql
                    .push_str(if in_list.negated { " not in (" } else { " in (" });
                self.expression_list(&in_list.list);
                self.sql.push(')');
            }
            Predicate::InSubQuery(in_sub) => {
                self.visit_expression(&in_sub.test);
                self.sql
                    .push_str(if in_sub.negated { " not in (" } else { " in (" });
                self.visit_select(&in_sub.sub_query);
                self.sql.push(')');
            }
            Predicate::Junction(junction) => self.visit_junction(junction),
            Predicate::Like(like) => {
                self.visit_expression(&like.match_expression);
                self.sql
                    .push_str(if like.negated { " not like " } else { " like " });
                self.visit_expression(&like.pattern);
                if let Some(escape) = &like.escape {
                    self.sql.push_str(" escape ");
                    self.visit_expression(escape);
                }
            }
            Predicate::Negated(inner) => self.wrapped("not (", inner),
            Predicate::Nullness(nullness) => {
                self.visit_expression(&nullness.expression);
                self.sql.push_str(if nullness.negated {
                    " is not null"
                } else {
                    " is null"
                });
            }
            Predicate::Relational(relational) => {
                self.visit_expression(&relational.lhs);
                self.sql.push_str(relational.operator.sql_text());
                self.visit_expression(&relational.rhs);
            }
        }
    }

    fn visit_junction(&mut self, junction: &Junction) {
        let separator = format!(" {} ", junction.nature.sql_text());
        let mut first = true;
        for child in junction.predicates() {
            let mark = self.sql.len();
            if !first {
                self.sql.push_str(&separator);
            }
            let parenthesize = matches!(
                child,
                Predicate::Junction(inner)
                    if inner.nature != junction.nature && inner.predicates().len() > 1
            );
            if parenthesize {
                self.sql.push('(');
            }
            let body = self.sql.len();
            self.visit_predicate(child);
            if self.sql.len() == body {
                self.sql.truncate(mark);
                continue;
            }
            if parenthesize {
                self.sql.push(')');
            }
            first = false;
        }
    }

    fn expression_list(&mut self, expressions: &[Expression]) {
        for (i, expression) in expressions.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.visit_expression(expression);
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Column(column) => {
                if let Some(qualifier) = &column.qualifier {
                    self.sql.push_str(qualifier);
                    self.sql.push('.');
                }
                self.sql.push_str(&column.column);
            }
            Expression::Literal(value) => self.visit_literal(value),
            Expression::Fragment(fragment) => self.sql.push_str(fragment),
            Expression::Parameter(spec) => {
                self.sql.push('?');
                self.parameters.push(spec.clone());
            }
            Expression::SubQuery(select) => {
                self.sql.push('(');
                self.visit_select(select);
                self.sql.push(')');
            }
            Expression::Function {
                name,
                distinct,
                args,
            } => {
                self.sql.push_str(name);
                self.sql.push('(');
                if *distinct {
                    self.sql.push_str("distinct ");
                }
                self.expression_list(args);
                self.sql.push(')');
            }
            Expression::Star => self.sql.push('*'),
            Expression::Arithmetic { op, lhs, rhs } => {
                if *op == ArithmeticOperator::Concat {
                    let pattern = self.dialect.concat_pattern();
                    self.render_pattern(pattern, &[lhs, rhs]);
                    return;
                }
                self.operand(lhs, op.precedence(), false);
                self.sql.push_str(op.sql_text());
                let strict = matches!(op, ArithmeticOperator::Subtract | ArithmeticOperator::Divide);
                self.operand(rhs, op.precedence(), strict);
            }
            Expression::Negated(inner) => {
                self.sql.push('-');
                self.operand(inner, u8::MAX, false);
            }
            Expression::TimestampDiff { unit, from, to } => {
                let pattern = self.dialect.timestampdiff_pattern(*unit);
                self.render_pattern(&pattern, &[from, to]);
            }
            Expression::TimestampAdd {
                unit,
                magnitude,
                to,
            } => {
                let pattern = self.dialect.timestampadd_pattern(*unit);
                self.render_pattern(&pattern, &[magnitude, to]);
            }
        }
    }

    /// Operand of a binary operator, parenthesized when it binds looser.
    fn operand(&mut self, expression: &Expression, precedence: u8, strict: bool) {
        let wrap = match expression {
            Expression::Arithmetic { op, .. } if *op != ArithmeticOperator::Concat => {
                op.precedence() < precedence || (strict && op.precedence() == precedence)
            }
            _ => false,
        };
        if wrap {
            self.sql.push('(');
        }
        self.visit_expression(expression);
        if wrap {
            self.sql.push(')');
        }
    }

    fn visit_literal(&mut self, value: &Value) {
        match value {
            Value::Null => self.sql.push_str("null"),
            Value::Bool(b) => self.sql.push_str(if *b { "true" } else { "false" }),
            Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_) => self.sql.push_str(&value.to_string()),
            Value::String(s) | Value::Enum(s) => {
                self.sql.push('\'');
                self.sql.push_str(&s.replace('\'', "''"));
                self.sql.push('\'');
            }
            Value::Bytes(_)
            | Value::Timestamp(_)
            | Value::Uuid(_)
            | Value::Entity(_)
            | Value::Unfetched => {
                self.sql.push('?');
                self.parameters.push(ParameterSpec::Fixed(value.clone()));
            }
        }
    }

    /// Substitute `?1`, `?2`, ... in a dialect pattern with rendered arguments.
    fn render_pattern(&mut self, pattern: &str, args: &[&Expression]) {
        let mut chars = pattern.char_indices().peekable();
        while let Some((_, c)) = chars.next() {
            if c != '?' {
                self.sql.push(c);
                continue;
            }
            let mut index = String::new();
            while let Some(&(_, d)) = chars.peek() {
                if !d.is_ascii_digit() {
                    break;
                }
                index.push(d);
                chars.next();
            }
            let arg = index
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|n| args.get(n));
            match arg {
                Some(arg) => self.visit_expression(arg),
                None => {
                    self.sql.push('?');
                    self.sql.push_str(&index);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySQLDialect, PostgreSQLDialect};
    use crate::sql::ast::{SqlSelection, TableReference};
    use crate::sql::predicate::{
        FilterPredicate, InListPredicate, JunctionNature, NullnessPredicate, Operator,
    };
    use crate::sql::TemporalUnit;
    use pretty_assertions::assert_eq;

    fn dog_select() -> SelectStatement {
        SelectStatement {
            selections: vec![SqlSelection {
                expression: Expression::column("dog0_", "name"),
                alias: Some("col_0_0_".into()),
            }],
            from: vec![TableGroup::new(TableReference::new("dogs", "dog0_"))],
            ..Default::default()
        }
    }

    #[test]
    fn test_renders_simple_select() {
        let mut select = dog_select();
        select.restrict(Predicate::relational(
            Expression::column("dog0_", "age"),
            Operator::GreaterThan,
            Expression::Parameter(ParameterSpec::Named("age".into())),
        ));
        let op = SqlAstRenderer::render(&PostgreSQLDialect, &SqlStatement::Select(select));
        assert_eq!(
            op.sql,
            "select dog0_.name as col_0_0_ from dogs dog0_ where dog0_.age>?"
        );
        assert_eq!(op.parameters, vec![ParameterSpec::Named("age".into())]);
    }

    #[test]
    fn test_empty_predicates_leave_no_where() {
        let mut select = dog_select();
        let mut junction = Junction::new(JunctionNature::Conjunction);
        junction.add(Predicate::Junction(Junction::new(JunctionNature::Disjunction)));
        junction.add(Predicate::Filter(FilterPredicate::new("")));
        select.where_clause = Some(Predicate::Junction(junction));
        let op = SqlAstRenderer::render(&PostgreSQLDialect, &SqlStatement::Select(select));
        assert_eq!(op.sql, "select dog0_.name as col_0_0_ from dogs dog0_");
    }

    #[test]
    fn test_skips_empty_children_and_groups_mixed_junctions() {
        let mut or = Junction::new(JunctionNature::Disjunction);
        or.add(Predicate::Filter(FilterPredicate::new("a=1")));
        or.add(Predicate::Filter(FilterPredicate::new("b=1")));
        let mut and = Junction::new(JunctionNature::Conjunction);
        and.add(Predicate::Junction(Junction::new(JunctionNature::Conjunction)));
        and.add(Predicate::Junction(or));
        and.add(Predicate::Nullness(NullnessPredicate {
            expression: Expression::column("t", "c"),
            negated: true,
        }));
        let op = SqlAstRenderer::render_predicate(&PostgreSQLDialect, &Predicate::Junction(and));
        assert_eq!(op.sql, "(a=1 or b=1) and t.c is not null");
    }

    #[test]
    fn test_wrappers_around_empty_junctions_render_nothing() {
        let hollow = || {
            let mut junction = Junction::new(JunctionNature::Conjunction);
            junction.add(Predicate::Junction(Junction::new(JunctionNature::Disjunction)));
            Predicate::Junction(junction)
        };
        let negated = Predicate::negated(hollow());
        let grouped = Predicate::Grouped(Box::new(hollow()));
        assert_eq!(SqlAstRenderer::render_predicate(&PostgreSQLDialect, &negated).sql, "");
        assert_eq!(SqlAstRenderer::render_predicate(&PostgreSQLDialect, &grouped).sql, "");

        let mut select = dog_select();
        select.where_clause = Some(negated);
        let op = SqlAstRenderer::render(&PostgreSQLDialect, &SqlStatement::Select(select));
        assert_eq!(op.sql, "select dog0_.name as col_0_0_ from dogs dog0_");

        let mut and = Junction::new(JunctionNature::Conjunction);
        and.add(grouped);
        and.add(Predicate::negated(Predicate::Filter(FilterPredicate::new("a=1"))));
        let op = SqlAstRenderer::render_predicate(&PostgreSQLDialect, &Predicate::Junction(and));
        assert_eq!(op.sql, "not (a=1)");
    }

    #[test]
    fn test_empty_in_list() {
        let in_list = |negated| {
            Predicate::InList(InListPredicate {
                test: Expression::column("t", "c"),
                list: Vec::new(),
                negated,
            })
        };
        assert_eq!(SqlAstRenderer::render_predicate(&PostgreSQLDialect, &in_list(false)).sql, "1=0");
        assert_eq!(SqlAstRenderer::render_predicate(&PostgreSQLDialect, &in_list(true)).sql, "1=1");
    }

    #[test]
    fn test_arithmetic_parenthesizes_looser_operands() {
        let sum = Expression::Arithmetic {
            op: ArithmeticOperator::Add,
            lhs: Box::new(Expression::column("t", "a")),
            rhs: Box::new(Expression::Literal(Value::Int32(1))),
        };
        let product = Expression::Arithmetic {
            op: ArithmeticOperator::Multiply,
            lhs: Box::new(sum),
            rhs: Box::new(Expression::Literal(Value::Int32(2))),
        };
        let predicate = Predicate::relational(product, Operator::Equal, Expression::Literal(Value::Int32(4)));
        assert_eq!(
            SqlAstRenderer::render_predicate(&PostgreSQLDialect, &predicate).sql,
            "(t.a+1)*2=4"
        );
    }

    #[test]
    fn test_patterns_collect_parameters_in_placement_order() {
        let diff = Expression::TimestampDiff {
            unit: TemporalUnit::Day,
            from: Box::new(Expression::Parameter(ParameterSpec::Named("from".into()))),
            to: Box::new(Expression::Parameter(ParameterSpec::Named("to".into()))),
        };
        let predicate = Predicate::relational(diff, Operator::GreaterThan, Expression::Literal(Value::Int32(1)));
        let op = SqlAstRenderer::render_predicate(&MySQLDialect, &predicate);
        assert_eq!(op.sql, "timestampdiff(day,?,?)>1");
        assert_eq!(
            op.parameters,
            vec![ParameterSpec::Named("from".into()), ParameterSpec::Named("to".into())]
        );
    }

    #[test]
    fn test_concat_uses_dialect_pattern() {
        let concat = Expression::Arithmetic {
            op: ArithmeticOperator::Concat,
            lhs: Box::new(Expression::column("t", "a")),
            rhs: Box::new(Expression::Literal(Value::String("x'y".into()))),
        };
        let predicate = Predicate::relational(concat, Operator::Equal, Expression::Literal(Value::Null));
        assert_eq!(
            SqlAstRenderer::render_predicate(&MySQLDialect, &predicate).sql,
            "concat(t.a,'x''y')=null"
        );
        assert_eq!(
            SqlAstRenderer::render_predicate(&PostgreSQLDialect, &predicate).sql,
            "(t.a||'x''y')=null"
        );
    }

    #[test]
    fn test_limit_parameters_follow_query_parameters() {
        let mut select = dog_select();
        select.restrict(Predicate::relational(
            Expression::column("dog0_", "id"),
            Operator::Equal,
            Expression::Parameter(ParameterSpec::Ordinal(0)),
        ));
        let op = SqlAstRenderer::render_limited(&PostgreSQLDialect, &select, Some(5), Some(10));
        assert!(op.sql.ends_with(" where dog0_.id=? limit ? offset ?"));
        assert_eq!(
            op.parameters,
            vec![
                ParameterSpec::Ordinal(0),
                ParameterSpec::Fixed(Value::Int64(5)),
                ParameterSpec::Fixed(Value::Int64(10)),
            ]
        );
    }

    #[test]
    fn test_renders_dml() {
        let delete = SqlStatement::Delete(DeleteStatement {
            table: "dogs".into(),
            where_clause: Some(Predicate::relational(
                Expression::Column(crate::sql::ast::ColumnReference::unqualified("age")),
                Operator::LessThan,
                Expression::Literal(Value::Int32(2)),
            )),
        });
        assert_eq!(
            SqlAstRenderer::render(&PostgreSQLDialect, &delete).sql,
            "delete from dogs where age<2"
        );
    }
}
