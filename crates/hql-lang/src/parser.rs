//! Recursive descent parser for HQL.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::{Span, Spanned};

/// Parser over a fully lexed query.
pub struct Parser<'source> {
    source: &'source str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Result<Self, ParseError> {
        Ok(Self {
            source,
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    /// Parse a complete `select`, `update` or `delete` statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let statement = match self.peek() {
            Some(Token::Update) => Statement::Update(self.parse_update()?),
            Some(Token::Delete) => Statement::Delete(self.parse_delete()?),
            Some(Token::Select) | Some(Token::From) => {
                Statement::Select(self.parse_select(false)?)
            }
            Some(other) => {
                let message = format!("expected select, from, update or delete, found {}", other);
                return Err(ParseError::new(message, self.current_span()));
            }
            None => {
                return Err(ParseError::unexpected_end(
                    "select, from, update or delete",
                    self.source,
                ))
            }
        };
        self.expect_end()?;
        Ok(statement)
    }

    /// Parse a collection filter, whose `from` clause is implicit.
    pub fn parse_filter(&mut self) -> Result<SelectStatement, ParseError> {
        let statement = self.parse_select(true)?;
        self.expect_end()?;
        Ok(statement)
    }

    fn parse_select(&mut self, from_optional: bool) -> Result<SelectStatement, ParseError> {
        let start = self.current_span().start;

        let select = if self.check(&Token::Select) {
            Some(self.parse_select_clause()?)
        } else {
            None
        };

        let from = if self.check(&Token::From) {
            Some(self.parse_from_clause()?)
        } else if from_optional {
            None
        } else {
            return Err(self.error_here("expected 'from'"));
        };

        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat(&Token::Group) {
            self.expect(&Token::By, "'by'")?;
            group_by = self.parse_expr_list()?;
        }

        let having = if self.eat(&Token::Having) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.eat(&Token::Order) {
            self.expect(&Token::By, "'by'")?;
            loop {
                let expr = self.parse_expr()?;
                let descending = if self.eat(&Token::Desc) {
                    true
                } else {
                    self.eat(&Token::Asc);
                    false
                };
                order_by.push(OrderItem { expr, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        Ok(SelectStatement {
            select,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            span: Span::new(start, self.previous_end().max(start)),
        })
    }

    fn parse_select_clause(&mut self) -> Result<SelectClause, ParseError> {
        let start = self.expect(&Token::Select, "'select'")?.span;
        let distinct = self.eat(&Token::Distinct);

        let selection = if self.eat(&Token::New) {
            let name = self.parse_qualified_name()?;
            let target = name.map(|n| match n.to_ascii_lowercase().as_str() {
                "map" => NewTarget::Map,
                "list" => NewTarget::List,
                _ => NewTarget::Class(n),
            });
            self.expect(&Token::LParen, "'('")?;
            let items = self.parse_select_items()?;
            self.expect(&Token::RParen, "')'")?;
            Selection::New { target, items }
        } else {
            Selection::Items(self.parse_select_items()?)
        };

        Ok(SelectClause {
            distinct,
            selection,
            span: start.to(Span::new(self.previous_end(), self.previous_end())),
        })
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        let mut items = Vec::new();
        loop {
            let expr = self.parse_expr()?;
            let alias = self.parse_optional_alias()?;
            items.push(SelectItem { expr, alias });
            if !self.eat(&Token::Comma) {
                return Ok(items);
            }
        }
    }

    fn parse_from_clause(&mut self) -> Result<FromClause, ParseError> {
        let start = self.expect(&Token::From, "'from'")?.span;
        let mut ranges = Vec::new();

        loop {
            let entity = self.parse_qualified_name()?;
            let alias = self.parse_optional_alias()?;

            let mut joins = Vec::new();
            while let Some(kind) = self.parse_join_kind()? {
                let fetch = self.eat(&Token::Fetch);
                let path = self.parse_path()?;
                let alias = self.parse_optional_alias()?;
                joins.push(Join {
                    kind,
                    fetch,
                    path,
                    alias,
                });
            }

            ranges.push(FromRange {
                entity,
                alias,
                joins,
            });

            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok(FromClause {
            ranges,
            span: start.to(Span::new(self.previous_end(), self.previous_end())),
        })
    }

    fn parse_join_kind(&mut self) -> Result<Option<JoinKind>, ParseError> {
        if self.eat(&Token::Join) {
            return Ok(Some(JoinKind::Inner));
        }
        if self.eat(&Token::Inner) {
            self.expect(&Token::Join, "'join'")?;
            return Ok(Some(JoinKind::Inner));
        }
        if self.eat(&Token::Left) {
            self.eat(&Token::Outer);
            self.expect(&Token::Join, "'join'")?;
            return Ok(Some(JoinKind::Left));
        }
        Ok(None)
    }

    fn parse_update(&mut self) -> Result<UpdateStatement, ParseError> {
        let start = self.expect(&Token::Update, "'update'")?.span;
        let entity = self.parse_qualified_name()?;
        let alias = self.parse_optional_alias()?;
        self.expect(&Token::Set, "'set'")?;

        let mut assignments = Vec::new();
        loop {
            let target = self.parse_path()?;
            self.expect(&Token::Eq, "'='")?;
            let value = self.parse_expr()?;
            assignments.push(Assignment { target, value });
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(UpdateStatement {
            entity,
            alias,
            assignments,
            where_clause,
            span: start.to(Span::new(self.previous_end(), self.previous_end())),
        })
    }

    fn parse_delete(&mut self) -> Result<DeleteStatement, ParseError> {
        let start = self.expect(&Token::Delete, "'delete'")?.span;
        self.eat(&Token::From);
        let entity = self.parse_qualified_name()?;
        let alias = self.parse_optional_alias()?;

        let where_clause = if self.eat(&Token::Where) {
            Some(self.parse_condition()?)
        } else {
            None
        };

        Ok(DeleteStatement {
            entity,
            alias,
            where_clause,
            span: start.to(Span::new(self.previous_end(), self.previous_end())),
        })
    }

    // ---- conditions ----

    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let first = self.parse_and_condition()?;
        if !self.check(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::Or) {
            operands.push(self.parse_and_condition()?);
        }
        Ok(Condition::Or(operands))
    }

    fn parse_and_condition(&mut self) -> Result<Condition, ParseError> {
        let first = self.parse_not_condition()?;
        if !self.check(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.eat(&Token::And) {
            operands.push(self.parse_not_condition()?);
        }
        Ok(Condition::And(operands))
    }

    fn parse_not_condition(&mut self) -> Result<Condition, ParseError> {
        if self.eat(&Token::Not) {
            return Ok(Condition::Not(Box::new(self.parse_not_condition()?)));
        }
        self.parse_condition_atom()
    }

    fn parse_condition_atom(&mut self) -> Result<Condition, ParseError> {
        if self.check(&Token::LParen) && !self.starts_subquery(1) {
            let saved = self.pos;
            self.advance();
            if let Ok(inner) = self.parse_condition() {
                if self.eat(&Token::RParen) && !self.continues_expression() {
                    return Ok(Condition::Paren(Box::new(inner)));
                }
            }
            // Not a parenthesized condition; reparse as an expression.
            self.pos = saved;
        }

        let lhs = self.parse_expr()?;

        let op = match self.peek() {
            Some(Token::Eq) => Some(CompareOp::Eq),
            Some(Token::Ne) => Some(CompareOp::Ne),
            Some(Token::Gt) => Some(CompareOp::Gt),
            Some(Token::Ge) => Some(CompareOp::Ge),
            Some(Token::Lt) => Some(CompareOp::Lt),
            Some(Token::Le) => Some(CompareOp::Le),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_expr()?;
            return Ok(Condition::Compare { lhs, op, rhs });
        }

        if self.eat(&Token::Is) {
            let negated = self.eat(&Token::Not);
            self.expect(&Token::Null, "'null'")?;
            return Ok(Condition::IsNull { expr: lhs, negated });
        }

        let negated = if self.check(&Token::Not)
            && matches!(
                self.peek_nth(1),
                Some(Token::Like) | Some(Token::In) | Some(Token::Between)
            ) {
            self.advance();
            true
        } else {
            false
        };

        if self.eat(&Token::Like) {
            let pattern = self.parse_expr()?;
            let escape = if self.eat(&Token::Escape) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            return Ok(Condition::Like {
                expr: lhs,
                pattern,
                escape,
                negated,
            });
        }

        if self.eat(&Token::In) {
            let target = self.parse_in_target()?;
            return Ok(Condition::In {
                expr: lhs,
                target,
                negated,
            });
        }

        if self.eat(&Token::Between) {
            let lower = self.parse_expr()?;
            self.expect(&Token::And, "'and'")?;
            let upper = self.parse_expr()?;
            return Ok(Condition::Between {
                expr: lhs,
                lower,
                upper,
                negated,
            });
        }

        Err(self
            .error_here("expected a comparison operator")
            .with_hint("use =, <>, <, >, like, in, between or is null"))
    }

    fn parse_in_target(&mut self) -> Result<InTarget, ParseError> {
        if !self.check(&Token::LParen) {
            return Ok(InTarget::Collection(self.parse_expr()?));
        }

        self.advance();
        if self.starts_subquery(0) {
            let query = self.parse_select(false)?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(InTarget::SubQuery(Box::new(query)));
        }

        let list = if self.check(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect(&Token::RParen, "')'")?;
        Ok(InTarget::List(list))
    }

    /// True if the next token keeps an expression going, meaning a closing
    /// parenthesis just consumed belonged to an expression, not a condition.
    fn continues_expression(&self) -> bool {
        match self.peek() {
            Some(
                Token::Eq
                | Token::Ne
                | Token::Gt
                | Token::Ge
                | Token::Lt
                | Token::Le
                | Token::Like
                | Token::In
                | Token::Is
                | Token::Between
                | Token::Plus
                | Token::Minus
                | Token::Star
                | Token::Slash
                | Token::Concat,
            ) => true,
            Some(Token::Not) => matches!(
                self.peek_nth(1),
                Some(Token::Like) | Some(Token::In) | Some(Token::Between)
            ),
            _ => false,
        }
    }

    // ---- expressions ----

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.eat(&Token::Comma) {
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithmeticOp::Add,
                Some(Token::Minus) => ArithmeticOp::Subtract,
                Some(Token::Concat) => ArithmeticOp::Concat,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithmeticOp::Multiply,
                Some(Token::Slash) => ArithmeticOp::Divide,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            let start = self.current_span();
            self.advance();
            let operand = self.parse_unary()?;
            let span = start.to(operand.span);
            let kind = match operand.kind {
                ExprKind::Literal(Literal::Int(i)) => ExprKind::Literal(Literal::Int(-i)),
                ExprKind::Literal(Literal::Float(x)) => ExprKind::Literal(Literal::Float(-x)),
                other => ExprKind::Negate(Box::new(Expr::new(other, operand.span))),
            };
            return Ok(Expr::new(kind, span));
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::unexpected_end("an expression", self.source));
        };
        let span = token.span;

        let kind = match token.token {
            Token::Int(i) => ExprKind::Literal(Literal::Int(i)),
            Token::Float(x) => ExprKind::Literal(Literal::Float(x)),
            Token::Str(s) => ExprKind::Literal(Literal::String(s)),
            Token::True => ExprKind::Literal(Literal::Bool(true)),
            Token::False => ExprKind::Literal(Literal::Bool(false)),
            Token::Null => ExprKind::Literal(Literal::Null),
            Token::NamedParam(name) => ExprKind::NamedParam(name),
            Token::PositionalParam(ordinal) => ExprKind::PositionalParam(ordinal),
            Token::LParen => {
                if self.starts_subquery(0) {
                    let query = self.parse_select(false)?;
                    let end = self.expect(&Token::RParen, "')'")?.span;
                    return Ok(Expr::new(
                        ExprKind::SubQuery(Box::new(query)),
                        span.to(end),
                    ));
                }
                let inner = self.parse_expr()?;
                let end = self.expect(&Token::RParen, "')'")?.span;
                return Ok(Expr::new(inner.kind, span.to(end)));
            }
            Token::Ident(name) => {
                if self.check(&Token::LParen) {
                    return self.parse_function_call(name, span);
                }
                let mut segments = vec![name];
                let mut end = span;
                while self.eat(&Token::Dot) {
                    let segment = self.expect_path_segment()?;
                    end = segment.span;
                    segments.push(segment.value);
                }
                return Ok(Expr::new(ExprKind::Path(Path::new(segments)), span.to(end)));
            }
            other => {
                return Err(ParseError::new(
                    format!("expected an expression, found {}", other),
                    span,
                ))
            }
        };

        Ok(Expr::new(kind, span))
    }

    fn parse_function_call(&mut self, name: String, start: Span) -> Result<Expr, ParseError> {
        self.expect(&Token::LParen, "'('")?;

        let mut distinct = false;
        let mut star = false;
        let mut args = Vec::new();

        if self.eat(&Token::Star) {
            star = true;
        } else if !self.check(&Token::RParen) {
            distinct = self.eat(&Token::Distinct);
            args = self.parse_expr_list()?;
        }

        let end = self.expect(&Token::RParen, "')'")?.span;
        Ok(Expr::new(
            ExprKind::Function {
                name,
                distinct,
                star,
                args,
            },
            start.to(end),
        ))
    }

    // ---- names ----

    fn parse_optional_alias(&mut self) -> Result<Option<Spanned<String>>, ParseError> {
        if self.eat(&Token::As) {
            return self.expect_ident().map(Some);
        }
        if let Some(Token::Ident(_)) = self.peek() {
            return self.expect_ident().map(Some);
        }
        Ok(None)
    }

    fn parse_qualified_name(&mut self) -> Result<Spanned<String>, ParseError> {
        let first = self.expect_ident()?;
        let mut name = first.value;
        let mut span = first.span;
        while self.eat(&Token::Dot) {
            let segment = self.expect_ident()?;
            name.push('.');
            name.push_str(&segment.value);
            span = span.to(segment.span);
        }
        Ok(Spanned::new(name, span))
    }

    fn parse_path(&mut self) -> Result<Spanned<Path>, ParseError> {
        let first = self.expect_ident()?;
        let mut segments = vec![first.value];
        let mut span = first.span;
        while self.eat(&Token::Dot) {
            let segment = self.expect_path_segment()?;
            span = span.to(segment.span);
            segments.push(segment.value);
        }
        Ok(Spanned::new(Path::new(segments), span))
    }

    /// A path segment may be a keyword, e.g. `o.order` or `c.size`.
    fn expect_path_segment(&mut self) -> Result<Spanned<String>, ParseError> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::Ident(name),
                span,
            }) => Ok(Spanned::new(name, span)),
            Some(SpannedToken { token, span }) => match token.keyword_text() {
                Some(keyword) => {
                    let text = span.slice(self.source).unwrap_or(keyword).to_string();
                    Ok(Spanned::new(text, span))
                }
                None => Err(ParseError::new(
                    format!("expected a property name, found {}", token),
                    span,
                )),
            },
            None => Err(ParseError::unexpected_end("a property name", self.source)),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, ParseError> {
        match self.advance() {
            Some(SpannedToken {
                token: Token::Ident(name),
                span,
            }) => Ok(Spanned::new(name, span)),
            Some(SpannedToken { token, span }) => Err(ParseError::new(
                format!("expected an identifier, found {}", token),
                span,
            )),
            None => Err(ParseError::unexpected_end("an identifier", self.source)),
        }
    }

    // ---- token helpers ----

    fn starts_subquery(&self, offset: usize) -> bool {
        matches!(
            self.peek_nth(offset),
            Some(Token::Select) | Some(Token::From)
        )
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<SpannedToken, ParseError> {
        match self.tokens.get(self.pos) {
            Some(t) if &t.token == token => {
                self.pos += 1;
                Ok(t.clone())
            }
            Some(t) => Err(ParseError::new(
                format!("expected {}, found {}", what, t.token),
                t.span,
            )),
            None => Err(ParseError::unexpected_end(what, self.source)),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(t) => Err(ParseError::new(
                format!("unexpected {} after end of statement", t.token),
                t.span,
            )),
        }
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(self.source.len(), self.source.len()))
    }

    fn previous_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn error_here(&self, message: &str) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(t) => ParseError::new(format!("{}, found {}", message, t.token), t.span),
            None => ParseError::new(
                format!("{}, found end of query", message),
                self.current_span(),
            ),
        }
    }
}

fn binary(op: ArithmeticOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.to(rhs.span);
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    )
}

/// Parse a full statement.
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    Parser::new(source)?.parse_statement()
}

/// Parse a collection filter (a query without a `from` clause).
pub fn parse_filter(source: &str) -> Result<SelectStatement, ParseError> {
    Parser::new(source)?.parse_filter()
}
