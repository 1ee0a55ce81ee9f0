//! Semantic analysis: HQL syntax tree to SQL AST.
//!
//! Names are resolved against the [`Catalog`]. Each query level has a scope
//! of from-elements (roots, explicit joins and the implicit joins created
//! while dereferencing many-to-one paths). Inner scopes see the aliases of
//! the enclosing ones, which is how correlated subqueries resolve.

use crate::catalog::{Catalog, CollectionDef, ElementDef, EntityDef};
use crate::error::{Error, Result};
use crate::hql::holder::{ConstructorTransformer, HolderInstantiator};
use crate::results::{converter_for, BasicFetch, BasicResult, DomainResult, EntityResult, FetchTiming};
use crate::sql::{
    ArithmeticOperator, Assignment, ColumnReference, DeleteStatement, Expression, FilterPredicate,
    InListPredicate, InSubQueryPredicate, Junction, JunctionNature, LikePredicate,
    NullnessPredicate, Operator, ParameterSpec, Predicate, SelectStatement, SortSpecification,
    SqlJoinType, SqlSelection, SqlStatement, TableGroup, TableJoin, TableReference, TemporalUnit,
    UpdateStatement,
};
use crate::value::{JavaType, Value};
use hql_lang::ast::{
    self, ArithmeticOp, CompareOp, Condition, ExprKind, InTarget, JoinKind, Literal, NewTarget,
    Selection,
};
use hql_lang::collection_properties::{
    CollectionProperties, COLLECTION_ELEMENTS, COLLECTION_INDEX, COLLECTION_INDICES,
    COLLECTION_MAX_ELEMENT, COLLECTION_MAX_INDEX, COLLECTION_MIN_ELEMENT, COLLECTION_MIN_INDEX,
    COLLECTION_SIZE,
};
use hql_lang::Spanned;
use std::collections::{BTreeMap, HashMap};

/// Everything the translator needs from one analysed statement.
#[derive(Debug, Clone)]
pub struct Translation {
    pub statement: SqlStatement,
    pub results: Vec<DomainResult>,
    pub return_aliases: Vec<String>,
    pub return_types: Vec<String>,
    pub holder: HolderInstantiator,
    pub query_spaces: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ElementRef {
    scope: usize,
    index: usize,
}

#[derive(Debug, Clone, Copy)]
enum ElementKind<'a> {
    Entity(&'a EntityDef),
    /// Elements of a value collection, held in the collection table.
    Values {
        column: &'a str,
        java_type: JavaType,
    },
}

#[derive(Debug)]
struct FromElement<'a> {
    alias: Option<String>,
    kind: ElementKind<'a>,
    group: usize,
    /// Table alias for each entity of the hierarchy; the first is primary.
    tables: Vec<(&'a str, String)>,
    /// False in DML, where columns are unqualified.
    qualified: bool,
    /// Name subqueries use to refer to this element's table.
    correlation: String,
    /// The collection this element was joined through, if any.
    collection: Option<&'a CollectionDef>,
    /// Part of the implicit select list.
    returned: bool,
}

impl FromElement<'_> {
    fn primary_alias(&self) -> &str {
        self.tables.first().map(|(_, alias)| alias.as_str()).unwrap_or("")
    }

    fn alias_for(&self, entity: &str) -> &str {
        self.tables
            .iter()
            .find(|(name, _)| *name == entity)
            .map(|(_, alias)| alias.as_str())
            .unwrap_or_else(|| self.primary_alias())
    }
}

#[derive(Debug, Default)]
struct Scope<'a> {
    elements: Vec<FromElement<'a>>,
    groups: Vec<TableGroup>,
    implicit_joins: HashMap<(usize, String), usize>,
    select_aliases: HashMap<String, Typed>,
}

/// A value expression with its declared type.
#[derive(Debug, Clone)]
struct Typed {
    expr: Expression,
    java_type: JavaType,
    column_type: JavaType,
    converter: Option<String>,
}

impl Typed {
    fn new(expr: Expression, java_type: JavaType) -> Self {
        Self {
            expr,
            java_type,
            column_type: java_type,
            converter: None,
        }
    }
}

/// Outcome of resolving a dotted path.
#[derive(Debug)]
enum Resolved<'a> {
    Scalar(Typed),
    /// An entity-valued path. `element` is set when the entity's table is
    /// joined; otherwise only its identifier (or foreign key) is available.
    Entity {
        element: Option<ElementRef>,
        id: Typed,
    },
    Collection {
        owner: ElementRef,
        collection: &'a CollectionDef,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathMode {
    /// Entity-valued paths are joined so the entity can be selected.
    Select,
    /// Entity-valued paths stop at the foreign key.
    Value,
}

struct Projection {
    results: Vec<DomainResult>,
    aliases: Vec<String>,
    holder: HolderInstantiator,
}

pub(crate) struct SemanticAnalyzer<'a> {
    catalog: &'a Catalog,
    collection_properties: &'a CollectionProperties,
    substitutions: &'a BTreeMap<String, String>,
    query: &'a str,
    shallow: bool,
    dml: bool,
    scopes: Vec<Scope<'a>>,
    alias_count: usize,
    positional_count: u32,
    query_spaces: Vec<String>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub(crate) fn new(
        catalog: &'a Catalog,
        collection_properties: &'a CollectionProperties,
        substitutions: &'a BTreeMap<String, String>,
        query: &'a str,
        shallow: bool,
    ) -> Self {
        Self {
            catalog,
            collection_properties,
            substitutions,
            query,
            shallow,
            dml: false,
            scopes: Vec::new(),
            alias_count: 0,
            positional_count: 0,
            query_spaces: Vec::new(),
        }
    }

    pub(crate) fn translate(mut self, statement: &ast::Statement) -> Result<Translation> {
        match statement {
            ast::Statement::Select(select) => {
                let (sql, projection) = self.query_spec(select, None)?;
                Ok(self.finish_select(sql, projection))
            }
            ast::Statement::Update(update) => {
                let sql = self.update(update)?;
                Ok(self.finish_dml(SqlStatement::Update(sql)))
            }
            ast::Statement::Delete(delete) => {
                let sql = self.delete(delete)?;
                Ok(self.finish_dml(SqlStatement::Delete(sql)))
            }
        }
    }

    /// Translate a collection filter; the implicit root `this` is the
    /// collection element, restricted to the owner's key.
    pub(crate) fn translate_filter(
        mut self,
        filter: &ast::SelectStatement,
        collection: &'a CollectionDef,
    ) -> Result<Translation> {
        let (sql, projection) = self.query_spec(filter, Some(collection))?;
        Ok(self.finish_select(sql, projection))
    }

    fn finish_select(self, sql: SelectStatement, projection: Projection) -> Translation {
        let return_types = projection.results.iter().map(DomainResult::type_name).collect();
        Translation {
            statement: SqlStatement::Select(sql),
            results: projection.results,
            return_aliases: projection.aliases,
            return_types,
            holder: projection.holder,
            query_spaces: self.query_spaces,
        }
    }

    fn finish_dml(self, statement: SqlStatement) -> Translation {
        Translation {
            statement,
            results: Vec::new(),
            return_aliases: Vec::new(),
            return_types: Vec::new(),
            holder: HolderInstantiator::NOOP,
            query_spaces: self.query_spaces,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::query(message, self.query)
    }

    // ---- scopes and from-elements ----

    fn current_scope(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    fn element(&self, element: ElementRef) -> &FromElement<'a> {
        &self.scopes[element.scope].elements[element.index]
    }

    fn add_query_space(&mut self, table: &str) {
        if !self.query_spaces.iter().any(|t| t == table) {
            self.query_spaces.push(table.to_string());
        }
    }

    fn generate_alias(&mut self, name: &str) -> String {
        let simple = name.rsplit('.').next().unwrap_or(name);
        let mut base: String = simple
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .take(10)
            .collect::<String>()
            .to_ascii_lowercase();
        if !base.starts_with(|c: char| c.is_ascii_alphabetic()) {
            base.insert(0, 'x');
        }
        let alias = format!("{}{}_", base, self.alias_count);
        self.alias_count += 1;
        alias
    }

    fn lookup_alias(&self, name: &str) -> Option<ElementRef> {
        self.scopes.iter().enumerate().rev().find_map(|(scope, s)| {
            s.elements
                .iter()
                .position(|e| e.alias.as_deref() == Some(name))
                .map(|index| ElementRef { scope, index })
        })
    }

    /// Register an entity element. With `join` it is joined into `group`,
    /// otherwise it starts a new table group. Superclass tables of a joined
    /// hierarchy are joined on the identifier column.
    fn add_entity_element(
        &mut self,
        scope: usize,
        entity: &'a EntityDef,
        alias: Option<String>,
        join: Option<(usize, SqlJoinType, Predicate)>,
        returned: bool,
    ) -> Result<ElementRef> {
        let id = self.catalog.identifier(entity)?;
        let table_alias = self.generate_alias(&entity.name);
        let qualified = !self.dml;

        let mut tables: Vec<(&'a str, String)> = Vec::new();
        let mut extra_joins = Vec::new();
        for (k, e) in self.catalog.hierarchy(entity).into_iter().enumerate() {
            if let Some((_, existing)) = tables
                .iter()
                .find(|(name, _)| self.catalog.entity(name).is_some_and(|d| d.table == e.table))
            {
                let existing = existing.clone();
                tables.push((e.name.as_str(), existing));
                continue;
            }
            if k == 0 {
                tables.push((e.name.as_str(), table_alias.clone()));
                continue;
            }
            if self.dml {
                return Err(self.error(format!(
                    "bulk manipulation of {} spans several tables",
                    entity.name
                )));
            }
            let super_alias = format!("{}{}_", table_alias, k);
            extra_joins.push(TableJoin {
                join_type: SqlJoinType::Inner,
                table: TableReference::new(&e.table, &super_alias),
                predicate: Predicate::relational(
                    Expression::column(&table_alias, &id.column),
                    Operator::Equal,
                    Expression::column(&super_alias, &id.column),
                ),
            });
            tables.push((e.name.as_str(), super_alias));
            self.add_query_space(&e.table);
        }
        self.add_query_space(&entity.table);

        let correlation = if qualified {
            table_alias.clone()
        } else {
            entity.table.clone()
        };
        let reference = TableReference::new(&entity.table, &table_alias);
        let s = &mut self.scopes[scope];
        let group = match join {
            Some((group, join_type, predicate)) => {
                s.groups[group].joins.push(TableJoin {
                    join_type,
                    table: reference,
                    predicate,
                });
                group
            }
            None => {
                s.groups.push(TableGroup::new(reference));
                s.groups.len() - 1
            }
        };
        s.groups[group].joins.extend(extra_joins);
        s.elements.push(FromElement {
            alias,
            kind: ElementKind::Entity(entity),
            group,
            tables,
            qualified,
            correlation,
            collection: None,
            returned,
        });
        Ok(ElementRef {
            scope,
            index: s.elements.len() - 1,
        })
    }

    fn entity_of(&self, element: ElementRef) -> Option<&'a EntityDef> {
        match self.element(element).kind {
            ElementKind::Entity(entity) => Some(entity),
            ElementKind::Values { .. } => None,
        }
    }

    /// Column of `element`, qualified by the alias of the table declaring it.
    fn column(&self, element: ElementRef, declaring: &str, column: &str) -> Expression {
        let e = self.element(element);
        if e.qualified {
            Expression::column(e.alias_for(declaring), column)
        } else {
            Expression::Column(ColumnReference::unqualified(column))
        }
    }

    /// Column reference usable from a subquery correlated with `element`.
    fn correlated_column(&self, element: ElementRef, column: &str) -> Expression {
        Expression::column(&self.element(element).correlation, column)
    }

    fn identifier(&self, element: ElementRef) -> Result<Typed> {
        let entity = self
            .entity_of(element)
            .ok_or_else(|| self.error("collection elements have no identifier"))?;
        let id = self.catalog.identifier(entity)?;
        let root = self.catalog.root_entity(entity);
        Ok(Typed::new(
            self.column(element, &root.name, &id.column),
            id.java_type,
        ))
    }

    fn declaring_entity(
        &self,
        entity: &'a EntityDef,
        declares: impl Fn(&EntityDef) -> bool,
    ) -> &'a EntityDef {
        self.catalog
            .hierarchy(entity)
            .into_iter()
            .find(|e| declares(e))
            .unwrap_or(entity)
    }

    /// Join the target of a many-to-one, reusing an earlier implicit join.
    fn implicit_join(&mut self, owner: ElementRef, property: &str) -> Result<ElementRef> {
        if self.dml {
            return Err(self.error(format!(
                "implicit join on {} is not allowed in a bulk manipulation statement",
                property
            )));
        }
        let key = (owner.index, property.to_string());
        if let Some(&index) = self.scopes[owner.scope].implicit_joins.get(&key) {
            return Ok(ElementRef {
                scope: owner.scope,
                index,
            });
        }

        let entity = self
            .entity_of(owner)
            .ok_or_else(|| self.error(format!("cannot dereference {}", property)))?;
        let many_to_one = self
            .catalog
            .find_many_to_one(entity, property)
            .ok_or_else(|| self.error(format!("{} is not an association of {}", property, entity.name)))?;
        let target = self.catalog.resolve_entity(&many_to_one.target)?;
        let declaring = self.declaring_entity(entity, |e| e.many_to_one(property).is_some());
        let fk = self.column(owner, &declaring.name, &many_to_one.column);
        let group = self.element(owner).group;

        let joined = self.add_entity_element(
            owner.scope,
            target,
            None,
            Some((group, SqlJoinType::Inner, Predicate::Junction(Junction::new(JunctionNature::Conjunction)))),
            false,
        )?;
        let target_id = self.identifier(joined)?;
        self.set_join_predicate(joined, Predicate::relational(fk, Operator::Equal, target_id.expr));
        self.scopes[owner.scope].implicit_joins.insert(key, joined.index);
        Ok(joined)
    }

    /// Replace the predicate of the join that introduced `element`.
    fn set_join_predicate(&mut self, element: ElementRef, predicate: Predicate) {
        let primary = self.element(element).primary_alias().to_string();
        let group = self.element(element).group;
        if let Some(join) = self.scopes[element.scope].groups[group]
            .joins
            .iter_mut()
            .find(|j| j.table.alias == primary)
        {
            join.predicate = predicate;
        }
    }

    /// Join a collection of `owner` as a new from-element.
    fn join_collection(
        &mut self,
        owner: ElementRef,
        collection: &'a CollectionDef,
        join_type: SqlJoinType,
        alias: Option<String>,
        returned: bool,
    ) -> Result<ElementRef> {
        let owner_id = self.identifier(owner)?;
        let group = self.element(owner).group;
        let scope = owner.scope;
        let element = match &collection.element {
            ElementDef::Entity { entity } => {
                let target = self.catalog.resolve_entity(entity)?;
                let joined = self.add_entity_element(
                    scope,
                    target,
                    alias,
                    Some((group, join_type, Predicate::Junction(Junction::new(JunctionNature::Conjunction)))),
                    returned,
                )?;
                let key = Expression::column(self.element(joined).primary_alias(), &collection.key_column);
                let mut on = Predicate::relational(key, Operator::Equal, owner_id.expr);
                if let Some(restriction) = self.restriction(collection, self.element(joined).primary_alias()) {
                    on = Predicate::and(on, restriction);
                }
                self.set_join_predicate(joined, on);
                joined
            }
            ElementDef::Value { column, java_type } => {
                let table_alias = self.generate_alias(&collection.table);
                let key = Expression::column(&table_alias, &collection.key_column);
                let mut on = Predicate::relational(key, Operator::Equal, owner_id.expr);
                if let Some(restriction) = self.restriction(collection, &table_alias) {
                    on = Predicate::and(on, restriction);
                }
                self.add_query_space(&collection.table);
                let s = &mut self.scopes[scope];
                s.groups[group].joins.push(TableJoin {
                    join_type,
                    table: TableReference::new(&collection.table, &table_alias),
                    predicate: on,
                });
                s.elements.push(FromElement {
                    alias,
                    kind: ElementKind::Values {
                        column: column.as_str(),
                        java_type: *java_type,
                    },
                    group,
                    tables: vec![("", table_alias.clone())],
                    qualified: true,
                    correlation: table_alias,
                    collection: None,
                    returned,
                });
                ElementRef {
                    scope,
                    index: s.elements.len() - 1,
                }
            }
        };
        self.scopes[scope].elements[element.index].collection = Some(collection);
        Ok(element)
    }

    fn restriction(&self, collection: &CollectionDef, table_alias: &str) -> Option<Predicate> {
        collection
            .restriction
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| Predicate::Filter(FilterPredicate::new(r.replace("{alias}", table_alias))))
    }

    // ---- select ----

    fn query_spec(
        &mut self,
        select: &ast::SelectStatement,
        filter: Option<&'a CollectionDef>,
    ) -> Result<(SelectStatement, Projection)> {
        self.scopes.push(Scope::default());
        let scope = self.current_scope();
        let mut sql = SelectStatement::default();

        let mut filter_restriction = None;
        if let Some(collection) = filter {
            filter_restriction = Some(self.filter_root(scope, collection)?);
        }
        if let Some(from) = &select.from {
            self.from_clause(scope, from)?;
        }
        if self.scopes[scope].elements.is_empty() {
            return Err(self.error("query must have a from clause"));
        }

        let projection = self.select_clause(select.select.as_ref(), &mut sql)?;

        if let Some(restriction) = filter_restriction {
            sql.restrict(restriction);
        }
        if let Some(condition) = &select.where_clause {
            let predicate = self.condition(condition)?;
            sql.restrict(predicate);
        }
        self.rest_of_query(select, &mut sql)?;

        let scope = self.scopes.pop().unwrap_or_default();
        sql.from = scope.groups;
        Ok((sql, projection))
    }

    fn rest_of_query(&mut self, select: &ast::SelectStatement, sql: &mut SelectStatement) -> Result<()> {
        for expr in &select.group_by {
            let typed = self.expr(expr)?;
            sql.group_by.push(typed.expr);
        }
        if let Some(having) = &select.having {
            sql.having = Some(self.condition(having)?);
        }
        for item in &select.order_by {
            let typed = match item.expr.as_path() {
                Some(path) if path.len() == 1 => {
                    let scope = self.current_scope();
                    match self.scopes[scope].select_aliases.get(path.first()) {
                        Some(typed) => typed.clone(),
                        None => self.expr(&item.expr)?,
                    }
                }
                _ => self.expr(&item.expr)?,
            };
            sql.order_by.push(SortSpecification {
                expression: typed.expr,
                descending: item.descending,
            });
        }
        Ok(())
    }

    /// Add `this` for a collection filter and return the key restriction.
    fn filter_root(&mut self, scope: usize, collection: &'a CollectionDef) -> Result<Predicate> {
        let this = "this".to_string();
        let root = match &collection.element {
            ElementDef::Entity { entity } => {
                let entity = self.catalog.resolve_entity(entity)?;
                self.add_entity_element(scope, entity, Some(this), None, true)?
            }
            ElementDef::Value { column, java_type } => {
                let table_alias = self.generate_alias(&collection.table);
                self.add_query_space(&collection.table);
                let s = &mut self.scopes[scope];
                s.groups
                    .push(TableGroup::new(TableReference::new(&collection.table, &table_alias)));
                s.elements.push(FromElement {
                    alias: Some(this),
                    kind: ElementKind::Values {
                        column: column.as_str(),
                        java_type: *java_type,
                    },
                    group: s.groups.len() - 1,
                    tables: vec![("", table_alias.clone())],
                    qualified: true,
                    correlation: table_alias,
                    collection: None,
                    returned: true,
                });
                ElementRef {
                    scope,
                    index: s.elements.len() - 1,
                }
            }
        };
        self.scopes[scope].elements[root.index].collection = Some(collection);

        let table_alias = self.element(root).primary_alias().to_string();
        let mut junction = Junction::new(JunctionNature::Conjunction);
        junction.add(Predicate::relational(
            Expression::column(&table_alias, &collection.key_column),
            Operator::Equal,
            Expression::Parameter(ParameterSpec::CollectionKey),
        ));
        if let Some(restriction) = self.restriction(collection, &table_alias) {
            junction.add(restriction);
        }
        Ok(Predicate::Junction(junction))
    }

    fn from_clause(&mut self, scope: usize, from: &ast::FromClause) -> Result<()> {
        for range in &from.ranges {
            let entity = self.catalog.resolve_entity(&range.entity.value)?;
            let alias = range.alias.as_ref().map(|a| a.value.clone());
            let root = self.add_entity_element(scope, entity, alias, None, true)?;
            for join in &range.joins {
                self.explicit_join(root, join)?;
            }
        }
        Ok(())
    }

    fn explicit_join(&mut self, root: ElementRef, join: &ast::Join) -> Result<()> {
        let path = &join.path.value;
        let (mut owner, rest) = match self.lookup_alias(path.first()) {
            Some(owner) if path.len() > 1 => (owner, &path.segments[1..]),
            _ => (root, &path.segments[..]),
        };
        let join_type = match join.kind {
            JoinKind::Inner => SqlJoinType::Inner,
            JoinKind::Left => SqlJoinType::LeftOuter,
        };
        let alias = join.alias.as_ref().map(|a| a.value.clone());
        let returned = !join.fetch;

        for (i, segment) in rest.iter().enumerate() {
            let last = i + 1 == rest.len();
            let entity = self
                .entity_of(owner)
                .ok_or_else(|| self.error(format!("cannot join {} from a collection of values", path)))?;
            if let Some(collection) = self.catalog.find_collection(entity, segment) {
                if !last {
                    return Err(self.error(format!("cannot dereference collection {} in join {}", segment, path)));
                }
                self.join_collection(owner, collection, join_type, alias.clone(), returned)?;
                return Ok(());
            }
            let many_to_one = self
                .catalog
                .find_many_to_one(entity, segment)
                .ok_or_else(|| self.error(format!("{} is not an association of {}", segment, entity.name)))?;
            if !last {
                owner = self.implicit_join(owner, segment)?;
                continue;
            }
            let target = self.catalog.resolve_entity(&many_to_one.target)?;
            let declaring = self.declaring_entity(entity, |e| e.many_to_one(segment).is_some());
            let fk = self.column(owner, &declaring.name, &many_to_one.column);
            let group = self.element(owner).group;
            let joined = self.add_entity_element(
                owner.scope,
                target,
                alias.clone(),
                Some((group, join_type, Predicate::Junction(Junction::new(JunctionNature::Conjunction)))),
                returned,
            )?;
            let target_id = self.identifier(joined)?;
            self.set_join_predicate(joined, Predicate::relational(fk, Operator::Equal, target_id.expr));
        }
        Ok(())
    }

    fn select_clause(
        &mut self,
        clause: Option<&ast::SelectClause>,
        sql: &mut SelectStatement,
    ) -> Result<Projection> {
        let scope = self.current_scope();
        let mut results = Vec::new();
        let mut aliases = Vec::new();

        let Some(clause) = clause else {
            let returned: Vec<ElementRef> = self.scopes[scope]
                .elements
                .iter()
                .enumerate()
                .filter(|(_, e)| e.returned)
                .map(|(index, _)| ElementRef { scope, index })
                .collect();
            for element in returned {
                let i = results.len();
                let alias = self.element(element).alias.clone();
                results.push(self.element_result(element, alias, i, sql)?);
                aliases.push(i.to_string());
            }
            return Ok(Projection {
                results,
                aliases,
                holder: HolderInstantiator::NOOP,
            });
        };

        sql.distinct = clause.distinct;
        let mut item_aliases = Vec::new();
        for (i, item) in clause.selection.items().iter().enumerate() {
            let alias = item.alias.as_ref().map(|a| a.value.clone());
            let result = match &item.expr.kind {
                ExprKind::Path(path) => match self.resolve_path(path, PathMode::Select)? {
                    Resolved::Entity {
                        element: Some(element),
                        ..
                    } => self.element_result(element, alias.clone(), i, sql)?,
                    Resolved::Entity { id, .. } => self.basic_result(id, alias.clone(), i, sql)?,
                    Resolved::Scalar(typed) => {
                        if let Some(alias) = &alias {
                            self.scopes[scope].select_aliases.insert(alias.clone(), typed.clone());
                        }
                        self.basic_result(typed, alias.clone(), i, sql)?
                    }
                    Resolved::Collection { collection, .. } => {
                        return Err(self.error(format!(
                            "collection {} cannot be selected; use elements() or a join",
                            collection.role
                        )))
                    }
                },
                _ => {
                    let typed = self.expr(&item.expr)?;
                    if let Some(alias) = &alias {
                        self.scopes[scope].select_aliases.insert(alias.clone(), typed.clone());
                    }
                    self.basic_result(typed, alias.clone(), i, sql)?
                }
            };
            aliases.push(alias.clone().unwrap_or_else(|| i.to_string()));
            item_aliases.push(alias);
            results.push(result);
        }

        let holder = match &clause.selection {
            Selection::Items(_) => HolderInstantiator::NOOP,
            Selection::New { target, items } => match &target.value {
                NewTarget::Class(class) => HolderInstantiator::new(
                    Some(ConstructorTransformer::new(
                        self.catalog.imported_class_name(class),
                        items.len(),
                    )),
                    false,
                    false,
                    item_aliases,
                ),
                NewTarget::Map => HolderInstantiator::new(None, true, false, item_aliases),
                NewTarget::List => HolderInstantiator::new(None, false, true, item_aliases),
            },
        };
        Ok(Projection {
            results,
            aliases,
            holder,
        })
    }

    fn basic_result(
        &mut self,
        typed: Typed,
        alias: Option<String>,
        index: usize,
        sql: &mut SelectStatement,
    ) -> Result<DomainResult> {
        let converter = typed.converter.as_deref().map(converter_for).transpose()?;
        let position = sql.selections.len();
        sql.selections.push(SqlSelection {
            expression: typed.expr,
            alias: Some(format!("col_{}_0_", index)),
        });
        Ok(DomainResult::Basic(BasicResult::new(
            position,
            alias,
            typed.java_type,
            typed.column_type,
            converter,
        )))
    }

    /// Result for a from-element: the whole entity, its identifier when
    /// shallow, or the element value of a value collection.
    fn element_result(
        &mut self,
        element: ElementRef,
        alias: Option<String>,
        index: usize,
        sql: &mut SelectStatement,
    ) -> Result<DomainResult> {
        let entity = match self.element(element).kind {
            ElementKind::Values { column, java_type } => {
                let qualifier = self.element(element).primary_alias().to_string();
                let typed = Typed::new(Expression::column(qualifier, column), java_type);
                return self.basic_result(typed, alias, index, sql);
            }
            ElementKind::Entity(entity) => entity,
        };
        let id = self.identifier(element)?;
        if self.shallow {
            return self.basic_result(id, alias, index, sql);
        }

        let offset = sql.selections.len();
        let mut column = 0;
        let mut push = |sql: &mut SelectStatement, expression: Expression| {
            sql.selections.push(SqlSelection {
                expression,
                alias: Some(format!("col_{}_{}_", index, column)),
            });
            column += 1;
            column - 1
        };

        let id_def = self.catalog.identifier(entity)?;
        let identifier = BasicFetch::new(
            &id_def.property,
            Some(push(sql, id.expr)),
            FetchTiming::Immediate,
            id_def.java_type,
            id_def.java_type,
            None,
            false,
        );

        let mut fetches = Vec::new();
        for property in self.catalog.all_properties(entity) {
            let declaring = self.declaring_entity(entity, |e| e.property(&property.name).is_some());
            let converter = property.converter.as_deref().map(converter_for).transpose()?;
            let column_type = property.column_type.unwrap_or(property.java_type);
            if property.lazy {
                fetches.push(BasicFetch::new(
                    &property.name,
                    None,
                    FetchTiming::Delayed,
                    property.java_type,
                    column_type,
                    converter,
                    true,
                ));
                continue;
            }
            let expression = self.column(element, &declaring.name, &property.column);
            fetches.push(BasicFetch::new(
                &property.name,
                Some(push(sql, expression)),
                FetchTiming::Immediate,
                property.java_type,
                column_type,
                converter,
                false,
            ));
        }
        for many_to_one in self.catalog.all_many_to_one(entity) {
            let declaring = self.declaring_entity(entity, |e| e.many_to_one(&many_to_one.name).is_some());
            let target = self.catalog.resolve_entity(&many_to_one.target)?;
            let target_type = self.catalog.identifier(target)?.java_type;
            let expression = self.column(element, &declaring.name, &many_to_one.column);
            fetches.push(BasicFetch::new(
                &many_to_one.name,
                Some(push(sql, expression)),
                FetchTiming::Immediate,
                target_type,
                target_type,
                None,
                false,
            ));
        }

        Ok(DomainResult::Entity(EntityResult {
            entity_name: entity.name.clone(),
            alias,
            offset,
            identifier,
            fetches,
        }))
    }

    /// A subquery: selections become plain columns, entities their ids.
    fn subquery(&mut self, select: &ast::SelectStatement) -> Result<(SelectStatement, JavaType)> {
        self.scopes.push(Scope::default());
        let scope = self.current_scope();
        let mut sql = SelectStatement::default();
        let Some(from) = &select.from else {
            return Err(self.error("subquery must have a from clause"));
        };
        self.from_clause(scope, from)?;

        let mut first_type = JavaType::Object;
        match &select.select {
            Some(clause) => {
                sql.distinct = clause.distinct;
                for (i, item) in clause.selection.items().iter().enumerate() {
                    let typed = self.expr(&item.expr)?;
                    if i == 0 {
                        first_type = typed.java_type;
                    }
                    sql.selections.push(SqlSelection {
                        expression: typed.expr,
                        alias: None,
                    });
                }
            }
            None => {
                let id = self.identifier(ElementRef { scope, index: 0 })?;
                first_type = id.java_type;
                sql.selections.push(SqlSelection {
                    expression: id.expr,
                    alias: None,
                });
            }
        }
        if let Some(condition) = &select.where_clause {
            let predicate = self.condition(condition)?;
            sql.restrict(predicate);
        }
        self.rest_of_query(select, &mut sql)?;

        let scope = self.scopes.pop().unwrap_or_default();
        sql.from = scope.groups;
        Ok((sql, first_type))
    }

    // ---- DML ----

    fn dml_root(&mut self, entity: &Spanned<String>, alias: Option<&Spanned<String>>) -> Result<ElementRef> {
        self.dml = true;
        self.scopes.push(Scope::default());
        let scope = self.current_scope();
        let entity = self.catalog.resolve_entity(&entity.value)?;
        self.add_entity_element(scope, entity, alias.map(|a| a.value.clone()), None, false)
    }

    fn update(&mut self, update: &ast::UpdateStatement) -> Result<UpdateStatement> {
        let root = self.dml_root(&update.entity, update.alias.as_ref())?;
        let entity = self
            .entity_of(root)
            .ok_or_else(|| self.error("update target is not an entity"))?;

        let mut assignments = Vec::new();
        for assignment in &update.assignments {
            let column = match self.resolve_path(&assignment.target.value, PathMode::Value)? {
                Resolved::Scalar(Typed {
                    expr: Expression::Column(column),
                    ..
                }) => column.column,
                Resolved::Entity {
                    element: None,
                    id:
                        Typed {
                            expr: Expression::Column(column),
                            ..
                        },
                    ..
                } => column.column,
                _ => {
                    return Err(self.error(format!(
                        "{} is not an updatable property of {}",
                        assignment.target.value, entity.name
                    )))
                }
            };
            let value = self.expr(&assignment.value)?;
            assignments.push(Assignment {
                column,
                value: value.expr,
            });
        }
        let where_clause = update
            .where_clause
            .as_ref()
            .map(|c| self.condition(c))
            .transpose()?;
        self.scopes.pop();
        Ok(UpdateStatement {
            table: entity.table.clone(),
            assignments,
            where_clause,
        })
    }

    fn delete(&mut self, delete: &ast::DeleteStatement) -> Result<DeleteStatement> {
        let root = self.dml_root(&delete.entity, delete.alias.as_ref())?;
        let entity = self
            .entity_of(root)
            .ok_or_else(|| self.error("delete target is not an entity"))?;
        let where_clause = delete
            .where_clause
            .as_ref()
            .map(|c| self.condition(c))
            .transpose()?;
        self.scopes.pop();
        Ok(DeleteStatement {
            table: entity.table.clone(),
            where_clause,
        })
    }

    // ---- paths ----

    /// The from-element an unqualified property name belongs to.
    fn implicit_owner(&self, name: &str) -> Option<ElementRef> {
        self.scopes.iter().enumerate().rev().find_map(|(scope, s)| {
            s.elements.iter().enumerate().find_map(|(index, e)| match e.kind {
                ElementKind::Entity(entity) => {
                    let id = self.catalog.identifier(entity).ok();
                    let known = id.is_some_and(|id| id.property == name)
                        || self.catalog.find_property(entity, name).is_some()
                        || self.catalog.find_many_to_one(entity, name).is_some()
                        || self.catalog.find_collection(entity, name).is_some();
                    known.then_some(ElementRef { scope, index })
                }
                ElementKind::Values { .. } => None,
            })
        })
    }

    fn resolve_path(&mut self, path: &ast::Path, mode: PathMode) -> Result<Resolved<'a>> {
        let (mut current, rest) = match self.lookup_alias(path.first()) {
            Some(element) => (element, &path.segments[1..]),
            None => {
                if path.len() == 1 {
                    if let Some(fragment) = self.substitution(path.first()) {
                        return Ok(Resolved::Scalar(Typed::new(
                            Expression::Fragment(fragment),
                            JavaType::Object,
                        )));
                    }
                }
                match self.implicit_owner(path.first()) {
                    Some(element) => (element, &path.segments[..]),
                    None => return Err(Error::Mapping(format!("could not resolve path: {}", path))),
                }
            }
        };

        if rest.is_empty() {
            return match self.element(current).kind {
                ElementKind::Entity(_) => Ok(Resolved::Entity {
                    element: Some(current),
                    id: self.identifier(current)?,
                }),
                ElementKind::Values { column, java_type } => {
                    let qualifier = self.element(current).primary_alias().to_string();
                    Ok(Resolved::Scalar(Typed::new(Expression::column(qualifier, column), java_type)))
                }
            };
        }

        let mut i = 0;
        while i < rest.len() {
            let segment = rest[i].as_str();
            let last = i + 1 == rest.len();
            let Some(entity) = self.entity_of(current) else {
                return Err(self.error(format!("cannot dereference collection element in {}", path)));
            };
            let id = self.catalog.identifier(entity)?;

            if segment == id.property || segment == "id" {
                if !last {
                    return Err(self.error(format!("cannot dereference scalar identifier in {}", path)));
                }
                return Ok(Resolved::Scalar(self.identifier(current)?));
            }

            if let Some(property) = self.catalog.find_property(entity, segment) {
                if !last {
                    return Err(self.error(format!("cannot dereference scalar property {} in {}", segment, path)));
                }
                let declaring = self.declaring_entity(entity, |e| e.property(segment).is_some());
                return Ok(Resolved::Scalar(Typed {
                    expr: self.column(current, &declaring.name, &property.column),
                    java_type: property.java_type,
                    column_type: property.column_type.unwrap_or(property.java_type),
                    converter: property.converter.clone(),
                }));
            }

            if let Some(many_to_one) = self.catalog.find_many_to_one(entity, segment) {
                let target = self.catalog.resolve_entity(&many_to_one.target)?;
                let target_id = self.catalog.identifier(target)?;
                let declaring = self.declaring_entity(entity, |e| e.many_to_one(segment).is_some());
                let fk = Typed::new(
                    self.column(current, &declaring.name, &many_to_one.column),
                    target_id.java_type,
                );
                if last {
                    if mode == PathMode::Select {
                        let joined = self.implicit_join(current, segment)?;
                        return Ok(Resolved::Entity {
                            element: Some(joined),
                            id: self.identifier(joined)?,
                        });
                    }
                    return Ok(Resolved::Entity {
                        element: None,
                        id: fk,
                    });
                }
                let next = rest[i + 1].as_str();
                if i + 2 == rest.len() && (next == target_id.property || next == "id") {
                    return Ok(Resolved::Scalar(fk));
                }
                current = self.implicit_join(current, segment)?;
                i += 1;
                continue;
            }

            if let Some(collection) = self.catalog.find_collection(entity, segment) {
                if last {
                    return Ok(Resolved::Collection {
                        owner: current,
                        collection,
                    });
                }
                let next = rest[i + 1].as_str();
                if i + 2 == rest.len() {
                    if let Some(name) = self.collection_properties.normalized_property_name(next) {
                        if !self.collection_properties.is_collection_property(next) {
                            return Err(self.error(format!(
                                "{}() may only be used with an alias of a joined indexed collection",
                                COLLECTION_INDEX
                            )));
                        }
                        return Ok(Resolved::Scalar(self.collection_function(name, current, collection)?));
                    }
                }
                return Err(self.error(format!(
                    "illegal attempt to dereference collection {} with element property {}",
                    collection.role, next
                )));
            }

            return Err(Error::Mapping(format!(
                "could not resolve property: {} of: {}",
                segment, entity.name
            )));
        }
        Err(Error::Mapping(format!("could not resolve path: {}", path)))
    }

    fn substitution(&self, token: &str) -> Option<String> {
        self.substitutions.get(token).cloned()
    }

    /// A collection pseudo-property as a correlated subquery.
    fn collection_function(
        &mut self,
        name: &'static str,
        owner: ElementRef,
        collection: &'a CollectionDef,
    ) -> Result<Typed> {
        let alias = self.generate_alias(&collection.table);
        self.add_query_space(&collection.table);
        let owner_entity = self
            .entity_of(owner)
            .ok_or_else(|| self.error("collection owner is not an entity"))?;
        let owner_id = self.catalog.identifier(owner_entity)?;

        let (element_column, element_type) = match &collection.element {
            ElementDef::Value { column, java_type } => (column.clone(), *java_type),
            ElementDef::Entity { entity } => {
                let target = self.catalog.resolve_entity(entity)?;
                let id = self.catalog.identifier(target)?;
                (id.column.clone(), id.java_type)
            }
        };
        let index_column = || {
            collection.index_column.clone().ok_or_else(|| {
                self.error(format!(
                    "{}() applied to unindexed collection {}",
                    name, collection.role
                ))
            })
        };
        let column = |c: String| Expression::column(&alias, c);

        let (selection, java_type) = match name {
            COLLECTION_SIZE => (Expression::count_star(), JavaType::Integer),
            COLLECTION_MAX_INDEX => (Expression::function("max", vec![column(index_column()?)]), JavaType::Integer),
            COLLECTION_MIN_INDEX => (Expression::function("min", vec![column(index_column()?)]), JavaType::Integer),
            COLLECTION_MAX_ELEMENT => (Expression::function("max", vec![column(element_column)]), element_type),
            COLLECTION_MIN_ELEMENT => (Expression::function("min", vec![column(element_column)]), element_type),
            COLLECTION_ELEMENTS => (column(element_column), element_type),
            COLLECTION_INDICES => (column(index_column()?), JavaType::Integer),
            _ => {
                return Err(self.error(format!(
                    "{}() may only be used with an alias of a joined indexed collection",
                    name
                )))
            }
        };

        let mut sub = SelectStatement {
            selections: vec![SqlSelection {
                expression: selection,
                alias: None,
            }],
            from: vec![TableGroup::new(TableReference::new(&collection.table, &alias))],
            ..Default::default()
        };
        sub.restrict(Predicate::relational(
            column(collection.key_column.clone()),
            Operator::Equal,
            self.correlated_column(owner, &owner_id.column),
        ));
        if let Some(restriction) = self.restriction(collection, &alias) {
            sub.restrict(restriction);
        }
        Ok(Typed::new(Expression::SubQuery(Box::new(sub)), java_type))
    }

    // ---- expressions ----

    fn expr(&mut self, expr: &ast::Expr) -> Result<Typed> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(self.literal(literal)),
            ExprKind::Path(path) => match self.resolve_path(path, PathMode::Value)? {
                Resolved::Scalar(typed) => Ok(typed),
                Resolved::Entity { id, .. } => Ok(id),
                Resolved::Collection { collection, .. } => Err(self.error(format!(
                    "collection {} used as a value; use size(), elements() or a join",
                    collection.role
                ))),
            },
            ExprKind::NamedParam(name) => Ok(Typed::new(
                Expression::Parameter(ParameterSpec::Named(name.clone())),
                JavaType::Object,
            )),
            ExprKind::PositionalParam(label) => {
                let ordinal = match label {
                    Some(0) => return Err(self.error("ordinal parameter labels start at 1")),
                    Some(n) => n - 1,
                    None => {
                        let n = self.positional_count;
                        self.positional_count += 1;
                        n
                    }
                };
                Ok(Typed::new(
                    Expression::Parameter(ParameterSpec::Ordinal(ordinal)),
                    JavaType::Object,
                ))
            }
            ExprKind::Function {
                name,
                distinct,
                star,
                args,
            } => self.function(name, *distinct, *star, args),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                let op = match op {
                    ArithmeticOp::Add => ArithmeticOperator::Add,
                    ArithmeticOp::Subtract => ArithmeticOperator::Subtract,
                    ArithmeticOp::Multiply => ArithmeticOperator::Multiply,
                    ArithmeticOp::Divide => ArithmeticOperator::Divide,
                    ArithmeticOp::Concat => ArithmeticOperator::Concat,
                };
                let java_type = arithmetic_type(op, lhs.java_type, rhs.java_type);
                Ok(Typed::new(
                    Expression::Arithmetic {
                        op,
                        lhs: Box::new(lhs.expr),
                        rhs: Box::new(rhs.expr),
                    },
                    java_type,
                ))
            }
            ExprKind::Negate(inner) => {
                let inner = self.expr(inner)?;
                Ok(Typed::new(Expression::Negated(Box::new(inner.expr)), inner.java_type))
            }
            ExprKind::SubQuery(select) => {
                let (sub, java_type) = self.subquery(select)?;
                Ok(Typed::new(Expression::SubQuery(Box::new(sub)), java_type))
            }
        }
    }

    fn literal(&self, literal: &Literal) -> Typed {
        match literal {
            Literal::Null => Typed::new(Expression::Literal(Value::Null), JavaType::Object),
            Literal::Bool(b) => {
                let token = if *b { "true" } else { "false" };
                match self.substitution(token) {
                    Some(fragment) => Typed::new(Expression::Fragment(fragment), JavaType::Boolean),
                    None => Typed::new(Expression::Literal(Value::Bool(*b)), JavaType::Boolean),
                }
            }
            Literal::Int(i) => match i32::try_from(*i) {
                Ok(small) => Typed::new(Expression::Literal(Value::Int32(small)), JavaType::Integer),
                Err(_) => Typed::new(Expression::Literal(Value::Int64(*i)), JavaType::Long),
            },
            Literal::Float(f) => Typed::new(Expression::Literal(Value::Float64(*f)), JavaType::Double),
            Literal::String(s) => Typed::new(Expression::Literal(Value::String(s.clone())), JavaType::String),
        }
    }

    fn function(&mut self, name: &str, distinct: bool, star: bool, args: &[ast::Expr]) -> Result<Typed> {
        let lower = name.to_ascii_lowercase();

        if let Some(property) = self.collection_properties.normalized_property_name(&lower) {
            return self.collection_property_function(property, args);
        }

        if lower == "timestampdiff" || lower == "timestampadd" {
            let [unit, first, second] = args else {
                return Err(self.error(format!("{}() takes a unit and two arguments", lower)));
            };
            let unit = unit
                .as_path()
                .filter(|p| p.len() == 1)
                .and_then(|p| TemporalUnit::from_name(p.first()))
                .ok_or_else(|| self.error(format!("{}() requires a temporal unit", lower)))?;
            let first = Box::new(self.expr(first)?.expr);
            let second = Box::new(self.expr(second)?.expr);
            return Ok(if lower == "timestampdiff" {
                Typed::new(
                    Expression::TimestampDiff {
                        unit,
                        from: first,
                        to: second,
                    },
                    JavaType::Long,
                )
            } else {
                Typed::new(
                    Expression::TimestampAdd {
                        unit,
                        magnitude: first,
                        to: second,
                    },
                    JavaType::Timestamp,
                )
            });
        }

        if star {
            if lower != "count" {
                return Err(self.error(format!("{}(*) is not a valid aggregate", lower)));
            }
            return Ok(Typed::new(Expression::count_star(), JavaType::Long));
        }

        let mut typed_args = Vec::with_capacity(args.len());
        for arg in args {
            typed_args.push(self.expr(arg)?);
        }
        let java_type = function_type(&lower, &typed_args);
        Ok(Typed::new(
            Expression::Function {
                name: lower,
                distinct,
                args: typed_args.into_iter().map(|t| t.expr).collect(),
            },
            java_type,
        ))
    }

    /// `size(d.kittens)`, `elements(d.kittens)`, `index(k)` and friends.
    fn collection_property_function(&mut self, property: &'static str, args: &[ast::Expr]) -> Result<Typed> {
        let [arg] = args else {
            return Err(self.error(format!("{}() takes exactly one argument", property)));
        };
        let Some(path) = arg.as_path() else {
            return Err(self.error(format!("{}() requires a collection path", property)));
        };

        if property == COLLECTION_INDEX {
            let element = self
                .lookup_alias(path.first())
                .filter(|_| path.len() == 1)
                .filter(|e| self.element(*e).collection.is_some_and(CollectionDef::is_indexed));
            let Some(element) = element else {
                return Err(self.error(format!(
                    "{}() may only be used with an alias of a joined indexed collection",
                    COLLECTION_INDEX
                )));
            };
            let e = self.element(element);
            let column = e
                .collection
                .and_then(|c| c.index_column.clone())
                .unwrap_or_default();
            return Ok(Typed::new(
                Expression::column(e.primary_alias(), column),
                JavaType::Integer,
            ));
        }

        match self.resolve_path(path, PathMode::Value)? {
            Resolved::Collection { owner, collection } => {
                self.collection_function(property, owner, collection)
            }
            _ => Err(self.error(format!("{}() requires a collection path, got {}", property, path))),
        }
    }

    // ---- conditions ----

    fn condition(&mut self, condition: &Condition) -> Result<Predicate> {
        match condition {
            Condition::And(items) | Condition::Or(items) => {
                let nature = if matches!(condition, Condition::And(_)) {
                    JunctionNature::Conjunction
                } else {
                    JunctionNature::Disjunction
                };
                let mut junction = Junction::new(nature);
                for item in items {
                    junction.add(self.condition(item)?);
                }
                Ok(Predicate::Junction(junction))
            }
            Condition::Not(inner) => Ok(negate(self.condition(inner)?)),
            Condition::Paren(inner) => Ok(Predicate::Grouped(Box::new(self.condition(inner)?))),
            Condition::Compare { lhs, op, rhs } => {
                let lhs = self.expr(lhs)?;
                let rhs = self.expr(rhs)?;
                let operator = match op {
                    CompareOp::Eq => Operator::Equal,
                    CompareOp::Ne => Operator::NotEqual,
                    CompareOp::Gt => Operator::GreaterThan,
                    CompareOp::Ge => Operator::GreaterThanOrEqual,
                    CompareOp::Lt => Operator::LessThan,
                    CompareOp::Le => Operator::LessThanOrEqual,
                };
                Ok(Predicate::relational(lhs.expr, operator, rhs.expr))
            }
            Condition::Like {
                expr,
                pattern,
                escape,
                negated,
            } => Ok(Predicate::Like(LikePredicate {
                match_expression: self.expr(expr)?.expr,
                pattern: self.expr(pattern)?.expr,
                escape: escape.as_ref().map(|e| self.expr(e)).transpose()?.map(|t| t.expr),
                negated: *negated,
            })),
            Condition::In {
                expr,
                target,
                negated,
            } => {
                let test = self.expr(expr)?.expr;
                match target {
                    InTarget::List(list) => {
                        let mut values = Vec::with_capacity(list.len());
                        for item in list {
                            values.push(self.expr(item)?.expr);
                        }
                        Ok(Predicate::InList(InListPredicate {
                            test,
                            list: values,
                            negated: *negated,
                        }))
                    }
                    InTarget::SubQuery(select) => {
                        let (sub, _) = self.subquery(select)?;
                        Ok(Predicate::InSubQuery(InSubQueryPredicate {
                            test,
                            sub_query: Box::new(sub),
                            negated: *negated,
                        }))
                    }
                    InTarget::Collection(collection) => match self.expr(collection)?.expr {
                        Expression::SubQuery(sub) => Ok(Predicate::InSubQuery(InSubQueryPredicate {
                            test,
                            sub_query: sub,
                            negated: *negated,
                        })),
                        _ => Err(self.error("in requires elements() or indices() of a collection")),
                    },
                }
            }
            Condition::IsNull { expr, negated } => Ok(Predicate::Nullness(NullnessPredicate {
                expression: self.expr(expr)?.expr,
                negated: *negated,
            })),
            Condition::Between {
                expr,
                lower,
                upper,
                negated,
            } => {
                let test = self.expr(expr)?.expr;
                let lower = self.expr(lower)?.expr;
                let upper = self.expr(upper)?.expr;
                let mut junction = Junction::new(JunctionNature::Conjunction);
                junction.add(Predicate::relational(test.clone(), Operator::GreaterThanOrEqual, lower));
                junction.add(Predicate::relational(test, Operator::LessThanOrEqual, upper));
                let between = Predicate::Junction(junction);
                Ok(if *negated {
                    Predicate::negated(between)
                } else {
                    between
                })
            }
        }
    }
}

/// Push a negation into predicates that have a direct negated form.
fn negate(predicate: Predicate) -> Predicate {
    match predicate {
        Predicate::Relational(mut relational) => {
            relational.operator = relational.operator.negate();
            Predicate::Relational(relational)
        }
        Predicate::InList(mut p) => {
            p.negated = !p.negated;
            Predicate::InList(p)
        }
        Predicate::InSubQuery(mut p) => {
            p.negated = !p.negated;
            Predicate::InSubQuery(p)
        }
        Predicate::Like(mut p) => {
            p.negated = !p.negated;
            Predicate::Like(p)
        }
        Predicate::Nullness(mut p) => {
            p.negated = !p.negated;
            Predicate::Nullness(p)
        }
        Predicate::Negated(inner) => *inner,
        other => Predicate::negated(other),
    }
}

fn arithmetic_type(op: ArithmeticOperator, lhs: JavaType, rhs: JavaType) -> JavaType {
    if op == ArithmeticOperator::Concat {
        return JavaType::String;
    }
    match (lhs, rhs) {
        (JavaType::Object, other) | (other, JavaType::Object) => other,
        (JavaType::Double, _) | (_, JavaType::Double) => JavaType::Double,
        (JavaType::Float, _) | (_, JavaType::Float) => JavaType::Float,
        (JavaType::Long, _) | (_, JavaType::Long) => JavaType::Long,
        (l, r) if l.is_integral() && r.is_integral() => JavaType::Integer,
        _ => JavaType::Object,
    }
}

fn function_type(name: &str, args: &[Typed]) -> JavaType {
    let first = args.first().map(|a| a.java_type).unwrap_or(JavaType::Object);
    match name {
        "count" => JavaType::Long,
        "sum" if first.is_integral() => JavaType::Long,
        "sum" if first.is_numeric() => JavaType::Double,
        "avg" | "sqrt" => JavaType::Double,
        "min" | "max" | "abs" | "coalesce" | "nullif" => first,
        "lower" | "upper" | "trim" | "concat" | "substring" | "str" => JavaType::String,
        "length" | "locate" | "bit_length" | "mod" => JavaType::Integer,
        "current_timestamp" | "current_date" | "current_time" => JavaType::Timestamp,
        _ => JavaType::Object,
    }
}
