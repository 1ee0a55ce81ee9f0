//! Query plans and the plan cache.
//!
//! A plan is the set of compiled translators for one HQL string: one per
//! concrete query produced by the splitter. Plans are immutable once built
//! and are shared through the [`QueryPlanCache`].

use super::holder::Row;
use super::parameters::{QueryParameters, RowSelection};
use super::splitter::{concrete_queries, ImplementorSource};
use super::translator::{FilterTranslator, JdbcExecutor, QueryTranslator, QueryTranslatorImpl, TranslationContext};
use crate::error::Result;
use crate::sql::ParameterSpec;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::debug;

/// Compiled translators for an HQL query.
#[derive(Debug)]
pub struct HqlQueryPlan {
    source_query: String,
    shallow: bool,
    translators: Vec<QueryTranslatorImpl>,
    query_spaces: Vec<String>,
    sql_strings: Vec<String>,
}

impl HqlQueryPlan {
    pub fn new(
        query: &str,
        shallow: bool,
        context: &TranslationContext,
        source: &dyn ImplementorSource,
    ) -> Result<Self> {
        let concrete = concrete_queries(query, source)?;
        let mut translators = Vec::with_capacity(concrete.len());
        for concrete_query in concrete {
            let mut translator = QueryTranslatorImpl::new(concrete_query);
            translator.compile(context, shallow)?;
            translators.push(translator);
        }
        Ok(Self::from_translators(query, shallow, translators))
    }

    fn from_translators(query: &str, shallow: bool, translators: Vec<QueryTranslatorImpl>) -> Self {
        let mut query_spaces: Vec<String> = Vec::new();
        let mut sql_strings = Vec::new();
        for translator in &translators {
            for space in translator.query_spaces() {
                if !query_spaces.contains(space) {
                    query_spaces.push(space.clone());
                }
            }
            sql_strings.extend(translator.collect_sql_strings());
        }
        Self {
            source_query: query.to_string(),
            shallow,
            translators,
            query_spaces,
            sql_strings,
        }
    }

    pub fn source_query(&self) -> &str {
        &self.source_query
    }

    pub fn is_shallow(&self) -> bool {
        self.shallow
    }

    pub fn translators(&self) -> &[QueryTranslatorImpl] {
        &self.translators
    }

    pub fn query_spaces(&self) -> &[String] {
        &self.query_spaces
    }

    pub fn sql_strings(&self) -> &[String] {
        &self.sql_strings
    }

    /// Return aliases of the first concrete query; all of them share the
    /// same select clause.
    pub fn return_aliases(&self) -> &[String] {
        self.translators.first().map(|t| t.return_aliases()).unwrap_or(&[])
    }

    pub fn return_types(&self) -> &[String] {
        self.translators.first().map(|t| t.return_types()).unwrap_or(&[])
    }

    /// Names of the named parameters the query uses.
    pub fn named_parameters(&self) -> BTreeSet<String> {
        self.parameter_specs()
            .filter_map(|spec| match spec {
                ParameterSpec::Named(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of positional parameters (highest ordinal plus one).
    pub fn ordinal_parameter_count(&self) -> usize {
        self.parameter_specs()
            .filter_map(|spec| match spec {
                ParameterSpec::Ordinal(n) => Some(*n as usize + 1),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    fn parameter_specs(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.translators.iter().flat_map(|t| t.parameter_specs())
    }

    pub fn is_manipulation(&self) -> bool {
        self.translators.iter().any(|t| t.is_manipulation_statement())
    }

    /// Run every concrete query and concatenate the rows in order.
    ///
    /// With more than one concrete query the row selection is applied to
    /// the merged rows instead of in SQL.
    pub fn perform_list(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<Vec<Row>> {
        if self.translators.len() <= 1 {
            let mut rows = Vec::new();
            for translator in &self.translators {
                rows.extend(translator.list(executor, parameters)?);
            }
            return Ok(rows);
        }

        let selection = parameters.row_selection;
        let mut unlimited = parameters.clone();
        unlimited.row_selection = RowSelection::default();
        let mut rows = Vec::new();
        for translator in &self.translators {
            rows.extend(translator.list(executor, &unlimited)?);
        }
        let first = selection.first_row.unwrap_or(0) as usize;
        let max = selection.max_rows.map(|m| m as usize).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(first).take(max).collect())
    }

    /// Run every concrete statement and sum the affected row counts.
    pub fn perform_execute_update(
        &self,
        executor: &mut dyn JdbcExecutor,
        parameters: &QueryParameters,
    ) -> Result<u64> {
        let mut count = 0;
        for translator in &self.translators {
            count += translator.execute_update(executor, parameters)?;
        }
        Ok(count)
    }
}

/// Compiled translators for a collection filter.
#[derive(Debug)]
pub struct FilterQueryPlan {
    collection_role: String,
    plan: HqlQueryPlan,
}

impl FilterQueryPlan {
    pub fn new(
        filter: &str,
        collection_role: &str,
        shallow: bool,
        context: &TranslationContext,
        source: &dyn ImplementorSource,
    ) -> Result<Self> {
        let concrete = concrete_queries(filter, source)?;
        let mut translators = Vec::with_capacity(concrete.len());
        for concrete_query in concrete {
            let mut translator = QueryTranslatorImpl::new(concrete_query);
            translator.compile_filter(context, collection_role, shallow)?;
            translators.push(translator);
        }
        Ok(Self {
            collection_role: collection_role.to_string(),
            plan: HqlQueryPlan::from_translators(filter, shallow, translators),
        })
    }

    pub fn collection_role(&self) -> &str {
        &self.collection_role
    }

    pub fn plan(&self) -> &HqlQueryPlan {
        &self.plan
    }

    pub fn perform_list(&self, executor: &mut dyn JdbcExecutor, parameters: &QueryParameters) -> Result<Vec<Row>> {
        self.plan.perform_list(executor, parameters)
    }
}

/// Cache key: the query text, the shallow flag and, for filters, the role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryPlanKey {
    pub query: String,
    pub shallow: bool,
    pub collection_role: Option<String>,
}

impl QueryPlanKey {
    pub fn hql(query: &str, shallow: bool) -> Self {
        Self {
            query: query.to_string(),
            shallow,
            collection_role: None,
        }
    }

    pub fn filter(query: &str, collection_role: &str, shallow: bool) -> Self {
        Self {
            query: query.to_string(),
            shallow,
            collection_role: Some(collection_role.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
enum CachedQueryPlan {
    Hql(Arc<HqlQueryPlan>),
    Filter(Arc<FilterQueryPlan>),
}

#[derive(Debug)]
struct CachedPlan {
    plan: CachedQueryPlan,
    hit_count: AtomicU64,
}

impl CachedPlan {
    fn new(plan: CachedQueryPlan) -> Self {
        Self {
            plan,
            hit_count: AtomicU64::new(0),
        }
    }

    fn record_hit(&self) {
        self.hit_count.fetch_add(1, AtomicOrdering::Relaxed);
    }

    fn hits(&self) -> u64 {
        self.hit_count.load(AtomicOrdering::Relaxed)
    }
}

/// Plan cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(AtomicOrdering::Relaxed)
    }

    /// Hit rate between 0.0 and 1.0.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Bounded cache of compiled plans with least-hit eviction.
///
/// Two threads missing on the same key may both compile; the later insert
/// wins and both plans are equivalent.
#[derive(Debug)]
pub struct QueryPlanCache {
    cache: RwLock<HashMap<QueryPlanKey, CachedPlan>>,
    max_entries: usize,
    stats: CacheStats,
}

impl QueryPlanCache {
    /// A cache holding at most `max_entries` plans; zero disables caching.
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries,
            stats: CacheStats::default(),
        }
    }

    /// The plan for an HQL query, compiled with `build` on a miss.
    pub fn hql_query_plan(
        &self,
        query: &str,
        shallow: bool,
        build: impl FnOnce() -> Result<HqlQueryPlan>,
    ) -> Result<Arc<HqlQueryPlan>> {
        let key = QueryPlanKey::hql(query, shallow);
        if let Some(CachedQueryPlan::Hql(plan)) = self.get(&key) {
            return Ok(plan);
        }
        let plan = Arc::new(build()?);
        self.insert(key, CachedQueryPlan::Hql(Arc::clone(&plan)));
        Ok(plan)
    }

    /// The plan for a collection filter, compiled with `build` on a miss.
    pub fn filter_query_plan(
        &self,
        filter: &str,
        collection_role: &str,
        shallow: bool,
        build: impl FnOnce() -> Result<FilterQueryPlan>,
    ) -> Result<Arc<FilterQueryPlan>> {
        let key = QueryPlanKey::filter(filter, collection_role, shallow);
        if let Some(CachedQueryPlan::Filter(plan)) = self.get(&key) {
            return Ok(plan);
        }
        let plan = Arc::new(build()?);
        self.insert(key, CachedQueryPlan::Filter(Arc::clone(&plan)));
        Ok(plan)
    }

    fn get(&self, key: &QueryPlanKey) -> Option<CachedQueryPlan> {
        let guard = self.cache.read();
        if let Some(cached) = guard.get(key) {
            cached.record_hit();
            self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
            debug!(query = %key.query, "query plan cache hit");
            return Some(cached.plan.clone());
        }
        self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
        debug!(query = %key.query, "query plan cache miss");
        None
    }

    fn insert(&self, key: QueryPlanKey, plan: CachedQueryPlan) {
        if self.max_entries == 0 {
            return;
        }
        let mut guard = self.cache.write();
        if guard.len() >= self.max_entries && !guard.contains_key(&key) {
            self.evict_least_used(&mut guard);
        }
        guard.insert(key, CachedPlan::new(plan));
    }

    fn evict_least_used(&self, cache: &mut HashMap<QueryPlanKey, CachedPlan>) {
        let evict_key = cache
            .iter()
            .min_by_key(|(_, v)| v.hits())
            .map(|(k, _)| k.clone());
        if let Some(key) = evict_key {
            cache.remove(&key);
            self.stats.evictions.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl Default for QueryPlanCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PLAN_CACHE_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_plan(query: &str) -> HqlQueryPlan {
        HqlQueryPlan::from_translators(query, false, Vec::new())
    }

    #[test]
    fn test_cache_hit_returns_same_plan() {
        let cache = QueryPlanCache::new(4);
        let first = cache.hql_query_plan("from Dog", false, || Ok(empty_plan("from Dog"))).unwrap();
        let second = cache
            .hql_query_plan("from Dog", false, || panic!("should be cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().hit_rate(), 0.5);
    }

    #[test]
    fn test_shallow_flag_is_part_of_key() {
        let cache = QueryPlanCache::new(4);
        cache.hql_query_plan("from Dog", false, || Ok(empty_plan("from Dog"))).unwrap();
        cache.hql_query_plan("from Dog", true, || Ok(empty_plan("from Dog"))).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_eviction_removes_least_hit_entry() {
        let cache = QueryPlanCache::new(2);
        cache.hql_query_plan("a", false, || Ok(empty_plan("a"))).unwrap();
        cache.hql_query_plan("b", false, || Ok(empty_plan("b"))).unwrap();
        cache.hql_query_plan("a", false, || Ok(empty_plan("a"))).unwrap();
        cache.hql_query_plan("c", false, || Ok(empty_plan("c"))).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions(), 1);
        cache.hql_query_plan("a", false, || panic!("a should survive")).unwrap();
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = QueryPlanCache::new(2);
        let err = cache.hql_query_plan("from", false, || {
            Err(crate::error::Error::query("unexpected end", "from"))
        });
        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = QueryPlanCache::new(0);
        cache.hql_query_plan("a", false, || Ok(empty_plan("a"))).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_plan_lists_nothing() {
        struct NoExecutor;
        impl JdbcExecutor for NoExecutor {
            fn execute_query(
                &mut self,
                _: &str,
                _: &[crate::value::Value],
            ) -> Result<Box<dyn crate::results::JdbcValuesSource>> {
                panic!("no query expected")
            }
            fn execute_update(&mut self, _: &str, _: &[crate::value::Value]) -> Result<u64> {
                panic!("no update expected")
            }
        }
        let plan = empty_plan("from Nothing");
        let params = QueryParameters::new();
        assert!(plan.perform_list(&mut NoExecutor, &params).unwrap().is_empty());
        assert_eq!(plan.perform_execute_update(&mut NoExecutor, &params).unwrap(), 0);
        assert!(plan.return_aliases().is_empty());
    }
}
