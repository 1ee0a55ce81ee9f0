//! Session factory settings.

use crate::dialect::DialectKind;
use crate::error::{Error, Result};
use crate::loader::BatchFetchStyle;
use std::collections::BTreeMap;
use std::path::Path;

pub const DIALECT: &str = "hibernate.dialect";
pub const QUERY_SUBSTITUTIONS: &str = "hibernate.query.substitutions";
pub const DEFAULT_BATCH_FETCH_SIZE: &str = "hibernate.default_batch_fetch_size";
pub const BATCH_FETCH_STYLE: &str = "hibernate.batch_fetch_style";
pub const QUERY_PLAN_CACHE_MAX_SIZE: &str = "hibernate.query.plan_cache_max_size";

pub const DEFAULT_PLAN_CACHE_MAX_SIZE: usize = 2048;

/// Settings read from Hibernate-style properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// SQL dialect.
    pub dialect: DialectKind,

    /// Query substitutions, e.g. `true` rendered as `1`.
    pub substitutions: BTreeMap<String, String>,

    /// Batch size for collections that do not declare one. 1 disables batching.
    pub default_batch_fetch_size: usize,

    pub batch_fetch_style: BatchFetchStyle,

    /// Maximum number of cached query plans; 0 disables the cache.
    pub plan_cache_max_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            substitutions: BTreeMap::new(),
            default_batch_fetch_size: 1,
            batch_fetch_style: BatchFetchStyle::default(),
            plan_cache_max_size: DEFAULT_PLAN_CACHE_MAX_SIZE,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_substitution(mut self, token: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.substitutions.insert(token.into(), replacement.into());
        self
    }

    pub fn with_default_batch_fetch_size(mut self, size: usize) -> Self {
        self.default_batch_fetch_size = size;
        self
    }

    pub fn with_batch_fetch_style(mut self, style: BatchFetchStyle) -> Self {
        self.batch_fetch_style = style;
        self
    }

    pub fn with_plan_cache_max_size(mut self, size: usize) -> Self {
        self.plan_cache_max_size = size;
        self
    }

    /// Build settings from a property map. Unknown keys are ignored.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(dialect) = properties.get(DIALECT) {
            settings.dialect = dialect.parse()?;
        }
        if let Some(substitutions) = properties.get(QUERY_SUBSTITUTIONS) {
            settings.substitutions = parse_substitutions(substitutions)?;
        }
        if let Some(size) = properties.get(DEFAULT_BATCH_FETCH_SIZE) {
            settings.default_batch_fetch_size = parse_usize(DEFAULT_BATCH_FETCH_SIZE, size)?.max(1);
        }
        if let Some(style) = properties.get(BATCH_FETCH_STYLE) {
            settings.batch_fetch_style = style.parse()?;
        }
        if let Some(size) = properties.get(QUERY_PLAN_CACHE_MAX_SIZE) {
            settings.plan_cache_max_size = parse_usize(QUERY_PLAN_CACHE_MAX_SIZE, size)?;
        }
        Ok(settings)
    }

    /// Read settings from a `.properties` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_properties(&parse_properties(&text))
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// Parse `"true 1, false 0"` (also `true=1`) into a substitution map.
pub fn parse_substitutions(text: &str) -> Result<BTreeMap<String, String>> {
    let mut substitutions = BTreeMap::new();
    for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (token, replacement) = entry
            .split_once('=')
            .or_else(|| entry.split_once(char::is_whitespace))
            .ok_or_else(|| Error::Config(format!("malformed query substitution: '{}'", entry)))?;
        substitutions.insert(token.trim().to_string(), replacement.trim().to_string());
    }
    Ok(substitutions)
}

/// Parse Java-style properties: `key=value` or `key: value` per line,
/// `#` and `!` comments.
pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':']).map(|i| (&line[..i], &line[i + 1..]));
            let (key, value) = split.or_else(|| line.split_once(char::is_whitespace))?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}
