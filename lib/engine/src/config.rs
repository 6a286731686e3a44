use crate::error::ConfigError;
use rdf_gateway_model::vocab::DEFAULT_PREDICATE_NAMESPACE;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

pub const PAGE_THRESHOLD_VAR: &str = "SPARQL_PAGE_THRESHOLD";
pub const CACHE_CAPACITY_VAR: &str = "QUERY_CACHE_CAPACITY";
pub const CACHE_TTL_VAR: &str = "QUERY_CACHE_TTL_SECS";
pub const BATCH_MAX_SIZE_VAR: &str = "BATCH_MAX_SIZE";
pub const PREDICATE_NAMESPACE_VAR: &str = "PREDICATE_NAMESPACE";

/// Holds the tuning knobs of the resolution engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of tuples per page. Pagination is disabled if this is zero or negative.
    pub page_threshold: i64,
    /// Maximum number of cached query results. Caching is disabled if this is zero.
    pub cache_capacity: usize,
    /// How long a cached query result stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of identifiers per batched lookup. `None` is unbounded.
    pub batch_max_size: Option<NonZeroUsize>,
    /// Predicates starting with this namespace fill the field named by the rest of the IRI.
    pub predicate_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_threshold: 0,
            cache_capacity: 1000,
            cache_ttl: Duration::from_secs(300),
            batch_max_size: None,
            predicate_namespace: DEFAULT_PREDICATE_NAMESPACE.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration from `lookup`, falling back to the defaults for missing variables.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let batch_max_size = parse_var::<usize>(&lookup, BATCH_MAX_SIZE_VAR)?
            .and_then(NonZeroUsize::new)
            .or(defaults.batch_max_size);

        Ok(Self {
            page_threshold: parse_var(&lookup, PAGE_THRESHOLD_VAR)?
                .unwrap_or(defaults.page_threshold),
            cache_capacity: parse_var(&lookup, CACHE_CAPACITY_VAR)?
                .unwrap_or(defaults.cache_capacity),
            cache_ttl: parse_var(&lookup, CACHE_TTL_VAR)?
                .map_or(defaults.cache_ttl, Duration::from_secs),
            batch_max_size,
            predicate_namespace: lookup(PREDICATE_NAMESPACE_VAR)
                .filter(|ns| !ns.is_empty())
                .unwrap_or(defaults.predicate_namespace),
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            reason: e.to_string(),
            value,
        })
}
