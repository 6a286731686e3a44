use crate::batch::{BatchLoaders, RequestContext};
use crate::cache::QueryCache;
use crate::config::EngineConfig;
use crate::error::{ResolveError, SchemaConfigError};
use crate::resolver::{Resolved, ResolverTable};
use crate::resource::ResourceIndex;
use crate::schema::SchemaDefinition;
use crate::services::Endpoints;
use crate::source::HeaderMap;
use crate::template::TemplateCompiler;
use rdf_gateway_model::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Represents a configured gateway.
///
/// An engine consists of:
/// - The parsed [SchemaDefinition].
/// - The [ResourceIndex], which binds every schema type to the way its entries are obtained.
/// - The [ResolverTable], which tells the execution layer how to resolve each field.
///
/// The engine is built once at startup and shared by all requests. State that belongs to a single
/// request lives in a [RequestContext].
#[derive(Debug)]
pub struct Engine {
    schema: SchemaDefinition,
    index: Arc<ResourceIndex>,
    resolvers: ResolverTable,
    config: EngineConfig,
}

impl Engine {
    /// Builds the resources of `schema` with a fresh compiler and cache.
    pub fn new(
        schema: SchemaDefinition,
        endpoints: &Endpoints,
        templates: &HashMap<String, String>,
        config: EngineConfig,
    ) -> Result<Self, SchemaConfigError> {
        let cache = Arc::new(QueryCache::new(config.cache_capacity, config.cache_ttl));
        Self::build(
            schema,
            endpoints,
            templates,
            &TemplateCompiler::new(),
            cache,
            config,
        )
    }

    /// Builds the resources of `schema` with the given compiler and cache.
    pub fn build(
        schema: SchemaDefinition,
        endpoints: &Endpoints,
        templates: &HashMap<String, String>,
        compiler: &TemplateCompiler,
        cache: Arc<QueryCache>,
        config: EngineConfig,
    ) -> Result<Self, SchemaConfigError> {
        let index = ResourceIndex::build(&schema, endpoints, templates, compiler, cache, &config)?;
        Ok(Self::from_index(schema, Arc::new(index), config))
    }

    /// Creates an engine around an existing index.
    pub fn from_index(
        schema: SchemaDefinition,
        index: Arc<ResourceIndex>,
        config: EngineConfig,
    ) -> Self {
        let resolvers = ResolverTable::build(&schema, &index);
        tracing::info!(
            resources = index.all().count(),
            root = index.root().count(),
            "Built resource index"
        );
        Self {
            schema,
            index,
            resolvers,
            config,
        }
    }

    pub fn schema(&self) -> &SchemaDefinition {
        &self.schema
    }

    pub fn index(&self) -> &Arc<ResourceIndex> {
        &self.index
    }

    pub fn resolvers(&self) -> &ResolverTable {
        &self.resolvers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates the context of a new request. `headers` are forwarded to every source.
    pub fn request_context(&self, headers: HeaderMap) -> RequestContext {
        let loaders = BatchLoaders::for_request(&self.index, &headers, self.config.batch_max_size);
        RequestContext { headers, loaders }
    }

    /// Resolves `field` of `type_name`. See [ResolverTable::resolve].
    pub async fn resolve(
        &self,
        type_name: &str,
        field: &str,
        parent: Option<&Entry>,
        args: &serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<Resolved, ResolveError> {
        self.resolvers
            .resolve(&self.index, type_name, field, parent, args, ctx)
            .await
    }
}
