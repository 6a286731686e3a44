//! Schema types bound to the way their entries are obtained.
//!
//! A [Resource] is either a [RootResource], backed by a SPARQL endpoint and a query template, an
//! [EmbeddedResource], which is only materialized as part of a root resource's result, or a
//! [UnionResource], which fans out to its members.

mod index;

pub use index::ResourceIndex;

use crate::cache::{CacheKey, QueryCache};
use crate::entry_builder::build_entry;
use crate::error::FetchError;
use crate::grouping::group_bindings;
use crate::source::{fetch_tuples, HeaderMap, SparqlSource};
use crate::template::QueryTemplate;
use futures::future::try_join_all;
use rdf_gateway_model::vocab::IRI_FIELD;
use rdf_gateway_model::{Entry, EntryMap, FieldDescriptor};
use serde_json::json;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The name and fields of an object type. Shared by root and embedded resources.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceShape {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl ResourceShape {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug)]
pub enum Resource {
    Root(RootResource),
    Embedded(EmbeddedResource),
    Union(UnionResource),
}

impl Resource {
    pub fn name(&self) -> &str {
        match self {
            Resource::Root(resource) => &resource.shape.name,
            Resource::Embedded(resource) => &resource.shape.name,
            Resource::Union(resource) => &resource.name,
        }
    }

    /// Returns the name and fields of object resources. Unions have no fields of their own.
    pub fn shape(&self) -> Option<&ResourceShape> {
        match self {
            Resource::Root(resource) => Some(&resource.shape),
            Resource::Embedded(resource) => Some(&resource.shape),
            Resource::Union(_) => None,
        }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        self.shape().map_or(&[], |shape| shape.fields.as_slice())
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Resource::Embedded(_))
    }

    /// Fetches the entries selected by `args`, keyed by subject.
    pub async fn fetch(
        &self,
        index: &ResourceIndex,
        args: &serde_json::Value,
        headers: &HeaderMap,
    ) -> Result<Arc<EntryMap>, FetchError> {
        match self {
            Resource::Root(resource) => resource.fetch(index, args, headers).await,
            Resource::Union(resource) => resource.fetch(index, args, headers).await,
            Resource::Embedded(resource) => Err(FetchError::NotFetchable(resource.shape.name.clone())),
        }
    }

    /// Fetches the entries with the given identifiers.
    ///
    /// The result has one item per identifier, in the same order. Identifiers without a matching
    /// entry yield `None`. No query is issued for an empty list.
    pub async fn fetch_by_iris(
        &self,
        index: &ResourceIndex,
        ids: &[String],
        headers: &HeaderMap,
    ) -> Result<Vec<Option<Arc<Entry>>>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = serde_json::Map::new();
        args.insert(IRI_FIELD.to_owned(), json!(ids));
        let entries = self.fetch(index, &serde_json::Value::Object(args), headers).await?;
        let by_iri = entries
            .values()
            .filter_map(|entry| entry.iri().map(|iri| (iri, entry)))
            .collect::<HashMap<_, _>>();
        Ok(ids
            .iter()
            .map(|id| by_iri.get(id.as_str()).map(|entry| Arc::clone(*entry)))
            .collect())
    }
}

/// A type backed by a SPARQL endpoint and a query template.
pub struct RootResource {
    pub(crate) shape: ResourceShape,
    pub(crate) source: Arc<dyn SparqlSource>,
    pub(crate) template: QueryTemplate,
    pub(crate) cache: Arc<QueryCache>,
    pub(crate) page_threshold: i64,
}

impl RootResource {
    pub fn new(
        shape: ResourceShape,
        source: Arc<dyn SparqlSource>,
        template: QueryTemplate,
        cache: Arc<QueryCache>,
        page_threshold: i64,
    ) -> Self {
        Self {
            shape,
            source,
            template,
            cache,
            page_threshold,
        }
    }

    pub fn shape(&self) -> &ResourceShape {
        &self.shape
    }

    /// Renders the query for `args` and returns the entries of all named subjects in its result.
    ///
    /// Results are served from the cache if the same query was issued recently with the same
    /// credentials.
    pub async fn fetch(
        &self,
        index: &ResourceIndex,
        args: &serde_json::Value,
        headers: &HeaderMap,
    ) -> Result<Arc<EntryMap>, FetchError> {
        let query = self.template.render(args)?;
        let key = CacheKey::new(self.shape.name.as_str(), headers, query);
        if let Some(entries) = self.cache.get(&key) {
            tracing::debug!(resource = %self.shape.name, "Serving entries from cache");
            return Ok(entries);
        }

        tracing::debug!(resource = %self.shape.name, query = key.query(), "Fetching entries");
        let stream = fetch_tuples(
            Arc::clone(&self.source),
            key.query(),
            self.page_threshold,
            headers,
        )
        .await?;
        let grouped = group_bindings(stream).await?;

        let mut entries = EntryMap::with_capacity(grouped.primary.len());
        for subject in grouped.primary.keys() {
            let entry = build_entry(&grouped.all, subject, &self.shape, index)?;
            entries.insert(subject.clone(), Arc::new(entry));
        }
        let entries = Arc::new(entries);

        self.cache.insert(key, Arc::clone(&entries));
        Ok(entries)
    }
}

impl Debug for RootResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootResource")
            .field("shape", &self.shape)
            .field("page_threshold", &self.page_threshold)
            .finish_non_exhaustive()
    }
}

/// A type that is only materialized as a nested value of another type's entry.
#[derive(Clone, Debug)]
pub struct EmbeddedResource {
    pub(crate) shape: ResourceShape,
}

impl EmbeddedResource {
    pub fn new(shape: ResourceShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> &ResourceShape {
        &self.shape
    }
}

/// A choice among several resources. Entries are told apart by their type name.
#[derive(Clone, Debug)]
pub struct UnionResource {
    pub(crate) name: String,
    pub(crate) members: Vec<String>,
}

impl UnionResource {
    pub fn new(name: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Fetches all members concurrently and merges their entries.
    ///
    /// Fails if any member fails.
    pub async fn fetch(
        &self,
        index: &ResourceIndex,
        args: &serde_json::Value,
        headers: &HeaderMap,
    ) -> Result<Arc<EntryMap>, FetchError> {
        let members = self
            .members
            .iter()
            .map(|member| match index.lookup(member) {
                Some(Resource::Root(resource)) => Ok(resource),
                Some(_) => Err(FetchError::NotFetchable(member.clone())),
                None => Err(FetchError::UnknownMember {
                    union: self.name.clone(),
                    member: member.clone(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results =
            try_join_all(members.into_iter().map(|member| member.fetch(index, args, headers)))
                .await?;

        let mut merged = EntryMap::new();
        for entries in results {
            merged.extend(entries.iter().map(|(id, entry)| (id.clone(), Arc::clone(entry))));
        }
        Ok(Arc::new(merged))
    }
}
