//! The table of field resolvers, built once from the schema.
//!
//! Every field of the query type and of every object type is mapped to a [ResolverKind]. The
//! execution layer looks up the kind by type and field name and calls [ResolverTable::resolve].

use crate::batch::RequestContext;
use crate::error::ResolveError;
use crate::resource::{Resource, ResourceIndex};
use crate::schema::SchemaDefinition;
use rdf_gateway_model::{Entry, EntryValue};
use std::collections::HashMap;
use std::sync::Arc;

/// How a single field is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    /// Reads the value of the field from the parent entry.
    ScalarLookup,
    /// Reads an embedded entry (or a list of them) from the parent entry.
    EmbeddedExpand,
    /// Fetches entries of a root resource. Below the query type, the parent holds the identifiers.
    RootFetch { resource: String, list: bool },
    /// Like [ResolverKind::RootFetch], for a union of root resources.
    UnionFetch { resource: String, list: bool },
}

/// The value of a resolved field.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    Null,
    Value(EntryValue),
    Entry(Arc<Entry>),
    List(Vec<Resolved>),
}

impl From<&EntryValue> for Resolved {
    fn from(value: &EntryValue) -> Self {
        match value {
            EntryValue::Null => Resolved::Null,
            EntryValue::Entry(entry) => Resolved::Entry(Arc::clone(entry)),
            EntryValue::List(values) => Resolved::List(values.iter().map(Resolved::from).collect()),
            other => Resolved::Value(other.clone()),
        }
    }
}

impl From<Option<Arc<Entry>>> for Resolved {
    fn from(entry: Option<Arc<Entry>>) -> Self {
        entry.map_or(Resolved::Null, Resolved::Entry)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolverTable {
    resolvers: HashMap<String, HashMap<String, ResolverKind>>,
}

impl ResolverTable {
    pub fn build(schema: &SchemaDefinition, index: &ResourceIndex) -> Self {
        let mut resolvers = HashMap::new();
        for object in std::iter::once(&schema.query).chain(&schema.objects) {
            let fields = object
                .fields
                .iter()
                .map(|field| {
                    let kind = resolver_kind(index, field.ty.named_type(), field.ty.is_list());
                    (field.name.clone(), kind)
                })
                .collect::<HashMap<_, _>>();
            resolvers.insert(object.name.clone(), fields);
        }
        Self { resolvers }
    }

    pub fn get(&self, type_name: &str, field: &str) -> Option<&ResolverKind> {
        self.resolvers.get(type_name)?.get(field)
    }

    /// Resolves `field` of `type_name`.
    ///
    /// `parent` is `None` for fields of the query type. These fetch the entries selected by `args`
    /// directly. Fields of other types read their value from `parent`; references to root
    /// resources are loaded through the batch loaders of `ctx`.
    pub async fn resolve(
        &self,
        index: &ResourceIndex,
        type_name: &str,
        field: &str,
        parent: Option<&Entry>,
        args: &serde_json::Value,
        ctx: &RequestContext,
    ) -> Result<Resolved, ResolveError> {
        let kind = self
            .get(type_name, field)
            .ok_or_else(|| ResolveError::MissingResolver {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
            })?;

        match (kind, parent) {
            (
                ResolverKind::RootFetch { resource, list }
                | ResolverKind::UnionFetch { resource, list },
                None,
            ) => fetch(index, resource, *list, args, ctx).await,
            (
                ResolverKind::RootFetch { resource, list }
                | ResolverKind::UnionFetch { resource, list },
                Some(parent),
            ) => load(resource, *list, parent.get(field), ctx).await,
            (ResolverKind::ScalarLookup | ResolverKind::EmbeddedExpand, Some(parent)) => {
                Ok(parent.get(field).map_or(Resolved::Null, Resolved::from))
            }
            (ResolverKind::ScalarLookup | ResolverKind::EmbeddedExpand, None) => Ok(Resolved::Null),
        }
    }
}

fn resolver_kind(index: &ResourceIndex, target: &str, list: bool) -> ResolverKind {
    match index.lookup(target) {
        Some(Resource::Embedded(_)) => ResolverKind::EmbeddedExpand,
        Some(Resource::Root(_)) => ResolverKind::RootFetch {
            resource: target.to_owned(),
            list,
        },
        Some(Resource::Union(_)) => ResolverKind::UnionFetch {
            resource: target.to_owned(),
            list,
        },
        None => ResolverKind::ScalarLookup,
    }
}

/// Fetches the entries of `resource` selected by `args`.
async fn fetch(
    index: &ResourceIndex,
    resource: &str,
    list: bool,
    args: &serde_json::Value,
    ctx: &RequestContext,
) -> Result<Resolved, ResolveError> {
    let Some(target) = index.lookup(resource) else {
        return Err(ResolveError::MissingLoader(resource.to_owned()));
    };
    let entries = target.fetch(index, args, &ctx.headers).await?;
    let mut entries = entries.values().map(|entry| Resolved::Entry(Arc::clone(entry)));
    if list {
        Ok(Resolved::List(entries.collect()))
    } else {
        Ok(entries.next().unwrap_or(Resolved::Null))
    }
}

/// Loads the entries referenced by `value` through the batch loader of `resource`.
async fn load(
    resource: &str,
    list: bool,
    value: Option<&EntryValue>,
    ctx: &RequestContext,
) -> Result<Resolved, ResolveError> {
    let loader = ctx.loader(resource)?;
    match value {
        None | Some(EntryValue::Null) => Ok(Resolved::Null),
        Some(EntryValue::Entry(entry)) => Ok(Resolved::Entry(Arc::clone(entry))),
        Some(EntryValue::List(values)) => {
            let ids = values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_owned))
                .collect::<Vec<_>>();
            let entries = loader.load_many(&ids).await?;
            Ok(Resolved::List(
                entries.into_iter().flatten().map(Resolved::Entry).collect(),
            ))
        }
        Some(value) => {
            let Some(id) = value.as_str() else {
                return Ok(Resolved::Null);
            };
            let entry = loader.load(id).await?;
            if list {
                // Unknown identifiers are left out of lists.
                Ok(Resolved::List(entry.into_iter().map(Resolved::Entry).collect()))
            } else {
                Ok(Resolved::from(entry))
            }
        }
    }
}
