use crate::cache::QueryCache;
use crate::config::EngineConfig;
use crate::error::SchemaConfigError;
use crate::resource::{EmbeddedResource, Resource, ResourceShape, RootResource, UnionResource};
use crate::schema::{ObjectDefinition, ResourceConfig, SchemaDefinition, TemplateSource};
use crate::services::Endpoints;
use crate::template::TemplateCompiler;
use rdf_gateway_model::FieldDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// All resources of a schema, built once at startup.
#[derive(Debug)]
pub struct ResourceIndex {
    resources: Vec<Resource>,
    by_name: HashMap<String, usize>,
    predicate_namespace: String,
}

impl ResourceIndex {
    /// Creates an index from already constructed resources.
    pub fn new(resources: Vec<Resource>, predicate_namespace: impl Into<String>) -> Self {
        let by_name = resources
            .iter()
            .enumerate()
            .map(|(i, resource)| (resource.name().to_owned(), i))
            .collect();
        Self {
            resources,
            by_name,
            predicate_namespace: predicate_namespace.into(),
        }
    }

    /// Builds the resources of all object and union types in `schema`.
    ///
    /// Endpoints are resolved through `endpoints` and named templates through `templates`. Every
    /// template is compiled eagerly, so configuration problems abort the startup.
    pub fn build(
        schema: &SchemaDefinition,
        endpoints: &Endpoints,
        templates: &HashMap<String, String>,
        compiler: &TemplateCompiler,
        cache: Arc<QueryCache>,
        config: &EngineConfig,
    ) -> Result<Self, SchemaConfigError> {
        let mut resources = Vec::with_capacity(schema.objects.len() + schema.unions.len());

        for object in &schema.objects {
            let shape = shape_of(object);
            let resource = match object.resource_config()? {
                ResourceConfig::Embedded => Resource::Embedded(EmbeddedResource::new(shape)),
                ResourceConfig::Sparql { endpoint, template } => {
                    let text = match &template {
                        TemplateSource::Inline(text) => text,
                        TemplateSource::Named(name) => lookup_template(templates, name)
                            .ok_or_else(|| SchemaConfigError::UnknownTemplate {
                                resource: object.name.clone(),
                                template: name.clone(),
                            })?,
                    };
                    let template =
                        compiler
                            .compile(text)
                            .map_err(|source| SchemaConfigError::Template {
                                resource: object.name.clone(),
                                source,
                            })?;
                    let source = endpoints.resolve(&object.name, &endpoint)?;
                    Resource::Root(RootResource::new(
                        shape,
                        source,
                        template,
                        Arc::clone(&cache),
                        config.page_threshold,
                    ))
                }
            };
            tracing::debug!(
                name = resource.name(),
                embedded = resource.is_embedded(),
                "Built resource"
            );
            resources.push(resource);
        }

        for union in &schema.unions {
            if let Some(member) = union
                .members
                .iter()
                .find(|member| schema.object(member).is_none())
            {
                return Err(SchemaConfigError::UnknownUnionMember {
                    union: union.name.clone(),
                    member: member.clone(),
                });
            }
            if let Some(member) = union
                .members
                .iter()
                .find(|member| schema.object(member).is_some_and(|o| o.is_embedded()))
            {
                return Err(SchemaConfigError::EmbeddedUnionMember {
                    union: union.name.clone(),
                    member: member.clone(),
                });
            }
            resources.push(Resource::Union(UnionResource::new(
                union.name.as_str(),
                union.members.clone(),
            )));
        }

        let index = Self::new(resources, config.predicate_namespace.as_str());
        for field in &schema.query.fields {
            let target = field.ty.named_type();
            if !index.is_root(target) {
                return Err(SchemaConfigError::UnresolvableQueryField {
                    field: field.name.clone(),
                    target: target.to_owned(),
                });
            }
        }
        Ok(index)
    }

    pub fn lookup(&self, name: &str) -> Option<&Resource> {
        self.by_name.get(name).map(|i| &self.resources[*i])
    }

    pub fn all(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    /// Returns all resources that can be fetched on their own.
    pub fn root(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|resource| self.is_root(resource.name()))
    }

    /// Whether `name` is a root resource or a union of root resources.
    pub fn is_root(&self, name: &str) -> bool {
        match self.lookup(name) {
            Some(Resource::Root(_)) => true,
            Some(Resource::Union(union)) => union
                .members()
                .iter()
                .all(|member| matches!(self.lookup(member), Some(Resource::Root(_)))),
            _ => false,
        }
    }

    /// Whether `name` is a type defined by the schema author, as opposed to a built-in scalar.
    pub fn is_user_defined(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Predicates in this namespace fill the field named by the remainder of their IRI.
    pub fn predicate_namespace(&self) -> &str {
        &self.predicate_namespace
    }
}

fn shape_of(object: &ObjectDefinition) -> ResourceShape {
    ResourceShape::new(
        object.name.as_str(),
        object
            .fields
            .iter()
            .map(|field| FieldDescriptor::new(field.name.as_str(), &field.ty))
            .collect(),
    )
}

/// Templates are keyed by file name. The `.sparql` extension may be omitted.
fn lookup_template<'a>(templates: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    templates
        .get(name)
        .or_else(|| templates.get(&format!("{name}.sparql")))
}
