//! Loads the annotated schema and derives how each type is resolved.
//!
//! A type is configured by one of the following, checked in this order:
//!
//! - the `@embedded` directive, which marks it as embedded,
//! - the `@sparql(service: "...", template: "...")` directive, which names a configured service and
//!   a query template file,
//! - a description that contains an `--- endpoint ---` block, followed by the endpoint on the next
//!   line, and a `--- sparql ---` block, which contains the query template up to the end.

use crate::error::SchemaConfigError;
use async_graphql_parser::types::{
    BaseType, ConstDirective, TypeDefinition, TypeKind, TypeSystemDefinition,
};
use async_graphql_parser::parse_schema;
use async_graphql_value::ConstValue;
use rdf_gateway_model::FieldType;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// The name of the query entry type.
pub const QUERY_TYPE: &str = "Query";

const EMBEDDED_DIRECTIVE: &str = "embedded";
const SPARQL_DIRECTIVE: &str = "sparql";
const ENDPOINT_MARKER: &str = "--- endpoint ---";
const SPARQL_MARKER: &str = "--- sparql ---";

static SCHEMA_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z].*\.graphql$").expect("valid regex"));

/// The parts of a parsed schema document the gateway uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaDefinition {
    pub query: ObjectDefinition,
    /// All object types except for [QUERY_TYPE].
    pub objects: Vec<ObjectDefinition>,
    pub unions: Vec<UnionDefinition>,
    pub enums: Vec<EnumDefinition>,
    pub scalars: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub directives: Vec<DirectiveDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub ty: FieldType,
    pub arguments: Vec<ArgumentDefinition>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: FieldType,
}

/// A directive applied to a type. Only string arguments are kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveDefinition {
    pub name: String,
    pub arguments: Vec<(String, String)>,
}

impl DirectiveDefinition {
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub values: Vec<String>,
}

/// Where the query template of a root type comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// The name of a template file.
    Named(String),
    /// The template text itself.
    Inline(String),
}

/// How the entries of an object type are obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceConfig {
    Embedded,
    Sparql {
        /// A service name or a literal endpoint URL.
        endpoint: String,
        template: TemplateSource,
    },
}

impl SchemaDefinition {
    /// Parses a schema document.
    pub fn parse(source: &str) -> Result<Self, SchemaConfigError> {
        if source.trim().is_empty() {
            return Err(SchemaConfigError::Empty);
        }
        let document = parse_schema(source)?;

        let mut queries = Vec::new();
        let mut objects = Vec::new();
        let mut unions = Vec::new();
        let mut enums = Vec::new();
        let mut scalars = Vec::new();
        let mut names = Vec::<String>::new();

        for definition in document.definitions {
            let TypeSystemDefinition::Type(definition) = definition else {
                continue;
            };
            let TypeDefinition {
                description,
                name,
                directives,
                kind,
                ..
            } = definition.node;
            let name = name.node.to_string();
            let description = description.map(|d| d.node);

            if name != QUERY_TYPE {
                if names.contains(&name) {
                    return Err(SchemaConfigError::DuplicateType(name));
                }
                names.push(name.clone());
            }

            match kind {
                TypeKind::Object(object) => {
                    let definition = ObjectDefinition {
                        description,
                        fields: object
                            .fields
                            .into_iter()
                            .map(|field| {
                                let field = field.node;
                                FieldDefinition {
                                    name: field.name.node.to_string(),
                                    description: field.description.map(|d| d.node),
                                    ty: field_type(&field.ty.node),
                                    arguments: field
                                        .arguments
                                        .into_iter()
                                        .map(|argument| ArgumentDefinition {
                                            name: argument.node.name.node.to_string(),
                                            ty: field_type(&argument.node.ty.node),
                                        })
                                        .collect(),
                                }
                            })
                            .collect(),
                        directives: directives.iter().map(|d| directive(&d.node)).collect(),
                        name,
                    };
                    if definition.name == QUERY_TYPE {
                        queries.push(definition);
                    } else {
                        objects.push(definition);
                    }
                }
                TypeKind::Union(union) => unions.push(UnionDefinition {
                    name,
                    description,
                    members: union
                        .members
                        .into_iter()
                        .map(|member| member.node.to_string())
                        .collect(),
                }),
                TypeKind::Enum(enumeration) => enums.push(EnumDefinition {
                    name,
                    values: enumeration
                        .values
                        .into_iter()
                        .map(|value| value.node.value.node.to_string())
                        .collect(),
                }),
                TypeKind::Scalar => scalars.push(name),
                TypeKind::Interface(_) | TypeKind::InputObject(_) => {
                    tracing::warn!(%name, "Ignoring unsupported type definition");
                }
            }
        }

        let mut queries = queries.into_iter();
        let query = queries.next().ok_or(SchemaConfigError::MissingQuery)?;
        if queries.next().is_some() {
            return Err(SchemaConfigError::DuplicateQuery);
        }

        Ok(Self {
            query,
            objects,
            unions,
            enums,
            scalars,
        })
    }

    /// Reads the schema from a single file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, SchemaConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SchemaConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source)
    }

    /// Concatenates all schema files in `dir` and parses the result.
    ///
    /// Only files whose name starts with a letter or a digit and ends with `.graphql` are read, in
    /// order of their names.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaConfigError> {
        let dir = dir.as_ref();
        let io_error = |source| SchemaConfigError::Io {
            path: dir.display().to_string(),
            source,
        };

        let mut paths = std::fs::read_dir(dir)
            .map_err(io_error)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_error)?;
        paths.retain(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| SCHEMA_FILE.is_match(name))
        });
        paths.sort();

        let mut source = String::new();
        for path in paths {
            tracing::debug!(path = %path.display(), "Reading schema file");
            let content =
                std::fs::read_to_string(&path).map_err(|source| SchemaConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
            source.push_str(&content);
            source.push('\n');
        }
        Self::parse(&source)
    }

    /// Loads the schema from `path`, which is either a file or a directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaConfigError> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load_file(path)
        }
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        self.objects.iter().find(|object| object.name == name)
    }

    pub fn union(&self, name: &str) -> Option<&UnionDefinition> {
        self.unions.iter().find(|union| union.name == name)
    }
}

impl ObjectDefinition {
    pub fn directive(&self, name: &str) -> Option<&DirectiveDefinition> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn is_embedded(&self) -> bool {
        self.directive(EMBEDDED_DIRECTIVE).is_some()
    }

    /// Derives how the entries of this type are obtained.
    pub fn resource_config(&self) -> Result<ResourceConfig, SchemaConfigError> {
        let description = self.description.as_deref().map(DescriptionBlocks::parse);

        if self.is_embedded() {
            let has_endpoint = self.directive(SPARQL_DIRECTIVE).is_some()
                || description.is_some_and(|d| d.endpoint.is_some());
            if has_endpoint {
                return Err(SchemaConfigError::EmbeddedWithEndpoint(self.name.clone()));
            }
            return Ok(ResourceConfig::Embedded);
        }

        if let Some(directive) = self.directive(SPARQL_DIRECTIVE) {
            let endpoint = directive
                .argument("service")
                .ok_or_else(|| SchemaConfigError::MissingEndpoint(self.name.clone()))?;
            let template = directive
                .argument("template")
                .ok_or_else(|| SchemaConfigError::MissingQueryTemplate(self.name.clone()))?;
            return Ok(ResourceConfig::Sparql {
                endpoint: endpoint.to_owned(),
                template: TemplateSource::Named(template.to_owned()),
            });
        }

        let description =
            description.ok_or_else(|| SchemaConfigError::MissingDescription(self.name.clone()))?;
        let endpoint = description
            .endpoint
            .ok_or_else(|| SchemaConfigError::MissingEndpoint(self.name.clone()))?;
        if description.sparql.trim().is_empty() {
            return Err(SchemaConfigError::MissingQueryTemplate(self.name.clone()));
        }
        Ok(ResourceConfig::Sparql {
            endpoint: endpoint.to_owned(),
            template: TemplateSource::Inline(description.sparql),
        })
    }
}

/// The blocks of a structured type description.
struct DescriptionBlocks<'a> {
    endpoint: Option<&'a str>,
    sparql: String,
}

impl<'a> DescriptionBlocks<'a> {
    fn parse(description: &'a str) -> Self {
        enum State {
            Default,
            Endpoint,
            Sparql,
        }

        let mut state = State::Default;
        let mut blocks = Self {
            endpoint: None,
            sparql: String::new(),
        };
        for line in description.lines() {
            match line {
                ENDPOINT_MARKER => state = State::Endpoint,
                SPARQL_MARKER => state = State::Sparql,
                line => match state {
                    State::Endpoint => {
                        blocks.endpoint = Some(line.trim()).filter(|e| !e.is_empty());
                        state = State::Default;
                    }
                    State::Sparql => {
                        blocks.sparql.push_str(line);
                        blocks.sparql.push('\n');
                    }
                    State::Default => {}
                },
            }
        }
        blocks
    }
}

fn field_type(ty: &async_graphql_parser::types::Type) -> FieldType {
    let base = match &ty.base {
        BaseType::Named(name) => FieldType::named(name.as_str()),
        BaseType::List(item) => FieldType::list(field_type(item)),
    };
    if ty.nullable {
        base
    } else {
        base.non_null()
    }
}

fn directive(directive: &ConstDirective) -> DirectiveDefinition {
    DirectiveDefinition {
        name: directive.name.node.to_string(),
        arguments: directive
            .arguments
            .iter()
            .filter_map(|(name, value)| match &value.node {
                ConstValue::String(value) => Some((name.node.to_string(), value.clone())),
                _ => None,
            })
            .collect(),
    }
}
