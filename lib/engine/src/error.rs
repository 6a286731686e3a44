use oxttl::TurtleSyntaxError;
use std::io;
use std::sync::Arc;

/// The error code attached to every failure caused by a SPARQL endpoint.
pub const SOURCE_FAILURE_CODE: &str = "SPARQL_SERVICE_FAILURE";

/// An error raised while compiling or rendering a query template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template is not valid handlebars syntax (e.g. an unclosed block).
    #[error("Invalid query template: {0}")]
    Syntax(#[from] Box<handlebars::TemplateError>),
    /// The template calls a helper that is not registered.
    #[error("Query template references the undefined helper '{0}'")]
    UndefinedHelper(String),
    /// Rendering the template with the given arguments failed.
    #[error("Could not render query template: {0}")]
    Render(#[from] Box<handlebars::RenderError>),
}

/// An error raised by a SPARQL endpoint or while reading its response.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The request could not be sent or the response body could not be read.
    #[error("SPARQL endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("SPARQL endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    /// The response is not valid N-Triples or Turtle.
    #[error("Unable to parse SPARQL endpoint results: {0}")]
    Parse(#[from] TurtleSyntaxError),
    /// A page started with the same tuple as the first page.
    #[error("Found duplicate triple at offset {offset}; possible infinite loop detected")]
    LoopGuard { offset: usize },
    /// Any other failure of a source, e.g. of an in-memory source.
    #[error("{0}")]
    Other(String),
}

/// An error raised while reconstructing an entry from grouped tuples.
#[derive(Debug, thiserror::Error)]
pub enum EntryBuildError {
    /// An embedded value refers back to a subject that is already being built.
    #[error("Subject '{subject}' contains itself through embedded type '{resource}'")]
    Cycle { subject: String, resource: String },
}

/// An error raised while fetching the entries of a resource.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The query could not be issued.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The tuple stream failed after it started delivering tuples. Partial results are discarded.
    #[error("Unable to process SPARQL endpoint results: {0}")]
    SourceResult(#[source] SourceError),
    /// The query template could not be rendered.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// The grouped tuples could not be turned into entries.
    #[error(transparent)]
    Build(#[from] EntryBuildError),
    /// The resource is embedded and can only be materialized as part of another resource.
    #[error("Resource '{0}' is embedded and cannot be fetched on its own")]
    NotFetchable(String),
    /// A union refers to a member that is not part of the index.
    #[error("Union '{union}' refers to the unknown member '{member}'")]
    UnknownMember { union: String, member: String },
}

/// An error raised while loading the schema or building the resource index.
///
/// These errors are fatal and abort the startup.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaConfigError {
    #[error("GraphQL schema is invalid: {0}")]
    Parse(#[from] async_graphql_parser::Error),
    #[error("GraphQL schema is empty or was not found")]
    Empty,
    #[error("Query is not defined")]
    MissingQuery,
    #[error("Multiple definitions of Query found")]
    DuplicateQuery,
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),
    #[error("Neither a sparql directive nor a description is defined for type '{0}'")]
    MissingDescription(String),
    #[error("Endpoint is not defined for type '{0}'")]
    MissingEndpoint(String),
    #[error("Query is not defined for type '{0}'")]
    MissingQueryTemplate(String),
    #[error("Embedded type '{0}' must not define an endpoint or a query")]
    EmbeddedWithEndpoint(String),
    #[error("Endpoint '{endpoint}' of type '{resource}' is neither a known service nor a valid URL")]
    UnknownEndpoint { resource: String, endpoint: String },
    #[error("Query template '{template}' of type '{resource}' is unknown")]
    UnknownTemplate { resource: String, template: String },
    #[error("Union '{union}' references the undeclared member '{member}'")]
    UnknownUnionMember { union: String, member: String },
    #[error("Union '{union}' contains the embedded type '{member}', which cannot be fetched")]
    EmbeddedUnionMember { union: String, member: String },
    #[error("Query field '{field}' references '{target}', which is not backed by a SPARQL endpoint")]
    UnresolvableQueryField { field: String, target: String },
    #[error("Query template of type '{resource}' is invalid: {source}")]
    Template {
        resource: String,
        #[source]
        source: TemplateError,
    },
    #[error("Could not read schema from '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// An error raised while reading the engine or service configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("Could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not parse service file '{path}': {source}")]
    Services {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Service '{name}' has an invalid URL: {source}")]
    InvalidServiceUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },
}

/// An error raised while resolving a single field of a query.
///
/// A failed field resolves to `null` with an error entry; sibling fields are unaffected.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Fetch(Arc<FetchError>),
    /// The batch this lookup was part of was dropped before it completed.
    #[error("Batch lookup for '{0}' was cancelled")]
    BatchCancelled(String),
    #[error("No batch loader exists for resource '{0}'")]
    MissingLoader(String),
    #[error("No resolver exists for field '{type_name}.{field}'")]
    MissingResolver { type_name: String, field: String },
}

impl ResolveError {
    /// Returns a machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::Fetch(_) | ResolveError::BatchCancelled(_) => SOURCE_FAILURE_CODE,
            ResolveError::MissingLoader(_) | ResolveError::MissingResolver { .. } => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    /// Returns the HTTP status a transport should map this error to.
    pub fn status_hint(&self) -> u16 {
        500
    }
}

impl From<FetchError> for ResolveError {
    fn from(error: FetchError) -> Self {
        ResolveError::Fetch(Arc::new(error))
    }
}
