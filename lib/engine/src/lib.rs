//! The resolution engine of the gateway.
//!
//! Schema types are backed by SPARQL endpoints. The engine renders the query template of a type,
//! pages through the endpoint's results, groups the resulting tuples by subject and reconstructs
//! nested entries from them. Results are cached across requests and lookups by identifier are
//! batched within a request.

pub mod batch;
pub mod cache;
pub mod config;
mod engine;
pub mod entry_builder;
pub mod error;
pub mod grouping;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod services;
pub mod source;
pub mod template;

pub use batch::{BatchLoader, BatchLoaders, RequestContext};
pub use cache::QueryCache;
pub use config::EngineConfig;
pub use engine::Engine;
pub use resolver::{Resolved, ResolverKind, ResolverTable};
pub use resource::{Resource, ResourceIndex};
pub use schema::SchemaDefinition;
pub use services::Endpoints;
pub use template::{QueryTemplate, TemplateCompiler};
