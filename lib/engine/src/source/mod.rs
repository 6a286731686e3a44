//! Access to SPARQL endpoints.
//!
//! A [SparqlSource] runs a `CONSTRUCT` query and returns its result as a [TupleStream]. The
//! [fetch_tuples] function builds on top of that and pages through large result sets.

mod http;
mod pagination;

pub use http::{Credentials, HttpSparqlSource};
pub use pagination::{fetch_tuples, paged_query};
pub use reqwest::header::HeaderMap;

use crate::error::SourceError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use rdf_gateway_model::Tuple;

/// A stream of tuples returned by a [SparqlSource].
///
/// The stream is pulled on demand. Once it yields an error, it does not yield further items.
pub type TupleStream = BoxStream<'static, Result<Tuple, SourceError>>;

/// An endpoint that answers `CONSTRUCT` queries.
#[async_trait]
pub trait SparqlSource: Send + Sync {
    /// Issues `query` and returns the resulting tuples.
    ///
    /// `headers` are the headers forwarded from the client request. If they contain an
    /// `Authorization` value, it must be sent to the endpoint unchanged.
    async fn construct(&self, query: &str, headers: &HeaderMap) -> Result<TupleStream, SourceError>;
}
