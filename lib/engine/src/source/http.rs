use crate::error::SourceError;
use crate::source::{HeaderMap, SparqlSource, TupleStream};
use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use oxttl::ntriples::LowLevelNTriplesParser;
use oxttl::turtle::LowLevelTurtleParser;
use oxttl::{NTriplesParser, TurtleParser, TurtleSyntaxError};
use rdf_gateway_model::Tuple;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::fmt::{Debug, Formatter};
use url::Url;

const ACCEPTED_FORMATS: &str = "application/n-triples, text/turtle;q=0.9";

/// Credentials that are sent to an endpoint unless the client request carries its own
/// `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic {
        user: String,
        password: Option<String>,
    },
    Bearer(String),
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .finish_non_exhaustive(),
            Credentials::Bearer(_) => f.write_str("Bearer(..)"),
        }
    }
}

/// A [SparqlSource] that talks to a remote endpoint using the SPARQL 1.1 protocol.
#[derive(Clone, Debug)]
pub struct HttpSparqlSource {
    client: Client,
    url: Url,
    credentials: Option<Credentials>,
}

impl HttpSparqlSource {
    pub fn new(url: Url) -> Self {
        Self::with_client(Client::new(), url)
    }

    /// Creates a source that shares the connection pool of `client`.
    pub fn with_client(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            credentials: None,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SparqlSource for HttpSparqlSource {
    async fn construct(&self, query: &str, headers: &HeaderMap) -> Result<TupleStream, SourceError> {
        let mut request = self
            .client
            .post(self.url.clone())
            .header(ACCEPT, HeaderValue::from_static(ACCEPTED_FORMATS))
            .form(&[("query", query)]);

        request = match (headers.get(AUTHORIZATION), &self.credentials) {
            (Some(authorization), _) => request.header(AUTHORIZATION, authorization.clone()),
            (None, Some(Credentials::Basic { user, password })) => {
                request.basic_auth(user, password.as_ref())
            }
            (None, Some(Credentials::Bearer(token))) => request.bearer_auth(token),
            (None, None) => request,
        };

        tracing::debug!(endpoint = %self.url, query, "Sending SPARQL query");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(endpoint = %self.url, %status, "SPARQL endpoint rejected query");
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parser = BodyParser::for_content_type(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        Ok(parse_body(response.bytes_stream().boxed(), parser))
    }
}

/// Incremental parser for the supported response formats.
enum BodyParser {
    NTriples(LowLevelNTriplesParser),
    Turtle(LowLevelTurtleParser),
}

impl BodyParser {
    /// N-Triples is only assumed if the endpoint says so. Turtle also accepts N-Triples.
    fn for_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(content_type) if content_type.contains("n-triples") => {
                BodyParser::NTriples(NTriplesParser::new().low_level())
            }
            _ => BodyParser::Turtle(TurtleParser::new().low_level()),
        }
    }

    fn extend_from_slice(&mut self, chunk: &[u8]) {
        match self {
            BodyParser::NTriples(parser) => parser.extend_from_slice(chunk),
            BodyParser::Turtle(parser) => parser.extend_from_slice(chunk),
        }
    }

    fn end(&mut self) {
        match self {
            BodyParser::NTriples(parser) => parser.end(),
            BodyParser::Turtle(parser) => parser.end(),
        }
    }

    fn is_end(&self) -> bool {
        match self {
            BodyParser::NTriples(parser) => parser.is_end(),
            BodyParser::Turtle(parser) => parser.is_end(),
        }
    }

    fn parse_next(&mut self) -> Option<Result<Tuple, TurtleSyntaxError>> {
        match self {
            BodyParser::NTriples(parser) => parser.parse_next(),
            BodyParser::Turtle(parser) => parser.parse_next(),
        }
    }
}

/// Parses the response body chunk by chunk. A new chunk is only read once all tuples of the
/// previous chunks have been consumed.
fn parse_body<S, B>(body: S, parser: BodyParser) -> TupleStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]>,
{
    stream::unfold(Some((body, parser)), |state| async move {
        let (mut body, mut parser) = state?;
        loop {
            if let Some(result) = parser.parse_next() {
                return match result {
                    Ok(tuple) => Some((Ok(tuple), Some((body, parser)))),
                    Err(error) => Some((Err(SourceError::Parse(error)), None)),
                };
            }
            if parser.is_end() {
                return None;
            }
            match body.next().await {
                Some(Ok(chunk)) => parser.extend_from_slice(chunk.as_ref()),
                Some(Err(error)) => return Some((Err(SourceError::Transport(error)), None)),
                None => parser.end(),
            }
        }
    })
    .boxed()
}
