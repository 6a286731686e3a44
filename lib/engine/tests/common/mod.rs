#![allow(dead_code)]

use async_trait::async_trait;
use futures::{stream, StreamExt};
use oxttl::TurtleParser;
use rdf_gateway_engine::error::SourceError;
use rdf_gateway_engine::source::{HeaderMap, SparqlSource, TupleStream};
use rdf_gateway_engine::{EngineConfig, Endpoints, Engine, SchemaDefinition};
use rdf_gateway_model::Tuple;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NS: &str = "https://github.com/dbcls/grasp/ns/";

pub const SCHEMA: &str = r#"
type Query {
  subject(iri: String): Subject
  subjects(iri: [String!]): [Subject!]!
  things: [Thing!]!
}

type Subject @sparql(service: "subjects", template: "subject.sparql") {
  iri: String!
  id: String
  count: Int
  test: Boolean
  publisher: Publisher
  other: Other
  tags: [String!]!
}

type Publisher @embedded {
  iri: String!
  name: String
}

type Other @sparql(service: "others", template: "other.sparql") {
  iri: String!
  label: String
}

union Thing = Subject | Other
"#;

pub const SUBJECTS: &str = r#"
@prefix : <https://github.com/dbcls/grasp/ns/> .
@prefix ex: <http://example.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:subject1 :iri ex:subject1 ;
    :id "subject1" ;
    :count "5"^^xsd:integer ;
    :test "true"^^xsd:boolean ;
    :obsolete "no longer in the schema" ;
    :publisher _:b1 ;
    :other ex:other1 .

_:b1 :name "ACME" .

ex:subject2 :iri ex:subject2 ;
    :id "subject2" ;
    :tags "a", "b" .
"#;

pub const OTHERS: &str = r#"
@prefix : <https://github.com/dbcls/grasp/ns/> .
@prefix ex: <http://example.org/> .

ex:other1 :iri ex:other1 ;
    :label "Other one" .
"#;

/// An endpoint that serves a fixed list of tuples and records the queries it receives.
///
/// Queries ending in `OFFSET x LIMIT y` get the corresponding slice. Other queries get at most
/// `max_results` tuples, like an endpoint with a result set limit.
pub struct MemorySource {
    tuples: Vec<Tuple>,
    max_results: Option<usize>,
    repeat_pages: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
    authorizations: Mutex<Vec<Option<String>>>,
}

impl MemorySource {
    pub fn new(tuples: Vec<Tuple>) -> Self {
        Self {
            tuples,
            max_results: None,
            repeat_pages: false,
            delay: None,
            requests: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
        }
    }

    pub fn from_turtle(data: &str) -> Result<Self, Box<dyn Error>> {
        let tuples = TurtleParser::new()
            .for_reader(data.as_bytes())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(tuples))
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Ignores the offset and serves the first page again and again.
    pub fn repeating_pages(mut self) -> Self {
        self.repeat_pages = true;
        self
    }

    /// Delays every response, like a slow endpoint.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.authorizations.lock().unwrap().clone()
    }
}

#[async_trait]
impl SparqlSource for MemorySource {
    async fn construct(&self, query: &str, headers: &HeaderMap) -> Result<TupleStream, SourceError> {
        self.requests.lock().unwrap().push(query.to_owned());
        self.authorizations.lock().unwrap().push(
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        );

        let paging = Regex::new(r"OFFSET (\d+)\s+LIMIT (\d+)\s*$").unwrap();
        let (offset, limit) = match paging.captures(query) {
            Some(captures) => (captures[1].parse().unwrap(), captures[2].parse().unwrap()),
            None => (0, self.max_results.unwrap_or(usize::MAX)),
        };
        let offset = if self.repeat_pages { 0 } else { offset };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let page = self
            .tuples
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .map(Ok)
            .collect::<Vec<_>>();
        Ok(stream::iter(page).boxed())
    }
}

/// An endpoint that always fails.
pub struct FailingSource;

#[async_trait]
impl SparqlSource for FailingSource {
    async fn construct(&self, _: &str, _: &HeaderMap) -> Result<TupleStream, SourceError> {
        Err(SourceError::Status {
            status: 503,
            body: "Service Unavailable".to_owned(),
        })
    }
}

pub struct Fixture {
    pub engine: Engine,
    pub subjects: Arc<MemorySource>,
    pub others: Arc<MemorySource>,
}

pub fn fixture() -> Result<Fixture, Box<dyn Error>> {
    fixture_with_config(EngineConfig::default())
}

pub fn fixture_with_config(config: EngineConfig) -> Result<Fixture, Box<dyn Error>> {
    fixture_with_sources(
        config,
        MemorySource::from_turtle(SUBJECTS)?,
        MemorySource::from_turtle(OTHERS)?,
    )
}

pub fn fixture_with_sources(
    config: EngineConfig,
    subjects: MemorySource,
    others: MemorySource,
) -> Result<Fixture, Box<dyn Error>> {
    let subjects = Arc::new(subjects);
    let others = Arc::new(others);

    let mut endpoints = Endpoints::default();
    endpoints.insert("subjects", Arc::clone(&subjects) as Arc<dyn SparqlSource>);
    endpoints.insert("others", Arc::clone(&others) as Arc<dyn SparqlSource>);

    let templates = HashMap::from([
        (
            "subject.sparql".to_owned(),
            "CONSTRUCT { ?iri ?p ?o } WHERE { ?iri a :Subject ; ?p ?o . {{#if iri}}{{filter-by-iri}}{{/if}} }"
                .to_owned(),
        ),
        (
            "other.sparql".to_owned(),
            "CONSTRUCT { ?iri ?p ?o } WHERE { ?iri a :Other ; ?p ?o . {{#if iri}}{{filter-by-iri}}{{/if}} }"
                .to_owned(),
        ),
    ]);

    let schema = SchemaDefinition::parse(SCHEMA)?;
    let engine = Engine::new(schema, &endpoints, &templates, config)?;
    Ok(Fixture {
        engine,
        subjects,
        others,
    })
}

pub fn iri(local: &str) -> String {
    format!("http://example.org/{local}")
}
