use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use futures::{stream, StreamExt};
use rdf_gateway_engine::error::SourceError;
use rdf_gateway_engine::source::{HeaderMap, SparqlSource, TupleStream};
use rdf_gateway_engine::{EngineConfig, Endpoints, Engine, SchemaDefinition};
use rdf_gateway_model::vocab::DEFAULT_PREDICATE_NAMESPACE;
use rdf_gateway_model::{Literal, NamedNode, Term, Tuple};
use rdf_gateway_web::{create_router, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
type Query {
  book(iri: String): Book
  books: [Book!]!
  catalog: [Book]
  authors: [Author!]!
  items: [Item!]!
}

type Book @sparql(service: "books", template: "book.sparql") {
  iri: String!
  title: String
  status: Status
  author: Author
  publisher: Publisher!
}

type Publisher @sparql(service: "publishers", template: "book.sparql") {
  iri: String!
  name: String
}

type Author @sparql(service: "authors", template: "author.sparql") {
  iri: String!
  name: String
}

union Item = Book | Author

enum Status {
  PUBLISHED
  DRAFT
}
"#;

const TEMPLATE: &str = "CONSTRUCT { ?iri ?p ?o } WHERE { ?iri ?p ?o {{#if iri}}{{filter-by-iri}}{{/if}} }";

struct StaticSource {
    tuples: Vec<Tuple>,
    delay: Option<Duration>,
    authorizations: Mutex<Vec<Option<String>>>,
}

impl StaticSource {
    fn new(tuples: Vec<Tuple>) -> Arc<Self> {
        Arc::new(Self {
            tuples,
            delay: None,
            authorizations: Mutex::new(Vec::new()),
        })
    }

    fn slow(tuples: Vec<Tuple>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            tuples,
            delay: Some(delay),
            authorizations: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SparqlSource for StaticSource {
    async fn construct(&self, _query: &str, headers: &HeaderMap) -> Result<TupleStream, SourceError> {
        self.authorizations.lock().unwrap().push(
            headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned),
        );
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(stream::iter(self.tuples.clone().into_iter().map(Ok)).boxed())
    }
}

struct UnavailableSource;

#[async_trait]
impl SparqlSource for UnavailableSource {
    async fn construct(&self, _query: &str, _headers: &HeaderMap) -> Result<TupleStream, SourceError> {
        Err(SourceError::Status {
            status: 503,
            body: "Service Unavailable".to_owned(),
        })
    }
}

fn tuple(subject: &str, field: &str, object: impl Into<Term>) -> Tuple {
    Tuple::new(
        NamedNode::new_unchecked(subject),
        NamedNode::new_unchecked(format!("{DEFAULT_PREDICATE_NAMESPACE}{field}")),
        object,
    )
}

fn book_tuples() -> Vec<Tuple> {
    let book = "http://example.org/book1";
    vec![
        tuple(book, "iri", NamedNode::new_unchecked(book)),
        tuple(book, "title", Literal::new_simple_literal("Dune")),
        tuple(book, "status", Literal::new_simple_literal("PUBLISHED")),
        tuple(
            book,
            "author",
            NamedNode::new_unchecked("http://example.org/author1"),
        ),
        tuple(
            book,
            "publisher",
            NamedNode::new_unchecked("http://example.org/publisher1"),
        ),
    ]
}

fn author_tuples() -> Vec<Tuple> {
    let author = "http://example.org/author1";
    vec![
        tuple(author, "iri", NamedNode::new_unchecked(author)),
        tuple(author, "name", Literal::new_simple_literal("Frank Herbert")),
    ]
}

fn server(books: Arc<dyn SparqlSource>, authors: Arc<dyn SparqlSource>) -> TestServer {
    let schema = SchemaDefinition::parse(SCHEMA).unwrap();
    let mut endpoints = Endpoints::default();
    endpoints.insert("books", books);
    endpoints.insert("authors", authors);
    endpoints.insert("publishers", Arc::new(UnavailableSource));
    let templates = HashMap::from([
        ("book.sparql".to_owned(), TEMPLATE.to_owned()),
        ("author.sparql".to_owned(), TEMPLATE.to_owned()),
    ]);
    let engine = Engine::new(schema, &endpoints, &templates, EngineConfig::default()).unwrap();
    let state = AppState::new(Arc::new(engine)).unwrap();
    TestServer::new(create_router(state)).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let server = server(StaticSource::new(vec![]), StaticSource::new(vec![]));

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn graphiql_is_served() {
    let server = server(StaticSource::new(vec![]), StaticSource::new(vec![]));

    let response = server.get("/graphql").await;

    response.assert_status_ok();
    assert!(response.text().contains("graphiql"));
}

#[tokio::test]
async fn query_resolves_nested_resources() {
    let server = server(
        StaticSource::new(book_tuples()),
        StaticSource::new(author_tuples()),
    );

    let response = server
        .post("/graphql")
        .json(&json!({
            "query": "{ books { __typename iri title status author { name } } }"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({
            "data": {
                "books": [{
                    "__typename": "Book",
                    "iri": "http://example.org/book1",
                    "title": "Dune",
                    "status": "PUBLISHED",
                    "author": { "name": "Frank Herbert" }
                }]
            }
        })
    );
}

#[tokio::test]
async fn query_arguments_are_passed_to_templates() {
    let server = server(
        StaticSource::new(book_tuples()),
        StaticSource::new(author_tuples()),
    );

    let response = server
        .post("/graphql")
        .json(&json!({
            "query": r#"{ book(iri: "http://example.org/book1") { title } }"#
        }))
        .await;

    assert_eq!(
        response.json::<Value>(),
        json!({ "data": { "book": { "title": "Dune" } } })
    );
}

#[tokio::test]
async fn authorization_is_forwarded() {
    let books = StaticSource::new(book_tuples());
    let server = server(
        Arc::clone(&books) as Arc<dyn SparqlSource>,
        StaticSource::new(author_tuples()),
    );

    server
        .post("/graphql")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_static("Bearer secret"),
        )
        .add_header(
            HeaderName::from_static("x-other"),
            HeaderValue::from_static("dropped"),
        )
        .json(&json!({ "query": "{ books { iri } }" }))
        .await
        .assert_status_ok();

    assert_eq!(
        *books.authorizations.lock().unwrap(),
        vec![Some("Bearer secret".to_owned())]
    );
}

#[tokio::test]
async fn failing_source_yields_null_and_error() {
    let server = server(
        StaticSource::new(book_tuples()),
        Arc::new(UnavailableSource),
    );

    let response = server
        .post("/graphql")
        .json(&json!({ "query": "{ books { title author { name } } }" }))
        .await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(
        body["data"],
        json!({ "books": [{ "title": "Dune", "author": null }] })
    );
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["books", 0, "author"]));
    assert_eq!(
        errors[0]["extensions"]["code"],
        json!("SPARQL_SERVICE_FAILURE")
    );
    assert_eq!(errors[0]["extensions"]["http"]["status"], json!(500));
}

#[tokio::test]
async fn union_members_resolve_their_own_fields() {
    let server = server(
        StaticSource::new(book_tuples()),
        StaticSource::new(author_tuples()),
    );

    let response = server
        .post("/graphql")
        .json(&json!({
            "query": "{ items { __typename ... on Book { title } ... on Author { name } } }"
        }))
        .await;

    assert_eq!(
        response.json::<Value>(),
        json!({
            "data": {
                "items": [
                    { "__typename": "Book", "title": "Dune" },
                    { "__typename": "Author", "name": "Frank Herbert" }
                ]
            }
        })
    );
}

#[tokio::test]
async fn failing_non_null_field_does_not_stall_shared_lookups() {
    let server = server(
        StaticSource::new(book_tuples()),
        StaticSource::slow(author_tuples(), Duration::from_millis(100)),
    );

    // Both books load the same author. The first one is dropped when its non-null publisher fails.
    let request = server.post("/graphql").json(&json!({
        "query": r#"{
            catalog { author { name } publisher { name } }
            book(iri: "http://example.org/book1") { author { name } }
        }"#
    }));
    let response = tokio::time::timeout(Duration::from_secs(5), request)
        .await
        .expect("the request should not stall");

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(
        body["data"],
        json!({
            "catalog": [null],
            "book": { "author": { "name": "Frank Herbert" } }
        })
    );
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], json!(["catalog", 0, "publisher"]));
    assert_eq!(
        errors[0]["extensions"]["code"],
        json!("SPARQL_SERVICE_FAILURE")
    );
}
