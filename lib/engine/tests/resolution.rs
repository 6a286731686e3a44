#![cfg(test)]

mod common;

use common::{
    fixture, fixture_with_config, fixture_with_sources, iri, MemorySource, OTHERS, SUBJECTS,
};
use futures::future::join_all;
use rdf_gateway_engine::error::ResolveError;
use rdf_gateway_engine::source::HeaderMap;
use rdf_gateway_engine::{EngineConfig, Resolved, ResolverKind};
use rdf_gateway_model::EntryValue;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde_json::json;
use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

fn entry_iri(resolved: &Resolved) -> Option<&str> {
    match resolved {
        Resolved::Entry(entry) => entry.iri(),
        _ => None,
    }
}

#[tokio::test]
async fn test_batch_coalesces_lookups() -> Result<(), Box<dyn Error>> {
    let fixture = fixture()?;
    let ctx = fixture.engine.request_context(HeaderMap::new());
    let loader = ctx.loader("Subject")?;

    let ids = [iri("subject1"), iri("subject2"), iri("subject1"), iri("missing")];
    let results = join_all(ids.iter().map(|id| loader.load(id))).await;

    assert_eq!(fixture.subjects.requests().len(), 1);
    let iris = results
        .into_iter()
        .map(|result| result.map(|entry| entry.and_then(|e| e.iri().map(str::to_owned))))
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        iris,
        [Some(iri("subject1")), Some(iri("subject2")), Some(iri("subject1")), None]
    );

    let request = &fixture.subjects.requests()[0];
    assert_eq!(request.matches("<http://example.org/subject1>").count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_batch_respects_max_size() -> Result<(), Box<dyn Error>> {
    let fixture = fixture_with_config(EngineConfig {
        batch_max_size: NonZeroUsize::new(2),
        cache_capacity: 0,
        ..EngineConfig::default()
    })?;
    let ctx = fixture.engine.request_context(HeaderMap::new());
    let loader = ctx.loader("Subject")?;

    let ids = [iri("subject1"), iri("subject2"), iri("missing")];
    loader.load_many(&ids).await?;

    assert_eq!(fixture.subjects.requests().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_dropped_lookup_does_not_strand_its_batch() -> Result<(), Box<dyn Error>> {
    let fixture = fixture_with_sources(
        EngineConfig::default(),
        MemorySource::from_turtle(SUBJECTS)?.with_delay(Duration::from_millis(200)),
        MemorySource::from_turtle(OTHERS)?,
    )?;
    let ctx = fixture.engine.request_context(HeaderMap::new());
    let loader = Arc::clone(ctx.loader("Subject")?);

    let sibling = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load(&iri("subject2")).await })
    };
    let dropped =
        tokio::time::timeout(Duration::from_millis(50), loader.load(&iri("subject1"))).await;
    assert!(dropped.is_err(), "the first lookup should time out");

    let sibling = tokio::time::timeout(Duration::from_secs(2), sibling).await???;
    assert_eq!(sibling.and_then(|e| e.iri().map(str::to_owned)), Some(iri("subject2")));

    // The batch of the dropped lookup completed as well.
    let first = loader.load(&iri("subject1")).await?;
    assert_eq!(first.and_then(|e| e.iri().map(str::to_owned)), Some(iri("subject1")));
    assert_eq!(fixture.subjects.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_loaders_are_request_scoped() -> Result<(), Box<dyn Error>> {
    let fixture = fixture_with_config(EngineConfig {
        cache_capacity: 0,
        ..EngineConfig::default()
    })?;

    let first = fixture.engine.request_context(HeaderMap::new());
    first.loader("Subject")?.load(&iri("subject1")).await?;
    first.loader("Subject")?.load(&iri("subject1")).await?;
    assert_eq!(fixture.subjects.requests().len(), 1);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bob"));
    let second = fixture.engine.request_context(headers);
    second.loader("Subject")?.load(&iri("subject1")).await?;

    assert_eq!(
        fixture.subjects.authorizations(),
        [None, Some("Bearer bob".to_owned())]
    );
    Ok(())
}

#[test]
fn test_resolver_table() -> Result<(), Box<dyn Error>> {
    let fixture = fixture()?;
    let resolvers = fixture.engine.resolvers();

    assert_eq!(
        resolvers.get("Query", "subjects"),
        Some(&ResolverKind::RootFetch {
            resource: "Subject".to_owned(),
            list: true
        })
    );
    assert_eq!(
        resolvers.get("Query", "things"),
        Some(&ResolverKind::UnionFetch {
            resource: "Thing".to_owned(),
            list: true
        })
    );
    assert_eq!(
        resolvers.get("Subject", "publisher"),
        Some(&ResolverKind::EmbeddedExpand)
    );
    assert_eq!(
        resolvers.get("Subject", "other"),
        Some(&ResolverKind::RootFetch {
            resource: "Other".to_owned(),
            list: false
        })
    );
    assert_eq!(
        resolvers.get("Subject", "count"),
        Some(&ResolverKind::ScalarLookup)
    );
    assert_eq!(resolvers.get("Subject", "unknown"), None);
    Ok(())
}

#[tokio::test]
async fn test_resolve_query_fields() -> Result<(), Box<dyn Error>> {
    let fixture = fixture()?;
    let engine = &fixture.engine;
    let ctx = engine.request_context(HeaderMap::new());

    let Resolved::List(subjects) = engine
        .resolve("Query", "subjects", None, &json!({}), &ctx)
        .await?
    else {
        panic!("expected a list");
    };
    assert_eq!(subjects.len(), 2);

    let subject = engine
        .resolve("Query", "subject", None, &json!({ "iri": iri("subject1") }), &ctx)
        .await?;
    assert_eq!(entry_iri(&subject), Some(iri("subject1").as_str()));
    Ok(())
}

#[tokio::test]
async fn test_resolve_nested_fields() -> Result<(), Box<dyn Error>> {
    let fixture = fixture()?;
    let engine = &fixture.engine;
    let ctx = engine.request_context(HeaderMap::new());

    let subject = engine
        .resolve("Query", "subject", None, &json!({ "iri": iri("subject1") }), &ctx)
        .await?;
    let Resolved::Entry(subject) = subject else {
        panic!("expected an entry");
    };

    let count = engine
        .resolve("Subject", "count", Some(subject.as_ref()), &json!({}), &ctx)
        .await?;
    assert_eq!(count, Resolved::Value(EntryValue::Integer(5)));

    let publisher = engine
        .resolve("Subject", "publisher", Some(subject.as_ref()), &json!({}), &ctx)
        .await?;
    assert!(matches!(publisher, Resolved::Entry(entry) if entry.typename() == "Publisher"));

    let other = engine
        .resolve("Subject", "other", Some(subject.as_ref()), &json!({}), &ctx)
        .await?;
    let Resolved::Entry(other) = other else {
        panic!("expected an entry");
    };
    assert_eq!(other.typename(), "Other");
    assert_eq!(fixture.others.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_resolve_unknown_field() -> Result<(), Box<dyn Error>> {
    let fixture = fixture()?;
    let ctx = fixture.engine.request_context(HeaderMap::new());

    let result = fixture
        .engine
        .resolve("Subject", "unknown", None, &json!({}), &ctx)
        .await;

    assert!(matches!(result, Err(ResolveError::MissingResolver { .. })));
    Ok(())
}
