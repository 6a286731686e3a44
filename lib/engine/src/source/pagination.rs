use crate::error::SourceError;
use crate::source::{HeaderMap, SparqlSource, TupleStream};
use futures::{stream, StreamExt};
use rdf_gateway_model::Tuple;
use std::sync::Arc;

/// Appends an `OFFSET`/`LIMIT` clause to `query`.
pub fn paged_query(query: &str, offset: usize, limit: usize) -> String {
    format!("{query}\nOFFSET {offset}\nLIMIT {limit}")
}

/// Issues `query` against `source` and pages through the results.
///
/// If `threshold` is zero or negative, the query is issued once and its stream is returned as is.
/// Otherwise, whenever a page delivers exactly `threshold` tuples, the original query is issued
/// again with the next offset and a limit of `threshold`. The combined stream ends with the first
/// page that delivers a different number of tuples.
///
/// If a later page starts with the same tuple as the first page, the stream fails with
/// [SourceError::LoopGuard]. Pages are only requested once the consumer has drained the previous
/// page. Dropping the stream stops the pagination.
///
/// Errors of the first request are returned directly. Later errors end the stream.
pub async fn fetch_tuples(
    source: Arc<dyn SparqlSource>,
    query: &str,
    threshold: i64,
    headers: &HeaderMap,
) -> Result<TupleStream, SourceError> {
    let first_page = source.construct(query, headers).await?;
    let Some(threshold) = usize::try_from(threshold).ok().filter(|t| *t > 0) else {
        return Ok(first_page);
    };

    let pager = Pager {
        source,
        query: query.to_owned(),
        headers: headers.clone(),
        threshold,
        offset: 0,
        count: 0,
        page: first_page,
        first: None,
    };
    Ok(stream::unfold(Some(pager), |pager| async move { pager?.next().await }).boxed())
}

struct Pager {
    source: Arc<dyn SparqlSource>,
    query: String,
    headers: HeaderMap,
    threshold: usize,
    offset: usize,
    /// Number of tuples delivered by the current page.
    count: usize,
    page: TupleStream,
    /// The first tuple of the first page.
    first: Option<Tuple>,
}

impl Pager {
    async fn next(mut self) -> Option<(Result<Tuple, SourceError>, Option<Self>)> {
        loop {
            match self.page.next().await {
                Some(Ok(tuple)) => {
                    if self.count == 0 {
                        if self.offset == 0 {
                            self.first = Some(tuple.clone());
                        } else if self.first.as_ref() == Some(&tuple) {
                            tracing::error!(offset = self.offset, "Page repeats the first page");
                            return Some((
                                Err(SourceError::LoopGuard {
                                    offset: self.offset,
                                }),
                                None,
                            ));
                        }
                    }
                    self.count += 1;
                    return Some((Ok(tuple), Some(self)));
                }
                Some(Err(error)) => return Some((Err(error), None)),
                None if self.count == self.threshold => {
                    self.offset += self.threshold;
                    self.count = 0;
                    tracing::debug!(offset = self.offset, "Requesting next page");

                    let query = paged_query(&self.query, self.offset, self.threshold);
                    match self.source.construct(&query, &self.headers).await {
                        Ok(page) => self.page = page,
                        Err(error) => return Some((Err(error), None)),
                    }
                }
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paged_query_appends_offset_and_limit() {
        assert_eq!(
            paged_query("CONSTRUCT WHERE { ?s ?p ?o }", 10, 5),
            "CONSTRUCT WHERE { ?s ?p ?o }\nOFFSET 10\nLIMIT 5"
        );
    }
}
