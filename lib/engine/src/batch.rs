//! Request-scoped coalescing of lookups by identifier.
//!
//! During the resolution of a single request, many fields may ask for the entry of some
//! identifier. A [BatchLoader] collects all identifiers requested within one scheduling turn and
//! fetches them with a single query.

use crate::error::ResolveError;
use crate::resource::ResourceIndex;
use crate::source::HeaderMap;
use futures::future::{join_all, try_join_all};
use rdf_gateway_model::Entry;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type LoadResult = Result<Option<Arc<Entry>>, ResolveError>;

#[derive(Default)]
struct LoaderState {
    /// Identifiers that have been requested but not yet dispatched.
    pending: Vec<String>,
    waiters: HashMap<String, Vec<oneshot::Sender<LoadResult>>>,
    /// Identifiers that have already been loaded during this request.
    completed: HashMap<String, Option<Arc<Entry>>>,
}

/// Loads the entries of one resource by identifier, coalescing concurrent lookups.
///
/// A loader belongs to a single request and forwards the headers of that request to the source.
/// Batches run on their own task, so dropping a lookup never strands the other lookups of its
/// batch.
pub struct BatchLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    resource: String,
    index: Arc<ResourceIndex>,
    headers: HeaderMap,
    max_batch_size: Option<NonZeroUsize>,
    state: Mutex<LoaderState>,
}

impl BatchLoader {
    pub fn new(
        resource: impl Into<String>,
        index: Arc<ResourceIndex>,
        headers: HeaderMap,
        max_batch_size: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                resource: resource.into(),
                index,
                headers,
                max_batch_size,
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    pub fn resource(&self) -> &str {
        &self.inner.resource
    }

    /// Returns the entry of `id`, or `None` if the source has no such entry.
    pub async fn load(&self, id: &str) -> LoadResult {
        let receiver = {
            let mut guard = self.inner.lock();
            let state = &mut *guard;
            if let Some(entry) = state.completed.get(id) {
                return Ok(entry.clone());
            }

            let (sender, receiver) = oneshot::channel();
            match state.waiters.entry(id.to_owned()) {
                MapEntry::Occupied(mut waiters) => waiters.get_mut().push(sender),
                MapEntry::Vacant(waiters) => {
                    waiters.insert(vec![sender]);
                    state.pending.push(id.to_owned());
                }
            }
            receiver
        };

        // Give sibling lookups of the same turn the chance to join the batch.
        tokio::task::yield_now().await;
        LoaderInner::dispatch(&self.inner);

        receiver
            .await
            .map_err(|_| ResolveError::BatchCancelled(self.inner.resource.clone()))?
    }

    /// Returns the entries of `ids`, in the same order.
    pub async fn load_many(&self, ids: &[String]) -> Result<Vec<Option<Arc<Entry>>>, ResolveError> {
        try_join_all(ids.iter().map(|id| self.load(id))).await
    }
}

impl LoaderInner {
    /// Hands all pending identifiers to a background task. Does nothing if another lookup already
    /// took them.
    fn dispatch(this: &Arc<Self>) {
        let ids = std::mem::take(&mut this.lock().pending);
        if ids.is_empty() {
            return;
        }

        let batches: Vec<Vec<String>> = match this.max_batch_size {
            Some(max) => ids.chunks(max.get()).map(<[String]>::to_vec).collect(),
            None => vec![ids],
        };
        tracing::debug!(
            resource = %this.resource,
            batches = batches.len(),
            "Dispatching batched lookups"
        );

        let inner = Arc::clone(this);
        tokio::spawn(async move {
            let results = join_all(batches.iter().map(|batch| inner.fetch(batch))).await;
            for (batch, result) in batches.iter().zip(results) {
                inner.fulfill(batch, result);
            }
        });
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<Option<Arc<Entry>>>, ResolveError> {
        let resource = self
            .index
            .lookup(&self.resource)
            .ok_or_else(|| ResolveError::MissingLoader(self.resource.clone()))?;
        Ok(resource
            .fetch_by_iris(&self.index, ids, &self.headers)
            .await?)
    }

    fn fulfill(&self, ids: &[String], result: Result<Vec<Option<Arc<Entry>>>, ResolveError>) {
        let mut state = self.lock();
        match result {
            Ok(entries) => {
                for (id, entry) in ids.iter().zip(entries) {
                    for waiter in state.waiters.remove(id).into_iter().flatten() {
                        let _ = waiter.send(Ok(entry.clone()));
                    }
                    state.completed.insert(id.clone(), entry);
                }
            }
            Err(error) => {
                for id in ids {
                    for waiter in state.waiters.remove(id).into_iter().flatten() {
                        let _ = waiter.send(Err(error.clone()));
                    }
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("resource", &self.inner.resource)
            .field("max_batch_size", &self.inner.max_batch_size)
            .finish_non_exhaustive()
    }
}

/// The batch loaders of a single request, one per root resource.
#[derive(Debug, Default)]
pub struct BatchLoaders {
    loaders: HashMap<String, Arc<BatchLoader>>,
}

impl BatchLoaders {
    pub fn for_request(
        index: &Arc<ResourceIndex>,
        headers: &HeaderMap,
        max_batch_size: Option<NonZeroUsize>,
    ) -> Self {
        let loaders = index
            .root()
            .map(|resource| {
                let loader = BatchLoader::new(
                    resource.name(),
                    Arc::clone(index),
                    headers.clone(),
                    max_batch_size,
                );
                (resource.name().to_owned(), Arc::new(loader))
            })
            .collect();
        Self { loaders }
    }

    pub fn get(&self, resource: &str) -> Option<&Arc<BatchLoader>> {
        self.loaders.get(resource)
    }
}

/// Everything the resolvers of a single request share.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Headers of the client request. Forwarded to every source.
    pub headers: HeaderMap,
    pub loaders: BatchLoaders,
}

impl RequestContext {
    pub fn loader(&self, resource: &str) -> Result<&Arc<BatchLoader>, ResolveError> {
        self.loaders
            .get(resource)
            .ok_or_else(|| ResolveError::MissingLoader(resource.to_owned()))
    }
}
