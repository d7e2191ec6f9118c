use std::sync::Arc;

use async_trait::async_trait;
use garde::Validate;
use parking_lot::Mutex;

use crate::api::client::Ack;
use crate::error::{AppError, FieldErrors, Result};
use crate::models::filter::{FilterParams, ListQuery, Sort};
use crate::models::page::{FetchOutcome, PagePayload};
use crate::validation::forms;

/// Operator-facing texts for one kind of entity, used whenever the backend
/// does not supply a message of its own.
#[derive(Debug, Clone, Copy)]
pub struct ResourceMessages {
    pub fetch_failed: &'static str,
    pub created: &'static str,
    pub create_failed: &'static str,
    pub updated: &'static str,
    pub update_failed: &'static str,
    pub deleted: &'static str,
    pub delete_failed: &'static str,
}

/// A paginated backend collection with create, update and remove endpoints.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// One row of the list.
    type Item: Clone + Send + Sync + 'static;
    /// Payload of a creation.
    type Draft: Validate<Context = ()> + Send + Sync;
    /// Payload of an update.
    type Patch: Validate<Context = ()> + Send + Sync;
    /// What a removal needs to identify its row.
    type Target: Send + Sync;

    const MESSAGES: ResourceMessages;

    /// Sort applied when the page opens.
    fn default_sort() -> Sort;

    async fn fetch_page(&self, query: &ListQuery) -> Result<PagePayload<Self::Item>>;

    async fn create(&self, draft: &Self::Draft) -> Result<Ack>;

    async fn update(&self, id: i64, patch: &Self::Patch) -> Result<Ack>;

    async fn remove(&self, target: &Self::Target) -> Result<Ack>;
}

/// Result of a create, update or remove, ready to be shown as a notice.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome<T> {
    pub success: bool,
    pub message: String,
    /// Field-keyed errors, from the client-side checks or the backend.
    pub field_errors: Option<FieldErrors>,
    /// The page-0 re-fetch issued after a successful mutation.
    pub refresh: Option<FetchOutcome<T>>,
}

struct ListState<T> {
    items: Vec<T>,
    error: Option<String>,
    in_flight: usize,
    /// Sequence number of the most recently issued fetch.
    issued: u64,
    /// Page-0 query of the last non-appending fetch.
    view: Option<ListQuery>,
    mounted: bool,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
            in_flight: 0,
            issued: 0,
            view: None,
            mounted: true,
        }
    }
}

/// Marks the list as loading for as long as it lives, so the flag is
/// cleared on every exit path, including a dropped future.
struct LoadingGuard<T> {
    state: Arc<Mutex<ListState<T>>>,
}

impl<T> LoadingGuard<T> {
    fn enter(state: &Arc<Mutex<ListState<T>>>) -> Self {
        state.lock().in_flight += 1;
        Self {
            state: Arc::clone(state),
        }
    }
}

impl<T> Drop for LoadingGuard<T> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Owns the in-memory list of one resource: rows, loading flag and error.
///
/// Fetches are numbered; a response that is not the most recent one issued
/// is dropped instead of applied. Once [`unmount`](Self::unmount) has been
/// called nothing is applied anymore.
pub struct ListController<R: Resource> {
    resource: Arc<R>,
    state: Arc<Mutex<ListState<R::Item>>>,
}

impl<R: Resource> Clone for ListController<R> {
    fn clone(&self) -> Self {
        Self {
            resource: Arc::clone(&self.resource),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R: Resource> ListController<R> {
    pub fn new(resource: Arc<R>) -> Self {
        Self {
            resource,
            state: Arc::new(Mutex::new(ListState::default())),
        }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Fetches one page and applies it.
    ///
    /// # Arguments
    ///
    /// * `query` - Filters, page number and sort to send.
    /// * `append` - Concatenate after the current rows instead of replacing them.
    ///
    /// # Returns
    ///
    /// The page summary when applied. On failure the error is stored and the
    /// list is emptied unless appending.
    pub async fn fetch(&self, query: &ListQuery, append: bool) -> FetchOutcome<R::Item> {
        let seq = {
            let mut state = self.state.lock();
            if !state.mounted {
                return FetchOutcome::Detached;
            }
            state.issued += 1;
            state.error = None;
            if !append {
                state.view = Some(query.first_page());
            }
            state.issued
        };
        let _loading = LoadingGuard::enter(&self.state);

        tracing::debug!("Fetching page {} (#{}, append={})", query.page, seq, append);
        let result = self.resource.fetch_page(query).await;

        let mut state = self.state.lock();
        if !state.mounted {
            tracing::debug!("Dropping page {} (#{}): list closed", query.page, seq);
            return FetchOutcome::Detached;
        }
        if state.issued != seq {
            tracing::debug!(
                "Dropping page {} (#{}): superseded by #{}",
                query.page,
                seq,
                state.issued
            );
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(payload) => {
                let summary = payload.normalize(query.page);
                if append {
                    state.items.extend(summary.content.iter().cloned());
                } else {
                    state.items = summary.content.clone();
                }
                FetchOutcome::Loaded(summary)
            }
            Err(e) => {
                tracing::warn!("❌ Fetching page {} failed: {}", query.page, e);
                let message = e
                    .backend_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| R::MESSAGES.fetch_failed.to_string());
                if !append {
                    state.items.clear();
                }
                state.error = Some(message.clone());
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Re-fetches page 0 of the current view.
    pub async fn refresh(&self) -> FetchOutcome<R::Item> {
        let query = self
            .state
            .lock()
            .view
            .clone()
            .unwrap_or_else(|| ListQuery::new(FilterParams::default(), 0, R::default_sort()));
        self.fetch(&query, false).await
    }

    pub async fn create(&self, draft: &R::Draft) -> MutationOutcome<R::Item> {
        let result = match forms::check(draft) {
            Ok(()) => self.mutate(self.resource.create(draft)).await,
            Err(e) => Err(e),
        };
        self.finish(result, R::MESSAGES.created, R::MESSAGES.create_failed)
            .await
    }

    pub async fn update(&self, id: i64, patch: &R::Patch) -> MutationOutcome<R::Item> {
        let result = match forms::check(patch) {
            Ok(()) => self.mutate(self.resource.update(id, patch)).await,
            Err(e) => Err(e),
        };
        self.finish(result, R::MESSAGES.updated, R::MESSAGES.update_failed)
            .await
    }

    pub async fn remove(&self, target: &R::Target) -> MutationOutcome<R::Item> {
        let result = self.mutate(self.resource.remove(target)).await;
        self.finish(result, R::MESSAGES.deleted, R::MESSAGES.delete_failed)
            .await
    }

    async fn mutate<F>(&self, call: F) -> Result<Ack>
    where
        F: std::future::Future<Output = Result<Ack>>,
    {
        self.state.lock().error = None;
        let _loading = LoadingGuard::enter(&self.state);
        call.await
    }

    async fn finish(
        &self,
        result: Result<Ack>,
        succeeded: &str,
        failed: &str,
    ) -> MutationOutcome<R::Item> {
        match result {
            Ok(ack) => {
                let message = ack.message.unwrap_or_else(|| succeeded.to_string());
                tracing::info!("✅ {}", message);
                let refresh = self.refresh().await;
                MutationOutcome {
                    success: true,
                    message,
                    field_errors: None,
                    refresh: Some(refresh),
                }
            }
            Err(e) => {
                tracing::warn!("❌ {}: {}", failed, e);
                let message = match &e {
                    AppError::Validation(_) => e.user_message(),
                    _ => e
                        .backend_message()
                        .map(str::to_string)
                        .unwrap_or_else(|| failed.to_string()),
                };
                let mut state = self.state.lock();
                if state.mounted {
                    state.error = Some(message.clone());
                }
                MutationOutcome {
                    success: false,
                    message,
                    field_errors: e.field_errors().cloned(),
                    refresh: None,
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    pub fn items(&self) -> Vec<R::Item> {
        self.state.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// The page-0 query of the current view, if anything was fetched yet.
    pub fn view(&self) -> Option<ListQuery> {
        self.state.lock().view.clone()
    }

    /// Stops applying results. Fetches still in flight finish as `Detached`.
    pub fn unmount(&self) {
        self.state.lock().mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.state.lock().mounted
    }
}
