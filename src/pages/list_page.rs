use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::controllers::list::{ListController, MutationOutcome, Resource};
use crate::debounce::{Debouncer, earliest};
use crate::error::{FieldErrors, Result};
use crate::models::filter::{FilterParams, ListQuery, Sort};
use crate::models::page::FetchOutcome;
use crate::pages::filter_panel::{FilterField, FilterPanel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A short-lived message about a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub field_errors: Option<FieldErrors>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            field_errors: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}

impl<T> From<&MutationOutcome<T>> for Notice {
    fn from(outcome: &MutationOutcome<T>) -> Self {
        Self {
            severity: if outcome.success {
                Severity::Success
            } else {
                Severity::Error
            },
            message: outcome.message.clone(),
            field_errors: outcome.field_errors.clone(),
        }
    }
}

/// One list screen: the rows of a resource plus the filters, search, sort
/// and paging that drive which rows are shown.
///
/// Any change to the filters, the committed search or the sort starts over
/// from page 0. [`load_more`](Self::load_more) walks forward one page at a
/// time and never asks for the same page twice.
pub struct ListPage<R: Resource> {
    controller: ListController<R>,
    panel: FilterPanel,
    search: Debouncer<String>,
    search_text: String,
    filters: FilterParams,
    sort: Sort,
    page: u32,
    has_more: bool,
    last_fetched_page: Option<u32>,
}

impl<R: Resource> ListPage<R> {
    /// Creates a new `ListPage`.
    ///
    /// # Arguments
    ///
    /// * `resource` - The backend collection to list.
    /// * `fields` - The fields the filter panel offers.
    /// * `search_delay` - Quiet period of the global search.
    /// * `filter_delay` - Quiet period of the filter panel.
    pub fn new(
        resource: Arc<R>,
        fields: &'static [FilterField],
        search_delay: Duration,
        filter_delay: Duration,
    ) -> Self {
        Self {
            controller: ListController::new(resource),
            panel: FilterPanel::new(fields, filter_delay),
            search: Debouncer::new(search_delay),
            search_text: String::new(),
            filters: FilterParams::new(),
            sort: R::default_sort(),
            page: 0,
            has_more: true,
            last_fetched_page: None,
        }
    }

    /// Loads the first page.
    pub async fn open(&mut self) -> FetchOutcome<R::Item> {
        self.reload().await
    }

    fn query(&self, page: u32) -> ListQuery {
        ListQuery::new(self.filters.clone(), page, self.sort.clone())
    }

    /// Starts over from page 0 with the current filters and sort.
    pub async fn reload(&mut self) -> FetchOutcome<R::Item> {
        self.page = 0;
        self.has_more = true;
        self.last_fetched_page = None;
        let outcome = self.controller.fetch(&self.query(0), false).await;
        self.track(0, &outcome);
        outcome
    }

    fn track(&mut self, page: u32, outcome: &FetchOutcome<R::Item>) {
        match outcome {
            FetchOutcome::Loaded(summary) => {
                self.page = page;
                self.last_fetched_page = Some(page);
                self.has_more = !summary.exhausted();
            }
            FetchOutcome::Failed(_) => {
                self.has_more = false;
            }
            FetchOutcome::Superseded | FetchOutcome::Detached => {}
        }
    }

    /// Sorts by `field`: ascending first, toggling on repeated clicks.
    /// Ignored while a fetch is running.
    pub async fn sort_by(&mut self, field: &str) -> Option<FetchOutcome<R::Item>> {
        let sort = if self.sort.field == field {
            Sort::new(field, self.sort.order.toggled())
        } else {
            Sort::asc(field)
        };
        self.set_sort(sort).await
    }

    /// Applies an explicit sort. Ignored while a fetch is running.
    pub async fn set_sort(&mut self, sort: Sort) -> Option<FetchOutcome<R::Item>> {
        if self.controller.is_loading() {
            tracing::debug!("Ignoring sort on {} while loading", sort.field);
            return None;
        }
        self.sort = sort;
        Some(self.reload().await)
    }

    /// Replaces the field criteria, keeping the committed search.
    pub async fn apply_filters(&mut self, criteria: &FilterParams) -> FetchOutcome<R::Item> {
        self.filters.replace_fields(criteria);
        self.reload().await
    }

    /// Records what is in the search box. Fetches once the box has been
    /// quiet for the search delay.
    pub fn search_input(&mut self, text: &str, now: Instant) {
        self.search_text = text.to_string();
        self.search.schedule(text.to_string(), now);
    }

    /// Searches for the box's content now, cancelling the pending search.
    pub async fn submit_search(&mut self) -> FetchOutcome<R::Item> {
        let text = self.search_text.clone();
        self.stage_search(&text);
        self.reload().await
    }

    /// Commits `text` as the global search without fetching. The next
    /// [`reload`](Self::reload) uses it.
    pub fn stage_search(&mut self, text: &str) {
        self.search.cancel();
        self.search_text = text.to_string();
        self.filters.set_global_search(text);
    }

    /// Sets the sort without fetching.
    pub fn stage_sort(&mut self, sort: Sort) {
        self.sort = sort;
    }

    /// Folds the panel into the active filters without fetching.
    pub fn stage_panel(&mut self) {
        let criteria = self.panel.apply();
        self.filters.replace_fields(&criteria);
    }

    pub fn edit_filter(&mut self, name: &str, value: &str, now: Instant) -> Result<()> {
        self.panel.edit(name, value, now)
    }

    /// Folds the panel into the active filters right away.
    pub async fn apply_panel(&mut self) -> FetchOutcome<R::Item> {
        let criteria = self.panel.apply();
        self.apply_filters(&criteria).await
    }

    /// When the page next needs [`poll_timers`](Self::poll_timers).
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.search.deadline(), self.panel.deadline()])
    }

    /// Fires whichever coalesced changes are due, in a single fetch.
    pub async fn poll_timers(&mut self, now: Instant) -> Option<FetchOutcome<R::Item>> {
        let criteria = self.panel.poll(now);
        let search = self.search.poll(now);
        if criteria.is_none() && search.is_none() {
            return None;
        }

        if let Some(criteria) = criteria {
            self.filters.replace_fields(&criteria);
        }
        if let Some(text) = search {
            self.filters.set_global_search(&text);
        }
        Some(self.reload().await)
    }

    /// Appends the next page.
    ///
    /// # Returns
    ///
    /// `None` when the request is not honored: a fetch is running, the list
    /// is exhausted, or the current page itself was never loaded.
    pub async fn load_more(&mut self) -> Option<FetchOutcome<R::Item>> {
        if self.controller.is_loading() || !self.has_more {
            return None;
        }
        if self.last_fetched_page != Some(self.page) {
            return None;
        }

        let next = self.page + 1;
        tracing::debug!("Loading page {}", next);
        let outcome = self.controller.fetch(&self.query(next), true).await;
        self.track(next, &outcome);
        Some(outcome)
    }

    /// Clears the panel, the search and the active filters, then reloads.
    pub async fn reset_filters(&mut self) -> FetchOutcome<R::Item> {
        self.panel.reset();
        self.search.cancel();
        self.search_text.clear();
        self.filters.clear();
        self.reload().await
    }

    pub async fn create(&mut self, draft: &R::Draft) -> Notice {
        let outcome = self.controller.create(draft).await;
        self.after_mutation(&outcome)
    }

    pub async fn update(&mut self, id: i64, patch: &R::Patch) -> Notice {
        let outcome = self.controller.update(id, patch).await;
        self.after_mutation(&outcome)
    }

    pub async fn remove(&mut self, target: &R::Target) -> Notice {
        let outcome = self.controller.remove(target).await;
        self.after_mutation(&outcome)
    }

    /// A refresh that was dropped leaves the paging state untouched.
    fn after_mutation(&mut self, outcome: &MutationOutcome<R::Item>) -> Notice {
        if let Some(refresh @ (FetchOutcome::Loaded(_) | FetchOutcome::Failed(_))) =
            &outcome.refresh
        {
            self.page = 0;
            self.has_more = true;
            self.last_fetched_page = None;
            self.track(0, refresh);
        }
        Notice::from(outcome)
    }

    /// Stops the page: pending coalesced changes are dropped and late
    /// results are no longer applied.
    pub fn close(&mut self) {
        self.search.cancel();
        self.panel.reset();
        self.controller.unmount();
    }

    pub fn items(&self) -> Vec<R::Item> {
        self.controller.items()
    }

    pub fn error(&self) -> Option<String> {
        self.controller.error()
    }

    pub fn is_loading(&self) -> bool {
        self.controller.is_loading()
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn filters(&self) -> &FilterParams {
        &self.filters
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn panel(&self) -> &FilterPanel {
        &self.panel
    }

    pub fn controller(&self) -> &ListController<R> {
        &self.controller
    }
}
