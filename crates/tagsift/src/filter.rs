//
// filter.rs
//
// Category filter container and the listings that follow it
//

use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::autocomplete::SuggestionItem;
use crate::sorted_set::{CategoryId, SortedIndexSet};

/// A filterable category as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub category: String,
}

/// A toggle target rendered by [`CategoryFilter::entries`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterEntry {
    pub category: Category,
    pub active: bool,
}

/// Remote list of available categories
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn categories(&self) -> anyhow::Result<Vec<Category>>;
}

/// Remote query keyed by the active filter set
#[async_trait]
pub trait ListingSource<R>: Send + Sync {
    async fn fetch(&self, filters: &SortedIndexSet) -> anyhow::Result<Vec<R>>;
}

/// Owns the selected category ids and publishes every new snapshot to
/// subscribers as read-only context.
#[derive(Debug)]
pub struct CategoryFilter {
    selected: watch::Sender<SortedIndexSet>,
    categories: Vec<Category>,
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::with_selection(SortedIndexSet::new())
    }
}

impl CategoryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selection(selected: SortedIndexSet) -> Self {
        let (selected, _) = watch::channel(selected);
        Self {
            selected,
            categories: Vec::new(),
        }
    }

    /// Fetch the available categories. On failure the previous list is kept.
    pub async fn load(&mut self, source: &dyn CategorySource) -> bool {
        match source.categories().await {
            Ok(categories) => {
                log::trace!("Loaded {} filter categories", categories.len());
                self.categories = categories;
                true
            }
            Err(err) => {
                log::debug!("Loading filter categories failed: {:#}", err);
                false
            }
        }
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Current snapshot of the selected ids
    pub fn selected(&self) -> SortedIndexSet {
        self.selected.borrow().clone()
    }

    pub fn is_active(&self, id: CategoryId) -> bool {
        self.selected.borrow().locate(id).is_some()
    }

    /// Toggle `id` and publish the resulting snapshot
    pub fn toggle(&self, id: CategoryId) -> SortedIndexSet {
        let next = self.selected.borrow().toggle(id);
        self.selected.send_replace(next.clone());
        next
    }

    /// Available categories with their active flag, in listing order
    pub fn entries(&self) -> Vec<FilterEntry> {
        let selected = self.selected.borrow();
        self.categories
            .iter()
            .map(|category| FilterEntry {
                active: selected.locate(category.id).is_some(),
                category: category.clone(),
            })
            .collect()
    }

    pub fn subscribe(&self) -> watch::Receiver<SortedIndexSet> {
        self.selected.subscribe()
    }
}

/// Render state of a [`FilteredListing`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing<R> {
    /// Filter set the items were (or are being) fetched for
    pub filters: SortedIndexSet,
    pub items: Vec<R>,
    pub loading: bool,
}

impl<R> Default for Listing<R> {
    fn default() -> Self {
        Self {
            filters: SortedIndexSet::new(),
            items: Vec::new(),
            loading: false,
        }
    }
}

type RequestId = u64;

/// Completed fetch, tagged with the request that issued it
struct Fetched<R> {
    request: RequestId,
    filters: SortedIndexSet,
    result: anyhow::Result<Vec<R>>,
}

/// Re-runs a listing query whenever the followed filter set changes.
///
/// Only the most recently issued fetch may publish; results of any earlier
/// fetch are dropped.
/// A failed fetch keeps the previous items.
pub struct FilteredListing<R> {
    view: watch::Receiver<Listing<R>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<R> FilteredListing<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Start following `filters`; the current snapshot is fetched immediately
    pub fn follow<S>(filters: watch::Receiver<SortedIndexSet>, source: Arc<S>) -> Self
    where
        S: ListingSource<R> + 'static,
    {
        let (view_tx, view) = watch::channel(Listing::default());
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(Self::run(filters, source, view_tx, shutdown.clone()));
        Self {
            view,
            shutdown,
            task: Some(task),
        }
    }

    fn spawn_fetch<S>(
        source: &Arc<S>,
        request: RequestId,
        filters: SortedIndexSet,
        done: &mpsc::UnboundedSender<Fetched<R>>,
    ) where
        S: ListingSource<R> + 'static,
    {
        let source = source.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let result = source.fetch(&filters).await;
            let _ = done.send(Fetched {
                request,
                filters,
                result,
            });
        });
    }

    async fn run<S>(
        mut filters: watch::Receiver<SortedIndexSet>,
        source: Arc<S>,
        view: watch::Sender<Listing<R>>,
        shutdown: CancellationToken,
    ) where
        S: ListingSource<R> + 'static,
    {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut current = filters.borrow_and_update().clone();
        let mut latest: RequestId = 0;
        let mut upstream_open = true;

        view.send_modify(|listing| {
            listing.filters = current.clone();
            listing.loading = true;
        });
        Self::spawn_fetch(&source, latest, current.clone(), &done_tx);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                changed = filters.changed(), if upstream_open => {
                    if changed.is_err() {
                        upstream_open = false;
                        continue;
                    }
                    let next = filters.borrow_and_update().clone();
                    if next == current {
                        continue;
                    }
                    current = next;
                    latest += 1;
                    view.send_modify(|listing| {
                        listing.filters = current.clone();
                        listing.loading = true;
                    });
                    Self::spawn_fetch(&source, latest, current.clone(), &done_tx);
                }
                Some(fetched) = done_rx.recv() => {
                    // Only the newest request may publish, even when an older
                    // one was issued for an equal filter set.
                    if fetched.request != latest {
                        log::trace!(
                            "Discarding listing request {} for {:?} (latest {})",
                            fetched.request,
                            fetched.filters,
                            latest
                        );
                        continue;
                    }
                    match fetched.result {
                        Ok(items) => view.send_modify(|listing| {
                            listing.items = items;
                            listing.loading = false;
                        }),
                        Err(err) => {
                            log::debug!(
                                "Listing fetch for {:?} failed: {:#}",
                                fetched.filters,
                                err
                            );
                            view.send_modify(|listing| listing.loading = false);
                        }
                    }
                }
            }
        }
    }

    pub fn view(&self) -> Listing<R> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Listing<R>> {
        self.view.clone()
    }

    /// Stop following and wait for the task to exit
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                log::warn!("Filtered listing task failed: {}", err);
            }
        }
    }
}

impl<R> Drop for FilteredListing<R> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Insertion-ordered selection keyed by value.
///
/// Adding a value that is already selected is a no-op, which is also how
/// duplicate creations are absorbed.
#[derive(Debug, Clone)]
pub struct SelectedItems<T: Hash + Eq> {
    items: IndexMap<T, SuggestionItem<T>>,
}

impl<T: Hash + Eq> Default for SelectedItems<T> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }
}

impl<T: Hash + Eq + Clone> SelectedItems<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the value was already selected
    pub fn add(&mut self, item: SuggestionItem<T>) -> bool {
        if self.items.contains_key(&item.value) {
            return false;
        }
        self.items.insert(item.value.clone(), item);
        true
    }

    pub fn remove(&mut self, value: &T) -> Option<SuggestionItem<T>> {
        self.items.shift_remove(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.items.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &SuggestionItem<T>> {
        self.items.values()
    }

    /// Selected values in selection order
    pub fn values(&self) -> Vec<T> {
        self.items.keys().cloned().collect()
    }
}
