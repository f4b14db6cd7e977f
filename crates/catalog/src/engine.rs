//! Catalog state: snapshot, criteria and page, with the visible slice
//! recomputed after every mutation and pushed to subscribers.

use std::sync::{Arc, Weak};

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use shared::domain::Template;
use tracing::debug;

use crate::{
    criteria::{FilterCriteria, FilterPatch},
    filter::apply_filters,
    pagination::{clamp_page, paginate, total_pages, PaginationState},
};

/// Everything a view needs to draw the catalog page.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogView {
    pub items: Vec<Template>,
    pub current_page: usize,
    pub total_pages: usize,
    pub items_per_page: usize,
    pub filtered_count: usize,
    pub total_count: usize,
    pub criteria: FilterCriteria,
}

impl CatalogView {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    pub fn range_label(&self) -> String {
        if self.filtered_count == 0 {
            return "Showing 0-0 of 0 cards".to_string();
        }
        let start = (self.current_page - 1) * self.items_per_page + 1;
        let end = (start + self.items_per_page - 1).min(self.filtered_count);
        format!("Showing {start}-{end} of {} cards", self.filtered_count)
    }

    pub fn page_label(&self) -> String {
        format!("Page {} of {}", self.current_page, self.total_pages)
    }
}

/// Receiving end of a catalog observer. Holds at most one pending view: a
/// newer recompute replaces one that was never read.
#[derive(Debug)]
pub struct CatalogSubscription {
    rx: Receiver<CatalogView>,
    _alive: Arc<()>,
}

impl CatalogSubscription {
    pub fn try_recv(&self) -> Result<CatalogView, TryRecvError> {
        self.rx.try_recv()
    }

    /// Takes the pending view, if any.
    pub fn latest(&self) -> Option<CatalogView> {
        self.rx.try_recv().ok()
    }
}

struct Subscriber {
    tx: Sender<CatalogView>,
    slot: Receiver<CatalogView>,
    alive: Weak<()>,
}

impl Subscriber {
    /// Returns false once the subscription handle is gone.
    fn deliver(&self, view: &CatalogView) -> bool {
        if self.alive.strong_count() == 0 {
            return false;
        }
        match self.tx.try_send(view.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(fresh)) => {
                let _ = self.slot.try_recv();
                let _ = self.tx.try_send(fresh);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

pub struct CatalogStateEngine {
    snapshot: Vec<Template>,
    criteria: FilterCriteria,
    pagination: PaginationState,
    filtered: Vec<Template>,
    view: CatalogView,
    subscribers: Vec<Subscriber>,
}

impl Default for CatalogStateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogStateEngine {
    pub fn new() -> Self {
        Self::with_page_size(PaginationState::default().items_per_page)
    }

    pub fn with_page_size(items_per_page: usize) -> Self {
        let pagination = PaginationState {
            current_page: 1,
            items_per_page: items_per_page.max(1),
        };
        let criteria = FilterCriteria::default();
        Self {
            snapshot: Vec::new(),
            view: CatalogView {
                items: Vec::new(),
                current_page: 1,
                total_pages: 1,
                items_per_page: pagination.items_per_page,
                filtered_count: 0,
                total_count: 0,
                criteria: criteria.clone(),
            },
            criteria,
            pagination,
            filtered: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> &[Template] {
        &self.snapshot
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn view(&self) -> &CatalogView {
        &self.view
    }

    pub fn find(&self, name: &str) -> Option<&Template> {
        self.snapshot.iter().find(|template| template.name() == name)
    }

    /// Registers an observer; it receives the current view immediately and
    /// the newest recomputed view afterwards.
    pub fn subscribe(&mut self) -> CatalogSubscription {
        let (tx, rx) = bounded(1);
        let alive = Arc::new(());
        let subscriber = Subscriber {
            tx,
            slot: rx.clone(),
            alive: Arc::downgrade(&alive),
        };
        subscriber.deliver(&self.view);
        self.subscribers.push(subscriber);
        CatalogSubscription { rx, _alive: alive }
    }

    /// Replaces the snapshot wholesale. Criteria and page survive the reload.
    pub fn load_snapshot(&mut self, templates: Vec<Template>) {
        debug!(templates = templates.len(), "catalog snapshot replaced");
        self.snapshot = templates;
        self.refilter();
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.criteria.search_query = query.into();
        self.pagination.current_page = 1;
        self.refilter();
    }

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.criteria.merge(patch);
        self.pagination.current_page = 1;
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.reset();
    }

    /// Back to default criteria and page 1, keeping the loaded snapshot.
    pub fn reset(&mut self) {
        self.criteria = FilterCriteria::default();
        self.pagination.current_page = 1;
        self.refilter();
    }

    /// Returns whether the page changed.
    pub fn next_page(&mut self) -> bool {
        let target = self.pagination.current_page + 1;
        self.move_to(target)
    }

    /// Returns whether the page changed.
    pub fn previous_page(&mut self) -> bool {
        let target = self.pagination.current_page.saturating_sub(1);
        self.move_to(target)
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.move_to(page)
    }

    fn move_to(&mut self, page: usize) -> bool {
        let total = total_pages(self.filtered.len(), self.pagination.items_per_page);
        let target = clamp_page(page, total);
        if target == self.pagination.current_page {
            return false;
        }
        self.pagination.current_page = target;
        self.repaginate();
        true
    }

    fn refilter(&mut self) {
        self.filtered = apply_filters(&self.snapshot, &self.criteria);
        self.repaginate();
    }

    fn repaginate(&mut self) {
        let page = paginate(
            &self.filtered,
            self.pagination.current_page,
            self.pagination.items_per_page,
        );
        self.pagination.current_page = page.clamped_page;

        self.view = CatalogView {
            items: page.items,
            current_page: page.clamped_page,
            total_pages: page.total_pages,
            items_per_page: self.pagination.items_per_page,
            filtered_count: self.filtered.len(),
            total_count: self.snapshot.len(),
            criteria: self.criteria.clone(),
        };
        debug!(
            page = self.view.current_page,
            total_pages = self.view.total_pages,
            filtered = self.view.filtered_count,
            "catalog view recomputed"
        );
        self.publish();
    }

    fn publish(&mut self) {
        let view = &self.view;
        self.subscribers.retain(|subscriber| subscriber.deliver(view));
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
