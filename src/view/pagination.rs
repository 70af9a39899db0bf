//! Page / filter / sort bookkeeping for paginated list views.
//!
//! The controller never fetches anything itself. Each mutator returns `true`
//! when the caller must refetch the current page, which keeps the fetch on
//! the view's single logical thread.

use serde::Serialize;

use crate::model::{PageRequest, PageResponse};
use crate::view::materialize::{FilterCriteria, SortCriteria};

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Page position and totals.
///
/// Totals are exact right after a fetch. Between fetches `total_elements`
/// is nudged by one per streamed create/delete and `total_pages` is left
/// alone, so under heavy event traffic both drift from the server's truth
/// until the next fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl PageState {
    #[must_use]
    pub const fn new(size: u32) -> Self {
        Self {
            page: 0,
            size,
            total_elements: 0,
            total_pages: 0,
        }
    }

    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.total_pages == 0 || self.page + 1 >= self.total_pages
    }
}

/// Tracks page index, size, filter and sort for one list view.
#[derive(Debug, Clone)]
pub struct PaginationController {
    state: PageState,
    filter: FilterCriteria,
    sort: SortCriteria,
}

impl PaginationController {
    /// Start at page 0 with no filter and the default sort.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            state: PageState::new(size.max(1)),
            filter: FilterCriteria::default(),
            sort: SortCriteria::default(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &PageState {
        &self.state
    }

    #[must_use]
    pub const fn filter(&self) -> &FilterCriteria {
        &self.filter
    }

    #[must_use]
    pub const fn sort(&self) -> &SortCriteria {
        &self.sort
    }

    /// The request for the page the controller currently points at.
    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest {
            page: self.state.page,
            size: self.state.size,
            sort: self.sort,
            filter: self.filter.clone(),
        }
    }

    /// Replace the filter. A different filter resets to page 0.
    pub fn set_filter(&mut self, filter: FilterCriteria) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.state.page = 0;
        true
    }

    /// Replace the sort. A different sort resets to page 0.
    pub fn set_sort(&mut self, sort: SortCriteria) -> bool {
        if sort == self.sort {
            return false;
        }
        self.sort = sort;
        self.state.page = 0;
        true
    }

    /// Advance one page; ignored on the last page.
    pub fn next(&mut self) -> bool {
        if self.state.page + 1 < self.state.total_pages {
            self.state.page += 1;
            true
        } else {
            false
        }
    }

    /// Go back one page; ignored on page 0.
    pub fn previous(&mut self) -> bool {
        if self.state.page > 0 {
            self.state.page -= 1;
            true
        } else {
            false
        }
    }

    /// Jump to a page; out-of-range targets are ignored. Jumping to the
    /// current page is a refresh and still asks for a refetch.
    pub fn go_to(&mut self, page: u32) -> bool {
        if page >= self.state.total_pages {
            return false;
        }
        self.state.page = page;
        true
    }

    /// Point the next fetch at `page` without bounds checks (no totals yet).
    pub fn start_at(&mut self, page: u32) {
        self.state.page = page;
    }

    /// Adopt the totals and page index from a fetch response.
    pub fn apply_response<T>(&mut self, response: &PageResponse<T>) {
        self.state.page = response.number;
        self.state.total_pages = response.total_pages;
        self.state.total_elements = response.total_elements;
    }

    /// A matching record appeared via the stream.
    pub fn nudge_created(&mut self) {
        self.state.total_elements = self.state.total_elements.saturating_add(1);
    }

    /// A matching record disappeared via the stream.
    pub fn nudge_deleted(&mut self) {
        self.state.total_elements = self.state.total_elements.saturating_sub(1);
    }
}

impl Default for PaginationController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
