//! Paginated fetch request and response shapes.

use serde::{Deserialize, Serialize};

use crate::view::materialize::{FilterCriteria, SortCriteria};

/// One page of records as returned by the paginated list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,

    /// Zero-based page index actually served
    #[serde(default)]
    pub number: u32,

    #[serde(default)]
    pub size: u32,

    #[serde(default)]
    pub total_elements: u64,

    #[serde(default)]
    pub total_pages: u32,

    #[serde(default)]
    pub first: Option<bool>,

    #[serde(default)]
    pub last: Option<bool>,

    #[serde(default)]
    pub number_of_elements: Option<u32>,

    #[serde(default)]
    pub empty: Option<bool>,
}

impl<T> PageResponse<T> {
    /// Build a response from a content slice and totals.
    pub fn new(content: Vec<T>, number: u32, size: u32, total_elements: u64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            u32::try_from(total_elements.div_ceil(u64::from(size))).unwrap_or(u32::MAX)
        };
        Self {
            content,
            number,
            size,
            total_elements,
            total_pages,
            first: None,
            last: None,
            number_of_elements: None,
            empty: None,
        }
    }
}

/// Parameters for a paginated issue fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortCriteria,
    pub filter: FilterCriteria,
}

impl PageRequest {
    /// Query-string pairs in the order the list endpoint expects.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
            ("sort", self.sort.to_query()),
        ];

        if let Some(ref project_id) = self.filter.project_id {
            pairs.push(("projectId", project_id.clone()));
        }
        if let Some(status) = self.filter.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(priority) = self.filter.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(ref search) = self.filter.search {
            if !search.is_empty() {
                pairs.push(("search", search.clone()));
            }
        }

        pairs
    }
}
