//! Client-side style pagination over fully loaded result sets

use serde::{Deserialize, Serialize};

/// Page sizes the tables offer
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [5, 20, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Most page buttons shown at once
const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page size {0} is not one of {PAGE_SIZE_OPTIONS:?}")]
    InvalidPageSize(usize),
}

/// Requested page, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default = "first_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn first_page() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: first_page(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }
}

/// One page of a result set plus the numbers the pager needs
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    /// 0-based index of the first item on this page
    pub start_index: usize,
    /// Exclusive end index
    pub end_index: usize,
    pub page_numbers: Vec<usize>,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            start_index: self.start_index,
            end_index: self.end_index,
            page_numbers: self.page_numbers,
        }
    }
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size)
}

/// Clamp a requested page into `1..=max(total_pages, 1)`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.min(total_pages).max(1)
}

/// Page numbers for the pager, at most five centred on `current`.
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= PAGE_WINDOW {
        (1..=total_pages).collect()
    } else if current <= 3 {
        (1..=PAGE_WINDOW).collect()
    } else if current >= total_pages - 2 {
        (total_pages - PAGE_WINDOW + 1..=total_pages).collect()
    } else {
        (current - 2..=current + 2).collect()
    }
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Result<Paginated<T>, PaginationError> {
    if !PAGE_SIZE_OPTIONS.contains(&request.page_size) {
        return Err(PaginationError::InvalidPageSize(request.page_size));
    }

    let total_items = items.len();
    let total_pages = total_pages(total_items, request.page_size);
    let page = clamp_page(request.page, total_pages);
    let start_index = ((page - 1) * request.page_size).min(total_items);
    let end_index = (start_index + request.page_size).min(total_items);

    let items = items
        .into_iter()
        .skip(start_index)
        .take(end_index - start_index)
        .collect();

    Ok(Paginated {
        items,
        page,
        page_size: request.page_size,
        total_items,
        total_pages,
        start_index,
        end_index,
        page_numbers: page_window(page, total_pages),
    })
}
