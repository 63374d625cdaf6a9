//! Page-by-page enumeration of the identity provider's list endpoints.

use crate::error::{Error, Result, StoreError};
use std::future::Future;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// Position and size of a requested page. Indexes start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub index: u32,
    /// Records per page.
    pub per_page: u32,
}

impl PageRequest {
    /// Offset of the first record of this page.
    pub fn offset(&self) -> usize {
        self.index as usize * self.per_page as usize
    }
}

/// One page of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records in provider order.
    pub items: Vec<T>,
    /// Whether the provider has a page after this one.
    pub has_next: bool,
}

impl<T> Page<T> {
    /// Creates a page.
    pub fn new(items: Vec<T>, has_next: bool) -> Self {
        Self { items, has_next }
    }

    /// Creates the final page of an enumeration.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, false)
    }
}

/// Lazy enumeration over a page-fetch function.
///
/// The page index is the only state carried between fetches, so a fresh
/// pager over the same fetch function replays the same sequence. After the
/// last page or the first error, [`Pager::next_page`] returns `None`.
pub struct Pager<T, F> {
    resource: &'static str,
    fetch: F,
    per_page: u32,
    max_pages: Option<u32>,
    next_index: Option<u32>,
    fetched: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F, Fut> Pager<T, F>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = std::result::Result<Page<T>, StoreError>>,
{
    /// Creates a pager starting at page zero.
    ///
    /// `resource` names the enumeration in errors and logs. A `per_page` of
    /// zero is treated as one.
    pub fn new(resource: &'static str, per_page: u32, fetch: F) -> Self {
        Self {
            resource,
            fetch,
            per_page: per_page.max(1),
            max_pages: None,
            next_index: Some(0),
            fetched: 0,
            _marker: PhantomData,
        }
    }

    /// Bounds the number of pages fetched.
    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Number of fetches issued so far.
    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }

    /// Fetches the next page.
    pub async fn next_page(&mut self) -> Option<Result<Page<T>>> {
        let index = self.next_index?;
        if let Some(max_pages) = self.max_pages
            && index >= max_pages
        {
            self.next_index = None;
            return Some(Err(Error::PageLimitExceeded {
                resource: self.resource,
                max_pages,
            }));
        }

        let request = PageRequest {
            index,
            per_page: self.per_page,
        };
        self.fetched += 1;
        match (self.fetch)(request).await {
            Ok(page) => {
                debug!(
                    resource = self.resource,
                    page = index,
                    items = page.items.len(),
                    has_next = page.has_next,
                    "fetched page"
                );
                self.next_index = if page.has_next {
                    index.checked_add(1)
                } else {
                    None
                };
                Some(Ok(page))
            }
            Err(source) => {
                warn!(resource = self.resource, page = index, error = %source, "page fetch failed");
                self.next_index = None;
                Some(Err(Error::Pagination {
                    resource: self.resource,
                    page: index,
                    source,
                }))
            }
        }
    }

    /// Drains every page, returning all records in page order.
    ///
    /// The first error aborts the enumeration and discards collected records.
    pub async fn try_collect(mut self) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await {
            items.extend(page?.items);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::Cell;
    use std::future::ready;

    fn slice_page(total: usize, request: PageRequest) -> Page<usize> {
        let start = request.offset().min(total);
        let end = (start + request.per_page as usize).min(total);
        Page::new((start..end).collect(), end < total)
    }

    #[test]
    fn fetch_count_matches_page_math() {
        let per_page = 10u32;
        for total in [0usize, 1, 10, 11, 30] {
            let calls = Cell::new(0u32);
            let pager = Pager::new("numbers", per_page, |request: PageRequest| {
                calls.set(calls.get() + 1);
                ready(Ok::<_, StoreError>(slice_page(total, request)))
            });
            let items = block_on(pager.try_collect()).expect("collect");

            let expected_fetches = total.div_ceil(per_page as usize).max(1) as u32;
            assert_eq!(calls.get(), expected_fetches, "total={total}");
            assert_eq!(items, (0..total).collect::<Vec<_>>(), "total={total}");
        }
    }

    #[test]
    fn index_advances_by_one() {
        let seen = std::cell::RefCell::new(Vec::new());
        let pager = Pager::new("numbers", 2, |request: PageRequest| {
            seen.borrow_mut().push(request);
            ready(Ok::<_, StoreError>(slice_page(5, request)))
        });
        block_on(pager.try_collect()).expect("collect");

        let indexes: Vec<u32> = seen.borrow().iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(seen.borrow().iter().all(|r| r.per_page == 2));
    }

    #[test]
    fn error_stops_enumeration() {
        let calls = Cell::new(0u32);
        let mut pager = Pager::new("numbers", 1, |request: PageRequest| {
            calls.set(calls.get() + 1);
            if request.index == 1 {
                ready(Err::<Page<usize>, StoreError>("connection reset".into()))
            } else {
                ready(Ok(Page::new(vec![request.index as usize], true)))
            }
        });

        let first = block_on(pager.next_page()).expect("page").expect("ok");
        assert_eq!(first.items, vec![0]);
        let second = block_on(pager.next_page()).expect("page");
        assert!(matches!(
            second,
            Err(Error::Pagination {
                resource: "numbers",
                page: 1,
                ..
            })
        ));
        assert!(block_on(pager.next_page()).is_none());
        assert_eq!(calls.get(), 2);
        assert_eq!(pager.pages_fetched(), 2);
    }

    #[test]
    fn try_collect_discards_partial_results_on_error() {
        let pager = Pager::new("numbers", 1, |request: PageRequest| {
            if request.index == 2 {
                ready(Err::<Page<usize>, StoreError>("timeout".into()))
            } else {
                ready(Ok(Page::new(vec![request.index as usize], true)))
            }
        });
        let result = block_on(pager.try_collect());
        assert!(matches!(result, Err(Error::Pagination { page: 2, .. })));
    }

    #[test]
    fn max_pages_bounds_endless_source() {
        let calls = Cell::new(0u32);
        let pager = Pager::new("endless", 5, |_request: PageRequest| {
            calls.set(calls.get() + 1);
            ready(Ok::<_, StoreError>(Page::new(vec![0u8], true)))
        })
        .max_pages(Some(3));

        let result = block_on(pager.try_collect());
        assert!(matches!(
            result,
            Err(Error::PageLimitExceeded {
                resource: "endless",
                max_pages: 3
            })
        ));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn fresh_pager_replays_sequence() {
        let fetch = |request: PageRequest| ready(Ok::<_, StoreError>(slice_page(7, request)));
        let first = block_on(Pager::new("numbers", 3, fetch).try_collect()).expect("first");
        let second = block_on(Pager::new("numbers", 3, fetch).try_collect()).expect("second");
        assert_eq!(first, second);
    }
}
