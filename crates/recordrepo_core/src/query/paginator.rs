//! Length-aware pagination result.

use crate::model::Record;
use serde::Serialize;

/// Default page size used when callers do not pick one.
pub const DEFAULT_PER_PAGE: u32 = 15;

/// One page of results plus the total row count behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthAwarePaginator<T = Record> {
    items: Vec<T>,
    total: u64,
    per_page: u32,
    current_page: u32,
}

impl<T> LengthAwarePaginator<T> {
    /// `per_page` must be non-zero; `current_page` is clamped to at least 1.
    pub fn new(items: Vec<T>, total: u64, per_page: u32, current_page: u32) -> Self {
        Self {
            items,
            total,
            per_page: per_page.max(1),
            current_page: current_page.max(1),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of items on this page.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Last page number, never below 1.
    pub fn last_page(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page < self.last_page()
    }

    pub fn on_first_page(&self) -> bool {
        self.current_page <= 1
    }

    /// 1-based ordinal of the first item on this page.
    pub fn first_item(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.offset() + 1)
    }

    /// 1-based ordinal of the last item on this page.
    pub fn last_item(&self) -> Option<u64> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.offset() + self.items.len() as u64)
    }

    pub(crate) fn offset(&self) -> u64 {
        u64::from(self.current_page - 1) * u64::from(self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::LengthAwarePaginator;

    #[test]
    fn computes_page_metadata() {
        let page = LengthAwarePaginator::new((1..=10).collect::<Vec<u32>>(), 50, 10, 1);
        assert_eq!(page.current_page(), 1);
        assert_eq!(page.last_page(), 5);
        assert!(page.has_more_pages());
        assert_eq!(page.first_item(), Some(1));
        assert_eq!(page.last_item(), Some(10));
    }

    #[test]
    fn last_page_rounds_up_and_never_drops_below_one() {
        let partial = LengthAwarePaginator::new(vec![1], 21, 10, 3);
        assert_eq!(partial.last_page(), 3);
        assert!(!partial.has_more_pages());
        assert_eq!(partial.first_item(), Some(21));

        let empty = LengthAwarePaginator::<u8>::new(Vec::new(), 0, 15, 1);
        assert_eq!(empty.last_page(), 1);
        assert!(!empty.has_more_pages());
        assert_eq!(empty.first_item(), None);
    }

    #[test]
    fn page_zero_is_treated_as_first_page() {
        let page = LengthAwarePaginator::new(vec!["a"], 1, 10, 0);
        assert_eq!(page.current_page(), 1);
        assert!(page.on_first_page());
    }
}
