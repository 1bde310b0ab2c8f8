//! Paginated result envelope.

use serde::Serialize;

use crate::PageRequest;

/// One page of items plus the un-paged total count.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    items: Vec<T>,
    total: u64,
    page: u32,
    size: u32,
}

impl<T> Paginated<T> {
    /// Wrap a page of items produced for `request`.
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            size: request.size(),
        }
    }

    /// Items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the envelope and return its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Total number of matching items across all pages.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Zero-based page index.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requested page size.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of pages needed to cover `total` at the current size.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    /// Whether a page exists after this one.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page).saturating_add(1) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(0, 10, 0)]
    #[case(10, 10, 1)]
    #[case(11, 10, 2)]
    fn total_pages_rounds_up(#[case] total: u64, #[case] size: u32, #[case] expected: u64) {
        let page: Paginated<u8> = Paginated::new(Vec::new(), total, PageRequest::new(0, size));
        assert_eq!(page.total_pages(), expected);
    }

    #[rstest]
    fn has_next_is_false_on_last_page() {
        let first = Paginated::new(vec![1, 2], 3, PageRequest::new(0, 2));
        let last = Paginated::new(vec![3], 3, PageRequest::new(1, 2));
        assert!(first.has_next());
        assert!(!last.has_next());
    }

    #[rstest]
    fn serializes_with_camel_case_keys() {
        let page = Paginated::new(vec!["x"], 7, PageRequest::new(1, 1));
        let value = serde_json::to_value(&page).expect("serialize page");
        assert_eq!(
            value,
            json!({ "items": ["x"], "total": 7, "page": 1, "size": 1 })
        );
    }
}
