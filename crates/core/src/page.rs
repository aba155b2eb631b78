//! Offset pagination over already-materialised lists.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: usize = 25;
pub const MAX_PER_PAGE: usize = 200;

/// Page selector (1-based).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }.normalized()
    }

    /// Clamp out-of-range values instead of rejecting them.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Slice an ordered list into the requested page.
///
/// Pages past the end are empty but still report the correct totals.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let request = request.normalized();
    let total = items.len();
    let total_pages = total.div_ceil(request.per_page);
    let start = (request.page - 1).saturating_mul(request.per_page);

    let items = items
        .into_iter()
        .skip(start)
        .take(request.per_page)
        .collect();

    Page {
        items,
        page: request.page,
        per_page: request.per_page,
        total,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn last_page_is_partial() {
        let page = paginate((1..=7).collect::<Vec<_>>(), PageRequest::new(2, 5));
        assert_eq!(page.items, vec![6, 7]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn out_of_range_request_is_clamped() {
        let page = paginate(vec![1, 2, 3], PageRequest { page: 0, per_page: 0 });
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items, vec![1]);
    }

    proptest! {
        /// Walking every page yields each element exactly once, in order.
        #[test]
        fn pages_partition_the_input(len in 0usize..300, per_page in 1usize..50) {
            let input: Vec<usize> = (0..len).collect();
            let first = paginate(input.clone(), PageRequest::new(1, per_page));

            let mut seen = Vec::new();
            for p in 1..=first.total_pages.max(1) {
                seen.extend(paginate(input.clone(), PageRequest::new(p, per_page)).items);
            }
            prop_assert_eq!(seen, input);
        }
    }
}
