//! Optional `?page=&per_page=` slicing for list endpoints.

use serde::Deserialize;

/// Raw query parameters; both absent means "return everything".
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn pagination(self) -> Option<Pagination> {
        if self.page.is_none() && self.per_page.is_none() {
            return None;
        }
        let d = Pagination::default();
        Some(Pagination { page: self.page.unwrap_or(d.page), per_page: self.per_page.unwrap_or(d.per_page) })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page index
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    /// `(offset, limit)` with the page clamped to >= 1 and the size to 1..=200.
    pub fn offset_limit(self) -> (u64, u64) {
        let page = self.page.max(1) as u64;
        let per_page = self.per_page.clamp(1, 200) as u64;
        ((page - 1) * per_page, per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, per_page: 50 } }
}
