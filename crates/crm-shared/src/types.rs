//! Common types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub type EntityId = Uuid;

pub fn new_id() -> EntityId {
    Uuid::new_v4()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: DEFAULT_PAGE_SIZE }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1),
            per_page: per_page.unwrap_or(DEFAULT_PAGE_SIZE),
        }
        .normalized()
    }

    /// Clamp into `page >= 1` and `1 <= per_page <= MAX_PAGE_SIZE`.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.per_page as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub last_page: u32,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let per_page = pagination.per_page.max(1);
        let last_page = ((total.max(0) as u64).div_ceil(per_page as u64)).max(1) as u32;
        Self {
            items,
            total,
            page: pagination.page,
            per_page,
            last_page,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_page_is_clamped() {
        assert_eq!(Pagination::new(Some(1), Some(0)).per_page, 1);
        assert_eq!(Pagination::new(Some(1), Some(1000)).per_page, MAX_PAGE_SIZE);
        assert_eq!(Pagination::new(None, None).per_page, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_offset() {
        let p = Pagination::new(Some(3), Some(25));
        assert_eq!(p.offset(), 50);
        assert_eq!(p.limit(), 25);
        assert_eq!(Pagination::new(Some(0), Some(10)).offset(), 0);
    }

    #[test]
    fn test_last_page() {
        let p = Pagination::new(Some(1), Some(10));
        assert_eq!(PaginatedResult::new(Vec::<u8>::new(), 0, p).last_page, 1);
        assert_eq!(PaginatedResult::new(Vec::<u8>::new(), 10, p).last_page, 1);
        assert_eq!(PaginatedResult::new(Vec::<u8>::new(), 11, p).last_page, 2);
    }
}
