//! Offset pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

use crate::CoreError;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

/// `skip`/`limit` window over a sorted collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// One page of items plus the counters the dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub has_next: bool,
}

impl Pagination {
    pub fn new(skip: Option<usize>, limit: Option<usize>) -> Result<Self, CoreError> {
        let pagination = Self {
            skip: skip.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_LIMIT),
        };
        pagination.validate()?;
        Ok(pagination)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(CoreError::invalid(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Slice `items`, which must already be sorted.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let limit = self.limit.max(1);
        let items: Vec<T> = items.into_iter().skip(self.skip).take(limit).collect();
        Page {
            items,
            total,
            page: (self.skip / limit).saturating_add(1),
            size: limit,
            has_next: self.skip.saturating_add(limit) < total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Pagination::new(None, None).unwrap();
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn test_limit_bounds() {
        assert!(Pagination::new(None, Some(0)).is_err());
        assert!(Pagination::new(None, Some(1001)).is_err());
        assert!(Pagination::new(Some(5), Some(1000)).is_ok());
    }

    #[test]
    fn test_apply_counts_pages() {
        let items: Vec<u32> = (0..25).collect();
        let page = Pagination { skip: 10, limit: 10 }.apply(items.clone());
        assert_eq!(page.items, (10..20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert!(page.has_next);

        let last = Pagination { skip: 20, limit: 10 }.apply(items);
        assert_eq!(last.items.len(), 5);
        assert_eq!(last.page, 3);
        assert!(!last.has_next);
    }

    #[test]
    fn test_skip_past_end() {
        let page = Pagination { skip: 50, limit: 10 }.apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert!(!page.has_next);
    }

    #[test]
    fn test_huge_skip_does_not_overflow() {
        let page = Pagination {
            skip: usize::MAX,
            limit: 10,
        }
        .apply(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert!(!page.has_next);
        assert_eq!(page.page, usize::MAX / 10 + 1);
    }
}
