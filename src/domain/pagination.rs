//! Page-number to offset/limit conversion.

use serde::{Deserialize, Serialize};

/// Number of rows the gateways return when a window carries no limit.
pub const DEFAULT_WINDOW_LIMIT: u32 = 100;

/// Zero-based `(offset, limit)` window derived from a 1-based page number.
///
/// Pages `<= 1` all resolve to offset 0. A `limit` of 0 means the caller did
/// not ask for windowing and the gateway falls back to
/// [`DEFAULT_WINDOW_LIMIT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationWindow {
    /// Number of rows to skip.
    pub offset: u64,
    /// Maximum number of rows to return (0 = unbounded).
    pub limit: u32,
}

impl PaginationWindow {
    /// Computes the window for `page` with `range_limit` rows per page.
    ///
    /// ```
    /// use versions_api::domain::PaginationWindow;
    ///
    /// let window = PaginationWindow::from_page(3, 10);
    /// assert_eq!(window.offset, 20);
    /// assert_eq!(window.limit, 10);
    ///
    /// let window = PaginationWindow::from_page(-4, 10);
    /// assert_eq!(window.offset, 0);
    /// ```
    #[must_use]
    pub const fn from_page(page: i64, range_limit: u32) -> Self {
        let skipped_pages = if page > 1 { (page - 1).unsigned_abs() } else { 0 };
        Self {
            offset: skipped_pages.saturating_mul(range_limit as u64),
            limit: range_limit,
        }
    }

    /// Returns true if no limit was requested.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.limit == 0
    }

    /// Limit to hand to the storage engine.
    #[must_use]
    pub const fn effective_limit(&self) -> u32 {
        if self.is_unbounded() {
            DEFAULT_WINDOW_LIMIT
        } else {
            self.limit
        }
    }
}
