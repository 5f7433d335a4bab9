//! Service configuration.

use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Tunables for list requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Used when a caller asks for zero or fewer items.
    pub default_page_size: usize,
    /// Requests above this are clamped to it.
    pub max_page_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

impl ServiceConfig {
    /// Normalize a caller-supplied page size to a positive store limit.
    pub fn page_size(&self, requested: i64) -> usize {
        let max = self.max_page_size.max(1);
        if requested <= 0 {
            return self.default_page_size.clamp(1, max);
        }
        usize::try_from(requested).map_or(max, |n| n.min(max))
    }
}
