//! Recycle-bin ordering helpers.

use crate::sharepoint::types::RecycleBinItem;

/// Conventional number of entries shown by `get_recently_deleted_items`.
pub const DEFAULT_RECENT_ITEMS: usize = 5;

/// Newest deletions first, truncated to `max_items`.  `None` and `Some(0)`
/// keep everything.  Items deleted at the same instant keep service order.
pub fn most_recent(mut items: Vec<RecycleBinItem>, max_items: Option<usize>) -> Vec<RecycleBinItem> {
    items.sort_by(|a, b| b.deleted_date.cmp(&a.deleted_date));
    if let Some(max) = max_items.filter(|&m| m > 0) {
        items.truncate(max);
    }
    items
}
