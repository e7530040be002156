// Database models - List ordering and filtering
//
// The repository returns rows in store order; the archive screen applies these afterwards.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::RecordingListItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListSort {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
}

impl ListSort {
    pub fn compare(self, a: &RecordingListItem, b: &RecordingListItem) -> Ordering {
        match self {
            ListSort::Newest => b.created_at.cmp(&a.created_at),
            ListSort::Oldest => a.created_at.cmp(&b.created_at),
            ListSort::TitleAsc => compare_titles(a, b),
            ListSort::TitleDesc => compare_titles(b, a),
        }
    }
}

fn compare_titles(a: &RecordingListItem, b: &RecordingListItem) -> Ordering {
    a.recording_title
        .to_lowercase()
        .cmp(&b.recording_title.to_lowercase())
        .then_with(|| a.recording_title.cmp(&b.recording_title))
}

fn matches_query(item: &RecordingListItem, needle: &str) -> bool {
    item.id.to_string().contains(needle)
        || item.date_key.to_lowercase().contains(needle)
        || item.recording_title.to_lowercase().contains(needle)
        || item.memo.to_lowercase().contains(needle)
}

/// Keep items whose id, date key, title or memo contain `query` (case-insensitive), then sort
pub fn filter_and_sort(items: &[RecordingListItem], query: &str, sort: ListSort) -> Vec<RecordingListItem> {
    let needle = query.trim().to_lowercase();
    let mut rows: Vec<RecordingListItem> = items
        .iter()
        .filter(|item| needle.is_empty() || matches_query(item, &needle))
        .cloned()
        .collect();
    rows.sort_by(|a, b| sort.compare(a, b));
    rows
}
