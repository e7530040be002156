// Database models - Re-exports all domain-specific models
//
// - recording.rs: Recording drafts, list/detail projections and edits
// - list_view.rs: Presentation-side ordering and filtering of the list projection

mod list_view;
mod recording;

pub use list_view::{filter_and_sort, ListSort};
pub use recording::{GeoPoint, RecordingDetail, RecordingDraft, RecordingEdit, RecordingListItem};
