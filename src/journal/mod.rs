pub mod entry;
pub mod store;
pub mod timeline;

pub use entry::{
    AiFeedbackSet, AttachmentRef, EntryDraft, EntryType, JournalEntry, PerspectiveComment,
    parse_entry_date,
};
pub use timeline::{LogNotifier, SharedTimeline, TimelineController, TimelineSnapshot};
