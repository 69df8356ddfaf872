mod book;
mod bookmark;
mod highlight;
mod ids;
mod note;
mod reading_progress;
mod verse;

pub use book::{Book, Testament};
pub use bookmark::Bookmark;
pub use highlight::Highlight;
pub use ids::{BookmarkId, HighlightId, NoteId, ProgressId};
pub use note::{NewNote, Note, NoteBuilder};
pub use reading_progress::ReadingProgress;
pub use verse::{Chapter, Verse};
