pub mod batch;
pub mod bookmark;
pub mod folder;
pub mod tag;

#[cfg(feature = "diesel")]
pub mod schema;

#[cfg(feature = "diesel")]
pub use schema::*;

// Re-export for convenience
pub use batch::{BatchReport, BatchStatus, ItemResult, Operation};
pub use bookmark::{
    Bookmark, CreateBookmark, DeleteBookmarks, ImportBookmarks, ModifyBookmark, ResyncBookmarks,
};
pub use folder::{CreateFolder, Folder, ModifyFolder};
pub use tag::{CreateTag, Tag};

// Present-but-null deserializes to `Some(None)`, absent fields fall back to `#[serde(default)]`.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}
