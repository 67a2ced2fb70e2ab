//! Batch import, resync and delete of bookmarks.
pub mod batch;
pub mod limiter;
pub mod metadata;
pub mod report;
pub mod writer;

pub use batch::{delete_bookmarks, import_bookmarks, resync_bookmarks, ImportItem, ImportTarget};
pub use metadata::{HttpFetcher, MetadataFetcher, PageMetadata};
pub use writer::{BookmarkWriter, PgWriter, ResyncMode};
