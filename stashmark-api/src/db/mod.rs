// ORM Models
pub mod bookmark;
pub mod folder;
pub mod tag;
pub mod user;

// Driver
pub mod connection;

use diesel_async::AsyncPgConnection as Connection;

use crate::utils::DatabaseError;

/// Loads bookmarks together with their tags and converts them to API responses.
pub async fn get_bookmark_details(
    conn: &mut Connection,
    bookmarks: Vec<bookmark::Bookmark>,
) -> Result<Vec<stashmark_types::Bookmark>, DatabaseError> {
    Ok(tag::get_tags_per_bookmark(conn, bookmarks)
        .await?
        .into_iter()
        .map(|(m, tags)| stashmark_types::Bookmark {
            id: m.id,
            url: m.url,
            name: m.name,
            description: m.description,
            favicon: m.favicon,
            image: m.image,
            is_favorite: m.is_favorite,
            folder_id: m.folder_id,
            tags: tags.into_iter().map(|t| t.name).collect(),
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
        .collect())
}
