use diesel_async::pooled_connection::deadpool::Object;
use diesel_async::AsyncPgConnection;
use serde::{Deserialize, Serialize};

use crate::api::fairings::db::DBPool;
use crate::db::bookmark::{self, Bookmark, NewBookmark, ResyncBookmark};
use crate::utils::{DatabaseError, ItemError};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncMode {
    /// favicon and preview image only
    AssetsOnly,
    /// assets plus name and description
    Full,
}

impl ResyncMode {
    pub fn from_assets_only(assets_only: bool) -> Self {
        if assets_only {
            ResyncMode::AssetsOnly
        } else {
            ResyncMode::Full
        }
    }
}

/// Per-item persistence used by the batch pipeline. Every call is independent, a failure
/// only concerns the item it was made for.
#[rocket::async_trait]
pub trait BookmarkWriter: Send + Sync {
    /// Inserts the bookmark and its tag links atomically.
    async fn create(&self, new_bookmark: NewBookmark, tag_ids: &[i32]) -> Result<Bookmark, ItemError>;

    async fn find(&self, user_id: i32, id: i32) -> Result<Bookmark, ItemError>;

    async fn resync(
        &self,
        user_id: i32,
        id: i32,
        changes: ResyncBookmark,
    ) -> Result<Bookmark, ItemError>;

    async fn delete(&self, user_id: i32, id: i32) -> Result<(), ItemError>;
}

/// Checks one pooled connection out per call, so concurrent items never share a
/// transaction.
pub struct PgWriter {
    pool: DBPool,
}

impl PgWriter {
    pub fn new(pool: &DBPool) -> Self {
        Self { pool: pool.clone() }
    }

    pub(crate) async fn conn(&self) -> Result<Object<AsyncPgConnection>, DatabaseError> {
        rocket_db_pools::Pool::get(&self.pool)
            .await
            .map_err(|e| DatabaseError::Unavailable(e.to_string()))
    }
}

#[rocket::async_trait]
impl BookmarkWriter for PgWriter {
    async fn create(&self, new_bookmark: NewBookmark, tag_ids: &[i32]) -> Result<Bookmark, ItemError> {
        let mut conn = self.conn().await?;
        Ok(bookmark::create_bookmark(&mut conn, &new_bookmark, tag_ids).await?)
    }

    async fn find(&self, user_id: i32, id: i32) -> Result<Bookmark, ItemError> {
        let mut conn = self.conn().await?;
        Bookmark::get(&mut conn, user_id, id)
            .await?
            .ok_or(ItemError::NotFound(id))
    }

    async fn resync(
        &self,
        user_id: i32,
        id: i32,
        changes: ResyncBookmark,
    ) -> Result<Bookmark, ItemError> {
        let mut conn = self.conn().await?;
        bookmark::resync_bookmark(&mut conn, user_id, id, &changes)
            .await?
            .ok_or(ItemError::NotFound(id))
    }

    async fn delete(&self, user_id: i32, id: i32) -> Result<(), ItemError> {
        let mut conn = self.conn().await?;
        match bookmark::delete_bookmarks(&mut conn, user_id, &[id]).await? {
            0 => Err(ItemError::NotFound(id)),
            _ => Ok(()),
        }
    }
}
