use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection as Connection, RunQueryDsl};

use stashmark_types::schema::{bookmarks, bookmarks_tags, tags};

use super::tag;
use crate::pipeline::metadata::PageMetadata;
use crate::pipeline::writer::ResyncMode;
use crate::utils::DatabaseError;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = bookmarks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Bookmark {
    pub id: i32,
    pub user_id: i32,
    pub folder_id: Option<i32>,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
    pub is_favorite: bool,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = bookmarks)]
pub struct NewBookmark {
    pub user_id: i32,
    pub folder_id: Option<i32>,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
    pub is_favorite: bool,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = bookmarks)]
pub struct ModifyBookmark {
    pub url: Option<String>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub is_favorite: Option<bool>,
    pub folder_id: Option<Option<i32>>,
}

impl ModifyBookmark {
    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.is_favorite.is_none()
            && self.folder_id.is_none()
    }
}

/// Columns refreshed by a metadata resync. `None` leaves the column untouched,
/// `Some(None)` clears it.
#[derive(AsChangeset, Debug, Default, Clone, PartialEq, Eq)]
#[diesel(table_name = bookmarks)]
pub struct ResyncBookmark {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub favicon: Option<Option<String>>,
    pub image: Option<Option<String>>,
}

impl ResyncBookmark {
    pub fn new(metadata: &PageMetadata, mode: ResyncMode) -> Self {
        let assets = Self {
            favicon: Some(metadata.favicon.clone()),
            image: Some(metadata.image.clone()),
            ..Default::default()
        };
        match mode {
            ResyncMode::AssetsOnly => assets,
            ResyncMode::Full => Self {
                // a page without any title keeps the current name
                name: metadata.title.clone(),
                description: Some(metadata.description.clone()),
                ..assets
            },
        }
    }

    /// Applies the changeset in memory, mirroring what the UPDATE does.
    pub fn apply(&self, bookmark: &mut Bookmark) {
        if let Some(name) = &self.name {
            bookmark.name = name.clone();
        }
        if let Some(description) = &self.description {
            bookmark.description = description.clone();
        }
        if let Some(favicon) = &self.favicon {
            bookmark.favicon = favicon.clone();
        }
        if let Some(image) = &self.image {
            bookmark.image = image.clone();
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookmarkFilter {
    pub folder_id: Option<i32>,
    pub tag: Option<String>,
    pub favorite: Option<bool>,
    /// Only bookmarks with a smaller id, `0` disables the cursor.
    pub before: i32,
    pub limit: i64,
}

impl Bookmark {
    pub async fn get(
        conn: &mut Connection,
        user_id: i32,
        id: i32,
    ) -> Result<Option<Bookmark>, DatabaseError> {
        Ok(bookmarks::table
            .find(id)
            .filter(bookmarks::user_id.eq(user_id))
            .select(Bookmark::as_select())
            .first(conn)
            .await
            .optional()?)
    }
}

/// Inserts the bookmark and its tag links in one transaction.
pub async fn create_bookmark(
    conn: &mut Connection,
    new_bookmark: &NewBookmark,
    tag_ids: &[i32],
) -> Result<Bookmark, DatabaseError> {
    conn.transaction::<_, DatabaseError, _>(|conn| {
        async move {
            let m = diesel::insert_into(bookmarks::table)
                .values(new_bookmark)
                .returning(Bookmark::as_returning())
                .get_result(conn)
                .await?;

            tag::link_tags(conn, m.id, tag_ids).await?;

            Ok(m)
        }
        .scope_boxed()
    })
    .await
}

pub async fn update_bookmark(
    conn: &mut Connection,
    user_id: i32,
    id: i32,
    modified: &ModifyBookmark,
) -> Result<Option<Bookmark>, DatabaseError> {
    use diesel::dsl::now;
    Ok(diesel::update(bookmarks::table.find(id))
        .filter(bookmarks::user_id.eq(user_id))
        .set((modified, bookmarks::updated_at.eq(now)))
        .returning(Bookmark::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}

pub async fn resync_bookmark(
    conn: &mut Connection,
    user_id: i32,
    id: i32,
    changes: &ResyncBookmark,
) -> Result<Option<Bookmark>, DatabaseError> {
    use diesel::dsl::now;
    Ok(diesel::update(bookmarks::table.find(id))
        .filter(bookmarks::user_id.eq(user_id))
        .set((changes, bookmarks::updated_at.eq(now)))
        .returning(Bookmark::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}

pub async fn delete_bookmarks(
    conn: &mut Connection,
    user_id: i32,
    ids: &[i32],
) -> Result<usize, DatabaseError> {
    Ok(diesel::delete(
        bookmarks::table.filter(bookmarks::id.eq_any(ids).and(bookmarks::user_id.eq(user_id))),
    )
    .execute(conn)
    .await?)
}

pub async fn list_bookmarks(
    conn: &mut Connection,
    user_id: i32,
    filter: &BookmarkFilter,
) -> Result<Vec<Bookmark>, DatabaseError> {
    let mut query = bookmarks::table
        .filter(bookmarks::user_id.eq(user_id))
        .select(Bookmark::as_select())
        .into_boxed();

    if let Some(folder_id) = filter.folder_id {
        query = query.filter(bookmarks::folder_id.eq(folder_id));
    }
    if let Some(name) = &filter.tag {
        let tagged = bookmarks_tags::table
            .inner_join(tags::table)
            .filter(tags::name.eq(name.clone()).and(tags::user_id.eq(user_id)))
            .select(bookmarks_tags::bookmark_id);
        query = query.filter(bookmarks::id.eq_any(tagged));
    }
    if let Some(favorite) = filter.favorite {
        query = query.filter(bookmarks::is_favorite.eq(favorite));
    }
    if filter.before > 0 {
        query = query.filter(bookmarks::id.lt(filter.before));
    }

    Ok(query
        .order_by(bookmarks::id.desc())
        .limit(filter.limit)
        .load(conn)
        .await?)
}

pub async fn all_bookmarks(
    conn: &mut Connection,
    user_id: i32,
) -> Result<Vec<Bookmark>, DatabaseError> {
    Ok(bookmarks::table
        .filter(bookmarks::user_id.eq(user_id))
        .select(Bookmark::as_select())
        .order_by(bookmarks::id.asc())
        .load(conn)
        .await?)
}
