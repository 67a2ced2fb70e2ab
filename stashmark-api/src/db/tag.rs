use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};
use itertools::Itertools;

use stashmark_types::schema::{bookmarks_tags, tags};

use super::bookmark::Bookmark;
use crate::utils::DatabaseError;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Tag {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Insertable, Identifiable, Selectable, Queryable, Associations, Debug)]
#[diesel(belongs_to(Bookmark))]
#[diesel(belongs_to(Tag))]
#[diesel(table_name = bookmarks_tags)]
#[diesel(primary_key(bookmark_id, tag_id))]
pub struct BookmarkTag {
    pub bookmark_id: i32,
    pub tag_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = tags)]
pub struct NewTag {
    pub user_id: i32,
    pub name: String,
}

impl From<Tag> for stashmark_types::Tag {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

/// Trims, drops empty names and duplicates, and sorts so concurrent upserts lock rows in
/// the same order.
pub fn normalize_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect()
}

pub async fn get_or_create_tags(
    conn: &mut Connection,
    user_id: i32,
    names: &[String],
) -> Result<Vec<Tag>, DatabaseError> {
    use diesel::dsl::now;

    let new_tags = normalize_names(names)
        .into_iter()
        .map(|name| NewTag { user_id, name })
        .collect_vec();
    if new_tags.is_empty() {
        return Ok(vec![]);
    }

    Ok(diesel::insert_into(tags::table)
        .values(&new_tags)
        .on_conflict((tags::user_id, tags::name))
        .do_update()
        .set(tags::updated_at.eq(now))
        .returning(Tag::as_returning())
        .get_results(conn)
        .await?)
}

pub async fn create_tag(conn: &mut Connection, user_id: i32, name: &str) -> Result<Tag, DatabaseError> {
    Ok(diesel::insert_into(tags::table)
        .values(&NewTag {
            user_id,
            name: name.trim().to_string(),
        })
        .returning(Tag::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn delete_tag(conn: &mut Connection, user_id: i32, id: i32) -> Result<usize, DatabaseError> {
    Ok(
        diesel::delete(tags::table.filter(tags::id.eq(id).and(tags::user_id.eq(user_id))))
            .execute(conn)
            .await?,
    )
}

pub async fn link_tags(
    conn: &mut Connection,
    bookmark_id: i32,
    tag_ids: &[i32],
) -> Result<(), DatabaseError> {
    if tag_ids.is_empty() {
        return Ok(());
    }
    let links = tag_ids
        .iter()
        .unique()
        .map(|&tag_id| BookmarkTag {
            bookmark_id,
            tag_id,
        })
        .collect_vec();

    diesel::insert_into(bookmarks_tags::table)
        .values(&links)
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn replace_bookmark_tags(
    conn: &mut Connection,
    bookmark_id: i32,
    tag_ids: &[i32],
) -> Result<(), DatabaseError> {
    diesel::delete(bookmarks_tags::table.filter(bookmarks_tags::bookmark_id.eq(bookmark_id)))
        .execute(conn)
        .await?;
    link_tags(conn, bookmark_id, tag_ids).await
}

pub async fn get_tags_per_bookmark(
    conn: &mut Connection,
    bookmarks: Vec<Bookmark>,
) -> Result<Vec<(Bookmark, Vec<Tag>)>, DatabaseError> {
    let tags = BookmarkTag::belonging_to(&bookmarks)
        .inner_join(tags::table)
        .select((BookmarkTag::as_select(), Tag::as_select()))
        .order_by(tags::name.asc())
        .load(conn)
        .await?;
    Ok(tags
        .grouped_by(&bookmarks)
        .into_iter()
        .zip(bookmarks)
        .map(|(tags, bookmark)| (bookmark, tags.into_iter().map(|(_, tag)| tag).collect()))
        .collect())
}

pub async fn search_tags(
    conn: &mut Connection,
    user_id: i32,
    keyword: Option<&str>,
    before: i32,
    limit: i64,
) -> Result<Vec<Tag>, DatabaseError> {
    let mut query = tags::table
        .filter(tags::user_id.eq(user_id))
        .select(Tag::as_select())
        .into_boxed();
    if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        query = query.filter(tags::name.ilike(format!("%{}%", keyword)));
    }
    if before > 0 {
        query = query.filter(tags::id.lt(before));
    }
    Ok(query
        .order_by(tags::id.desc())
        .limit(limit)
        .load(conn)
        .await?)
}
