use std::collections::{HashMap, HashSet};

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};

use stashmark_types::schema::folders;

use crate::utils::DatabaseError;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = folders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Folder {
    pub id: i32,
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = folders)]
pub struct NewFolder<'a> {
    pub user_id: i32,
    pub parent_id: Option<i32>,
    pub name: &'a str,
    pub description: Option<&'a str>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = folders)]
pub struct ModifyFolder {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<i32>>,
}

impl Folder {
    pub async fn get(
        conn: &mut Connection,
        user_id: i32,
        id: i32,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(folders::table
            .find(id)
            .filter(folders::user_id.eq(user_id))
            .select(Folder::as_select())
            .first(conn)
            .await
            .optional()?)
    }
}

impl From<Folder> for stashmark_types::Folder {
    fn from(f: Folder) -> Self {
        Self {
            id: f.id,
            name: f.name,
            description: f.description,
            parent_id: f.parent_id,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// Whether hanging `folder_id` under `new_parent` would make it its own ancestor.
/// `parents` maps every folder of the user to its parent.
pub fn creates_cycle(parents: &HashMap<i32, Option<i32>>, folder_id: i32, new_parent: i32) -> bool {
    let mut visited = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(id) = cursor {
        if id == folder_id {
            return true;
        }
        if !visited.insert(id) {
            // the stored tree is already broken, refuse to extend it
            return true;
        }
        cursor = parents.get(&id).copied().flatten();
    }
    false
}

pub async fn create_folder(
    conn: &mut Connection,
    new_folder: &NewFolder<'_>,
) -> Result<Folder, DatabaseError> {
    Ok(diesel::insert_into(folders::table)
        .values(new_folder)
        .returning(Folder::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn update_folder(
    conn: &mut Connection,
    user_id: i32,
    id: i32,
    modified: &ModifyFolder,
) -> Result<Option<Folder>, DatabaseError> {
    use diesel::dsl::now;
    Ok(diesel::update(folders::table.find(id))
        .filter(folders::user_id.eq(user_id))
        .set((modified, folders::updated_at.eq(now)))
        .returning(Folder::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}

/// Deletes the folder and, by cascade, its sub-folders. Bookmarks inside are kept with
/// their folder cleared.
pub async fn delete_folder(conn: &mut Connection, user_id: i32, id: i32) -> Result<usize, DatabaseError> {
    Ok(diesel::delete(
        folders::table.filter(folders::id.eq(id).and(folders::user_id.eq(user_id))),
    )
    .execute(conn)
    .await?)
}

/// Children of `parent_id`, or the top-level folders when `None`.
pub async fn list_folders(
    conn: &mut Connection,
    user_id: i32,
    parent_id: Option<i32>,
) -> Result<Vec<Folder>, DatabaseError> {
    let query = folders::table
        .filter(folders::user_id.eq(user_id))
        .select(Folder::as_select())
        .order_by(folders::name.asc())
        .into_boxed();
    let query = match parent_id {
        Some(parent_id) => query.filter(folders::parent_id.eq(parent_id)),
        None => query.filter(folders::parent_id.is_null()),
    };
    Ok(query.load(conn).await?)
}

pub async fn all_folders(conn: &mut Connection, user_id: i32) -> Result<Vec<Folder>, DatabaseError> {
    Ok(folders::table
        .filter(folders::user_id.eq(user_id))
        .select(Folder::as_select())
        .order_by(folders::id.asc())
        .load(conn)
        .await?)
}

/// Same as [`all_folders`], holding row locks until the surrounding transaction ends.
/// Concurrent moves of the same user's folders take turns and each sees the other's result.
pub async fn lock_folders(conn: &mut Connection, user_id: i32) -> Result<Vec<Folder>, DatabaseError> {
    Ok(folders::table
        .filter(folders::user_id.eq(user_id))
        .select(Folder::as_select())
        .order_by(folders::id.asc())
        .for_update()
        .load(conn)
        .await?)
}
