use super::errors::Error;
use super::fairings::db::Db;
use super::folder::ensure_folder;
use super::guards;
use crate::db::{self, bookmark, tag};

use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use itertools::Itertools;
use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use stashmark_types::{Bookmark, CreateBookmark, ModifyBookmark};
use tracing::debug;

fn tag_ids(tags: &[tag::Tag]) -> Vec<i32> {
    tags.iter().map(|t| t.id).collect_vec()
}

/// Create a new bookmark
#[utoipa::path(
    post,
    path = "/api/bookmarks/",
    request_body = CreateBookmark,
    responses(
        (status = 200, description = "Bookmark created success", body = Bookmark),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/", format = "application/json", data = "<payload>")]
pub async fn create_bookmark(
    mut db: Connection<Db>,
    auth: guards::Auth,
    payload: Json<CreateBookmark>,
) -> Result<Json<Bookmark>, Error> {
    let payload = payload.into_inner();
    let user_id = auth.user_id;
    ensure_folder(&mut db, user_id, payload.folder_id).await?;

    let new = bookmark::NewBookmark {
        user_id,
        folder_id: payload.folder_id,
        url: payload.url,
        name: payload.name,
        description: payload.description,
        favicon: payload.favicon,
        image: payload.image,
        is_favorite: payload.is_favorite,
    };
    let tags = payload.tags;

    let m = db
        .transaction::<_, Error, _>(|db| {
            async move {
                let tags = tag::get_or_create_tags(db, user_id, &tags).await?;
                let m = bookmark::create_bookmark(db, &new, &tag_ids(&tags)).await?;
                Ok(db::get_bookmark_details(db, vec![m]).await?.remove(0))
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(m))
}

/// List bookmarks, newest first
#[utoipa::path(
    get,
    path = "/api/bookmarks/",
    params(
        ("folder_id" = inline(Option<i32>), Query, description = "Only bookmarks directly in this folder"),
        ("tag" = inline(Option<&str>), Query, description = "Only bookmarks with this tag"),
        ("favorite" = inline(Option<bool>), Query, description = "Filter by the favorite flag"),
        ("before" = inline(Option<i32>), Query, description = "The bookmark id to search before"),
        ("limit" = inline(Option<i64>), Query, description = "The limit of search results, 1 to 100, 10 by default")
    ),
    responses(
        (status = 200, description = "Bookmarks listed success", body = Vec<Bookmark>)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/?<folder_id>&<tag>&<favorite>&<before>&<limit>")]
pub async fn list_bookmarks(
    mut db: Connection<Db>,
    auth: guards::Auth,
    folder_id: Option<i32>,
    tag: Option<&str>,
    favorite: Option<bool>,
    before: Option<i32>,
    limit: Option<i64>,
) -> Result<Json<Vec<Bookmark>>, Error> {
    let filter = bookmark::BookmarkFilter {
        folder_id,
        tag: tag.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string),
        favorite,
        before: before.unwrap_or_default(),
        limit: super::page_limit(limit),
    };
    let rv = bookmark::list_bookmarks(&mut db, auth.user_id, &filter).await?;
    debug!(?filter, found = rv.len(), "bookmarks listed");
    Ok(Json(db::get_bookmark_details(&mut db, rv).await?))
}

/// Get a bookmark
#[utoipa::path(
    get,
    path = "/api/bookmarks/{id}",
    params(
        ("id" = inline(i32), Path, description = "The bookmark id")
    ),
    responses(
        (status = 200, description = "Bookmark found", body = Bookmark),
        (status = 404, description = "Bookmark not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/<id>")]
pub async fn get_bookmark(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
) -> Result<Json<Bookmark>, Error> {
    let m = bookmark::Bookmark::get(&mut db, auth.user_id, id)
        .await?
        .ok_or_else(|| Error::NotFound("Bookmark not found".to_string()))?;
    Ok(Json(db::get_bookmark_details(&mut db, vec![m]).await?.remove(0)))
}

/// Update a bookmark
#[utoipa::path(
    patch,
    path = "/api/bookmarks/{id}",
    params(
        ("id" = inline(i32), Path, description = "The bookmark id to be updated")
    ),
    request_body = ModifyBookmark,
    responses(
        (status = 200, description = "Bookmark updated success", body = Bookmark),
        (status = 400, description = "No changes"),
        (status = 404, description = "Bookmark or folder not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[patch("/<id>", format = "application/json", data = "<payload>")]
pub async fn update_bookmark(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
    payload: Json<ModifyBookmark>,
) -> Result<Json<Bookmark>, Error> {
    let payload = payload.into_inner();
    if payload.is_empty() {
        return Err(Error::BadRequest("No changes".to_string()));
    }
    let user_id = auth.user_id;
    ensure_folder(&mut db, user_id, payload.folder_id.flatten()).await?;

    let modified = bookmark::ModifyBookmark {
        url: payload.url,
        name: payload.name,
        description: payload.description,
        is_favorite: payload.is_favorite,
        folder_id: payload.folder_id,
    };
    let modify_tags = payload.tags;

    let m = db
        .transaction::<_, Error, _>(|db| {
            async move {
                let m = if modified.is_empty() {
                    bookmark::Bookmark::get(db, user_id, id).await?
                } else {
                    bookmark::update_bookmark(db, user_id, id, &modified).await?
                }
                .ok_or_else(|| Error::NotFound("Bookmark not found".to_string()))?;

                if let Some(names) = modify_tags {
                    let tags = tag::get_or_create_tags(db, user_id, &names).await?;
                    tag::replace_bookmark_tags(db, m.id, &tag_ids(&tags)).await?;
                }

                Ok(db::get_bookmark_details(db, vec![m]).await?.remove(0))
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(m))
}

/// Delete a bookmark
#[utoipa::path(
    delete,
    path = "/api/bookmarks/{id}",
    params(
        ("id" = inline(i32), Path, description = "The bookmark id to be deleted")
    ),
    responses(
        (status = 200, description = "Bookmark deleted success"),
        (status = 404, description = "Bookmark not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/<id>")]
pub async fn delete_bookmark(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
) -> Result<&'static str, Error> {
    match bookmark::delete_bookmarks(&mut db, auth.user_id, &[id]).await? {
        0 => Err(Error::NotFound("Bookmark not found".to_string())),
        _ => Ok("Deleted"),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        create_bookmark,
        list_bookmarks,
        get_bookmark,
        update_bookmark,
        delete_bookmark
    ]
}

pub(crate) mod misc {
    use super::*;
    use crate::api::batch;
    use crate::api::SecurityAddon;

    use utoipa::OpenApi;

    #[derive(OpenApi)]
    #[openapi(
        info(title = "Bookmarks API", description = "Bookmarks API", version = "1.0"),
        paths(
            create_bookmark,
            list_bookmarks,
            get_bookmark,
            update_bookmark,
            delete_bookmark,
            batch::import_bookmarks,
            batch::import_netscape,
            batch::resync_bookmarks,
            batch::delete_bookmarks,
            batch::export_bookmarks
        ),
        components(schemas(
            CreateBookmark,
            ModifyBookmark,
            Bookmark,
            stashmark_types::ImportBookmarks,
            stashmark_types::ResyncBookmarks,
            stashmark_types::DeleteBookmarks,
            stashmark_types::BatchReport,
            stashmark_types::ItemResult,
            stashmark_types::BatchStatus,
            stashmark_types::Operation
        )),
        modifiers(&SecurityAddon)
    )]
    pub struct ApiDoc;
}
