use std::collections::HashMap;

use super::errors::Error;
use super::fairings::db::Db;
use super::guards;
use crate::db::folder::{self, Folder};

use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection};
use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use stashmark_types::{CreateFolder, ModifyFolder};
use tracing::info;

/// Fails with `NotFound` unless `folder_id` is `None` or a folder of `user_id`.
pub(crate) async fn ensure_folder(
    conn: &mut AsyncPgConnection,
    user_id: i32,
    folder_id: Option<i32>,
) -> Result<(), Error> {
    match folder_id {
        None => Ok(()),
        Some(id) => Folder::get(conn, user_id, id)
            .await?
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Folder {id} not found"))),
    }
}

/// Create a new folder
#[utoipa::path(
    post,
    path = "/api/folders/",
    request_body = CreateFolder,
    responses(
        (status = 200, description = "Folder created success", body = stashmark_types::Folder),
        (status = 400, description = "Empty folder name"),
        (status = 404, description = "Parent folder does not exist")
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/", format = "application/json", data = "<payload>")]
pub async fn create_folder(
    mut db: Connection<Db>,
    auth: guards::Auth,
    payload: Json<CreateFolder>,
) -> Result<Json<stashmark_types::Folder>, Error> {
    let payload = payload.into_inner();
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(Error::BadRequest("Folder name is empty".to_string()));
    }
    ensure_folder(&mut db, auth.user_id, payload.parent_id).await?;

    let f = folder::create_folder(
        &mut db,
        &folder::NewFolder {
            user_id: auth.user_id,
            parent_id: payload.parent_id,
            name,
            description: payload.description.as_deref(),
        },
    )
    .await?;
    info!(id = f.id, parent_id = ?f.parent_id, "folder created");
    Ok(Json(f.into()))
}

/// List folders
#[utoipa::path(
    get,
    path = "/api/folders/",
    params(
        ("parent_id" = inline(Option<i32>), Query, description = "List sub-folders of this folder, top-level folders when absent"),
    ),
    responses(
        (status = 200, description = "Folders listed success", body = Vec<stashmark_types::Folder>)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/?<parent_id>")]
pub async fn list_folders(
    mut db: Connection<Db>,
    auth: guards::Auth,
    parent_id: Option<i32>,
) -> Result<Json<Vec<stashmark_types::Folder>>, Error> {
    let folders = folder::list_folders(&mut db, auth.user_id, parent_id).await?;
    Ok(Json(folders.into_iter().map(Into::into).collect()))
}

/// Update a folder
#[utoipa::path(
    patch,
    path = "/api/folders/{id}",
    params(
        ("id" = inline(i32), Path, description = "The folder id to be updated")
    ),
    request_body = ModifyFolder,
    responses(
        (status = 200, description = "Folder updated success", body = stashmark_types::Folder),
        (status = 400, description = "No changes, or the move would nest the folder in itself"),
        (status = 404, description = "Folder or new parent folder not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[patch("/<id>", format = "application/json", data = "<payload>")]
pub async fn update_folder(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
    payload: Json<ModifyFolder>,
) -> Result<Json<stashmark_types::Folder>, Error> {
    let payload = payload.into_inner();
    if payload.is_empty() {
        return Err(Error::BadRequest("No changes".to_string()));
    }
    if payload.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(Error::BadRequest("Folder name is empty".to_string()));
    }
    let user_id = auth.user_id;

    let f = db
        .transaction::<_, Error, _>(|db| {
            async move {
                let folders = folder::lock_folders(db, user_id).await?;
                if !folders.iter().any(|f| f.id == id) {
                    return Err(Error::NotFound(format!("Folder {id} not found")));
                }

                if let Some(Some(parent_id)) = payload.parent_id {
                    if !folders.iter().any(|f| f.id == parent_id) {
                        return Err(Error::NotFound(format!("Folder {parent_id} not found")));
                    }
                    let parents: HashMap<i32, Option<i32>> =
                        folders.iter().map(|f| (f.id, f.parent_id)).collect();
                    if folder::creates_cycle(&parents, id, parent_id) {
                        return Err(Error::BadRequest(
                            "A folder cannot be moved into itself or its sub-folders".to_string(),
                        ));
                    }
                }

                let modified = folder::ModifyFolder {
                    name: payload.name.map(|n| n.trim().to_string()),
                    description: payload.description,
                    parent_id: payload.parent_id,
                };
                folder::update_folder(db, user_id, id, &modified)
                    .await?
                    .ok_or_else(|| Error::NotFound(format!("Folder {id} not found")))
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(f.into()))
}

/// Delete a folder with its sub-folders, bookmarks inside are kept
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    params(
        ("id" = inline(i32), Path, description = "The folder id to be deleted")
    ),
    responses(
        (status = 200, description = "Folder deleted success"),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/<id>")]
pub async fn delete_folder(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
) -> Result<&'static str, Error> {
    match folder::delete_folder(&mut db, auth.user_id, id).await? {
        0 => Err(Error::NotFound("Folder not found".to_string())),
        _ => {
            info!(id, "folder deleted");
            Ok("Deleted")
        }
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![create_folder, list_folders, update_folder, delete_folder]
}

pub(crate) mod misc {
    use super::*;
    use crate::api::SecurityAddon;

    use utoipa::OpenApi;

    #[derive(OpenApi)]
    #[openapi(
        info(title = "Folders API", description = "Folders API", version = "1.0"),
        paths(create_folder, list_folders, update_folder, delete_folder),
        components(schemas(CreateFolder, ModifyFolder, stashmark_types::Folder)),
        modifiers(&SecurityAddon)
    )]
    pub struct ApiDoc;
}
