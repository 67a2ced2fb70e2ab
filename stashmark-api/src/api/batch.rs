use std::collections::HashMap;

use super::configs::Config;
use super::errors::Error;
use super::fairings::db::Db;
use super::fairings::fetcher::Fetcher;
use super::folder::ensure_folder;
use super::guards;
use crate::db::{self, bookmark, folder, tag};
use crate::netscape;
use crate::pipeline::{self, ImportItem, ImportTarget, PgWriter, ResyncMode};

use rocket::data::{Data, ToByteUnit};
use rocket::response::content::RawHtml;
use rocket::serde::json::Json;
use rocket::State;
use rocket_db_pools::Connection;
use stashmark_types::{BatchReport, Bookmark, DeleteBookmarks, ImportBookmarks, ResyncBookmarks};
use tracing::{debug, info};

/// Checks the folder and resolves tag names up front, a failure here rejects the whole batch.
async fn prepare_import(
    writer: &PgWriter,
    user_id: i32,
    folder_id: Option<i32>,
    tags: &[String],
) -> Result<ImportTarget, Error> {
    let mut conn = writer.conn().await?;
    ensure_folder(&mut conn, user_id, folder_id).await?;
    let tags = tag::get_or_create_tags(&mut conn, user_id, tags).await?;
    Ok(ImportTarget {
        user_id,
        folder_id,
        tag_ids: tags.into_iter().map(|t| t.id).collect(),
    })
}

async fn run_import(
    pool: &Db,
    fetcher: &Fetcher,
    config: &Config,
    user_id: i32,
    folder_id: Option<i32>,
    tags: &[String],
    items: Vec<ImportItem>,
) -> Result<Json<BatchReport>, Error> {
    let writer = PgWriter::new(pool);
    let target = prepare_import(&writer, user_id, folder_id, tags).await?;
    info!(user_id, ?folder_id, urls = items.len(), "importing bookmarks");

    let report = pipeline::import_bookmarks(
        fetcher.as_ref(),
        &writer,
        &target,
        items,
        config.import_concurrency,
        |p| debug!(completed = p.completed, total = p.total, "import progress"),
    )
    .await?;
    Ok(Json(report))
}

/// Import bookmarks from a list of URLs
#[utoipa::path(
    post,
    path = "/api/bookmarks/import",
    request_body = ImportBookmarks,
    responses(
        (status = 200, description = "Per URL results, in input order", body = BatchReport),
        (status = 404, description = "Folder not found"),
        (status = 503, description = "Database unavailable")
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/import", format = "application/json", data = "<payload>")]
pub async fn import_bookmarks(
    auth: guards::Auth,
    pool: &Db,
    fetcher: &State<Fetcher>,
    config: &State<Config>,
    payload: Json<ImportBookmarks>,
) -> Result<Json<BatchReport>, Error> {
    let payload = payload.into_inner();
    let items = payload.urls.into_iter().map(ImportItem::url).collect();
    run_import(
        pool,
        fetcher,
        config,
        auth.user_id,
        payload.folder_id,
        &payload.tags,
        items,
    )
    .await
}

/// Import the links of a Netscape bookmark file, as exported by browsers
///
/// Tags and descriptions of the file are kept. Its folders are not recreated, every link
/// lands in `folder_id`.
#[utoipa::path(
    post,
    path = "/api/bookmarks/import/netscape",
    params(
        ("folder_id" = inline(Option<i32>), Query, description = "Folder receiving the imported bookmarks")
    ),
    request_body(content = String, content_type = "text/html"),
    responses(
        (status = 200, description = "Per link results, in file order", body = BatchReport),
        (status = 400, description = "File too large or not UTF-8"),
        (status = 404, description = "Folder not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/import/netscape?<folder_id>", data = "<body>")]
pub async fn import_netscape(
    auth: guards::Auth,
    pool: &Db,
    fetcher: &State<Fetcher>,
    config: &State<Config>,
    folder_id: Option<i32>,
    body: Data<'_>,
) -> Result<Json<BatchReport>, Error> {
    let html = body
        .open(4.mebibytes())
        .into_string()
        .await
        .map_err(|e| Error::BadRequest(format!("Unreadable bookmark file: {e}")))?;
    if !html.is_complete() {
        return Err(Error::BadRequest("Bookmark file is too large".to_string()));
    }

    let links = netscape::parse(&html);
    let names: Vec<String> = links.iter().flat_map(|l| l.tags.iter().cloned()).collect();
    let tag_ids: HashMap<String, i32> = {
        let mut conn = PgWriter::new(pool).conn().await?;
        ensure_folder(&mut conn, auth.user_id, folder_id).await?;
        tag::get_or_create_tags(&mut conn, auth.user_id, &names)
            .await?
            .into_iter()
            .map(|t| (t.name, t.id))
            .collect()
    };

    let items = links
        .into_iter()
        .map(|l| ImportItem {
            tag_ids: l.tags.iter().filter_map(|t| tag_ids.get(t).copied()).collect(),
            url: l.url,
            name: l.name,
            description: l.description,
        })
        .collect();
    run_import(pool, fetcher, config, auth.user_id, folder_id, &[], items).await
}

/// Re-fetch metadata of existing bookmarks
#[utoipa::path(
    post,
    path = "/api/bookmarks/resync",
    request_body = ResyncBookmarks,
    responses(
        (status = 200, description = "Per bookmark results, in input order", body = BatchReport)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/resync", format = "application/json", data = "<payload>")]
pub async fn resync_bookmarks(
    auth: guards::Auth,
    pool: &Db,
    fetcher: &State<Fetcher>,
    config: &State<Config>,
    payload: Json<ResyncBookmarks>,
) -> Result<Json<BatchReport>, Error> {
    let payload = payload.into_inner();
    let writer = PgWriter::new(pool);
    let mode = ResyncMode::from_assets_only(payload.assets_only);
    info!(user_id = auth.user_id, ?mode, ids = payload.ids.len(), "resyncing bookmarks");

    let report = pipeline::resync_bookmarks(
        fetcher.inner().as_ref(),
        &writer,
        auth.user_id,
        payload.ids,
        mode,
        config.resync_concurrency,
        |p| debug!(completed = p.completed, total = p.total, "resync progress"),
    )
    .await?;
    Ok(Json(report))
}

/// Delete many bookmarks
#[utoipa::path(
    post,
    path = "/api/bookmarks/delete",
    request_body = DeleteBookmarks,
    responses(
        (status = 200, description = "Per bookmark results, in input order", body = BatchReport)
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/delete", format = "application/json", data = "<payload>")]
pub async fn delete_bookmarks(
    auth: guards::Auth,
    pool: &Db,
    config: &State<Config>,
    payload: Json<DeleteBookmarks>,
) -> Result<Json<BatchReport>, Error> {
    let writer = PgWriter::new(pool);
    let report = pipeline::delete_bookmarks(
        &writer,
        auth.user_id,
        payload.into_inner().ids,
        config.resync_concurrency,
        |p| debug!(completed = p.completed, total = p.total, "delete progress"),
    )
    .await?;
    Ok(Json(report))
}

#[derive(Responder)]
pub enum Export {
    Json(Json<Vec<Bookmark>>),
    Netscape(RawHtml<String>),
}

/// Export all bookmarks
#[utoipa::path(
    get,
    path = "/api/bookmarks/export",
    params(
        ("format" = inline(Option<&str>), Query, description = "`json` (default) or `netscape`")
    ),
    responses(
        (status = 200, description = "All bookmarks of the user", body = Vec<Bookmark>),
        (status = 400, description = "Unknown format")
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/export?<format>")]
pub async fn export_bookmarks(
    mut db: Connection<Db>,
    auth: guards::Auth,
    format: Option<&str>,
) -> Result<Export, Error> {
    let format = format.unwrap_or("json");
    if !matches!(format, "json" | "netscape") {
        return Err(Error::BadRequest(format!("Unknown export format {format:?}")));
    }

    let all = bookmark::all_bookmarks(&mut db, auth.user_id).await?;
    let bookmarks = db::get_bookmark_details(&mut db, all).await?;
    info!(user_id = auth.user_id, format, count = bookmarks.len(), "exporting bookmarks");

    if format == "json" {
        return Ok(Export::Json(Json(bookmarks)));
    }
    let folders: Vec<stashmark_types::Folder> = folder::all_folders(&mut db, auth.user_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Export::Netscape(RawHtml(netscape::render(
        &folders, &bookmarks,
    ))))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        import_bookmarks,
        import_netscape,
        resync_bookmarks,
        delete_bookmarks,
        export_bookmarks
    ]
}
