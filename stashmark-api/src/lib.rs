#[macro_use]
extern crate rocket;

pub mod api;
pub mod db;
pub mod netscape;
pub mod pipeline;
pub mod utils;

#[cfg(test)]
#[cfg(not(tarpaulin_include))]
#[ctor::ctor]
fn init() {
    crate::utils::logging::setup_console_log();
}

pub(crate) mod misc {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;
    use utoipa_swagger_ui::Url;

    #[derive(OpenApi)]
    #[openapi(info(
        title = "Stashmark API",
        description = r"## Main API documentation

Every request needs an `Authorization` header carrying the API key printed by `adduser`.

- [Bookmarks API](/swagger-ui/?urls.primaryName=bookmarks)
- [Folders API](/swagger-ui/?urls.primaryName=folders)
- [Tags API](/swagger-ui/?urls.primaryName=tags)
    ",
        version = "1.0"
    ))]
    pub struct ApiDoc;

    pub fn docs() -> Vec<rocket::Route> {
        use crate::api::{bookmark, folder, tag};
        SwaggerUi::new("/swagger-ui/<_..>")
            .urls(vec![
                (
                    Url::with_primary("main", "/api-docs/openapi.json", true),
                    ApiDoc::openapi(),
                ),
                (
                    Url::new("bookmarks", "/api-docs/openapi-bookmarks.json"),
                    bookmark::misc::ApiDoc::openapi(),
                ),
                (
                    Url::new("folders", "/api-docs/openapi-folders.json"),
                    folder::misc::ApiDoc::openapi(),
                ),
                (
                    Url::new("tags", "/api-docs/openapi-tags.json"),
                    tag::misc::ApiDoc::openapi(),
                ),
            ])
            .into()
    }
}

#[cfg(not(tarpaulin_include))]
pub fn rocket() -> rocket::Rocket<rocket::Build> {
    use rocket::fairing::AdHoc;
    use rocket_db_pools::Database;

    use crate::api::configs::{self, Config};
    use crate::api::fairings::{self, db::Db};
    use crate::api::{batch, bookmark, folder, tag};
    use crate::misc;

    let cfg_provider = configs::config_provider();
    let log_dir = cfg_provider
        .extract_inner::<Option<String>>("log_dir")
        .ok()
        .flatten();
    crate::utils::logging::setup_logging(log_dir.as_deref());

    rocket::custom(cfg_provider)
        .attach(Db::init())
        .attach(fairings::db::migrations())
        .attach(fairings::fetcher::stage())
        .mount("/api/bookmarks", bookmark::routes())
        .mount("/api/bookmarks", batch::routes())
        .mount("/api/tags", tag::routes())
        .mount("/api/folders", folder::routes())
        .mount("/", misc::docs())
        .attach(AdHoc::config::<Config>())
}
