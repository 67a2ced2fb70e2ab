use super::errors::Error;
use super::fairings::db::Db;
use super::guards;
use crate::db::tag;

use rocket::serde::json::Json;
use rocket_db_pools::Connection;
use stashmark_types::{CreateTag, Tag};

/// Search tags
#[utoipa::path(
    get,
    path = "/api/tags/",
    params(
        ("q" = inline(Option<&str>), Query, description = "Part of the tag name"),
        ("before" = inline(Option<i32>), Query, description = "The tag id to search before"),
        ("limit" = inline(Option<i64>), Query, description = "The limit of search results, 1 to 100, 10 by default")
    ),
    responses(
        (status = 200, description = "Tags searched success", body = Vec<Tag>)
    ),
    security(
        ("api_key" = [])
    )
)]
#[get("/?<q>&<before>&<limit>")]
pub async fn search_tags(
    mut db: Connection<Db>,
    auth: guards::Auth,
    q: Option<&str>,
    before: Option<i32>,
    limit: Option<i64>,
) -> Result<Json<Vec<Tag>>, Error> {
    let tags = tag::search_tags(
        &mut db,
        auth.user_id,
        q,
        before.unwrap_or_default(),
        super::page_limit(limit),
    )
    .await?;
    Ok(Json(tags.into_iter().map(Into::into).collect()))
}

/// Create a tag
#[utoipa::path(
    post,
    path = "/api/tags/",
    request_body = CreateTag,
    responses(
        (status = 200, description = "Tag created success", body = Tag),
        (status = 400, description = "Empty or duplicated tag name")
    ),
    security(
        ("api_key" = [])
    )
)]
#[post("/", format = "application/json", data = "<payload>")]
pub async fn create_tag(
    mut db: Connection<Db>,
    auth: guards::Auth,
    payload: Json<CreateTag>,
) -> Result<Json<Tag>, Error> {
    let name = payload.into_inner().name;
    if name.trim().is_empty() {
        return Err(Error::BadRequest("Tag name is empty".to_string()));
    }
    Ok(Json(tag::create_tag(&mut db, auth.user_id, &name).await?.into()))
}

/// Delete a tag, bookmarks lose it
#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(
        ("id" = inline(i32), Path, description = "The tag id to be deleted")
    ),
    responses(
        (status = 200, description = "Tag deleted success"),
        (status = 404, description = "Tag not found")
    ),
    security(
        ("api_key" = [])
    )
)]
#[delete("/<id>")]
pub async fn delete_tag(
    mut db: Connection<Db>,
    auth: guards::Auth,
    id: i32,
) -> Result<&'static str, Error> {
    match tag::delete_tag(&mut db, auth.user_id, id).await? {
        0 => Err(Error::NotFound("Tag not found".to_string())),
        _ => Ok("Deleted"),
    }
}

pub fn routes() -> Vec<rocket::Route> {
    routes![search_tags, create_tag, delete_tag]
}

pub(crate) mod misc {
    use super::*;
    use crate::api::SecurityAddon;

    use utoipa::OpenApi;

    #[derive(OpenApi)]
    #[openapi(
        info(title = "Tags API", description = "Tags API", version = "1.0"),
        paths(search_tags, create_tag, delete_tag),
        components(schemas(CreateTag, Tag)),
        modifiers(&SecurityAddon)
    )]
    pub struct ApiDoc;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::test::{auth_header, test_async_client};
    use crate::db::{connection, user};
    use crate::utils::rand::rand_str;

    use rocket::http::Status;

    #[rocket::async_test]
    #[ignore = "requires postgres"]
    async fn tags_are_per_user() {
        let mut conn = connection::establish().await.unwrap();
        let u = user::test::create_rand_user(&mut conn).await;
        let other = user::test::create_rand_user(&mut conn).await;
        let client = test_async_client(routes()).await;
        let name = rand_str(8);

        let res = client
            .post(uri!(create_tag))
            .header(auth_header(&u.api_key))
            .json(&CreateTag { name: name.clone() })
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
        let created: Tag = res.into_json().await.unwrap();

        // duplicate for the same user
        let res = client
            .post(uri!(create_tag))
            .header(auth_header(&u.api_key))
            .json(&CreateTag { name: name.clone() })
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::BadRequest);

        let res = client
            .get(uri!(search_tags(q = Some(&name[2..6]), before = _, limit = _)))
            .header(auth_header(&other.api_key))
            .dispatch()
            .await;
        let found: Vec<Tag> = res.into_json().await.unwrap();
        assert!(found.is_empty());

        let res = client
            .get(uri!(search_tags(q = Some(&name[2..6]), before = _, limit = _)))
            .header(auth_header(&u.api_key))
            .dispatch()
            .await;
        let found: Vec<Tag> = res.into_json().await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);

        let res = client
            .delete(uri!(delete_tag(created.id)))
            .header(auth_header(&other.api_key))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::NotFound);
        let res = client
            .delete(uri!(delete_tag(created.id)))
            .header(auth_header(&u.api_key))
            .dispatch()
            .await;
        assert_eq!(res.status(), Status::Ok);
    }
}
