use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_db_pools::Connection;
use tracing::warn;

use crate::api::errors::Error;
use crate::api::fairings::db::Db;
use crate::db::user::User;

/// The user owning the API key sent in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Auth {
    pub user_id: i32,
}

/// Accepts both a bare key and `Bearer <key>`.
fn api_key_from_header(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value).trim()
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Auth {
    type Error = Error;

    async fn from_request(request: &'r rocket::Request<'_>) -> Outcome<Self, Self::Error> {
        let key = match request.headers().get_one("Authorization").map(api_key_from_header) {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Outcome::Error((
                    Status::Unauthorized,
                    Error::MissingAPIKey("Missing API Key".to_string()),
                ))
            }
        };

        let mut db = match request.guard::<Connection<Db>>().await {
            Outcome::Success(db) => db,
            _ => {
                return Outcome::Error((
                    Status::ServiceUnavailable,
                    Error::ServiceUnavailable("Database unavailable".to_string()),
                ))
            }
        };

        match User::get_by_api_key(&mut db, key).await {
            Ok(Some(user)) => Outcome::Success(Auth { user_id: user.id }),
            Ok(None) => Outcome::Error((
                Status::Forbidden,
                Error::InvalidAPIKey("Invalid API Key".to_string()),
            )),
            Err(e) => {
                warn!(error = %e, "failed to look up api key");
                Outcome::Error((
                    Status::ServiceUnavailable,
                    Error::ServiceUnavailable("Database unavailable".to_string()),
                ))
            }
        }
    }
}
