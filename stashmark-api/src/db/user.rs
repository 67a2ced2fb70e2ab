use diesel::prelude::*;
use diesel_async::{AsyncPgConnection as Connection, RunQueryDsl};

use stashmark_types::schema::users;

use crate::utils::{rand, DatabaseError};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub api_key: String,
    pub created_at: time::OffsetDateTime,
    pub updated_at: time::OffsetDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub api_key: &'a str,
}

impl User {
    pub async fn get_by_api_key(
        conn: &mut Connection,
        key: &str,
    ) -> Result<Option<User>, DatabaseError> {
        Ok(users::table
            .filter(users::api_key.eq(key))
            .select(User::as_select())
            .first(conn)
            .await
            .optional()?)
    }
}

/// Creates a user with a freshly generated API key.
pub async fn create_user(conn: &mut Connection, username: &str) -> Result<User, DatabaseError> {
    let key = rand::api_key();
    Ok(diesel::insert_into(users::table)
        .values(&NewUser {
            username,
            api_key: &key,
        })
        .returning(User::as_returning())
        .get_result(conn)
        .await?)
}
