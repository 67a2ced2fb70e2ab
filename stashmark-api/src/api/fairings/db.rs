use diesel_async::{
    pooled_connection::{
        deadpool::{BuildError, Object, Pool, PoolError},
        AsyncDieselConnectionManager,
    },
    AsyncPgConnection,
};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket_db_pools::{Database, Error};
use tracing::{error, info};

use crate::db::connection;

pub type InitError = BuildError;
pub type GetError = PoolError;
pub type Connection = AsyncPgConnection;

#[derive(Clone)]
pub struct DBPool(Pool<Connection>);

#[rocket::async_trait]
impl rocket_db_pools::Pool for DBPool {
    type Connection = Object<Connection>;

    type Error = Error<InitError, GetError>;

    async fn init(figment: &Figment) -> Result<Self, Self::Error> {
        let config = figment
            .extract::<rocket_db_pools::Config>()
            .map_err(Error::Config)?;
        let manager = AsyncDieselConnectionManager::<Connection>::new(config.url);
        Pool::builder(manager)
            .max_size(config.max_connections)
            .build()
            .map(Self)
            .map_err(Error::Init)
    }

    async fn get(&self) -> Result<Self::Connection, Self::Error> {
        let mut conn = self.0.get().await.map_err(Error::Get)?;
        connection::instrument(&mut conn);
        Ok(conn)
    }

    async fn close(&self) {
        self.0.close()
    }
}

#[derive(Database)]
#[database("main")]
pub struct Db(DBPool);

/// Applies pending migrations before the server starts, aborting launch on failure.
pub fn migrations() -> AdHoc {
    AdHoc::try_on_ignite("Database migrations", |rocket| async {
        let url = match rocket
            .figment()
            .extract_inner::<String>("databases.main.url")
        {
            Ok(url) => url,
            Err(e) => {
                error!(error = %e, "database url is not configured");
                return Err(rocket);
            }
        };

        match connection::run_migrations(&url).await {
            Ok(()) => {
                info!("database is up to date");
                Ok(rocket)
            }
            Err(e) => {
                error!(error = ?e, "failed to migrate database");
                Err(rocket)
            }
        }
    })
}
