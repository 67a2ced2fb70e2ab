use anyhow::Context;

use stashmark_api::db::{connection, user};

#[tokio::main(flavor = "current_thread")]
#[cfg(not(tarpaulin_include))]
async fn main() -> anyhow::Result<()> {
    stashmark_api::utils::logging::setup_console_log();

    let username = std::env::args()
        .nth(1)
        .context("usage: adduser <username>")?;

    let url = stashmark_api::api::configs::get_database_url()
        .context("database url is not configured, set SM_DATABASES")?;
    connection::run_migrations(&url).await?;

    let mut conn = connection::establish_with(&url).await?;
    let created = user::create_user(&mut conn, username.trim())
        .await
        .with_context(|| format!("failed to create user {username:?}"))?;

    tracing::info!(id = created.id, username = %created.username, "user created");
    println!("{}", created.api_key);
    Ok(())
}
