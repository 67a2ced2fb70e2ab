use std::time::Duration;

use rocket::{
    figment::Figment,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde", default)]
pub struct Config {
    /// Max URLs fetched at once by an import.
    pub import_concurrency: usize,
    /// Max bookmarks processed at once by a resync or a batch delete.
    pub resync_concurrency: usize,
    /// Per request timeout of the metadata fetcher, in seconds.
    pub fetch_timeout: u64,
    pub user_agent: String,
    /// Write a daily rolling log file into this directory as well.
    pub log_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_concurrency: 10,
            resync_concurrency: 4,
            fetch_timeout: 10,
            user_agent: format!("stashmark/{}", env!("CARGO_PKG_VERSION")),
            log_dir: None,
        }
    }
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

pub fn config_provider() -> Figment {
    use rocket::figment::providers::{Env, Serialized};

    rocket::figment::Figment::from(rocket::Config::default())
        .merge(Serialized::defaults(Config::default()))
        .merge(("databases.main", rocket_db_pools::Config::default()))
        .merge(Env::prefixed("SM_").global())
}

pub fn get_database_url() -> Result<String, rocket::figment::Error> {
    config_provider().extract_inner("databases.main.url")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: Config = config_provider().extract().unwrap();
        assert_eq!(config.import_concurrency, 10);
        assert_eq!(config.resync_concurrency, 4);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert!(config.user_agent.starts_with("stashmark/"));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let config: Config = config_provider()
            .merge(("import_concurrency", 3))
            .merge(("log_dir", "/tmp/stashmark"))
            .extract()
            .unwrap();
        assert_eq!(config.import_concurrency, 3);
        assert_eq!(config.resync_concurrency, 4);
        assert_eq!(config.log_dir.as_deref(), Some("/tmp/stashmark"));
    }
}
