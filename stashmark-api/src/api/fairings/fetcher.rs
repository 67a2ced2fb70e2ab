use rocket::fairing::AdHoc;
use tracing::{error, info};

use crate::api::configs::Config;
use crate::pipeline::{HttpFetcher, MetadataFetcher};

/// Managed state shared by every batch request.
pub type Fetcher = Box<dyn MetadataFetcher>;

pub fn stage() -> AdHoc {
    AdHoc::try_on_ignite("Metadata fetcher", |rocket| async {
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "invalid configuration");
                return Err(rocket);
            }
        };

        match HttpFetcher::new(config.fetch_timeout(), &config.user_agent) {
            Ok(fetcher) => {
                info!(
                    timeout = config.fetch_timeout,
                    user_agent = %config.user_agent,
                    "metadata fetcher ready"
                );
                Ok(rocket.manage(Box::new(fetcher) as Fetcher))
            }
            Err(e) => {
                error!(error = %e, "failed to build http client");
                Err(rocket)
            }
        }
    })
}
