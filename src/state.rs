//! Shared application state for the HTTP handlers.

use std::sync::Arc;

use log::{info, warn};

use crate::config::{ApiTokens, TwitterConfig};
use crate::twitter::TwitterClient;

#[derive(Clone, Debug, Default)]
pub struct AppState {
    /// Posting client; `None` when no Twitter credentials are configured
    pub twitter: Option<Arc<TwitterClient>>,
    /// Tokens accepted by the authenticated endpoints
    pub api_tokens: Arc<ApiTokens>,
}

impl AppState {
    pub fn new(twitter: Option<Arc<TwitterClient>>, api_tokens: ApiTokens) -> Self {
        Self {
            twitter,
            api_tokens: Arc::new(api_tokens),
        }
    }

    /// Builds the state from environment variables.
    ///
    /// Missing or invalid Twitter configuration disables posting instead of
    /// failing startup.
    pub fn from_env() -> Self {
        let twitter = match TwitterConfig::from_env() {
            Ok(config) => match TwitterClient::from_config(&config) {
                Ok(client) => {
                    info!("Twitter client configured");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    warn!("Failed to create Twitter client, posting is disabled: {}", e);
                    None
                }
            },
            Err(e) => {
                warn!("Twitter is not configured, posting is disabled: {}", e);
                None
            }
        };

        Self::new(twitter, ApiTokens::from_env())
    }
}
