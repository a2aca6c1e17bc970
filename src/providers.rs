use std::sync::Arc;

use chat_api::provider_for_config;
use chat_provider::ChatProvider;
use chat_provider_mock::{MockProvider, MOCK_PROVIDER_ID};

use crate::config::CasabotConfig;

pub const PROVIDER_ENV_VAR: &str = "CASABOT_PROVIDER";

/// Picks the provider named by `CASABOT_PROVIDER`, or the config's active one.
pub fn provider_from_env(config: &CasabotConfig) -> Result<Arc<dyn ChatProvider>, String> {
    let provider_id = std::env::var(PROVIDER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    provider_for_id(config, provider_id.as_deref())
}

/// `mock` forces the offline provider; any other id names a configured provider.
pub fn provider_for_id(
    config: &CasabotConfig,
    provider_id: Option<&str>,
) -> Result<Arc<dyn ChatProvider>, String> {
    let selected = match provider_id {
        Some(MOCK_PROVIDER_ID) => return Ok(Arc::new(MockProvider::default())),
        Some(name) => config.provider_named(name),
        None => config.active_provider(),
    }
    .map_err(|error| error.to_string())?;

    provider_for_config(selected).map_err(|error| error.to_string())
}
