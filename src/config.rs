//! Environment-derived runtime settings.

use log::warn;

pub const DEFAULT_VISION_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CARD_API_BASE_URL: &str = "https://api.pokemontcg.io/v2";
pub const DEFAULT_PORT: u16 = 8000;

/// Runtime settings, read once at startup and handed to the components
#[derive(Debug, Clone)]
pub struct Settings {
    /// Vision model credential; identification is unavailable without it
    pub openai_api_key: Option<String>,
    /// Vision endpoint override (tests, proxies)
    pub vision_base_url: String,
    /// Optional card database credential, sent as X-Api-Key
    pub card_api_key: Option<String>,
    /// Card database endpoint override
    pub card_api_base_url: String,
    /// HTTP port for the web shell
    pub port: u16,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        if openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set, card identification will be unavailable");
        }

        Settings {
            openai_api_key,
            vision_base_url: non_empty_var("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_VISION_BASE_URL.to_string()),
            card_api_key: non_empty_var("POKEMON_TCG_API_KEY"),
            card_api_base_url: non_empty_var("CARD_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CARD_API_BASE_URL.to_string()),
            port: non_empty_var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }
}

/// Treat unset and empty environment variables the same way.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_var_filters_empty_values() {
        std::env::set_var("CARD_PRICE_CHECK_TEST_EMPTY", "");
        std::env::set_var("CARD_PRICE_CHECK_TEST_SET", "value");

        assert_eq!(non_empty_var("CARD_PRICE_CHECK_TEST_EMPTY"), None);
        assert_eq!(non_empty_var("CARD_PRICE_CHECK_TEST_MISSING"), None);
        assert_eq!(
            non_empty_var("CARD_PRICE_CHECK_TEST_SET"),
            Some("value".to_string())
        );
    }
}
