//! Supabase store configuration.

use cidadania_core::{CoreError, ProvidersConfig};
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use url::Url;

/// Provider name used in config file
pub const PROVIDER_NAME: &str = "supabase";

/// Supabase-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Public anonymous key; row-level policies decide what it can read
    #[serde(default)]
    pub anon_key: String,
    /// Request timeout. Absent means the transport default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl SupabaseConfig {
    /// Extract Supabase config from the dynamic providers config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed.
    pub fn from_providers(providers: &ProvidersConfig) -> Result<Option<Self>, CoreError> {
        providers.get(PROVIDER_NAME)
    }

    /// Validate that required fields are present and the URL parses.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigMissingField`] naming every empty field, or
    /// [`CoreError::ConfigInvalid`] for a malformed URL.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push(concatcp!("providers.", PROVIDER_NAME, ".url"));
        }
        if self.anon_key.trim().is_empty() {
            missing.push(concatcp!("providers.", PROVIDER_NAME, ".anon_key"));
        }
        if !missing.is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: missing.join(", "),
            });
        }

        self.project_url()?;
        Ok(())
    }

    /// Parsed project URL
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] if `url` is not a usable base URL.
    pub fn project_url(&self) -> Result<Url, CoreError> {
        let url = Url::parse(self.url.trim()).map_err(|e| CoreError::ConfigInvalid {
            message: format!("providers.{PROVIDER_NAME}.url: {e}"),
        })?;
        if url.cannot_be_a_base() {
            return Err(CoreError::ConfigInvalid {
                message: format!("providers.{PROVIDER_NAME}.url: not a base URL"),
            });
        }
        Ok(url)
    }
}

/// Config template for the Supabase store.
/// This is appended to the base config template when creating a new config file.
pub const CONFIG_TEMPLATE: &str = concatcp!(
    "[providers.",
    PROVIDER_NAME,
    r#"]
# Project URL and public anon key from the project's API settings
url = ""
anon_key = ""
# Optional request timeout in seconds
# timeout_secs = 30

"#
);
