use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CidadaniaConfig {
    #[serde(default)]
    pub station: StationConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Store provider tables, keyed by provider name (e.g. `[providers.supabase]`)
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_station_name")]
    pub name: String,
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default = "default_stream_url")]
    pub stream_url: String,
    /// Origin prepended to article paths when building share links
    #[serde(default = "default_site_origin")]
    pub site_origin: String,
    /// Suffix appended to article titles in share text
    #[serde(default = "default_share_tagline")]
    pub share_tagline: String,
}

fn default_station_name() -> String {
    "Cidadania FM".to_string()
}

fn default_frequency() -> String {
    "FM 87.9".to_string()
}

fn default_stream_url() -> String {
    "http://play.radios.com.br/11331".to_string()
}

fn default_site_origin() -> String {
    "https://cidadaniafm.com.br".to_string()
}

fn default_share_tagline() -> String {
    "Blog Cidadania FM".to_string()
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            name: default_station_name(),
            frequency: default_frequency(),
            stream_url: default_stream_url(),
            site_origin: default_site_origin(),
            share_tagline: default_share_tagline(),
        }
    }
}

impl StationConfig {
    /// Parsed live stream URL
    ///
    /// # Errors
    ///
    /// Returns an error if `stream_url` is not a valid URL.
    pub fn stream_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.stream_url)?)
    }

    /// Parsed site origin
    ///
    /// # Errors
    ///
    /// Returns an error if `site_origin` is not a valid URL.
    pub fn site_origin(&self) -> Result<Url> {
        Ok(Url::parse(&self.site_origin)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
    /// External decoder fed with the raw stream on stdin, e.g. `["ffplay", "-nodisp", "-"]`
    #[serde(default)]
    pub decoder_command: Vec<String>,
}

const fn default_initial_volume() -> u8 {
    70
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_volume: default_initial_volume(),
            decoder_command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Dynamic provider configuration tables.
///
/// Each provider crate owns the shape of its own table and extracts it
/// with [`ProvidersConfig::get`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProvidersConfig(toml::Table);

impl ProvidersConfig {
    /// Deserialize the table for `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the table exists but does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.0
            .get(name)
            .map(|value| {
                value
                    .clone()
                    .try_into()
                    .map_err(|e: toml::de::Error| CoreError::ConfigInvalid {
                        message: format!("providers.{name}: {e}"),
                    })
            })
            .transpose()
    }

    /// Check whether a provider table exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl CidadaniaConfig {
    /// Get the configuration directory path (~/.config/cidadania/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/cidadania/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path or create a template on first run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read, parsed, or validated.
    pub fn load_or_create(provider_templates: Option<&[&str]>) -> Result<Self> {
        Self::load_or_create_at(&Self::config_path(), provider_templates)
    }

    /// Load config from `path` or create a template there on first run.
    ///
    /// # Errors
    ///
    /// See [`CidadaniaConfig::load_or_create`].
    pub fn load_or_create_at(path: &Path, provider_templates: Option<&[&str]>) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, build_config_template(provider_templates))?;

            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate values that serde cannot check on its own
    ///
    /// # Errors
    ///
    /// Returns the first invalid field found.
    pub fn validate(&self) -> Result<()> {
        if self.player.initial_volume > 100 {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "player.initial_volume must be between 0 and 100, got {}",
                    self.player.initial_volume
                ),
            });
        }

        self.station
            .stream_url()
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("station.stream_url: {e}"),
            })?;
        self.station
            .site_origin()
            .map_err(|e| CoreError::ConfigInvalid {
                message: format!("station.site_origin: {e}"),
            })?;

        Ok(())
    }
}

/// Build the full config template, appending provider fragments
#[must_use]
pub fn build_config_template(provider_templates: Option<&[&str]>) -> String {
    let mut template = String::from(BASE_CONFIG_TEMPLATE);
    if let Some(fragments) = provider_templates {
        for fragment in fragments {
            template.push_str(fragment);
        }
    }
    template
}

const BASE_CONFIG_TEMPLATE: &str = r#"# Cidadania Configuration
# ~/.config/cidadania/config.toml

[station]
name = "Cidadania FM"
frequency = "FM 87.9"
stream_url = "http://play.radios.com.br/11331"
# Origin used when building share links for news articles
site_origin = "https://cidadaniafm.com.br"
share_tagline = "Blog Cidadania FM"

[player]
# 0-100
initial_volume = 70
# Optional external decoder that reads the raw stream from stdin
# decoder_command = ["ffplay", "-nodisp", "-loglevel", "quiet", "-"]

[logging]
# Also write logs to ~/.config/cidadania/cidadania.log
enabled = false

"#;
