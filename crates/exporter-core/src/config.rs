//! Credentials configuration.
//!
//! The file is INI by default:
//!
//! ```ini
//! [gitlab]
//! token = glpat-xxxx
//! url = https://gitlab.fit.cvut.cz
//!
//! [github]
//! token = ghp_xxxx
//! ```
//!
//! Any key can be overridden from the environment, e.g. `EXPORTER_GITHUB__TOKEN`.

use crate::error::ConfigError;
use crate::github::{DEFAULT_GITHUB_API_URL, DEFAULT_GITHUB_WEB_URL};
use crate::gitlab::DEFAULT_GITLAB_URL;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct RawSection {
    token: Option<String>,
    url: Option<String>,
    api_url: Option<String>,
    web_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    gitlab: Option<RawSection>,
    github: Option<RawSection>,
}

/// GitLab connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitLabConfig {
    pub token: String,
    pub url: String,
}

/// GitHub connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub token: String,
    pub api_url: String,
    pub web_url: String,
}

/// Validated exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    pub gitlab: GitLabConfig,
    pub github: GitHubConfig,
}

impl ExporterConfig {
    /// Load from `path`, with environment overrides.
    ///
    /// The format follows the file extension; anything else is read as INI.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Invalid(format!(
                "Configuration file '{}' does not exist",
                path.display()
            )));
        }
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            Some("yaml" | "yml") => FileFormat::Yaml,
            _ => FileFormat::Ini,
        };

        let raw: RawConfig = Config::builder()
            .add_source(File::from(path).format(format))
            .add_source(
                Environment::with_prefix("EXPORTER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    /// Parse INI text, without environment overrides.
    pub fn from_ini(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = Config::builder()
            .add_source(File::from_str(text, FileFormat::Ini))
            .build()?
            .try_deserialize()?;
        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> Result<Self, ConfigError> {
        let (gitlab, github) = match (raw.gitlab, raw.github) {
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "No section: 'github' and 'gitlab'".into(),
                ))
            }
            (None, Some(_)) => return Err(ConfigError::Invalid("No section: 'gitlab'".into())),
            (Some(_), None) => return Err(ConfigError::Invalid("No section: 'github'".into())),
            (Some(gitlab), Some(github)) => (gitlab, github),
        };

        let gitlab_token = non_empty(gitlab.token)
            .ok_or_else(|| ConfigError::Invalid("No 'token' in section 'gitlab'".into()))?;
        let github_token = non_empty(github.token)
            .ok_or_else(|| ConfigError::Invalid("No 'token' in section 'github'".into()))?;

        Ok(Self {
            gitlab: GitLabConfig {
                token: gitlab_token,
                url: non_empty(gitlab.url).unwrap_or_else(|| DEFAULT_GITLAB_URL.to_string()),
            },
            github: GitHubConfig {
                token: github_token,
                api_url: non_empty(github.api_url)
                    .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
                web_url: non_empty(github.web_url)
                    .unwrap_or_else(|| DEFAULT_GITHUB_WEB_URL.to_string()),
            },
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
