use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::Error;

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub inline: InlineConfig,
    pub links: LinksConfig,
    pub extract: ExtractConfig,
}

/// Which inline decorations are recognized. Disabled rules leave their
/// characters as plain text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InlineConfig {
    pub mentions: bool,
    pub hashtags: bool,
    pub numbers: bool,
}

impl Default for InlineConfig {
    fn default() -> Self {
        Self {
            mentions: true,
            hashtags: true,
            numbers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub new_tab: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self { new_tab: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Section titles the extractor looks for, as they would be written.
    pub sections: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            sections: [
                "Suggestions",
                "Recommendations",
                "Action Items",
                "Metrics",
                "Insights",
                "Next Steps",
                "Summary",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Config {
    /// The configuration embedded at build time.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            tracing::error!(error = %e, "embedded default config is invalid");
            Self::default()
        })
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::compiled_default());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
