//! TOML configuration: which source to ask and which channel to notify.

use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{Context, Result};
use serde::Deserialize;

use binday_core::rules::SourceProfile;
use binday_notify::Priority;

const FILE_NAME: &str = "binday.toml";
const TOKEN_ENV: &str = "BINDAY_PUSHOVER_API_TOKEN";

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    String::from("binday/0.1")
}

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    /// Raise the log level to debug.
    #[serde(default)]
    pub debug: bool,

    /// Upper bound for each HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent to council sites.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    pub provider: ProviderConfig,

    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum ProviderConfig {
    Salford {
        house_number: u32,
        postcode: String,
    },
    Corby {
        page_url: String,
        #[serde(default)]
        green_out_with_blue: bool,
    },
    Feed {
        id: String,
        name: Option<String>,
        url: String,
        profile: SourceProfile,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum NotifierConfig {
    #[default]
    Stdout,
    Pushover {
        #[serde(default)]
        api_token: String,
        users: Vec<String>,
        #[serde(default)]
        priority: Priority,
    },
}

impl Config {
    /// Parse a configuration document.
    pub(crate) fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Load the first configuration file found, then apply environment overrides.
    pub(crate) fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidates = candidate_paths();
                candidates
                    .iter()
                    .find(|candidate| candidate.is_file())
                    .cloned()
                    .with_context(|| {
                        let searched = candidates
                            .iter()
                            .map(|candidate| format!("  {}", candidate.display()))
                            .collect::<Vec<_>>()
                            .join("\n");
                        format!(
                            "No configuration file found. Searched:\n{searched}\n\n\
                             A minimal {FILE_NAME}:\n\n\
                             [provider]\n\
                             kind = \"salford\"\n\
                             house_number = 1\n\
                             postcode = \"M6 5FX\"\n"
                        )
                    })?
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        config.apply_env(|key| env::var(key).ok());
        config.validate()?;

        Ok((config, path))
    }

    /// Secrets may come from the environment instead of the file.
    pub(crate) fn apply_env<F: Fn(&str) -> Option<String>>(&mut self, lookup: F) {
        if let NotifierConfig::Pushover { api_token, .. } = &mut self.notifier
            && let Some(token) = lookup(TOKEN_ENV).filter(|token| !token.trim().is_empty())
        {
            *api_token = token;
        }
    }

    /// Reject settings that can only fail at dispatch time.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if let NotifierConfig::Pushover {
            api_token, users, ..
        } = &self.notifier
        {
            if api_token.trim().is_empty() {
                anyhow::bail!("Pushover notifier needs api_token (or {TOKEN_ENV})");
            }
            if users.is_empty() {
                anyhow::bail!("Pushover notifier needs at least one user key");
            }
        }
        if let ProviderConfig::Feed { profile, .. } = &self.provider
            && profile.rules.rules.is_empty()
        {
            anyhow::bail!("Feed provider profile has an empty rule table");
        }
        Ok(())
    }
}

/// Search order when no path is given.
fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("binday").join(FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/binday").join(FILE_NAME));
    paths
}
