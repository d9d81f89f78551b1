//! Configuration management for OpenTool
//!
//! Loads configuration with priority:
//! 1. Explicitly specified config file
//! 2. opentool.toml in the current directory or one of its parents
//! 3. Defaults
//!
//! String values of the form `${VAR_NAME}` are replaced by the value of the
//! environment variable on load.

use crate::auth::Credentials;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "opentool.toml";

/// OpenTool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenToolConfig {
    #[serde(default)]
    pub spec: SpecSource,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Where the interface document comes from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecSource {
    pub path: Option<String>,
    pub url: Option<String>,
}

/// Catalog generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Overrides the servers declared by the document
    pub base_url: Option<String>,

    /// Only operations sharing one of these tags become tools
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub pretty: bool,

    pub version: Option<String>,

    /// Require explicit confirmation before PUT/POST/PATCH/DELETE calls
    #[serde(default)]
    pub confirm_destructive: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Credentials in the configuration file (may reference env vars)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub basic_auth: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            tags: Vec::new(),
            pretty: false,
            version: None,
            confirm_destructive: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl OpenToolConfig {
    /// Load configuration, falling back to defaults when no file is found
    pub fn load() -> Result<Self> {
        match Self::find_config_file() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE_NAME);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading configuration from: {:?}", path);

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::from_toml(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let mut config: OpenToolConfig = toml::from_str(contents)?;
        config.resolve_env_vars()?;
        Ok(config)
    }

    /// Find opentool.toml by searching current directory and parents
    fn find_config_file() -> Option<PathBuf> {
        let mut current = env::current_dir().ok()?;

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Some(config_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Resolve ${VAR_NAME} references to environment variables
    fn resolve_env_vars(&mut self) -> Result<()> {
        for value in [
            &mut self.spec.path,
            &mut self.spec.url,
            &mut self.generation.base_url,
            &mut self.credentials.api_key,
            &mut self.credentials.bearer_token,
            &mut self.credentials.basic_auth,
        ] {
            if let Some(raw) = value.take() {
                let resolved = Self::resolve_env_var(&raw).ok_or_else(|| {
                    anyhow!("Environment variable referenced by '{}' is not set", raw)
                })?;
                *value = Some(resolved);
            }
        }

        Ok(())
    }

    /// Resolve a single ${VAR_NAME} reference
    fn resolve_env_var(value: &str) -> Option<String> {
        if value.starts_with("${") && value.ends_with('}') {
            let var_name = &value[2..value.len() - 1];
            env::var(var_name).ok()
        } else {
            Some(value.to_string())
        }
    }

    /// Credentials from the file, completed from the environment
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.credentials.api_key.clone(),
            bearer_token: self.credentials.bearer_token.clone(),
            basic_auth: self.credentials.basic_auth.clone(),
        }
        .or(Credentials::from_env())
    }
}

fn default_timeout_secs() -> u64 {
    30
}
