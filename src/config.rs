use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use teardown::{AuthMode, CategoryKind, Endpoints, OAuthClient, RetryPolicy};

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("edgesweep"))
}

/// Default config file path
pub fn default_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

// ============================================================================
// Config
// ============================================================================

/// edgesweep configuration (~/.config/edgesweep/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthConfig,
    pub endpoints: Endpoints,
    /// Category key -> names that are never touched
    pub exclusions: BTreeMap<String, Vec<String>>,
    pub retry: RetryConfig,
    pub extensions: ExtensionsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    pub client_id: String,
    pub client_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let client = OAuthClient::default();
        Self {
            mode: AuthMode::default(),
            client_id: client.client_id,
            client_secret: client.client_secret,
        }
    }
}

impl AuthConfig {
    pub fn oauth_client(&self) -> OAuthClient {
        OAuthClient {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        }
    }
}

/// Retry settings for listing reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.backoff_factor,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Used when the organization's environments cannot be listed
    pub environments: Vec<String>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            environments: vec!["test".to_string(), "prod".to_string()],
        }
    }
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_path()?,
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("endpoints.management", &self.endpoints.management),
            ("endpoints.token", &self.endpoints.token),
            ("endpoints.portal_api", &self.endpoints.portal_api),
        ] {
            if url.trim().is_empty() {
                bail!("{name} must not be empty");
            }
        }

        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.retry.backoff_factor < 1.0 {
            bail!("retry.backoff_factor must be at least 1.0");
        }

        self.exclusion_map()?;
        Ok(())
    }

    /// Exclusions keyed by category.
    pub fn exclusion_map(&self) -> Result<HashMap<CategoryKind, Vec<String>>> {
        let mut map: HashMap<CategoryKind, Vec<String>> = HashMap::new();
        for (key, names) in &self.exclusions {
            let kind: CategoryKind = key
                .parse()
                .map_err(|e| anyhow::anyhow!("exclusions: {e}"))?;
            map.entry(kind).or_default().extend(names.iter().cloned());
        }
        Ok(map)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.auth.mode, AuthMode::OAuth);
        assert_eq!(config.auth.client_id, "edgecli");
        assert_eq!(config.extensions.environments, vec!["test", "prod"]);
        assert_eq!(config.retry.policy().max_attempts, 1);
    }

    #[test]
    fn test_load_full_config() {
        let file = write_config(
            r#"
[auth]
mode = "basic"

[endpoints]
management = "http://localhost:8080/v1"

[exclusions]
proxies = ["internal-health"]
products = ["partner-gold"]

[retry]
max_attempts = 4
base_delay_ms = 250

[extensions]
environments = ["dev"]
"#,
        );

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.auth.mode, AuthMode::Basic);
        assert_eq!(config.auth.client_secret, "edgeclisecret");
        assert_eq!(config.endpoints.management, "http://localhost:8080/v1");
        assert_eq!(config.endpoints.token, Endpoints::default().token);
        assert_eq!(config.extensions.environments, vec!["dev"]);

        let policy = config.retry.policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));

        let exclusions = config.exclusion_map().unwrap();
        assert_eq!(exclusions[&CategoryKind::ApiProxy], vec!["internal-health"]);
        assert_eq!(exclusions[&CategoryKind::ApiProduct], vec!["partner-gold"]);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let file = write_config("[retry]\nmax_attempts = 0\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("max_attempts"));
    }

    #[test]
    fn test_rejects_empty_endpoint() {
        let file = write_config("[endpoints]\ntoken = \"  \"\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(format!("{err:#}").contains("endpoints.token"));
    }

    #[test]
    fn test_rejects_unknown_exclusion_category() {
        let file = write_config("[exclusions]\ndatabases = [\"x\"]\n");
        assert!(Config::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[auth\nmode = ");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("[endpoints]"));
        assert!(text.contains("mode = \"oauth\""));
    }
}
