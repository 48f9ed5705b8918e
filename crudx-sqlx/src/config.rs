//! Data source configuration and pool construction.
//!
//! Resolution order (lowest to highest priority):
//! 1. `application.yaml` (base), `datasource` section
//! 2. `application-{profile}.yaml` (profile override, merged key by key)
//! 3. `.env` / `.env.{profile}` files (loaded into process environment)
//! 4. Environment variables (`DATASOURCE_URL`, `DATASOURCE_READER_URL`, ...)
//!
//! `.env` files never overwrite already-set environment variables.
//!
//! ```yaml
//! datasource:
//!   url: "postgres://app@primary/app"
//!   reader_url: "postgres://app@replica/app"
//!   max_connections: 20
//!   composite_keys: or-chain
//! ```

use crudx_data::{CompositeKeyStrategy, CrudError, CrudResult, IdentifierPolicy};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use sqlx::pool::PoolOptions;
use sqlx::{Database, Pool};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SECTION: &str = "datasource";
const PROFILE_ENV: &str = "CRUDX_PROFILE";
const DEFAULT_PROFILE: &str = "dev";

#[derive(Clone, Copy)]
enum EnvKind {
    Text,
    Number,
    Flag,
}

const ENV_OVERRIDES: &[(&str, &str, EnvKind)] = &[
    ("DATASOURCE_URL", "url", EnvKind::Text),
    ("DATASOURCE_READER_URL", "reader_url", EnvKind::Text),
    ("DATASOURCE_MAX_CONNECTIONS", "max_connections", EnvKind::Number),
    ("DATASOURCE_MIN_CONNECTIONS", "min_connections", EnvKind::Number),
    ("DATASOURCE_ACQUIRE_TIMEOUT_SECS", "acquire_timeout_secs", EnvKind::Number),
    ("DATASOURCE_COMPOSITE_KEYS", "composite_keys", EnvKind::Text),
    ("DATASOURCE_QUOTE_IDENTIFIERS", "quote_identifiers", EnvKind::Flag),
];

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_quote_identifiers() -> bool {
    true
}

/// Connection settings for the writer pool and an optional read replica.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceConfig {
    pub url: String,
    #[serde(default)]
    pub reader_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub composite_keys: CompositeKeyStrategy,
    #[serde(default = "default_quote_identifiers")]
    pub quote_identifiers: bool,
}

/// Pools built from a [`DataSourceConfig`], plus the statement options a
/// `CrudClient` should use with them.
#[derive(Debug)]
pub struct DataSourcePools<DB: Database> {
    pub reader: Pool<DB>,
    pub writer: Pool<DB>,
    pub composite_keys: CompositeKeyStrategy,
    pub identifier_policy: IdentifierPolicy,
}

impl<DB: Database> Clone for DataSourcePools<DB> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            writer: self.writer.clone(),
            composite_keys: self.composite_keys,
            identifier_policy: self.identifier_policy,
        }
    }
}

impl DataSourceConfig {
    /// Parse the `datasource` section of a YAML document. Environment is not consulted.
    pub fn from_yaml_str(yaml: &str) -> CrudResult<Self> {
        let root = parse_yaml(yaml)?;
        Self::from_section(section(&root))
    }

    /// Load `application.yaml`, the profile overlay, `.env` files and
    /// environment overrides from `dir`.
    ///
    /// Profile is determined by: `CRUDX_PROFILE` env var > argument > `"dev"`.
    pub fn load(dir: impl AsRef<Path>, profile: Option<&str>) -> CrudResult<Self> {
        let dir = dir.as_ref();
        let profile = resolve_profile(profile);

        let mut root = Value::Mapping(Mapping::new());
        for file in ["application.yaml".to_string(), format!("application-{profile}.yaml")] {
            let path = dir.join(&file);
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| CrudError::Config(format!("{}: {e}", path.display())))?;
                merge_yaml(&mut root, parse_yaml(&content)?);
                debug!(file = %path.display(), "loaded data source config");
            }
        }

        for file in [".env".to_string(), format!(".env.{profile}")] {
            let path = dir.join(file);
            if path.exists() {
                dotenvy::from_path(&path)
                    .map_err(|e| CrudError::Config(format!("{}: {e}", path.display())))?;
            }
        }

        let mut section = section(&root);
        apply_env_overrides(&mut section)?;
        let config = Self::from_section(section)?;
        info!(profile = %profile, replica = config.reader_url.is_some(), "data source configured");
        Ok(config)
    }

    fn from_section(section: Value) -> CrudResult<Self> {
        let config: Self = serde_yaml::from_value(section)
            .map_err(|e| CrudError::Config(format!("{SECTION}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CrudResult<()> {
        if self.url.trim().is_empty() {
            return Err(CrudError::Config(format!("{SECTION}.url must not be empty")));
        }
        if self.max_connections == 0 {
            return Err(CrudError::Config(format!(
                "{SECTION}.max_connections must be at least 1"
            )));
        }
        if self.min_connections > self.max_connections {
            return Err(CrudError::Config(format!(
                "{SECTION}.min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    pub fn identifier_policy(&self) -> IdentifierPolicy {
        if self.quote_identifiers {
            IdentifierPolicy::Quote
        } else {
            IdentifierPolicy::Validate
        }
    }

    fn pool_options<DB: Database>(&self) -> PoolOptions<DB> {
        PoolOptions::<DB>::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
    }

    /// Connect the writer pool and, when `reader_url` is set, a separate reader pool.
    pub async fn connect<DB: Database>(&self) -> CrudResult<DataSourcePools<DB>> {
        let writer = self.pool_options::<DB>().connect(&self.url).await?;
        let reader = match &self.reader_url {
            Some(url) => self.pool_options::<DB>().connect(url).await?,
            None => writer.clone(),
        };
        info!(
            backend = DB::NAME,
            max_connections = self.max_connections,
            replica = self.reader_url.is_some(),
            "data source pools ready"
        );
        Ok(DataSourcePools {
            reader,
            writer,
            composite_keys: self.composite_keys,
            identifier_policy: self.identifier_policy(),
        })
    }
}

pub fn resolve_profile(profile: Option<&str>) -> String {
    std::env::var(PROFILE_ENV)
        .ok()
        .or_else(|| profile.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

fn parse_yaml(content: &str) -> CrudResult<Value> {
    serde_yaml::from_str(content).map_err(|e| CrudError::Config(e.to_string()))
}

fn section(root: &Value) -> Value {
    root.get(SECTION)
        .cloned()
        .unwrap_or_else(|| Value::Mapping(Mapping::new()))
}

/// Merge `overlay` into `base`; mappings merge key by key, anything else replaces.
fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(section: &mut Value) -> CrudResult<()> {
    if !section.is_mapping() {
        *section = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(map) = section else {
        return Ok(());
    };
    for (var, key, kind) in ENV_OVERRIDES {
        let Ok(raw) = std::env::var(var) else {
            continue;
        };
        let value = match kind {
            EnvKind::Text => Value::String(raw),
            EnvKind::Number => raw
                .trim()
                .parse::<u64>()
                .map(Value::from)
                .map_err(|_| CrudError::Config(format!("{var}: expected a number, got '{raw}'")))?,
            EnvKind::Flag => raw
                .trim()
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| CrudError::Config(format!("{var}: expected true or false, got '{raw}'")))?,
        };
        debug!(var = *var, key = *key, "environment override");
        map.insert(Value::String(key.to_string()), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for (var, _, _) in ENV_OVERRIDES {
            std::env::remove_var(var);
        }
        std::env::remove_var(PROFILE_ENV);
    }

    #[test]
    fn test_defaults() {
        let config = DataSourceConfig::from_yaml_str(
            r#"
datasource:
  url: "sqlite::memory:"
"#,
        )
        .unwrap();
        assert_eq!(config.url, "sqlite::memory:");
        assert!(config.reader_url.is_none());
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout_secs, 30);
        assert_eq!(config.composite_keys, CompositeKeyStrategy::RowValues);
        assert_eq!(config.identifier_policy(), IdentifierPolicy::Quote);
    }

    #[test]
    fn test_full_section() {
        let config = DataSourceConfig::from_yaml_str(
            r#"
datasource:
  url: "postgres://primary/app"
  reader_url: "postgres://replica/app"
  max_connections: 20
  min_connections: 2
  acquire_timeout_secs: 5
  composite_keys: or-chain
  quote_identifiers: false
"#,
        )
        .unwrap();
        assert_eq!(config.reader_url.as_deref(), Some("postgres://replica/app"));
        assert_eq!(config.max_connections, 20);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.acquire_timeout_secs, 5);
        assert_eq!(config.composite_keys, CompositeKeyStrategy::OrChain);
        assert_eq!(config.identifier_policy(), IdentifierPolicy::Validate);
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let err = DataSourceConfig::from_yaml_str("datasource:\n  max_connections: 4\n").unwrap_err();
        assert!(matches!(err, CrudError::Config(_)));
    }

    #[test]
    fn test_invalid_pool_bounds_are_rejected() {
        let err = DataSourceConfig::from_yaml_str(
            "datasource:\n  url: \"sqlite::memory:\"\n  max_connections: 2\n  min_connections: 5\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("min_connections"));
    }

    #[test]
    fn test_merge_yaml_overlays_nested_keys() {
        let mut base = parse_yaml("datasource:\n  url: a\n  max_connections: 3\n").unwrap();
        merge_yaml(&mut base, parse_yaml("datasource:\n  url: b\n").unwrap());
        let config = DataSourceConfig::from_section(section(&base)).unwrap();
        assert_eq!(config.url, "b");
        assert_eq!(config.max_connections, 3);
    }

    #[test]
    #[serial]
    fn test_load_profile_overlay() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("application.yaml"),
            "datasource:\n  url: \"sqlite://base.db\"\n  max_connections: 4\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("application-test.yaml"),
            "datasource:\n  url: \"sqlite://test.db\"\n",
        )
        .unwrap();

        let config = DataSourceConfig::load(dir.path(), Some("test")).unwrap();
        assert_eq!(config.url, "sqlite://test.db");
        assert_eq!(config.max_connections, 4);
    }

    #[test]
    #[serial]
    fn test_env_overrides_yaml() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("application.yaml"),
            "datasource:\n  url: \"sqlite://base.db\"\n",
        )
        .unwrap();
        std::env::set_var("DATASOURCE_URL", "sqlite://env.db");
        std::env::set_var("DATASOURCE_MAX_CONNECTIONS", "7");
        std::env::set_var("DATASOURCE_QUOTE_IDENTIFIERS", "false");

        let config = DataSourceConfig::load(dir.path(), None).unwrap();
        clear_env();
        assert_eq!(config.url, "sqlite://env.db");
        assert_eq!(config.max_connections, 7);
        assert!(!config.quote_identifiers);
    }

    #[test]
    #[serial]
    fn test_env_number_must_parse() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("DATASOURCE_URL", "sqlite://env.db");
        std::env::set_var("DATASOURCE_MAX_CONNECTIONS", "many");

        let err = DataSourceConfig::load(dir.path(), None).unwrap_err();
        clear_env();
        assert!(err.to_string().contains("DATASOURCE_MAX_CONNECTIONS"));
    }

    #[test]
    #[serial]
    fn test_dotenv_file_is_read() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "DATASOURCE_URL=sqlite://dotenv.db\n").unwrap();

        let config = DataSourceConfig::load(dir.path(), None).unwrap();
        clear_env();
        assert_eq!(config.url, "sqlite://dotenv.db");
    }

    #[test]
    #[serial]
    fn test_profile_resolution() {
        clear_env();
        assert_eq!(resolve_profile(None), "dev");
        assert_eq!(resolve_profile(Some("prod")), "prod");
        std::env::set_var(PROFILE_ENV, "staging");
        assert_eq!(resolve_profile(Some("prod")), "staging");
        clear_env();
    }
}
