//! # PMOTube Configuration Module
//!
//! This module provides configuration management for PMOTube, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Type-safe getters and setters for configuration values
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config();
//!
//! // Access configuration values
//! let port = config.get_http_port();
//!
//! // Update configuration values
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Environment overrides
//!
//! Any key can be overridden with `PMOTUBE_CONFIG__<SECTION>__<KEY>`, e.g.
//! `PMOTUBE_CONFIG__PIPED__REQUEST_TIMEOUT_MS=5000`. The historical deployment
//! variables are honoured as well:
//!
//! - `PORT` → `host.http_port`
//! - `PIPED_API` → `piped.primary_instance`

use anyhow::{anyhow, Result};
use dirs::home_dir;
use lazy_static::lazy_static;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmotube.yaml");

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load PMOTube configuration"));
}

const ENV_CONFIG_DIR: &str = "PMOTUBE_CONFIG";
const ENV_PREFIX: &str = "PMOTUBE_CONFIG__";

/// Deployment variables predating the YAML configuration, mapped to their key path
const LEGACY_ENV_VARS: &[(&str, &[&str])] = &[
    ("PORT", &["host", "http_port"]),
    ("PIPED_API", &["piped", "primary_instance"]),
];

// Default values for configuration
const DEFAULT_BASE_URL: &str = "localhost";
const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for usize values with default
macro_rules! impl_usize_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<usize> {
            Ok(self
                .get_value($path)
                .ok()
                .as_ref()
                .and_then(scalar_u64)
                .map_or($default, |v| v as usize))
        }

        pub fn $setter(&self, size: usize) -> Result<()> {
            let n = Number::from(size);
            self.set_value($path, Value::Number(n))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for PMOTube
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use pmoconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// println!("HTTP port: {}", port);
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: String,
    path: String,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> String {
        // 1. Try provided directory
        if !directory.is_empty() {
            return directory.to_string();
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var=ENV_CONFIG_DIR, path=%env_path, "Trying to load config from env");
            return env_path;
        }

        // 3. Try current directory
        if Path::new(".pmotube").exists() {
            return ".pmotube".to_string();
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(".pmotube");
            if home_config.exists() {
                return home_config.to_string_lossy().to_string();
            }
        }

        // Default fallback
        ".pmotube".to_string()
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} is not a directory", path.display()));
        }

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `PMOTUBE_CONFIG` environment variable
    /// 3. `.pmotube` in the current directory
    /// 4. `.pmotube` in the user's home directory
    ///
    /// The directory is created if it doesn't exist.
    pub fn config_dir(directory: &str) -> Result<String> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(Path::new(&dir_path))?;
        Ok(dir_path)
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// A failed save is logged and otherwise ignored: a read-only config
    /// directory must not prevent the service from starting.
    pub fn load_config(directory: &str) -> Result<Self> {
        let config_dir = Self::config_dir(directory)?;
        info!(config_dir=%config_dir, "Using config directory");

        let config_file_path = Path::new(&config_dir).join("config.yaml");
        let path = config_file_path.to_string_lossy().to_string();

        let mut default_value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file=%path, "Loaded config file");
            data
        } else {
            info!(config_file=%path, "Config file not found, using default embedded config");
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        // Merger avec la config par défaut
        let external_value = Self::lower_keys_value(serde_yaml::from_slice(&yaml_data)?);
        merge_yaml(&mut default_value, &external_value);
        let mut config_value = Self::lower_keys_value(default_value);

        Self::apply_env_overrides(&mut config_value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        if let Err(e) = config.save() {
            warn!(config_file=%config.path, error=%e, "Unable to persist configuration");
        }
        Ok(config)
    }

    fn lock_data(&self) -> MutexGuard<'_, Value> {
        // A poisoned lock still holds a consistent YAML tree
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the directory holding `config.yaml`
    pub fn directory(&self) -> &str {
        &self.config_dir
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.lock_data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        {
            let mut data = self.lock_data();
            Self::set_value_internal(&mut data, path, value)?;
        }
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key = path[0].to_lowercase();
            let key_value = Value::String(key);
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["host", "http_port"]`)
    ///
    /// # Returns
    ///
    /// Returns a `Result` containing the YAML value or an error if the path doesn't exist
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.lock_data();
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides<I>(config: &mut Value, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, &key_path, yaml_value);
            } else if let Some((_, key_path)) =
                LEGACY_ENV_VARS.iter().find(|(name, _)| *name == key)
            {
                let yaml_value = Self::convert_env_value(&value);
                let _ = Self::set_value_internal(config, key_path, yaml_value);
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        let new_key = Value::String(s.to_lowercase());
                        let new_val = Self::lower_keys_value(v);
                        new_map.insert(new_key, new_val);
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Host announced by the HTTP server (`host.base_url`, default `localhost`)
    pub fn get_base_url(&self) -> String {
        match self.get_value(&["host", "base_url"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                warn!("host.base_url missing or empty, using {}", DEFAULT_BASE_URL);
                DEFAULT_BASE_URL.to_string()
            }
        }
    }

    /// Port of the HTTP server (`host.http_port`, default 3000)
    ///
    /// Accepts a number or a numeric string (as set by `PORT`); anything out
    /// of the `u16` range falls back to the default.
    pub fn get_http_port(&self) -> u16 {
        let port = self
            .get_value(&["host", "http_port"])
            .ok()
            .as_ref()
            .and_then(scalar_u64)
            .and_then(|p| u16::try_from(p).ok());

        port.unwrap_or_else(|| {
            warn!("Invalid host.http_port, using default {}", DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    /// Sets the HTTP port in configuration
    pub fn set_http_port(&self, port: u16) -> Result<()> {
        let n = Number::from(port);
        self.set_value(&["host", "http_port"], Value::Number(n))
    }

    impl_usize_config!(
        get_log_cache_size,
        set_log_cache_size,
        &["host", "logger", "buffer_capacity"],
        DEFAULT_LOG_BUFFER_CAPACITY
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        match self.get_value(&["host", "logger", "min_level"]) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(DEFAULT_LOG_MIN_LEVEL.to_string()),
        }
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance
///
/// This function provides access to the singleton configuration instance,
/// which is lazily loaded on first access.
///
/// # Examples
///
/// ```no_run
/// use pmoconfig::get_config;
///
/// let config = get_config();
/// let port = config.get_http_port();
/// ```
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Unsigned integer held by a YAML scalar, numeric strings included
fn scalar_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Merges external YAML configuration into default configuration
///
/// This function recursively merges two YAML value trees:
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        // un fichier vide ne doit pas écraser les valeurs par défaut
        (_, Value::Null) => {}
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Value {
        serde_yaml::from_str(DEFAULT_CONFIG).unwrap()
    }

    #[test]
    fn test_merge_keeps_defaults_and_overrides_scalars() {
        let mut base = defaults();
        let external: Value = serde_yaml::from_str("host:\n  http_port: 8088\n").unwrap();
        merge_yaml(&mut base, &external);

        let port = Config::get_value_internal(&base, &["host", "http_port"]).unwrap();
        assert_eq!(port, Value::Number(Number::from(8088)));
        let level = Config::get_value_internal(&base, &["host", "logger", "min_level"]).unwrap();
        assert_eq!(level, Value::String("INFO".into()));
    }

    #[test]
    fn test_prefixed_env_override() {
        let mut base = defaults();
        Config::apply_env_overrides(
            &mut base,
            vec![(
                "PMOTUBE_CONFIG__PIPED__REQUEST_TIMEOUT_MS".to_string(),
                "2500".to_string(),
            )],
        );
        let timeout =
            Config::get_value_internal(&base, &["piped", "request_timeout_ms"]).unwrap();
        assert_eq!(timeout, Value::Number(Number::from(2500)));
    }

    #[test]
    fn test_legacy_env_variables() {
        let mut base = defaults();
        Config::apply_env_overrides(
            &mut base,
            vec![
                ("PORT".to_string(), "4000".to_string()),
                ("PIPED_API".to_string(), "https://piped.example.org".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ],
        );
        assert_eq!(
            Config::get_value_internal(&base, &["host", "http_port"]).unwrap(),
            Value::Number(Number::from(4000))
        );
        assert_eq!(
            Config::get_value_internal(&base, &["piped", "primary_instance"]).unwrap(),
            Value::String("https://piped.example.org".into())
        );
    }

    #[test]
    fn test_load_config_in_directory() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("config.yaml"),
            "HOST:\n  LOGGER:\n    BUFFER_CAPACITY: 42\n",
        )?;

        let config = Config::load_config(&dir.path().to_string_lossy())?;
        assert_eq!(config.get_log_cache_size()?, 42);
        assert!(config.get_log_enable_console()?);
        assert!(dir.path().join("config.yaml").exists());

        config.set_log_cache_size(64)?;
        let reloaded = Config::load_config(&dir.path().to_string_lossy())?;
        assert_eq!(reloaded.get_log_cache_size()?, 64);
        Ok(())
    }

    #[test]
    fn test_scalar_u64_accepts_numeric_strings() {
        assert_eq!(scalar_u64(&Value::Number(Number::from(8080))), Some(8080));
        assert_eq!(scalar_u64(&Value::String(" 8080 ".into())), Some(8080));
        assert_eq!(scalar_u64(&Value::String("http".into())), None);
        assert_eq!(scalar_u64(&Value::Bool(true)), None);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let base = defaults();
        assert!(Config::get_value_internal(&base, &["host", "nope"]).is_err());
    }
}
