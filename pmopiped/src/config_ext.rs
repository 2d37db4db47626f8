//! Extension pour intégrer Piped dans pmoconfig
//!
//! Ce module fournit le trait `PipedConfigExt` qui ajoute à
//! `pmoconfig::Config` des accesseurs typés pour la section `piped`.
//!
//! # Exemple
//!
//! ```no_run
//! use pmoconfig::get_config;
//! use pmopiped::PipedConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//!
//! if let Some(primary) = config.get_piped_primary_instance()? {
//!     println!("Own instance: {}", primary);
//! }
//! println!("Timeout: {} ms", config.get_piped_request_timeout_ms()?);
//! # Ok(())
//! # }
//! ```

use crate::client::{DEFAULT_MAX_REDIRECTS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_USER_AGENT};
use crate::models::RelativeScheme;
use anyhow::Result;
use pmoconfig::Config;
use serde_yaml::Value;

/// Trait d'extension pour la configuration Piped
///
/// Les getters persistent la valeur par défaut quand la clé est absente ou
/// invalide.
pub trait PipedConfigExt {
    /// Instance de l'opérateur, essayée avant les instances publiques
    ///
    /// `None` quand la clé est absente ou vide.
    fn get_piped_primary_instance(&self) -> Result<Option<String>>;

    /// Définit (ou efface avec `None`) l'instance de l'opérateur
    fn set_piped_primary_instance(&self, instance: Option<&str>) -> Result<()>;

    /// Délai maximal d'une tentative, en millisecondes (défaut : 10000)
    fn get_piped_request_timeout_ms(&self) -> Result<u64>;

    fn set_piped_request_timeout_ms(&self, timeout_ms: u64) -> Result<()>;

    /// Nombre de redirections suivies par tentative (défaut : 5)
    fn get_piped_max_redirects(&self) -> Result<usize>;

    fn set_piped_max_redirects(&self, max_redirects: usize) -> Result<()>;

    /// Schéma donné aux URLs de flux sans schéma (défaut : https)
    fn get_piped_relative_url_scheme(&self) -> Result<RelativeScheme>;

    fn set_piped_relative_url_scheme(&self, scheme: RelativeScheme) -> Result<()>;

    /// User-Agent des requêtes sortantes (défaut : `Mozilla/5.0`)
    fn get_piped_user_agent(&self) -> Result<String>;

    fn set_piped_user_agent(&self, user_agent: &str) -> Result<()>;
}

/// Entier positif ou nul, y compris sous forme de chaîne
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        // Les surcharges d'environnement arrivent sous forme de chaîne
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl PipedConfigExt for Config {
    fn get_piped_primary_instance(&self) -> Result<Option<String>> {
        match self.get_value(&["piped", "primary_instance"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
            _ => Ok(None),
        }
    }

    fn set_piped_primary_instance(&self, instance: Option<&str>) -> Result<()> {
        self.set_value(
            &["piped", "primary_instance"],
            Value::String(instance.unwrap_or_default().to_string()),
        )
    }

    fn get_piped_request_timeout_ms(&self) -> Result<u64> {
        let parsed = self
            .get_value(&["piped", "request_timeout_ms"])
            .ok()
            .as_ref()
            .and_then(value_as_u64)
            .filter(|ms| *ms > 0);

        match parsed {
            Some(ms) => Ok(ms),
            None => {
                self.set_piped_request_timeout_ms(DEFAULT_REQUEST_TIMEOUT_MS)?;
                Ok(DEFAULT_REQUEST_TIMEOUT_MS)
            }
        }
    }

    fn set_piped_request_timeout_ms(&self, timeout_ms: u64) -> Result<()> {
        self.set_value(
            &["piped", "request_timeout_ms"],
            Value::Number(serde_yaml::Number::from(timeout_ms)),
        )
    }

    fn get_piped_max_redirects(&self) -> Result<usize> {
        let parsed = self
            .get_value(&["piped", "max_redirects"])
            .ok()
            .as_ref()
            .and_then(value_as_u64);

        match parsed {
            Some(n) => Ok(n as usize),
            None => {
                self.set_piped_max_redirects(DEFAULT_MAX_REDIRECTS)?;
                Ok(DEFAULT_MAX_REDIRECTS)
            }
        }
    }

    fn set_piped_max_redirects(&self, max_redirects: usize) -> Result<()> {
        self.set_value(
            &["piped", "max_redirects"],
            Value::Number(serde_yaml::Number::from(max_redirects as u64)),
        )
    }

    fn get_piped_relative_url_scheme(&self) -> Result<RelativeScheme> {
        if let Ok(Value::String(s)) = self.get_value(&["piped", "relative_url_scheme"]) {
            match s.parse() {
                Ok(scheme) => return Ok(scheme),
                Err(e) => tracing::warn!("{}, falling back to https", e),
            }
        }

        self.set_piped_relative_url_scheme(RelativeScheme::default())?;
        Ok(RelativeScheme::default())
    }

    fn set_piped_relative_url_scheme(&self, scheme: RelativeScheme) -> Result<()> {
        self.set_value(
            &["piped", "relative_url_scheme"],
            Value::String(scheme.as_str().to_string()),
        )
    }

    fn get_piped_user_agent(&self) -> Result<String> {
        match self.get_value(&["piped", "user_agent"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(s),
            _ => {
                self.set_piped_user_agent(DEFAULT_USER_AGENT)?;
                Ok(DEFAULT_USER_AGENT.to_string())
            }
        }
    }

    fn set_piped_user_agent(&self, user_agent: &str) -> Result<()> {
        self.set_value(
            &["piped", "user_agent"],
            Value::String(user_agent.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(&dir.path().to_string_lossy()).unwrap();
        (dir, config)
    }

    fn set(config: &Config, key: &str, value: Value) {
        config.set_value(&["piped", key], value).unwrap();
    }

    #[test]
    fn test_defaults() {
        let (_dir, config) = test_config();
        assert_eq!(config.get_piped_primary_instance().unwrap(), None);
        assert_eq!(
            config.get_piped_request_timeout_ms().unwrap(),
            DEFAULT_REQUEST_TIMEOUT_MS
        );
        assert_eq!(config.get_piped_max_redirects().unwrap(), DEFAULT_MAX_REDIRECTS);
        assert_eq!(
            config.get_piped_relative_url_scheme().unwrap(),
            RelativeScheme::Https
        );
        assert_eq!(config.get_piped_user_agent().unwrap(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_primary_instance() {
        let (_dir, config) = test_config();

        config
            .set_piped_primary_instance(Some("http://localhost:8081"))
            .unwrap();
        assert_eq!(
            config.get_piped_primary_instance().unwrap().as_deref(),
            Some("http://localhost:8081")
        );

        set(&config, "primary_instance", Value::String("   ".to_string()));
        assert_eq!(config.get_piped_primary_instance().unwrap(), None);

        config.set_piped_primary_instance(None).unwrap();
        assert_eq!(config.get_piped_primary_instance().unwrap(), None);
    }

    #[test]
    fn test_timeout_from_string_value() {
        let (_dir, config) = test_config();
        set(&config, "request_timeout_ms", Value::String("5000".to_string()));
        assert_eq!(config.get_piped_request_timeout_ms().unwrap(), 5000);
    }

    #[test]
    fn test_invalid_timeout_is_replaced_and_persisted() {
        let (dir, config) = test_config();

        set(&config, "request_timeout_ms", Value::Number(0u64.into()));
        assert_eq!(
            config.get_piped_request_timeout_ms().unwrap(),
            DEFAULT_REQUEST_TIMEOUT_MS
        );

        set(&config, "request_timeout_ms", Value::String("soon".to_string()));
        assert_eq!(
            config.get_piped_request_timeout_ms().unwrap(),
            DEFAULT_REQUEST_TIMEOUT_MS
        );
        assert_eq!(
            config.get_value(&["piped", "request_timeout_ms"]).unwrap(),
            Value::Number(DEFAULT_REQUEST_TIMEOUT_MS.into())
        );

        let reloaded = Config::load_config(&dir.path().to_string_lossy()).unwrap();
        assert_eq!(
            reloaded.get_value(&["piped", "request_timeout_ms"]).unwrap(),
            Value::Number(DEFAULT_REQUEST_TIMEOUT_MS.into())
        );
    }

    #[test]
    fn test_max_redirects() {
        let (_dir, config) = test_config();

        set(&config, "max_redirects", Value::String("2".to_string()));
        assert_eq!(config.get_piped_max_redirects().unwrap(), 2);

        set(&config, "max_redirects", Value::Number(0u64.into()));
        assert_eq!(config.get_piped_max_redirects().unwrap(), 0);

        set(&config, "max_redirects", Value::String("many".to_string()));
        assert_eq!(config.get_piped_max_redirects().unwrap(), DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_relative_url_scheme() {
        let (_dir, config) = test_config();

        set(&config, "relative_url_scheme", Value::String("HTTP".to_string()));
        assert_eq!(
            config.get_piped_relative_url_scheme().unwrap(),
            RelativeScheme::Http
        );

        set(&config, "relative_url_scheme", Value::String("gopher".to_string()));
        assert_eq!(
            config.get_piped_relative_url_scheme().unwrap(),
            RelativeScheme::Https
        );
        assert_eq!(
            config.get_value(&["piped", "relative_url_scheme"]).unwrap(),
            Value::String("https".to_string())
        );
    }

    #[test]
    fn test_blank_user_agent_falls_back() {
        let (_dir, config) = test_config();
        set(&config, "user_agent", Value::String(String::new()));
        assert_eq!(config.get_piped_user_agent().unwrap(), DEFAULT_USER_AGENT);

        config.set_piped_user_agent("PMOTube/0.1").unwrap();
        assert_eq!(config.get_piped_user_agent().unwrap(), "PMOTube/0.1");
    }
}
