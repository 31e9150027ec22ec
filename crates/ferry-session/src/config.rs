//! Session defaults and their loading from TOML files and the environment.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Defaults applied when a session is created.
///
/// ```toml
/// connect_timeout = 5
/// timeout = 60
/// bom_removing = true
/// sleep_min_seconds = 1
/// sleep_max_seconds = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Connect timeout in seconds.
    pub connect_timeout: u64,

    /// Whole-transfer timeout in seconds.
    pub timeout: u64,

    /// Root certificates handed to the engine. Must exist at construction.
    pub ca_bundle: PathBuf,

    pub bom_removing: bool,

    /// When false, `set_follow_location` is ignored.
    pub allow_follow_location: bool,

    pub sleep_min_seconds: Option<u64>,
    pub sleep_max_seconds: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 10,
            timeout: 30,
            ca_bundle: bundled_ca_path(),
            bom_removing: false,
            allow_follow_location: true,
            sleep_min_seconds: None,
            sleep_max_seconds: None,
        }
    }
}

impl SessionConfig {
    const ENV_PREFIX: &str = "FERRY_";

    /// Load from a TOML file, then `FERRY_*` environment variables, over the
    /// defaults. A missing file leaves the defaults in place.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let fig = Self::base()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX));
        Ok(fig.extract()?)
    }

    /// Parse a TOML document over the defaults. The environment is not read.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(Self::base().merge(Toml::string(toml)).extract()?)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(SessionConfig::default()))
    }
}

/// Absolute path of the CA bundle shipped with this crate.
pub fn bundled_ca_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/resources/cacert.pem"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, 10);
        assert_eq!(config.timeout, 30);
        assert!(!config.bom_removing);
        assert!(config.allow_follow_location);
        assert!(config.ca_bundle.is_absolute());
        assert!(config.ca_bundle.is_file());
    }

    #[test]
    fn test_from_toml_overrides_only_given_keys() {
        let config = SessionConfig::from_toml_str(
            "timeout = 90\nbom_removing = true\nsleep_min_seconds = 1\nsleep_max_seconds = 4\n",
        )
        .unwrap();
        assert_eq!(config.timeout, 90);
        assert_eq!(config.connect_timeout, 10);
        assert!(config.bom_removing);
        assert_eq!(config.sleep_min_seconds, Some(1));
        assert_eq!(config.sleep_max_seconds, Some(4));
        assert_eq!(config.ca_bundle, bundled_ca_path());
    }

    #[test]
    fn test_from_toml_rejects_wrong_types() {
        assert!(SessionConfig::from_toml_str("timeout = \"soon\"").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferry.toml");
        std::fs::write(&path, "connect_timeout = 3\nallow_follow_location = false\n").unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.connect_timeout, 3);
        assert!(!config.allow_follow_location);
    }

    #[test]
    fn test_load_missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.timeout, 30);
    }
}
