//! Configuration for locating the megam binary.
//!
//! [`MegamConfig`] describes where to look for the optimizer: an optional
//! explicit path, the environment variables to consult, and the file names a
//! megam build may be installed under.
//!
//! # Example
//!
//! ```
//! use megam::MegamConfig;
//!
//! let config = MegamConfig::builder()
//!     .binary("/opt/megam/megam.opt")
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.env_vars, vec!["MEGAM", "MEGAMHOME"]);
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MegamError, Result};

/// Environment variables checked for the megam location, in order.
pub const DEFAULT_ENV_VARS: &[&str] = &["MEGAM", "MEGAMHOME"];

/// File names megam is commonly built or installed under, in order.
pub const DEFAULT_BINARY_NAMES: &[&str] = &["megam.opt", "megam", "megam_686", "megam_i686.opt"];

/// Where to get megam.
pub const MEGAM_URL: &str = "http://www.cs.utah.edu/~hal/megam/";

/// Settings used by the locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MegamConfig {
    /// Name used in log and error messages.
    /// Default: "megam"
    pub name: String,

    /// Explicit path to the binary. When set, no other location is searched.
    /// Default: None
    pub binary: Option<PathBuf>,

    /// Environment variables naming either the binary or a directory holding it.
    /// Default: ["MEGAM", "MEGAMHOME"]
    pub env_vars: Vec<String>,

    /// Acceptable binary file names, tried in order.
    /// Default: ["megam.opt", "megam", "megam_686", "megam_i686.opt"]
    pub binary_names: Vec<String>,

    /// Help URL included in lookup errors.
    pub url: String,
}

impl Default for MegamConfig {
    fn default() -> Self {
        Self {
            name: "megam".to_string(),
            binary: None,
            env_vars: DEFAULT_ENV_VARS.iter().map(|s| s.to_string()).collect(),
            binary_names: DEFAULT_BINARY_NAMES.iter().map(|s| s.to_string()).collect(),
            url: MEGAM_URL.to_string(),
        }
    }
}

impl MegamConfig {
    /// Create a new configuration builder.
    pub fn builder() -> MegamConfigBuilder {
        MegamConfigBuilder::default()
    }

    /// Validate the configuration and return an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MegamError::InvalidConfig(
                "name must not be empty".to_string(),
            ));
        }

        if self.binary_names.is_empty() {
            return Err(MegamError::InvalidConfig(
                "binary_names must contain at least one name".to_string(),
            ));
        }

        if let Some(bad) = self
            .binary_names
            .iter()
            .find(|n| n.is_empty() || n.contains(std::path::is_separator))
        {
            return Err(MegamError::InvalidConfig(format!(
                "invalid binary name '{bad}' (must be a bare file name)"
            )));
        }

        if self.env_vars.iter().any(|v| v.is_empty() || v.contains('=')) {
            return Err(MegamError::InvalidConfig(
                "env_vars entries must be non-empty and must not contain '='".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`MegamConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct MegamConfigBuilder {
    name: Option<String>,
    binary: Option<PathBuf>,
    env_vars: Option<Vec<String>>,
    binary_names: Option<Vec<String>>,
    url: Option<String>,
}

impl MegamConfigBuilder {
    /// Set the display name used in log and error messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set an explicit binary path.
    ///
    /// An explicit path is authoritative: if it does not exist, resolution
    /// fails instead of falling back to the environment or `PATH`.
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Replace the list of environment variables to consult.
    pub fn env_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the list of acceptable binary file names.
    pub fn binary_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binary_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the help URL reported by lookup errors.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `MegamConfig` or an error if validation fails.
    pub fn build(self) -> Result<MegamConfig> {
        let defaults = MegamConfig::default();
        let config = MegamConfig {
            name: self.name.unwrap_or(defaults.name),
            binary: self.binary,
            env_vars: self.env_vars.unwrap_or(defaults.env_vars),
            binary_names: self.binary_names.unwrap_or(defaults.binary_names),
            url: self.url.unwrap_or(defaults.url),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MegamConfig::default();
        assert_eq!(config.name, "megam");
        assert!(config.binary.is_none());
        assert_eq!(config.env_vars, vec!["MEGAM", "MEGAMHOME"]);
        assert_eq!(
            config.binary_names,
            vec!["megam.opt", "megam", "megam_686", "megam_i686.opt"]
        );
        assert_eq!(config.url, MEGAM_URL);
    }

    #[test]
    fn test_builder_defaults() {
        let config = MegamConfig::builder().build().unwrap();
        assert_eq!(config, MegamConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = MegamConfig::builder()
            .binary("/usr/local/bin/megam")
            .env_vars(["MY_MEGAM"])
            .binary_names(["megam-0.92"])
            .build()
            .unwrap();

        assert_eq!(config.binary, Some(PathBuf::from("/usr/local/bin/megam")));
        assert_eq!(config.env_vars, vec!["MY_MEGAM"]);
        assert_eq!(config.binary_names, vec!["megam-0.92"]);
    }

    #[test]
    fn test_validation_empty_binary_names() {
        let result = MegamConfig::builder()
            .binary_names(Vec::<String>::new())
            .build();

        assert!(matches!(result, Err(MegamError::InvalidConfig(_))));
    }

    #[test]
    fn test_validation_binary_name_with_separator() {
        let result = MegamConfig::builder().binary_names(["bin/megam"]).build();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("bin/megam"));
    }

    #[test]
    fn test_validation_bad_env_var() {
        let result = MegamConfig::builder().env_vars(["A=B"]).build();
        assert!(matches!(result, Err(MegamError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "name": "megam",
            "binary": "/opt/megam/megam.opt",
            "env_vars": ["MEGAM"],
            "binary_names": ["megam.opt"],
            "url": "http://www.cs.utah.edu/~hal/megam/"
        }"#;

        let config: MegamConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.binary, Some(PathBuf::from("/opt/megam/megam.opt")));
        assert!(config.validate().is_ok());
    }
}
