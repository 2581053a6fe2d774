use std::path::Path;

use mbs_security::SecurityConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Configuration for an [`Interceptor`](crate::Interceptor).
///
/// The defaults describe an unsecured server: no access controller, and
/// class-loader beans allowed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Domain given to names registered with an empty domain.
    pub default_domain: String,
    /// Whether registered class-loader beans join the class loader
    /// repository. When `false`, registering one fails.
    pub allow_dynamic_class_loaders: bool,
    /// Permission rules. `None` disables permission checks entirely.
    pub security: Option<SecurityConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_domain: "DefaultDomain".into(),
            allow_dynamic_class_loaders: true,
            security: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.default_domain.is_empty() {
            return Err(ServerError::Config("default_domain must not be empty".into()));
        }
        if self
            .default_domain
            .chars()
            .any(|c| matches!(c, ':' | '\n' | '*' | '?'))
        {
            return Err(ServerError::Config(format!(
                "default_domain {:?} contains a forbidden character",
                self.default_domain
            )));
        }
        Ok(())
    }
}
