use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;
use crate::schema::{APP_NAME_LEN, DomainState, check_len};

/// Declared app. The name is immutable: changing it replaces the app.
///
/// # Example
///
/// ```
/// use koyeb_provider::AppConfig;
///
/// let app = AppConfig::new("demo-app");
/// assert!(app.validate().is_ok());
/// assert!(AppConfig::new("x").validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub name: String,
}

impl AppConfig {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn validate(&self) -> ProviderResult<()> {
        check_len("app name", &self.name, APP_NAME_LEN)
    }
}

/// App as observed on the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub id: String,
    pub name: String,
    pub organization_id: String,
    #[serde(default)]
    pub domains: Vec<DomainState>,
    pub created_at: String,
    pub updated_at: String,
}

impl AppState {
    /// The declarative view of this state.
    #[must_use]
    pub fn config(&self) -> AppConfig {
        AppConfig::new(&self.name)
    }
}
