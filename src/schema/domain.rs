use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{APP_NAME_LEN, check_len, check_not_empty};

const MAX_DOMAIN_LEN: usize = 253;

/// Declared custom domain, optionally attached to an app by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
}

impl DomainConfig {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            app_name: None,
        }
    }

    #[must_use]
    pub fn app(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }

    pub fn validate(&self) -> ProviderResult<()> {
        check_not_empty("domain name", &self.name)?;
        if self.name.len() > MAX_DOMAIN_LEN {
            return Err(ProviderError::Validation(format!(
                "domain name must be at most {MAX_DOMAIN_LEN} characters"
            )));
        }
        if !self.name.contains('.') || self.name.starts_with('.') || self.name.ends_with('.') {
            return Err(ProviderError::Validation(format!(
                "domain name '{}' is not a fully-qualified hostname",
                self.name
            )));
        }
        if let Some(app) = &self.app_name {
            check_len("domain app_name", app, APP_NAME_LEN)?;
        }
        Ok(())
    }
}

/// Domain as observed on the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainState {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    pub organization_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub messages: String,
    pub intended_cname: String,
    pub version: String,
    pub verified_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl DomainState {
    #[must_use]
    pub fn config(&self) -> DomainConfig {
        DomainConfig {
            name: self.name.clone(),
            app_name: self.app_name.clone(),
        }
    }
}
