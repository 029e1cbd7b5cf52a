//! Declarative manifest listing the apps, services and domains that
//! should exist.
//!
//! ```yaml
//! apps:
//!   - name: demo-app
//! services:
//!   - app_name: demo-app
//!     definition:
//!       name: web
//!       docker:
//!         image: koyeb/demo
//!       ports:
//!         - { port: 8080, protocol: http }
//!       routes:
//!         - { port: 8080, path: / }
//!       instance_types:
//!         - { type: nano }
//!       regions: [fra]
//! domains:
//!   - name: demo.example.com
//!     app_name: demo-app
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{AppConfig, DomainConfig, ServiceConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub apps: Vec<AppConfig>,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
}

impl Manifest {
    pub fn load(path: &Path) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Other(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> ProviderResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    #[must_use]
    pub fn app(mut self, app: AppConfig) -> Self {
        self.apps.push(app);
        self
    }

    #[must_use]
    pub fn service(mut self, service: ServiceConfig) -> Self {
        self.services.push(service);
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: DomainConfig) -> Self {
        self.domains.push(domain);
        self
    }

    /// Validate every entry, then the manifest as a whole.
    ///
    /// References to apps the manifest does not declare are returned as
    /// warnings, not errors.
    pub fn validate(&self) -> ProviderResult<Vec<String>> {
        let mut warnings = Vec::new();

        let mut app_names = HashSet::new();
        for app in &self.apps {
            app.validate()?;
            if !app_names.insert(app.name.as_str()) {
                return Err(ProviderError::Validation(format!(
                    "app '{}' is declared twice",
                    app.name
                )));
            }
        }

        let mut addresses = HashSet::new();
        let mut paths: HashMap<&str, HashMap<&str, String>> = HashMap::new();
        for service in &self.services {
            service.validate()?;
            let address = service.address();
            if !addresses.insert(address.clone()) {
                return Err(ProviderError::Validation(format!(
                    "service '{address}' is declared twice"
                )));
            }
            if !app_names.contains(service.app_name.as_str()) {
                warnings.push(format!(
                    "service '{address}' references app '{}' which is not declared",
                    service.app_name
                ));
            }

            let app_paths = paths.entry(service.app_name.as_str()).or_default();
            for route in &service.definition.routes {
                if let Some(owner) = app_paths.get(route.path.as_str()) {
                    return Err(ProviderError::Validation(format!(
                        "route path '{}' of service '{address}' is already used by '{owner}'",
                        route.path
                    )));
                }
                app_paths.insert(route.path.as_str(), address.clone());
            }
        }

        let mut domain_names = HashSet::new();
        for domain in &self.domains {
            domain.validate()?;
            if !domain_names.insert(domain.name.as_str()) {
                return Err(ProviderError::Validation(format!(
                    "domain '{}' is declared twice",
                    domain.name
                )));
            }
            if let Some(app) = domain
                .app_name
                .as_deref()
                .filter(|app| !app_names.contains(app))
            {
                warnings.push(format!(
                    "domain '{}' references app '{app}' which is not declared",
                    domain.name
                ));
            }
        }

        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        Ok(warnings)
    }

    /// Apps keyed by their state address.
    #[must_use]
    pub fn app_entries(&self) -> IndexMap<String, &AppConfig> {
        self.apps.iter().map(|a| (a.name.clone(), a)).collect()
    }

    /// Services keyed by their state address, `app/service`.
    #[must_use]
    pub fn service_entries(&self) -> IndexMap<String, &ServiceConfig> {
        self.services.iter().map(|s| (s.address(), s)).collect()
    }

    /// Domains keyed by their state address.
    #[must_use]
    pub fn domain_entries(&self) -> IndexMap<String, &DomainConfig> {
        self.domains.iter().map(|d| (d.name.clone(), d)).collect()
    }
}
