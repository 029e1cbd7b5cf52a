use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{AppState, DomainState, ServiceState};

pub const STATE_VERSION: u32 = 1;

/// Last known state of every managed resource, keyed by address in the
/// order resources were recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateStore {
    pub version: u32,
    #[serde(default)]
    pub apps: IndexMap<String, AppState>,
    #[serde(default)]
    pub services: IndexMap<String, ServiceState>,
    #[serde(default)]
    pub domains: IndexMap<String, DomainState>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            apps: IndexMap::new(),
            services: IndexMap::new(),
            domains: IndexMap::new(),
        }
    }
}

impl StateStore {
    /// Load the state file. A missing file is an empty state.
    pub fn load(path: &Path) -> ProviderResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no state file, starting empty");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&content)?;
        if store.version != STATE_VERSION {
            return Err(ProviderError::Other(format!(
                "state file {} has version {}, expected {STATE_VERSION}",
                path.display(),
                store.version
            )));
        }
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> ProviderResult<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), resources = self.len(), "state saved");
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len() + self.services.len() + self.domains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
