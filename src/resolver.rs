use crate::api::KoyebApi;
use crate::api::model::ListOptions;
use crate::cancel::Cancellation;
use crate::error::{ProviderError, ProviderResult};

const PAGE_SIZE: u32 = 100;

/// Maps human-readable app names to platform ids and back.
///
/// Lookups may take several remote calls; `cancel` is checked before
/// each of them.
pub trait IdResolver {
    fn app_id(&self, name: &str, cancel: &Cancellation) -> ProviderResult<String>;

    fn app_name(&self, id: &str, cancel: &Cancellation) -> ProviderResult<String>;
}

/// Resolver backed by the apps endpoints.
pub struct ApiResolver<'a> {
    api: &'a dyn KoyebApi,
}

impl<'a> ApiResolver<'a> {
    #[must_use]
    pub fn new(api: &'a dyn KoyebApi) -> Self {
        Self { api }
    }
}

impl IdResolver for ApiResolver<'_> {
    fn app_id(&self, name: &str, cancel: &Cancellation) -> ProviderResult<String> {
        let mut offset = 0;
        loop {
            cancel.check("resolving app id")?;
            let page = self
                .api
                .list_apps(&ListOptions::limit(PAGE_SIZE).offset(offset).name(name))?;

            if let Some(id) = page
                .apps
                .iter()
                .find(|a| a.name.as_deref() == Some(name))
                .and_then(|a| a.id.clone())
            {
                tracing::debug!(app_name = name, app_id = %id, "resolved app");
                return Ok(id);
            }

            let seen = i64::from(offset) + i64::try_from(page.apps.len()).unwrap_or(i64::MAX);
            if page.apps.is_empty() || seen >= page.count {
                return Err(ProviderError::NotFound {
                    kind: "app",
                    id: name.to_string(),
                });
            }
            offset += PAGE_SIZE;
        }
    }

    fn app_name(&self, id: &str, cancel: &Cancellation) -> ProviderResult<String> {
        cancel.check("resolving app name")?;
        let app = self.api.get_app(id)?;
        Ok(app.name.unwrap_or_default())
    }
}
