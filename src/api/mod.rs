pub mod http;
pub mod model;

use crate::error::ProviderResult;
use model::{
    App, AppList, CreateApp, CreateDomain, CreateService, Deployment, Domain, DomainList,
    ListOptions, Service, ServiceList, UpdateDomain, UpdateService,
};

/// Remote Koyeb API, one method per endpoint used by the provider.
///
/// Implementations return [`ProviderError::NotFound`] when the remote
/// answers 404 and [`ProviderError::Api`] for any other non-2xx reply,
/// so callers can tell an out-of-band deletion from a real failure.
///
/// [`ProviderError::NotFound`]: crate::error::ProviderError::NotFound
/// [`ProviderError::Api`]: crate::error::ProviderError::Api
pub trait KoyebApi {
    fn list_apps(&self, opts: &ListOptions) -> ProviderResult<AppList>;

    fn get_app(&self, id: &str) -> ProviderResult<App>;

    fn create_app(&self, body: &CreateApp) -> ProviderResult<App>;

    fn delete_app(&self, id: &str) -> ProviderResult<()>;

    /// List services, optionally restricted to one app.
    fn list_services(&self, app_id: Option<&str>, opts: &ListOptions)
    -> ProviderResult<ServiceList>;

    fn get_service(&self, id: &str) -> ProviderResult<Service>;

    fn create_service(&self, body: &CreateService) -> ProviderResult<Service>;

    /// Replace the deployment definition of a service. Triggers a new
    /// deployment on the platform.
    fn update_service(&self, id: &str, body: &UpdateService) -> ProviderResult<Service>;

    fn delete_service(&self, id: &str) -> ProviderResult<()>;

    fn get_deployment(&self, id: &str) -> ProviderResult<Deployment>;

    fn list_domains(&self, opts: &ListOptions) -> ProviderResult<DomainList>;

    fn get_domain(&self, id: &str) -> ProviderResult<Domain>;

    fn create_domain(&self, body: &CreateDomain) -> ProviderResult<Domain>;

    fn update_domain(&self, id: &str, body: &UpdateDomain) -> ProviderResult<Domain>;

    fn delete_domain(&self, id: &str) -> ProviderResult<()>;
}
