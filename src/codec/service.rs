use crate::api::model;
use crate::codec::{expand_definition, flatten_definition, format_timestamp, join_messages, text};
use crate::error::ProviderResult;
use crate::schema::{DefinitionConfig, DeploymentState, ServiceConfig, ServiceState};

/// Encode a service creation under the already resolved `app_id`.
pub fn expand_service(config: &ServiceConfig, app_id: &str) -> ProviderResult<model::CreateService> {
    config.validate()?;
    Ok(model::CreateService {
        app_id: Some(app_id.to_string()),
        definition: Some(expand_definition(&config.definition)?),
    })
}

/// Encode a service update. The whole definition is always sent; the
/// platform replaces it rather than merging fields.
pub fn expand_service_update(definition: &DefinitionConfig) -> ProviderResult<model::UpdateService> {
    Ok(model::UpdateService {
        definition: Some(expand_definition(definition)?),
    })
}

/// Decode a service. `definition` comes from its latest deployment,
/// since the service resource itself does not carry one.
#[must_use]
pub fn flatten_service(
    service: &model::Service,
    app_name: &str,
    definition: Option<DefinitionConfig>,
) -> ServiceState {
    ServiceState {
        id: text(service.id.as_ref()),
        name: text(service.name.as_ref()),
        app_id: text(service.app_id.as_ref()),
        app_name: app_name.to_string(),
        organization_id: text(service.organization_id.as_ref()),
        definition,
        active_deployment: text(service.active_deployment_id.as_ref()),
        latest_deployment: text(service.latest_deployment_id.as_ref()),
        version: text(service.version.as_ref()),
        status: service
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        messages: join_messages(service.messages.as_ref()),
        paused_at: format_timestamp(service.paused_at.as_ref()),
        resumed_at: format_timestamp(service.resumed_at.as_ref()),
        terminated_at: format_timestamp(service.terminated_at.as_ref()),
        created_at: format_timestamp(service.created_at.as_ref()),
        updated_at: format_timestamp(service.updated_at.as_ref()),
    }
}

pub fn flatten_deployment(deployment: &model::Deployment) -> ProviderResult<DeploymentState> {
    Ok(DeploymentState {
        id: text(deployment.id.as_ref()),
        parent_id: text(deployment.parent_id.as_ref()),
        child_id: text(deployment.child_id.as_ref()),
        status: text(deployment.status.as_ref()),
        messages: join_messages(deployment.messages.as_ref()),
        version: text(deployment.version.as_ref()),
        definition: deployment
            .definition
            .as_ref()
            .map(flatten_definition)
            .transpose()?,
        allocated_at: format_timestamp(deployment.allocated_at.as_ref()),
        started_at: format_timestamp(deployment.started_at.as_ref()),
        succeeded_at: format_timestamp(deployment.succeeded_at.as_ref()),
        terminated_at: format_timestamp(deployment.terminated_at.as_ref()),
        created_at: format_timestamp(deployment.created_at.as_ref()),
        updated_at: format_timestamp(deployment.updated_at.as_ref()),
    })
}
