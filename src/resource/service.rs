use crate::api::model::ServiceStatus;
use crate::codec;
use crate::error::{ProviderError, ProviderResult};
use crate::resource::{Context, Resource, absent_on_not_found};
use crate::schema::{DefinitionConfig, ServiceConfig, ServiceState};

/// Services: the only kind updated in place, by replacing the whole
/// deployment definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceResource;

impl ServiceResource {
    fn latest_definition(
        ctx: &Context<'_>,
        deployment_id: Option<&str>,
    ) -> ProviderResult<Option<DefinitionConfig>> {
        let Some(deployment_id) = deployment_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };

        ctx.checkpoint("reading deployment")?;
        let Some(deployment) = absent_on_not_found(ctx.api.get_deployment(deployment_id))? else {
            return Ok(None);
        };
        deployment
            .definition
            .as_ref()
            .map(codec::flatten_definition)
            .transpose()
    }
}

impl Resource for ServiceResource {
    type Config = ServiceConfig;
    type State = ServiceState;

    const KIND: &'static str = "service";

    fn create(&self, ctx: &Context<'_>, config: &ServiceConfig) -> ProviderResult<ServiceState> {
        config.validate()?;

        ctx.checkpoint("resolving app")?;
        let app_id = ctx.resolver.app_id(&config.app_name, ctx.cancel)?;
        let body = codec::expand_service(config, &app_id)?;

        ctx.checkpoint("creating service")?;
        let service = ctx.api.create_service(&body)?;
        let created = codec::flatten_service(
            &service,
            &config.app_name,
            Some(config.definition.clone()),
        );
        tracing::info!(
            service_name = %created.name,
            service_id = %created.id,
            app_id = %app_id,
            "created service"
        );
        Ok(created)
    }

    fn read(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<Option<ServiceState>> {
        ctx.checkpoint("reading service")?;
        let Some(service) = absent_on_not_found(ctx.api.get_service(id))? else {
            return Ok(None);
        };
        if service.status == Some(ServiceStatus::Deleted) {
            return Ok(None);
        }

        let app_name = match service.app_id.as_deref().filter(|a| !a.is_empty()) {
            Some(app_id) => {
                absent_on_not_found(ctx.resolver.app_name(app_id, ctx.cancel))?.unwrap_or_default()
            }
            None => String::new(),
        };
        let definition = Self::latest_definition(ctx, service.latest_deployment_id.as_deref())?;

        Ok(Some(codec::flatten_service(&service, &app_name, definition)))
    }

    fn update(
        &self,
        ctx: &Context<'_>,
        id: &str,
        config: &ServiceConfig,
    ) -> ProviderResult<ServiceState> {
        config.validate()?;

        let current = self.read(ctx, id)?.ok_or_else(|| ProviderError::NotFound {
            kind: Self::KIND,
            id: id.to_string(),
        })?;
        if current.app_name != config.app_name {
            return Err(ProviderError::ForceNew {
                kind: Self::KIND,
                field: "app_name",
            });
        }
        if !current.name.is_empty() && current.name != config.definition.name {
            return Err(ProviderError::ForceNew {
                kind: Self::KIND,
                field: "definition.name",
            });
        }

        let body = codec::expand_service_update(&config.definition)?;
        ctx.checkpoint("updating service")?;
        let service = ctx.api.update_service(id, &body)?;
        tracing::info!(
            service_id = id,
            latest_deployment = service.latest_deployment_id.as_deref().unwrap_or_default(),
            "updated service definition"
        );

        let updated = codec::flatten_service(
            &service,
            &config.app_name,
            Some(config.definition.clone()),
        );
        Ok(self.read(ctx, id)?.unwrap_or(updated))
    }

    fn delete(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<()> {
        ctx.checkpoint("deleting service")?;
        match ctx.api.delete_service(id) {
            Ok(()) => tracing::info!(service_id = id, "deleted service"),
            Err(e) if e.is_not_found() => tracing::info!(service_id = id, "service already gone"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn replacement_reason(
        &self,
        prior: &ServiceConfig,
        next: &ServiceConfig,
    ) -> Option<&'static str> {
        if prior.app_name != next.app_name {
            Some("app_name")
        } else if prior.definition.name != next.definition.name {
            Some("definition.name")
        } else {
            None
        }
    }

    fn in_sync(&self, state: &ServiceState, config: &ServiceConfig) -> bool {
        state.app_name == config.app_name
            && state
                .definition
                .as_ref()
                .is_some_and(|def| def.same_as(&config.definition))
    }

    fn state_id(state: &ServiceState) -> &str {
        &state.id
    }
}
