use crate::codec;
use crate::error::{ProviderError, ProviderResult};
use crate::resource::{Context, Resource, absent_on_not_found};
use crate::schema::{DomainConfig, DomainState};

/// Custom domains. The attached app can change in place, the name
/// cannot.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainResource;

fn resolve_app(ctx: &Context<'_>, app_name: Option<&str>) -> ProviderResult<Option<String>> {
    app_name.map(|name| ctx.resolver.app_id(name, ctx.cancel)).transpose()
}

impl Resource for DomainResource {
    type Config = DomainConfig;
    type State = DomainState;

    const KIND: &'static str = "domain";

    fn create(&self, ctx: &Context<'_>, config: &DomainConfig) -> ProviderResult<DomainState> {
        config.validate()?;
        ctx.checkpoint("resolving app")?;
        let app_id = resolve_app(ctx, config.app_name.as_deref())?;

        ctx.checkpoint("creating domain")?;
        let domain = ctx
            .api
            .create_domain(&codec::expand_domain(config, app_id))?;
        let created = codec::flatten_domain(&domain, config.app_name.clone());
        tracing::info!(domain = %created.name, domain_id = %created.id, "created domain");
        Ok(created)
    }

    fn read(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<Option<DomainState>> {
        ctx.checkpoint("reading domain")?;
        let Some(domain) = absent_on_not_found(ctx.api.get_domain(id))? else {
            return Ok(None);
        };
        if domain.status.as_deref() == Some("DELETED") {
            return Ok(None);
        }

        let app_name = match domain.app_id.as_deref().filter(|a| !a.is_empty()) {
            Some(app_id) => absent_on_not_found(ctx.resolver.app_name(app_id, ctx.cancel))?,
            None => None,
        };
        Ok(Some(codec::flatten_domain(&domain, app_name)))
    }

    fn update(
        &self,
        ctx: &Context<'_>,
        id: &str,
        config: &DomainConfig,
    ) -> ProviderResult<DomainState> {
        config.validate()?;
        let current = self.read(ctx, id)?.ok_or_else(|| ProviderError::NotFound {
            kind: Self::KIND,
            id: id.to_string(),
        })?;
        if current.name != config.name {
            return Err(ProviderError::ForceNew {
                kind: Self::KIND,
                field: "name",
            });
        }
        if current.app_name == config.app_name {
            return Ok(current);
        }

        ctx.checkpoint("resolving app")?;
        let app_id = resolve_app(ctx, config.app_name.as_deref())?;
        ctx.checkpoint("updating domain")?;
        let domain = ctx
            .api
            .update_domain(id, &codec::expand_domain_update(app_id))?;
        tracing::info!(
            domain_id = id,
            app_name = config.app_name.as_deref().unwrap_or("<none>"),
            "updated domain attachment"
        );

        let updated = codec::flatten_domain(&domain, config.app_name.clone());
        Ok(self.read(ctx, id)?.unwrap_or(updated))
    }

    fn delete(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<()> {
        ctx.checkpoint("deleting domain")?;
        match ctx.api.delete_domain(id) {
            Ok(()) => tracing::info!(domain_id = id, "deleted domain"),
            Err(e) if e.is_not_found() => tracing::info!(domain_id = id, "domain already gone"),
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn replacement_reason(&self, prior: &DomainConfig, next: &DomainConfig) -> Option<&'static str> {
        (prior.name != next.name).then_some("name")
    }

    fn in_sync(&self, state: &DomainState, config: &DomainConfig) -> bool {
        state.name == config.name && state.app_name == config.app_name
    }

    fn state_id(state: &DomainState) -> &str {
        &state.id
    }
}
