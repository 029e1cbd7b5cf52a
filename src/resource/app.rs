use crate::codec;
use crate::deletion;
use crate::error::{ProviderError, ProviderResult};
use crate::resource::{Context, Resource, absent_on_not_found};
use crate::schema::{AppConfig, AppState};

/// Apps: created and deleted, never updated in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppResource;

impl Resource for AppResource {
    type Config = AppConfig;
    type State = AppState;

    const KIND: &'static str = "app";

    fn create(&self, ctx: &Context<'_>, config: &AppConfig) -> ProviderResult<AppState> {
        config.validate()?;
        ctx.checkpoint("creating app")?;

        let app = ctx.api.create_app(&codec::expand_app(config))?;
        let created = codec::flatten_app(&app);
        tracing::info!(app_name = %created.name, app_id = %created.id, "created app");
        Ok(created)
    }

    fn read(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<Option<AppState>> {
        ctx.checkpoint("reading app")?;
        let app = absent_on_not_found(ctx.api.get_app(id))?;
        Ok(app.as_ref().map(codec::flatten_app))
    }

    fn update(&self, ctx: &Context<'_>, id: &str, config: &AppConfig) -> ProviderResult<AppState> {
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
        Ok(current)
    }

    fn delete(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<()> {
        deletion::delete_app(ctx, id)?;
        Ok(())
    }

    fn replacement_reason(&self, prior: &AppConfig, next: &AppConfig) -> Option<&'static str> {
        (prior.name != next.name).then_some("name")
    }

    fn in_sync(&self, state: &AppState, config: &AppConfig) -> bool {
        state.name == config.name
    }

    fn state_id(state: &AppState) -> &str {
        &state.id
    }
}
