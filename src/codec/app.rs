use crate::api::model;
use crate::codec::{flatten_domain, format_timestamp, text};
use crate::schema::{AppConfig, AppState};

#[must_use]
pub fn expand_app(config: &AppConfig) -> model::CreateApp {
    model::CreateApp {
        name: Some(config.name.clone()),
    }
}

/// Decode an app. Its domains are tagged with the app name.
#[must_use]
pub fn flatten_app(app: &model::App) -> AppState {
    let name = text(app.name.as_ref());
    AppState {
        id: text(app.id.as_ref()),
        organization_id: text(app.organization_id.as_ref()),
        domains: app
            .domains
            .iter()
            .flatten()
            .map(|d| flatten_domain(d, Some(name.clone())))
            .collect(),
        created_at: format_timestamp(app.created_at.as_ref()),
        updated_at: format_timestamp(app.updated_at.as_ref()),
        name,
    }
}
