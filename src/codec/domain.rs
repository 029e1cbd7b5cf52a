use crate::api::model;
use crate::codec::{format_timestamp, join_messages, text};
use crate::schema::{DomainConfig, DomainState};

/// Domains managed here are always custom hostnames; auto-assigned ones
/// belong to the platform.
pub const CUSTOM_DOMAIN: &str = "CUSTOM";

/// Encode a domain creation. `app_id` is the already resolved id of
/// `config.app_name`.
#[must_use]
pub fn expand_domain(config: &DomainConfig, app_id: Option<String>) -> model::CreateDomain {
    model::CreateDomain {
        name: Some(config.name.clone()),
        kind: Some(CUSTOM_DOMAIN.to_string()),
        app_id,
    }
}

/// Encode an attach (`Some(id)`) or detach (`None`) of a domain.
#[must_use]
pub fn expand_domain_update(app_id: Option<String>) -> model::UpdateDomain {
    model::UpdateDomain {
        app_id: Some(app_id.unwrap_or_default()),
    }
}

#[must_use]
pub fn flatten_domain(domain: &model::Domain, app_name: Option<String>) -> DomainState {
    DomainState {
        id: text(domain.id.as_ref()),
        name: text(domain.name.as_ref()),
        app_name,
        organization_id: text(domain.organization_id.as_ref()),
        kind: text(domain.kind.as_ref()),
        status: text(domain.status.as_ref()),
        messages: join_messages(domain.messages.as_ref()),
        intended_cname: text(domain.intended_cname.as_ref()),
        version: text(domain.version.as_ref()),
        verified_at: format_timestamp(domain.verified_at.as_ref()),
        created_at: format_timestamp(domain.created_at.as_ref()),
        updated_at: format_timestamp(domain.updated_at.as_ref()),
    }
}
