//! Field codec between declarative configuration and the wire model.
//!
//! `expand_*` turns validated configuration into API requests and only
//! sets the fields that were declared. `flatten_*` turns API resources
//! back into configuration and state.

pub mod app;
pub mod definition;
pub mod domain;
pub mod service;

pub use app::{expand_app, flatten_app};
pub use definition::{expand_definition, flatten_definition};
pub use domain::{expand_domain, expand_domain_update, flatten_domain};
pub use service::{expand_service, expand_service_update, flatten_deployment, flatten_service};

use chrono::{DateTime, Datelike, Utc};

/// Layout of decoded timestamps, in UTC.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S +0000 UTC";

/// Render a remote timestamp. Absent timestamps and the zero time the
/// API reports for unset fields both render as an empty string.
#[must_use]
pub fn format_timestamp(ts: Option<&DateTime<Utc>>) -> String {
    match ts {
        Some(ts) if ts.year() > 1 => ts.format(TIMESTAMP_FORMAT).to_string(),
        _ => String::new(),
    }
}

/// Join status messages into the single string kept in state.
#[must_use]
pub fn join_messages(messages: Option<&Vec<String>>) -> String {
    messages.map(|m| m.join(" ")).unwrap_or_default()
}

fn text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}
