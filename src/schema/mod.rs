//! Validated configuration for each resource kind, and the state decoded
//! back from the remote API.
//!
//! Configuration types are built either from a manifest (they implement
//! `Deserialize`) or in code through builder methods, and must pass
//! `validate()` before any remote call is made.

pub mod app;
pub mod domain;
pub mod service;

pub use app::{AppConfig, AppState};
pub use domain::{DomainConfig, DomainState};
pub use service::{
    DefinitionConfig, DeploymentState, DockerSource, EnvVar, GitSource, InstanceType, Port,
    Protocol, Route, Scaling, ServiceConfig, ServiceState,
};

use crate::error::{ProviderError, ProviderResult};

pub const APP_NAME_LEN: (usize, usize) = (3, 23);
pub const DEFINITION_NAME_LEN: (usize, usize) = (3, 64);
pub const PORT_RANGE: (u32, u32) = (1, 65535);

/// Check that `value` has between `min` and `max` characters.
pub fn check_len(field: &str, value: &str, (min, max): (usize, usize)) -> ProviderResult<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ProviderError::Validation(format!(
            "{field} must be between {min} and {max} characters, got {len} ('{value}')"
        )));
    }
    Ok(())
}

/// Check that `port` is a usable TCP/UDP port number.
pub fn check_port(field: &str, port: u32) -> ProviderResult<()> {
    let (min, max) = PORT_RANGE;
    if port < min || port > max {
        return Err(ProviderError::Validation(format!(
            "{field} must be between {min} and {max}, got {port}"
        )));
    }
    Ok(())
}

pub fn check_not_empty(field: &str, value: &str) -> ProviderResult<()> {
    if value.trim().is_empty() {
        return Err(ProviderError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
