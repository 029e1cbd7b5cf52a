//! # koyeb-provider
//!
//! Declarative management of [Koyeb](https://www.koyeb.com) apps,
//! services and custom domains.
//!
//! Resources are described either in code, through builder methods on
//! the [`schema`] types, or in a YAML [`Manifest`]. The [`Provider`]
//! compares them with the state recorded by earlier runs, then creates,
//! updates, replaces or deletes remote resources until both agree.
//!
//! ## Resource lifecycle
//!
//! Each resource kind implements [`Resource`]: create, read, update and
//! delete against the [`KoyebApi`] seam, plus the list of fields that
//! force a replacement. Reads that hit a 404 report the resource as
//! gone instead of failing, so drift is absorbed by the next plan.
//!
//! ## App deletion
//!
//! Koyeb refuses to delete an app that still has services, and service
//! deletions complete asynchronously. Deleting an app therefore drains
//! its services first; see [`deletion`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use koyeb_provider::{
//!     AppConfig, DefinitionConfig, DockerSource, HttpClient, Manifest, Protocol, Provider,
//!     ProviderConfig, ServiceConfig, StateStore,
//! };
//!
//! fn main() -> anyhow::Result<()> {
//!     let manifest = Manifest::default()
//!         .app(AppConfig::new("demo-app"))
//!         .service(ServiceConfig::new(
//!             "demo-app",
//!             DefinitionConfig::new("web")
//!                 .docker(DockerSource::new("koyeb/demo"))
//!                 .port(8080, Protocol::Http)
//!                 .route(8080, "/")
//!                 .instance_type("nano")
//!                 .region("fra"),
//!         ));
//!     manifest.validate()?;
//!
//!     let client = HttpClient::new(ProviderConfig::from_env()?);
//!     let provider = Provider::new(&client);
//!
//!     let mut store = StateStore::default();
//!     let plan = provider.plan(&manifest, &store);
//!     println!("{plan}");
//!     provider.apply(&manifest, &plan, &mut store)?;
//!     Ok(())
//! }
//! ```
//!
//! The `koyeb-provider` binary wraps the same flow:
//!
//! ```sh
//! export KOYEB_TOKEN=...
//! koyeb-provider validate
//! koyeb-provider plan
//! koyeb-provider apply
//! koyeb-provider destroy
//! ```
//!
//! [`Resource`]: resource::Resource

// Allow noisy pedantic lints that don't add value for a
// provider crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod api;
pub mod cancel;
pub mod cmd;
pub mod codec;
pub mod config;
pub mod deletion;
pub mod error;
pub mod manifest;
pub mod provider;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod store;

pub use api::KoyebApi;
pub use api::http::HttpClient;
pub use cancel::Cancellation;
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use manifest::Manifest;
pub use provider::{Action, Change, Kind, Plan, Provider};
pub use resolver::{ApiResolver, IdResolver};
pub use resource::{AppResource, Context, DomainResource, Instance, Phase, ServiceResource};
pub use schema::{
    AppConfig, AppState, DefinitionConfig, DeploymentState, DockerSource, DomainConfig,
    DomainState, EnvVar, GitSource, InstanceType, Port, Protocol, Route, Scaling, ServiceConfig,
    ServiceState,
};
pub use store::StateStore;
