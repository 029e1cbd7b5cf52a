//! Create/read/update/delete handlers for each resource kind, and the
//! per-instance state machine that drives them.

pub mod app;
pub mod domain;
pub mod service;

use std::fmt;
use std::time::Duration;

use crate::api::KoyebApi;
use crate::cancel::Cancellation;
use crate::error::{ProviderError, ProviderResult};
use crate::resolver::IdResolver;

pub use app::AppResource;
pub use domain::DomainResource;
pub use service::ServiceResource;

/// Collaborators of one resource operation.
pub struct Context<'a> {
    pub api: &'a dyn KoyebApi,
    pub resolver: &'a dyn IdResolver,
    pub cancel: &'a Cancellation,
    /// Delay between service listings while an app is drained.
    pub poll_interval: Duration,
}

impl<'a> Context<'a> {
    #[must_use]
    pub const fn new(
        api: &'a dyn KoyebApi,
        resolver: &'a dyn IdResolver,
        cancel: &'a Cancellation,
    ) -> Self {
        Self {
            api,
            resolver,
            cancel,
            poll_interval: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Abort with a cancellation error if the operation was cancelled.
    pub fn checkpoint(&self, during: &str) -> ProviderResult<()> {
        self.cancel.check(during)
    }
}

/// Lifecycle handlers of one resource kind.
pub trait Resource {
    type Config;
    type State;

    /// Name used in logs and errors (`app`, `service`, `domain`).
    const KIND: &'static str;

    /// Issue the remote create. The returned state is what the create
    /// call answered; [`Instance::create`] reads it back afterwards.
    fn create(&self, ctx: &Context<'_>, config: &Self::Config) -> ProviderResult<Self::State>;

    /// Read the resource. `Ok(None)` means it no longer exists.
    fn read(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<Option<Self::State>>;

    /// Apply `config` in place. Fails with [`ProviderError::ForceNew`]
    /// when an immutable field differs.
    fn update(
        &self,
        ctx: &Context<'_>,
        id: &str,
        config: &Self::Config,
    ) -> ProviderResult<Self::State>;

    /// Delete the resource. Deleting a missing resource succeeds.
    fn delete(&self, ctx: &Context<'_>, id: &str) -> ProviderResult<()>;

    /// The immutable field that differs between two configurations, if
    /// any. Such a change requires replacing the resource.
    fn replacement_reason(&self, prior: &Self::Config, next: &Self::Config)
    -> Option<&'static str>;

    /// Whether `state` already matches `config`.
    fn in_sync(&self, state: &Self::State, config: &Self::Config) -> bool;

    fn state_id(state: &Self::State) -> &str;
}

/// Reconciliation phase of a single resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::Present => "present",
            Self::Updating => "updating",
            Self::Deleting => "deleting",
        };
        f.write_str(s)
    }
}

/// Local identity of one resource instance plus its last known state.
///
/// The id is cleared whenever the remote reports the resource gone or
/// after it was deleted.
pub struct Instance<R: Resource> {
    resource: R,
    id: Option<String>,
    phase: Phase,
    state: Option<R::State>,
}

impl<R: Resource> Instance<R> {
    /// An instance that does not exist yet.
    #[must_use]
    pub const fn new(resource: R) -> Self {
        Self {
            resource,
            id: None,
            phase: Phase::Absent,
            state: None,
        }
    }

    /// An instance known by id from a previous run.
    #[must_use]
    pub fn existing(resource: R, id: &str) -> Self {
        Self {
            resource,
            id: Some(id.to_string()),
            phase: Phase::Present,
            state: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn state(&self) -> Option<&R::State> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn into_state(self) -> Option<R::State> {
        self.state
    }

    pub fn create(&mut self, ctx: &Context<'_>, config: &R::Config) -> ProviderResult<&R::State> {
        if let Some(id) = &self.id {
            return Err(ProviderError::Other(format!(
                "{} '{id}' already exists",
                R::KIND
            )));
        }

        self.phase = Phase::Creating;
        let created = match self.resource.create(ctx, config) {
            Ok(state) => state,
            Err(e) => {
                self.phase = Phase::Absent;
                return Err(e);
            }
        };

        // The remote resource exists from here on, even if the read-back
        // below fails.
        let id = R::state_id(&created).to_string();
        self.id = Some(id.clone());
        self.phase = Phase::Present;

        match self.resource.read(ctx, &id) {
            Ok(read) => Ok(&*self.state.insert(read.unwrap_or(created))),
            Err(e) => {
                tracing::warn!(kind = R::KIND, %id, error = %e, "read after create failed");
                self.state = Some(created);
                Err(e)
            }
        }
    }

    /// Re-read the instance. A resource deleted out of band clears the
    /// local identity and yields `Ok(None)`.
    pub fn refresh(&mut self, ctx: &Context<'_>) -> ProviderResult<Option<&R::State>> {
        let Some(id) = self.id.clone() else {
            return Ok(None);
        };

        match self.resource.read(ctx, &id)? {
            Some(state) => {
                self.phase = Phase::Present;
                Ok(Some(&*self.state.insert(state)))
            }
            None => {
                tracing::info!(kind = R::KIND, %id, "resource gone, clearing identity");
                self.clear();
                Ok(None)
            }
        }
    }

    pub fn update(&mut self, ctx: &Context<'_>, config: &R::Config) -> ProviderResult<&R::State> {
        let id = self.id.clone().ok_or_else(|| {
            ProviderError::Other(format!("cannot update a {} that does not exist", R::KIND))
        })?;

        self.phase = Phase::Updating;
        match self.resource.update(ctx, &id, config) {
            Ok(state) => {
                self.phase = Phase::Present;
                Ok(&*self.state.insert(state))
            }
            Err(e) => {
                self.phase = Phase::Present;
                Err(e)
            }
        }
    }

    /// Delete the instance. An instance without identity is already gone.
    pub fn destroy(&mut self, ctx: &Context<'_>) -> ProviderResult<()> {
        let Some(id) = self.id.clone() else {
            return Ok(());
        };

        self.phase = Phase::Deleting;
        match self.resource.delete(ctx, &id) {
            Ok(()) => {
                self.clear();
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Present;
                Err(e)
            }
        }
    }

    fn clear(&mut self) {
        self.id = None;
        self.state = None;
        self.phase = Phase::Absent;
    }
}

/// Treat a 404 as "nothing there".
pub(crate) fn absent_on_not_found<T>(result: ProviderResult<T>) -> ProviderResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
