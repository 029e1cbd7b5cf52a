//! Reconciles a [`Manifest`] against the platform, recording what it
//! manages in a [`StateStore`].

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use indexmap::IndexMap;

use crate::api::KoyebApi;
use crate::api::http::HttpClient;
use crate::cancel::Cancellation;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::manifest::Manifest;
use crate::resolver::ApiResolver;
use crate::resource::{AppResource, Context, DomainResource, Instance, Resource, ServiceResource};
use crate::schema::{AppState, DefinitionConfig, DomainState, ServiceConfig, ServiceState};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    App,
    Service,
    Domain,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::App => AppResource::KIND,
            Self::Service => ServiceResource::KIND,
            Self::Domain => DomainResource::KIND,
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    /// Delete then create, because `field` cannot change in place.
    Replace { field: &'static str },
    Delete,
    NoOp,
}

impl Action {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
            Self::NoOp => "=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: Kind,
    pub address: String,
    pub action: Action,
}

impl Change {
    fn new(kind: Kind, address: &str, action: Action) -> Self {
        Self {
            kind,
            address: address.to_string(),
            action,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>3} {} {}",
            self.action.symbol(),
            self.kind,
            self.address
        )?;
        if let Action::Replace { field } = self.action {
            write!(f, " ({field} changed)")?;
        }
        Ok(())
    }
}

/// Ordered changes: deletions first (domains, services, apps), then
/// creations and updates (apps, services, domains).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub changes: Vec<Change>,
}

impl Plan {
    /// Changes other than no-ops.
    pub fn pending(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.action != Action::NoOp)
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.pending().next().is_some()
    }

    /// Look up the planned action for an address of the given kind.
    #[must_use]
    pub fn action(&self, kind: Kind, address: &str) -> Option<Action> {
        self.changes
            .iter()
            .find(|c| c.kind == kind && c.address == address)
            .map(|c| c.action)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mut create, mut update, mut replace, mut delete) = (0, 0, 0, 0);
        for change in self.pending() {
            writeln!(f, "{change}")?;
            match change.action {
                Action::Create => create += 1,
                Action::Update => update += 1,
                Action::Replace { .. } => replace += 1,
                Action::Delete => delete += 1,
                Action::NoOp => {}
            }
        }
        write!(
            f,
            "Plan: {create} to create, {update} to update, {replace} to replace, {delete} to delete."
        )
    }
}

/// Drives the resource handlers for a whole manifest.
pub struct Provider<'a> {
    api: &'a dyn KoyebApi,
    resolver: ApiResolver<'a>,
    cancel: Cancellation,
    poll_interval: Duration,
}

impl<'a> Provider<'a> {
    #[must_use]
    pub fn new(api: &'a dyn KoyebApi) -> Self {
        Self {
            api,
            resolver: ApiResolver::new(api),
            cancel: Cancellation::new(),
            poll_interval: Duration::from_secs(2),
        }
    }

    #[must_use]
    pub fn cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn context(&self) -> Context<'_> {
        Context::new(self.api, &self.resolver, &self.cancel).poll_interval(self.poll_interval)
    }

    /// Re-read every tracked resource. Resources deleted out of band
    /// are dropped from the store.
    pub fn refresh(&self, store: &mut StateStore) -> ProviderResult<()> {
        let ctx = self.context();
        refresh_entries(&ctx, AppResource, &mut store.apps)?;
        refresh_entries(&ctx, ServiceResource, &mut store.services)?;
        refresh_entries(&ctx, DomainResource, &mut store.domains)?;
        Ok(())
    }

    /// Compare the manifest with the store. Makes no remote calls.
    #[must_use]
    pub fn plan(&self, manifest: &Manifest, store: &StateStore) -> Plan {
        let (app_deletes, app_upserts) = diff(
            &AppResource,
            Kind::App,
            &manifest.app_entries(),
            &store.apps,
            AppState::config,
        );
        let (service_deletes, service_upserts) = diff(
            &ServiceResource,
            Kind::Service,
            &manifest.service_entries(),
            &store.services,
            prior_service,
        );
        let (domain_deletes, domain_upserts) = diff(
            &DomainResource,
            Kind::Domain,
            &manifest.domain_entries(),
            &store.domains,
            DomainState::config,
        );

        let changes = [
            domain_deletes,
            service_deletes,
            app_deletes,
            app_upserts,
            service_upserts,
            domain_upserts,
        ]
        .into_iter()
        .flatten()
        .collect();
        Plan { changes }
    }

    /// Carry out `plan`. The store is updated after every change, so it
    /// stays accurate when a later change fails.
    pub fn apply(
        &self,
        manifest: &Manifest,
        plan: &Plan,
        store: &mut StateStore,
    ) -> ProviderResult<usize> {
        let ctx = self.context();
        let apps = manifest.app_entries();
        let services = manifest.service_entries();
        let domains = manifest.domain_entries();

        let mut applied = 0;
        for change in plan.pending() {
            tracing::info!(
                kind = %change.kind,
                address = %change.address,
                action = ?change.action,
                "applying change"
            );
            match change.kind {
                Kind::App => apply_change(&ctx, AppResource, change, &apps, &mut store.apps)?,
                Kind::Service => {
                    apply_change(&ctx, ServiceResource, change, &services, &mut store.services)?;
                }
                Kind::Domain => {
                    apply_change(&ctx, DomainResource, change, &domains, &mut store.domains)?;
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Delete every tracked resource: domains, then services, then apps.
    pub fn destroy(&self, store: &mut StateStore) -> ProviderResult<()> {
        let ctx = self.context();
        destroy_entries(&ctx, DomainResource, &mut store.domains)?;
        destroy_entries(&ctx, ServiceResource, &mut store.services)?;
        destroy_entries(&ctx, AppResource, &mut store.apps)?;
        Ok(())
    }
}

fn prior_service(state: &ServiceState) -> ServiceConfig {
    state
        .config()
        .unwrap_or_else(|| ServiceConfig::new(&state.app_name, DefinitionConfig::new(&state.name)))
}

fn diff<R: Resource>(
    resource: &R,
    kind: Kind,
    desired: &IndexMap<String, &R::Config>,
    current: &IndexMap<String, R::State>,
    prior: impl Fn(&R::State) -> R::Config,
) -> (Vec<Change>, Vec<Change>) {
    let deletes = current
        .keys()
        .filter(|address| !desired.contains_key(*address))
        .map(|address| Change::new(kind, address, Action::Delete))
        .collect();

    let upserts = desired
        .iter()
        .map(|(address, config)| {
            let action = match current.get(address) {
                None => Action::Create,
                Some(state) => match resource.replacement_reason(&prior(state), config) {
                    Some(field) => Action::Replace { field },
                    None if resource.in_sync(state, config) => Action::NoOp,
                    None => Action::Update,
                },
            };
            Change::new(kind, address, action)
        })
        .collect();

    (deletes, upserts)
}

fn refresh_entries<R: Resource + Copy>(
    ctx: &Context<'_>,
    resource: R,
    current: &mut IndexMap<String, R::State>,
) -> ProviderResult<()> {
    let tracked: Vec<(String, String)> = current
        .iter()
        .map(|(address, state)| (address.clone(), R::state_id(state).to_string()))
        .collect();

    for (address, id) in tracked {
        let mut instance = Instance::existing(resource, &id);
        if instance.refresh(ctx)?.is_none() {
            tracing::warn!(kind = R::KIND, %address, %id, "deleted out of band, dropping from state");
            current.shift_remove(&address);
            continue;
        }
        if let Some(state) = instance.into_state() {
            current.insert(address, state);
        }
    }
    Ok(())
}

fn apply_change<R: Resource + Copy>(
    ctx: &Context<'_>,
    resource: R,
    change: &Change,
    desired: &IndexMap<String, &R::Config>,
    current: &mut IndexMap<String, R::State>,
) -> ProviderResult<()> {
    let address = change.address.as_str();
    let config = || {
        desired.get(address).copied().ok_or_else(|| {
            ProviderError::Other(format!("{} '{address}' is not in the manifest", R::KIND))
        })
    };

    match change.action {
        Action::NoOp => {}
        Action::Delete => destroy_entry(ctx, resource, address, current)?,
        Action::Create => create_entry(ctx, resource, address, config()?, current)?,
        Action::Update => {
            let config = config()?;
            let id = current
                .get(address)
                .map(|state| R::state_id(state).to_string())
                .ok_or_else(|| {
                    ProviderError::Other(format!("{} '{address}' is not tracked", R::KIND))
                })?;
            let mut instance = Instance::existing(resource, &id);
            instance.update(ctx, config)?;
            if let Some(state) = instance.into_state() {
                current.insert(address.to_string(), state);
            }
        }
        Action::Replace { field } => {
            tracing::info!(kind = R::KIND, address, field, "replacing");
            let config = config()?;
            destroy_entry(ctx, resource, address, current)?;
            create_entry(ctx, resource, address, config, current)?;
        }
    }
    Ok(())
}

fn create_entry<R: Resource + Copy>(
    ctx: &Context<'_>,
    resource: R,
    address: &str,
    config: &R::Config,
    current: &mut IndexMap<String, R::State>,
) -> ProviderResult<()> {
    let mut instance = Instance::new(resource);
    let result = instance.create(ctx, config).map(|_| ());
    // A failed read-back still leaves a remote resource to track.
    if let Some(state) = instance.into_state() {
        current.insert(address.to_string(), state);
    }
    result
}

fn destroy_entry<R: Resource + Copy>(
    ctx: &Context<'_>,
    resource: R,
    address: &str,
    current: &mut IndexMap<String, R::State>,
) -> ProviderResult<()> {
    let Some(state) = current.get(address) else {
        return Ok(());
    };
    let mut instance = Instance::existing(resource, R::state_id(state));
    instance.destroy(ctx)?;
    current.shift_remove(address);
    Ok(())
}

fn destroy_entries<R: Resource + Copy>(
    ctx: &Context<'_>,
    resource: R,
    current: &mut IndexMap<String, R::State>,
) -> ProviderResult<()> {
    let addresses: Vec<String> = current.keys().rev().cloned().collect();
    for address in addresses {
        destroy_entry(ctx, resource, &address, current)?;
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "koyeb-provider")]
#[command(about = "Declarative management of Koyeb apps, services and domains")]
pub struct Cli {
    /// Manifest describing the desired resources
    #[arg(long, default_value = "koyeb.yaml")]
    pub manifest: PathBuf,

    /// State file recording the managed resources
    #[arg(long, default_value = "koyeb.state.json")]
    pub state: PathBuf,

    /// Cancel remote operations after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the manifest without contacting the API
    Validate,

    /// Show the changes apply would make
    Plan,

    /// Create, update and delete resources to match the manifest
    Apply,

    /// Re-read the managed resources into the state file
    Refresh,

    /// Delete every managed resource
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

/// Dispatch a parsed command line.
pub fn run(cli: &Cli) -> ProviderResult<()> {
    if matches!(cli.command, Command::Validate) {
        return cmd_validate(&cli.manifest);
    }

    let config = ProviderConfig::from_env()?;
    let client = HttpClient::new(config.clone());
    client.check_prerequisites()?;

    let cancel = cli.timeout.map_or_else(Cancellation::new, |secs| {
        Cancellation::with_timeout(Duration::from_secs(secs))
    });
    let provider = Provider::new(&client)
        .cancellation(cancel)
        .poll_interval(config.poll_interval);
    let mut store = StateStore::load(&cli.state)?;

    match &cli.command {
        Command::Validate => Ok(()),
        Command::Plan => cmd_plan(&provider, &cli.manifest, &mut store),
        Command::Apply => cmd_apply(&provider, cli, &mut store),
        Command::Refresh => cmd_refresh(&provider, &cli.state, &mut store),
        Command::Destroy { yes } => cmd_destroy(&provider, &cli.state, &mut store, *yes),
    }
}

fn load_manifest(path: &Path) -> ProviderResult<Manifest> {
    let manifest = Manifest::load(path)?;
    for warning in manifest.validate()? {
        eprintln!("Warning: {warning}");
    }
    Ok(manifest)
}

fn cmd_validate(path: &Path) -> ProviderResult<()> {
    let manifest = load_manifest(path)?;
    eprintln!(
        "{} is valid: {} apps, {} services, {} domains",
        path.display(),
        manifest.apps.len(),
        manifest.services.len(),
        manifest.domains.len()
    );
    Ok(())
}

fn cmd_plan(provider: &Provider<'_>, manifest: &Path, store: &mut StateStore) -> ProviderResult<()> {
    let manifest = load_manifest(manifest)?;
    provider.refresh(store)?;

    let plan = provider.plan(&manifest, store);
    if plan.has_changes() {
        println!("{plan}");
    } else {
        println!("No changes. Resources match the manifest.");
    }
    Ok(())
}

fn cmd_apply(provider: &Provider<'_>, cli: &Cli, store: &mut StateStore) -> ProviderResult<()> {
    let manifest = load_manifest(&cli.manifest)?;
    provider.refresh(store)?;
    store.save(&cli.state)?;

    let plan = provider.plan(&manifest, store);
    if !plan.has_changes() {
        eprintln!("No changes. Resources match the manifest.");
        return Ok(());
    }
    println!("{plan}");

    let result = provider.apply(&manifest, &plan, store);
    store.save(&cli.state)?;
    let applied = result?;

    eprintln!();
    eprintln!("Apply complete! {applied} changes applied.");
    Ok(())
}

fn cmd_refresh(provider: &Provider<'_>, state: &Path, store: &mut StateStore) -> ProviderResult<()> {
    provider.refresh(store)?;
    store.save(state)?;
    eprintln!("Refreshed {} resources.", store.len());
    Ok(())
}

fn cmd_destroy(
    provider: &Provider<'_>,
    state: &Path,
    store: &mut StateStore,
    yes: bool,
) -> ProviderResult<()> {
    provider.refresh(store)?;
    store.save(state)?;
    if store.is_empty() {
        eprintln!("Nothing to destroy.");
        return Ok(());
    }

    eprintln!("WARNING: This will permanently delete:");
    for address in store.domains.keys() {
        eprintln!("  domain {address}");
    }
    for address in store.services.keys() {
        eprintln!("  service {address}");
    }
    for address in store.apps.keys() {
        eprintln!("  app {address} and every service it still has");
    }
    eprintln!();

    if !yes {
        eprint!("Are you sure? Type 'yes' to confirm: ");
        std::io::stderr().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "yes" {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let result = provider.destroy(store);
    store.save(state)?;
    result?;

    eprintln!();
    eprintln!("Cleanup complete!");
    Ok(())
}
