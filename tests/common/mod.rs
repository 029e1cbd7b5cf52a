//! In-memory stand-in for the Koyeb API.
//!
//! Service deletion is asynchronous like on the platform: a deleted
//! service is listed as `DELETING` for `deletion_lag` more listings,
//! then disappears. Apps cannot be deleted while any service remains.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use koyeb_provider::api::KoyebApi;
use koyeb_provider::api::model::{
    App, AppList, CreateApp, CreateDomain, CreateService, Deployment, Domain, DomainList,
    ListOptions, Service, ServiceList, ServiceStatus, UpdateDomain, UpdateService,
};
use koyeb_provider::{
    AppConfig, Cancellation, Context, DefinitionConfig, DockerSource, IdResolver, Protocol,
    ProviderError, ProviderResult, ServiceConfig,
};

pub const FAST_POLL: Duration = Duration::from_millis(1);

struct FakeService {
    service: Service,
    /// Listings left before a deleting service disappears.
    remaining: Option<u32>,
}

#[derive(Default)]
struct Inner {
    next_id: u32,
    apps: IndexMap<String, App>,
    services: IndexMap<String, FakeService>,
    deployments: HashMap<String, Deployment>,
    domains: IndexMap<String, Domain>,
    calls: Vec<String>,
    failures: HashMap<String, u16>,
    vanishing: HashSet<String>,
    service_updates: Vec<UpdateService>,
    deletion_lag: u32,
    trip: Option<(String, Cancellation)>,
}

impl Inner {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn record(&mut self, call: String) -> ProviderResult<()> {
        let injected = self.failures.get(&call).copied();
        if let Some((_, token)) = self.trip.as_ref().filter(|(trigger, _)| *trigger == call) {
            token.cancel();
        }
        self.calls.push(call.clone());
        match injected {
            Some(404) => Err(ProviderError::NotFound {
                kind: "resource",
                id: call,
            }),
            Some(status) => Err(ProviderError::Api {
                request: call.clone(),
                operation: call,
                id: String::new(),
                status,
                body: r#"{"error":"injected"}"#.into(),
            }),
            None => Ok(()),
        }
    }

    fn age_deleting_services(&mut self) {
        let mut gone = Vec::new();
        for (id, svc) in &mut self.services {
            match svc.remaining {
                Some(0) => gone.push(id.clone()),
                Some(n) => svc.remaining = Some(n - 1),
                None => {}
            }
        }
        for id in gone {
            self.services.shift_remove(&id);
        }
    }
}

fn not_found(kind: &'static str, id: &str) -> ProviderError {
    ProviderError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn page<T: Clone>(items: &[T], opts: &ListOptions) -> (Vec<T>, i64) {
    let offset = usize::try_from(opts.offset.unwrap_or(0)).unwrap();
    let limit = opts.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap());
    let total = i64::try_from(items.len()).unwrap();
    (
        items.iter().skip(offset).take(limit).cloned().collect(),
        total,
    )
}

#[derive(Default)]
pub struct FakeApi {
    inner: Mutex<Inner>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep deleted services listed as `DELETING` for `lag` listings.
    pub fn with_deletion_lag(self, lag: u32) -> Self {
        self.inner.lock().unwrap().deletion_lag = lag;
        self
    }

    /// Make every call named `call` (e.g. `delete_service:svc-2`) fail
    /// with `status`.
    pub fn fail(&self, call: &str, status: u16) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(call.to_string(), status);
    }

    /// Cancel `token` as soon as `call` is answered, as a timeout
    /// firing mid-operation would.
    pub fn cancel_after(&self, call: &str, token: &Cancellation) {
        self.inner.lock().unwrap().trip = Some((call.to_string(), token.clone()));
    }

    /// Make the service disappear the moment a delete is issued for it,
    /// so the delete call itself answers 404.
    pub fn vanish_on_delete(&self, service_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .vanishing
            .insert(service_id.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn service_updates(&self) -> Vec<UpdateService> {
        self.inner.lock().unwrap().service_updates.clone()
    }

    pub fn has_app(&self, id: &str) -> bool {
        self.inner.lock().unwrap().apps.contains_key(id)
    }

    pub fn has_service(&self, id: &str) -> bool {
        self.inner.lock().unwrap().services.contains_key(id)
    }

    pub fn has_domain(&self, id: &str) -> bool {
        self.inner.lock().unwrap().domains.contains_key(id)
    }

    pub fn service_status(&self, id: &str) -> Option<ServiceStatus> {
        self.inner
            .lock()
            .unwrap()
            .services
            .get(id)
            .and_then(|s| s.service.status)
    }

    pub fn app_count(&self) -> usize {
        self.inner.lock().unwrap().apps.len()
    }

    pub fn service_count(&self) -> usize {
        self.inner.lock().unwrap().services.len()
    }

    pub fn domain_count(&self) -> usize {
        self.inner.lock().unwrap().domains.len()
    }

    /// Seed an app directly, bypassing the call log.
    pub fn seed_app(&self, name: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.id("app");
        inner.apps.insert(
            id.clone(),
            App {
                id: Some(id.clone()),
                name: Some(name.to_string()),
                organization_id: Some("org-1".into()),
                created_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
                ..App::default()
            },
        );
        id
    }

    /// Seed a running service under `app_id`.
    pub fn seed_service(&self, app_id: &str, name: &str) -> String {
        self.seed_service_with_status(app_id, name, ServiceStatus::Healthy)
    }

    pub fn seed_service_with_status(
        &self,
        app_id: &str,
        name: &str,
        status: ServiceStatus,
    ) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.id("svc");
        let remaining = status.is_terminal().then_some(inner.deletion_lag);
        inner.services.insert(
            id.clone(),
            FakeService {
                service: Service {
                    id: Some(id.clone()),
                    name: Some(name.to_string()),
                    app_id: Some(app_id.to_string()),
                    status: Some(status),
                    ..Service::default()
                },
                remaining,
            },
        );
        id
    }

    /// Keep a deleting service listed forever.
    pub fn stick_in_deleting(&self, service_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(svc) = inner.services.get_mut(service_id) {
            svc.service.status = Some(ServiceStatus::Deleting);
            svc.remaining = Some(u32::MAX);
        }
    }

    /// Delete an app behind the provider's back, services included.
    pub fn remove_app_out_of_band(&self, app_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.apps.shift_remove(app_id);
        inner
            .services
            .retain(|_, s| s.service.app_id.as_deref() != Some(app_id));
    }

    pub fn remove_service_out_of_band(&self, service_id: &str) {
        self.inner.lock().unwrap().services.shift_remove(service_id);
    }

    pub fn remove_domain_out_of_band(&self, domain_id: &str) {
        self.inner.lock().unwrap().domains.shift_remove(domain_id);
    }
}

impl KoyebApi for FakeApi {
    fn list_apps(&self, opts: &ListOptions) -> ProviderResult<AppList> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("list_apps".into())?;
        let matching: Vec<App> = inner
            .apps
            .values()
            .filter(|a| opts.name.is_none() || a.name == opts.name)
            .cloned()
            .collect();
        let (apps, count) = page(&matching, opts);
        Ok(AppList {
            apps,
            limit: i64::from(opts.limit.unwrap_or(0)),
            offset: i64::from(opts.offset.unwrap_or(0)),
            count,
        })
    }

    fn get_app(&self, id: &str) -> ProviderResult<App> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("get_app:{id}"))?;
        inner.apps.get(id).cloned().ok_or_else(|| not_found("app", id))
    }

    fn create_app(&self, body: &CreateApp) -> ProviderResult<App> {
        let mut inner = self.inner.lock().unwrap();
        let name = body.name.clone().unwrap_or_default();
        inner.record(format!("create_app:{name}"))?;
        if inner.apps.values().any(|a| a.name.as_deref() == Some(&name)) {
            return Err(ProviderError::Api {
                operation: "create app".into(),
                id: name,
                status: 409,
                request: String::new(),
                body: r#"{"error":"name already taken"}"#.into(),
            });
        }
        let id = inner.id("app");
        let app = App {
            id: Some(id.clone()),
            name: Some(name),
            organization_id: Some("org-1".into()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            ..App::default()
        };
        inner.apps.insert(id, app.clone());
        Ok(app)
    }

    fn delete_app(&self, id: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("delete_app:{id}"))?;
        if inner
            .services
            .values()
            .any(|s| s.service.app_id.as_deref() == Some(id))
        {
            return Err(ProviderError::Api {
                operation: "delete app".into(),
                id: id.to_string(),
                status: 400,
                request: String::new(),
                body: r#"{"error":"app still has services"}"#.into(),
            });
        }
        inner
            .apps
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("app", id))
    }

    fn list_services(
        &self,
        app_id: Option<&str>,
        opts: &ListOptions,
    ) -> ProviderResult<ServiceList> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("list_services:{}", app_id.unwrap_or("*")))?;
        inner.age_deleting_services();
        let matching: Vec<Service> = inner
            .services
            .values()
            .filter(|s| app_id.is_none() || s.service.app_id.as_deref() == app_id)
            .map(|s| s.service.clone())
            .collect();
        let (services, count) = page(&matching, opts);
        Ok(ServiceList {
            services,
            limit: i64::from(opts.limit.unwrap_or(0)),
            offset: i64::from(opts.offset.unwrap_or(0)),
            count,
        })
    }

    fn get_service(&self, id: &str) -> ProviderResult<Service> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("get_service:{id}"))?;
        inner
            .services
            .get(id)
            .map(|s| s.service.clone())
            .ok_or_else(|| not_found("service", id))
    }

    fn create_service(&self, body: &CreateService) -> ProviderResult<Service> {
        let mut inner = self.inner.lock().unwrap();
        let app_id = body.app_id.clone().unwrap_or_default();
        inner.record(format!("create_service:{app_id}"))?;
        if !inner.apps.contains_key(&app_id) {
            return Err(ProviderError::Api {
                operation: "create service".into(),
                id: app_id,
                status: 400,
                request: String::new(),
                body: r#"{"error":"unknown app"}"#.into(),
            });
        }

        let id = inner.id("svc");
        let deployment_id = inner.id("dep");
        inner.deployments.insert(
            deployment_id.clone(),
            Deployment {
                id: Some(deployment_id.clone()),
                service_id: Some(id.clone()),
                status: Some("HEALTHY".into()),
                definition: body.definition.clone(),
                ..Deployment::default()
            },
        );
        let service = Service {
            id: Some(id.clone()),
            name: body.definition.as_ref().and_then(|d| d.name.clone()),
            app_id: Some(app_id),
            organization_id: Some("org-1".into()),
            active_deployment_id: Some(deployment_id.clone()),
            latest_deployment_id: Some(deployment_id),
            status: Some(ServiceStatus::Healthy),
            version: Some("1".into()),
            ..Service::default()
        };
        inner.services.insert(
            id,
            FakeService {
                service: service.clone(),
                remaining: None,
            },
        );
        Ok(service)
    }

    fn update_service(&self, id: &str, body: &UpdateService) -> ProviderResult<Service> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("update_service:{id}"))?;
        if !inner.services.contains_key(id) {
            return Err(not_found("service", id));
        }
        inner.service_updates.push(body.clone());

        let deployment_id = inner.id("dep");
        let parent = inner
            .services
            .get(id)
            .and_then(|s| s.service.latest_deployment_id.clone());
        inner.deployments.insert(
            deployment_id.clone(),
            Deployment {
                id: Some(deployment_id.clone()),
                service_id: Some(id.to_string()),
                parent_id: parent,
                status: Some("HEALTHY".into()),
                definition: body.definition.clone(),
                ..Deployment::default()
            },
        );

        let svc = inner
            .services
            .get_mut(id)
            .ok_or_else(|| not_found("service", id))?;
        svc.service.latest_deployment_id = Some(deployment_id);
        Ok(svc.service.clone())
    }

    fn delete_service(&self, id: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("delete_service:{id}"))?;
        if inner.vanishing.remove(id) {
            inner.services.shift_remove(id);
            return Err(not_found("service", id));
        }
        let lag = inner.deletion_lag;
        let svc = inner
            .services
            .get_mut(id)
            .ok_or_else(|| not_found("service", id))?;
        if svc.remaining.is_none() {
            svc.service.status = Some(ServiceStatus::Deleting);
            svc.remaining = Some(lag);
        }
        Ok(())
    }

    fn get_deployment(&self, id: &str) -> ProviderResult<Deployment> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("get_deployment:{id}"))?;
        inner
            .deployments
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("deployment", id))
    }

    fn list_domains(&self, opts: &ListOptions) -> ProviderResult<DomainList> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("list_domains".into())?;
        let all: Vec<Domain> = inner.domains.values().cloned().collect();
        let (domains, count) = page(&all, opts);
        Ok(DomainList {
            domains,
            limit: i64::from(opts.limit.unwrap_or(0)),
            offset: i64::from(opts.offset.unwrap_or(0)),
            count,
        })
    }

    fn get_domain(&self, id: &str) -> ProviderResult<Domain> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("get_domain:{id}"))?;
        inner
            .domains
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("domain", id))
    }

    fn create_domain(&self, body: &CreateDomain) -> ProviderResult<Domain> {
        let mut inner = self.inner.lock().unwrap();
        let name = body.name.clone().unwrap_or_default();
        inner.record(format!("create_domain:{name}"))?;
        let id = inner.id("dom");
        let domain = Domain {
            id: Some(id.clone()),
            name: Some(name.clone()),
            app_id: body.app_id.clone().filter(|a| !a.is_empty()),
            organization_id: Some("org-1".into()),
            kind: body.kind.clone(),
            status: Some("PENDING".into()),
            intended_cname: Some(format!("{name}.cname.koyeb.app")),
            ..Domain::default()
        };
        inner.domains.insert(id, domain.clone());
        Ok(domain)
    }

    fn update_domain(&self, id: &str, body: &UpdateDomain) -> ProviderResult<Domain> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("update_domain:{id}"))?;
        let domain = inner
            .domains
            .get_mut(id)
            .ok_or_else(|| not_found("domain", id))?;
        domain.app_id = body.app_id.clone().filter(|a| !a.is_empty());
        Ok(domain.clone())
    }

    fn delete_domain(&self, id: &str) -> ProviderResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(format!("delete_domain:{id}"))?;
        inner
            .domains
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found("domain", id))
    }
}

/// Resolver answering from a fixed table, for tests that should not
/// depend on the apps endpoints.
pub struct StaticResolver(pub Vec<(String, String)>);

impl IdResolver for StaticResolver {
    fn app_id(&self, name: &str, _cancel: &Cancellation) -> ProviderResult<String> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone())
            .ok_or_else(|| not_found("app", name))
    }

    fn app_name(&self, id: &str, _cancel: &Cancellation) -> ProviderResult<String> {
        self.0
            .iter()
            .find(|(_, i)| i == id)
            .map(|(n, _)| n.clone())
            .ok_or_else(|| not_found("app", id))
    }
}

pub fn context<'a>(
    api: &'a dyn KoyebApi,
    resolver: &'a dyn IdResolver,
    cancel: &'a Cancellation,
) -> Context<'a> {
    Context::new(api, resolver, cancel).poll_interval(FAST_POLL)
}

pub fn web_definition() -> DefinitionConfig {
    DefinitionConfig::new("web")
        .docker(DockerSource::new("koyeb/demo"))
        .env("PORT", "8080")
        .port(8080, Protocol::Http)
        .route(8080, "/")
        .instance_type("nano")
        .region("fra")
}

pub fn web_service(app_name: &str) -> ServiceConfig {
    ServiceConfig::new(app_name, web_definition())
}

pub fn demo_app() -> AppConfig {
    AppConfig::new("demo-app")
}
