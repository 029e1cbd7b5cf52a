use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use url::Url;

use crate::api::KoyebApi;
use crate::api::model::{
    App, AppList, AppReply, CreateApp, CreateDomain, CreateService, Deployment, DeploymentReply,
    Domain, DomainList, DomainReply, ListOptions, Service, ServiceList, ServiceReply,
    UpdateDomain, UpdateService,
};
use crate::cmd;
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};

/// Koyeb REST client driving `curl`.
///
/// The bearer token from [`ProviderConfig`] is handed to curl through a
/// private header file, never on the command line. Bodies are piped
/// over stdin and the HTTP status is appended to stdout with `-w`, so
/// non-2xx replies can be told apart without `--fail`.
pub struct HttpClient {
    config: ProviderConfig,
}

/// Raw reply of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// One API request and the context its errors carry.
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: &'static str,
    pub kind: &'static str,
    pub id: String,
    pub method: &'static str,
    pub url: Url,
    pub body: Option<Vec<u8>>,
}

impl Request {
    #[must_use]
    pub fn new(
        operation: &'static str,
        kind: &'static str,
        id: &str,
        method: &'static str,
        url: Url,
    ) -> Self {
        Self {
            operation,
            kind,
            id: id.to_string(),
            method,
            url,
            body: None,
        }
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: &impl Serialize) -> ProviderResult<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    /// `METHOD url [body]`, as shown in error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.body {
            Some(body) => format!(
                "{} {} {}",
                self.method,
                self.url,
                String::from_utf8_lossy(body)
            ),
            None => format!("{} {}", self.method, self.url),
        }
    }

    fn transport(&self, message: String) -> ProviderError {
        ProviderError::Transport {
            operation: self.operation.to_string(),
            id: self.id.clone(),
            request: self.describe(),
            message,
        }
    }

    fn missing(&self, what: &str) -> ProviderError {
        self.transport(format!("response carried no {what}"))
    }
}

impl HttpClient {
    #[must_use]
    pub const fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    pub fn check_prerequisites(&self) -> ProviderResult<()> {
        if !cmd::command_exists("curl") {
            return Err(ProviderError::CommandNotFound(
                "curl is required to talk to the Koyeb API".into(),
            ));
        }
        Ok(())
    }

    /// Build an endpoint URL below the configured API root.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> ProviderResult<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.config.api_url))
            .map_err(|e| ProviderError::Other(format!("invalid API URL: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Write the request headers to a file only the current user can
    /// read. It is removed when the returned handle drops.
    fn header_file(&self) -> ProviderResult<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "Authorization: Bearer {}", self.config.token)?;
        writeln!(file, "Accept: application/json")?;
        file.flush()?;
        Ok(file)
    }

    /// Arguments of the curl invocation for `request`. Headers, the
    /// token among them, are read from `header_file`.
    fn curl_args(&self, request: &Request, header_file: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-sS".into(),
            "-X".into(),
            request.method.into(),
            "--max-time".into(),
            self.config.request_timeout.as_secs().max(1).to_string(),
            "-H".into(),
            format!("@{}", header_file.display()),
            "-w".into(),
            "\n%{http_code}".into(),
        ];
        if request.body.is_some() {
            args.extend(
                ["-H", "Content-Type: application/json", "--data-binary", "@-"].map(String::from),
            );
        }
        args.push(request.url.to_string());
        args
    }

    fn send(&self, request: &Request) -> ProviderResult<RawResponse> {
        let headers = self.header_file()?;
        let owned = self.curl_args(request, headers.path());
        let args: Vec<&str> = owned.iter().map(String::as_str).collect();

        tracing::debug!(
            operation = request.operation,
            method = request.method,
            url = %request.url,
            "koyeb api request"
        );

        let output = match &request.body {
            Some(b) => cmd::run_with_stdin("curl", &args, b),
            None => cmd::run("curl", &args),
        }
        .map_err(|e| request.transport(e.to_string()))?;

        parse_output(&output)
            .ok_or_else(|| request.transport(format!("unexpected curl output: {output}")))
    }

    fn call<T: DeserializeOwned>(&self, request: &Request) -> ProviderResult<T> {
        let response = self.send(request)?;
        let response = check_status(request, response)?;
        let text = if response.body.trim().is_empty() {
            "{}"
        } else {
            response.body.as_str()
        };
        Ok(serde_json::from_str(text)?)
    }

    fn call_empty(&self, request: &Request) -> ProviderResult<()> {
        let response = self.send(request)?;
        check_status(request, response)?;
        Ok(())
    }
}

/// Split curl output into the response body and the trailing status
/// line written by `-w '\n%{http_code}'`.
#[must_use]
pub fn parse_output(output: &str) -> Option<RawResponse> {
    let (body, code) = output.rsplit_once('\n').unwrap_or(("", output));
    let status = code.trim().parse().ok()?;
    Some(RawResponse {
        status,
        body: body.to_string(),
    })
}

/// Map a raw reply to the error taxonomy: 404 is `NotFound`, any other
/// non-2xx is `Api` carrying both the request and the response body.
pub fn check_status(request: &Request, response: RawResponse) -> ProviderResult<RawResponse> {
    match response.status {
        200..=299 => Ok(response),
        404 => Err(ProviderError::NotFound {
            kind: request.kind,
            id: request.id.clone(),
        }),
        status => Err(ProviderError::Api {
            operation: request.operation.to_string(),
            id: request.id.clone(),
            status,
            request: request.describe(),
            body: response.body,
        }),
    }
}

fn list_query(opts: &ListOptions) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(limit) = opts.limit {
        query.push(("limit", limit.to_string()));
    }
    if let Some(offset) = opts.offset {
        query.push(("offset", offset.to_string()));
    }
    if let Some(name) = &opts.name {
        query.push(("name", name.clone()));
    }
    query
}

impl KoyebApi for HttpClient {
    fn list_apps(&self, opts: &ListOptions) -> ProviderResult<AppList> {
        let url = self.endpoint("/v1/apps", &list_query(opts))?;
        self.call(&Request::new("list apps", "app", "", "GET", url))
    }

    fn get_app(&self, id: &str) -> ProviderResult<App> {
        let url = self.endpoint(&format!("/v1/apps/{id}"), &[])?;
        let request = Request::new("get app", "app", id, "GET", url);
        let reply: AppReply = self.call(&request)?;
        reply.app.ok_or_else(|| request.missing("app"))
    }

    fn create_app(&self, body: &CreateApp) -> ProviderResult<App> {
        let url = self.endpoint("/v1/apps", &[])?;
        let name = body.name.as_deref().unwrap_or_default();
        let request = Request::new("create app", "app", name, "POST", url).json(body)?;
        let reply: AppReply = self.call(&request)?;
        reply.app.ok_or_else(|| request.missing("app"))
    }

    fn delete_app(&self, id: &str) -> ProviderResult<()> {
        let url = self.endpoint(&format!("/v1/apps/{id}"), &[])?;
        self.call_empty(&Request::new("delete app", "app", id, "DELETE", url))
    }

    fn list_services(
        &self,
        app_id: Option<&str>,
        opts: &ListOptions,
    ) -> ProviderResult<ServiceList> {
        let mut query = list_query(opts);
        if let Some(app_id) = app_id {
            query.push(("app_id", app_id.to_string()));
        }
        let url = self.endpoint("/v1/services", &query)?;
        let id = app_id.unwrap_or_default();
        self.call(&Request::new("list services", "app", id, "GET", url))
    }

    fn get_service(&self, id: &str) -> ProviderResult<Service> {
        let url = self.endpoint(&format!("/v1/services/{id}"), &[])?;
        let request = Request::new("get service", "service", id, "GET", url);
        let reply: ServiceReply = self.call(&request)?;
        reply.service.ok_or_else(|| request.missing("service"))
    }

    fn create_service(&self, body: &CreateService) -> ProviderResult<Service> {
        let url = self.endpoint("/v1/services", &[])?;
        let app_id = body.app_id.as_deref().unwrap_or_default();
        let request = Request::new("create service", "app", app_id, "POST", url).json(body)?;
        let reply: ServiceReply = self.call(&request)?;
        reply.service.ok_or_else(|| request.missing("service"))
    }

    fn update_service(&self, id: &str, body: &UpdateService) -> ProviderResult<Service> {
        let url = self.endpoint(&format!("/v1/services/{id}"), &[])?;
        let request = Request::new("update service", "service", id, "PUT", url).json(body)?;
        let reply: ServiceReply = self.call(&request)?;
        reply.service.ok_or_else(|| request.missing("service"))
    }

    fn delete_service(&self, id: &str) -> ProviderResult<()> {
        let url = self.endpoint(&format!("/v1/services/{id}"), &[])?;
        self.call_empty(&Request::new("delete service", "service", id, "DELETE", url))
    }

    fn get_deployment(&self, id: &str) -> ProviderResult<Deployment> {
        let url = self.endpoint(&format!("/v1/deployments/{id}"), &[])?;
        let request = Request::new("get deployment", "deployment", id, "GET", url);
        let reply: DeploymentReply = self.call(&request)?;
        reply.deployment.ok_or_else(|| request.missing("deployment"))
    }

    fn list_domains(&self, opts: &ListOptions) -> ProviderResult<DomainList> {
        let url = self.endpoint("/v1/domains", &list_query(opts))?;
        self.call(&Request::new("list domains", "domain", "", "GET", url))
    }

    fn get_domain(&self, id: &str) -> ProviderResult<Domain> {
        let url = self.endpoint(&format!("/v1/domains/{id}"), &[])?;
        let request = Request::new("get domain", "domain", id, "GET", url);
        let reply: DomainReply = self.call(&request)?;
        reply.domain.ok_or_else(|| request.missing("domain"))
    }

    fn create_domain(&self, body: &CreateDomain) -> ProviderResult<Domain> {
        let url = self.endpoint("/v1/domains", &[])?;
        let name = body.name.as_deref().unwrap_or_default();
        let request = Request::new("create domain", "domain", name, "POST", url).json(body)?;
        let reply: DomainReply = self.call(&request)?;
        reply.domain.ok_or_else(|| request.missing("domain"))
    }

    fn update_domain(&self, id: &str, body: &UpdateDomain) -> ProviderResult<Domain> {
        let url = self.endpoint(&format!("/v1/domains/{id}"), &[])?;
        let request = Request::new("update domain", "domain", id, "PATCH", url).json(body)?;
        let reply: DomainReply = self.call(&request)?;
        reply.domain.ok_or_else(|| request.missing("domain"))
    }

    fn delete_domain(&self, id: &str) -> ProviderResult<()> {
        let url = self.endpoint(&format!("/v1/domains/{id}"), &[])?;
        self.call_empty(&Request::new("delete domain", "domain", id, "DELETE", url))
    }
}
