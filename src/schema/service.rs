use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::schema::{APP_NAME_LEN, DEFINITION_NAME_LEN, check_len, check_not_empty, check_port};

/// Declared service: the app it belongs to plus the deployment
/// definition it runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub app_name: String,
    pub definition: DefinitionConfig,
}

impl ServiceConfig {
    #[must_use]
    pub fn new(app_name: &str, definition: DefinitionConfig) -> Self {
        Self {
            app_name: app_name.to_string(),
            definition,
        }
    }

    /// Address of the service within a manifest: `app/service`.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}/{}", self.app_name, self.definition.name)
    }

    pub fn validate(&self) -> ProviderResult<()> {
        check_len("service app_name", &self.app_name, APP_NAME_LEN)?;
        self.definition.validate()
    }
}

/// How to build and run a service. Replaced wholesale on update.
///
/// # Example
///
/// ```
/// use koyeb_provider::{DefinitionConfig, DockerSource, Protocol};
///
/// let def = DefinitionConfig::new("web")
///     .docker(DockerSource::new("koyeb/demo"))
///     .env("PORT", "8080")
///     .port(8080, Protocol::Http)
///     .route(8080, "/")
///     .instance_type("nano")
///     .region("fra");
///
/// assert!(def.validate().is_ok());
/// assert_eq!(def.scaling.min, 1);
/// assert_eq!(def.scaling.max, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefinitionConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub instance_types: Vec<InstanceType>,
    #[serde(default)]
    pub scaling: Scaling,
    #[serde(default)]
    pub regions: BTreeSet<String>,
}

impl DefinitionConfig {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            docker: None,
            git: None,
            env: Vec::new(),
            ports: Vec::new(),
            routes: Vec::new(),
            instance_types: Vec::new(),
            scaling: Scaling::default(),
            regions: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn docker(mut self, source: DockerSource) -> Self {
        self.docker = Some(source);
        self
    }

    #[must_use]
    pub fn git(mut self, source: GitSource) -> Self {
        self.git = Some(source);
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push(EnvVar::value(key, value));
        self
    }

    #[must_use]
    pub fn env_secret(mut self, key: &str, secret: &str) -> Self {
        self.env.push(EnvVar::secret(key, secret));
        self
    }

    #[must_use]
    pub fn port(mut self, port: u32, protocol: Protocol) -> Self {
        self.ports.push(Port { port, protocol });
        self
    }

    #[must_use]
    pub fn route(mut self, port: u32, path: &str) -> Self {
        self.routes.push(Route {
            port,
            path: path.to_string(),
        });
        self
    }

    #[must_use]
    pub fn instance_type(mut self, kind: &str) -> Self {
        self.instance_types.push(InstanceType {
            kind: kind.to_string(),
        });
        self
    }

    #[must_use]
    pub const fn scaling(mut self, min: u32, max: u32) -> Self {
        self.scaling = Scaling { min, max };
        self
    }

    #[must_use]
    pub fn region(mut self, region: &str) -> Self {
        self.regions.insert(region.to_string());
        self
    }

    pub fn validate(&self) -> ProviderResult<()> {
        check_len("service name", &self.name, DEFINITION_NAME_LEN)?;

        match (&self.docker, &self.git) {
            (Some(_), Some(_)) => {
                return Err(ProviderError::validation(format!(
                    "service '{}': docker and git sources are mutually exclusive",
                    self.name
                )));
            }
            (None, None) => {
                return Err(ProviderError::validation(format!(
                    "service '{}': exactly one of docker or git source is required",
                    self.name
                )));
            }
            (Some(docker), None) => docker.validate()?,
            (None, Some(git)) => git.validate()?,
        }

        for env in &self.env {
            env.validate()?;
        }

        if self.ports.is_empty() {
            return Err(ProviderError::validation(format!(
                "service '{}': at least one port is required",
                self.name
            )));
        }
        for port in &self.ports {
            check_port("port", port.port)?;
        }

        let mut paths = HashSet::new();
        for route in &self.routes {
            route.validate()?;
            if !paths.insert(route.path.as_str()) {
                return Err(ProviderError::validation(format!(
                    "service '{}': route path '{}' is declared twice",
                    self.name, route.path
                )));
            }
        }

        if self.instance_types.len() != 1 {
            return Err(ProviderError::validation(format!(
                "service '{}': exactly one instance type is required, got {}",
                self.name,
                self.instance_types.len()
            )));
        }
        check_not_empty("instance type", &self.instance_types[0].kind)?;

        self.scaling.validate()?;

        if self.regions.is_empty() {
            return Err(ProviderError::validation(format!(
                "service '{}': at least one region is required",
                self.name
            )));
        }
        for region in &self.regions {
            check_not_empty("region", region)?;
        }

        Ok(())
    }

    /// Canonical form used to compare definitions: list-typed fields are
    /// unordered collections, so they are sorted by their natural key.
    /// Duplicates are kept.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut def = self.clone();
        def.env.sort_by(|a, b| (&a.key, &a.value, &a.secret).cmp(&(&b.key, &b.value, &b.secret)));
        def.ports.sort_by_key(|p| (p.port, p.protocol));
        def.routes.sort_by(|a, b| (&a.path, a.port).cmp(&(&b.path, b.port)));
        def.instance_types.sort_by(|a, b| a.kind.cmp(&b.kind));
        def
    }

    /// Whether two definitions describe the same deployment, ignoring the
    /// order of list-typed fields.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerSource {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Koyeb secret holding the container registry credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry_secret: Option<String>,
}

impl DockerSource {
    #[must_use]
    pub fn new(image: &str) -> Self {
        Self {
            image: image.to_string(),
            command: None,
            args: Vec::new(),
            image_registry_secret: None,
        }
    }

    #[must_use]
    pub fn command(mut self, command: &str) -> Self {
        self.command = Some(command.to_string());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    #[must_use]
    pub fn registry_secret(mut self, secret: &str) -> Self {
        self.image_registry_secret = Some(secret.to_string());
        self
    }

    fn validate(&self) -> ProviderResult<()> {
        check_not_empty("docker image", &self.image)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSource {
    pub repository: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_deploy_on_push: Option<bool>,
}

impl GitSource {
    #[must_use]
    pub fn new(repository: &str, branch: &str) -> Self {
        Self {
            repository: repository.to_string(),
            branch: branch.to_string(),
            build_command: None,
            run_command: None,
            no_deploy_on_push: None,
        }
    }

    #[must_use]
    pub fn build_command(mut self, command: &str) -> Self {
        self.build_command = Some(command.to_string());
        self
    }

    #[must_use]
    pub fn run_command(mut self, command: &str) -> Self {
        self.run_command = Some(command.to_string());
        self
    }

    #[must_use]
    pub const fn no_deploy_on_push(mut self, value: bool) -> Self {
        self.no_deploy_on_push = Some(value);
        self
    }

    fn validate(&self) -> ProviderResult<()> {
        check_not_empty("git repository", &self.repository)?;
        check_not_empty("git branch", &self.branch)
    }
}

/// Environment variable holding either a plaintext value or a
/// reference to a Koyeb secret, never both.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvVar {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl EnvVar {
    #[must_use]
    pub fn value(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: Some(value.to_string()),
            secret: None,
        }
    }

    #[must_use]
    pub fn secret(key: &str, secret: &str) -> Self {
        Self {
            key: key.to_string(),
            value: None,
            secret: Some(secret.to_string()),
        }
    }

    fn validate(&self) -> ProviderResult<()> {
        check_not_empty("env key", &self.key)?;
        match (&self.value, &self.secret) {
            (Some(_), Some(_)) => Err(ProviderError::Validation(format!(
                "env '{}' sets both value and secret",
                self.key
            ))),
            (None, None) => Err(ProviderError::Validation(format!(
                "env '{}' needs either a value or a secret",
                self.key
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVar")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("secret", &self.secret.as_ref().map(|_| "<sensitive>"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Tcp,
}

impl Protocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Self::Http),
            "tcp" => Ok(Self::Tcp),
            other => Err(ProviderError::Validation(format!(
                "protocol must be one of http, tcp; got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Port {
    pub port: u32,
    pub protocol: Protocol,
}

/// HTTP route by path prefix. Paths start with `/` and are unique
/// within an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    pub port: u32,
    pub path: String,
}

impl Route {
    fn validate(&self) -> ProviderResult<()> {
        check_port("route port", self.port)?;
        check_not_empty("route path", &self.path)?;
        if !self.path.starts_with('/') {
            return Err(ProviderError::Validation(format!(
                "route path '{}' must start with '/'",
                self.path
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceType {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scaling {
    #[serde(default = "one")]
    pub min: u32,
    #[serde(default = "one")]
    pub max: u32,
}

const fn one() -> u32 {
    1
}

impl Default for Scaling {
    fn default() -> Self {
        Self { min: 1, max: 1 }
    }
}

impl Scaling {
    fn validate(self) -> ProviderResult<()> {
        if self.max == 0 {
            return Err(ProviderError::validation("scaling max must be at least 1"));
        }
        if self.min > self.max {
            return Err(ProviderError::Validation(format!(
                "scaling min ({}) must not exceed max ({})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Service as observed on the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub id: String,
    pub name: String,
    pub app_id: String,
    pub app_name: String,
    pub organization_id: String,
    /// Definition of the latest deployment, when one could be loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<DefinitionConfig>,
    pub active_deployment: String,
    pub latest_deployment: String,
    pub version: String,
    pub status: String,
    pub messages: String,
    pub paused_at: String,
    pub resumed_at: String,
    pub terminated_at: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ServiceState {
    /// The declarative view of this state, if the definition is known.
    #[must_use]
    pub fn config(&self) -> Option<ServiceConfig> {
        self.definition
            .as_ref()
            .map(|def| ServiceConfig::new(&self.app_name, def.clone()))
    }
}

/// Read-only deployment produced by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    pub id: String,
    pub parent_id: String,
    pub child_id: String,
    pub status: String,
    pub messages: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<DefinitionConfig>,
    pub allocated_at: String,
    pub started_at: String,
    pub succeeded_at: String,
    pub terminated_at: String,
    pub created_at: String,
    pub updated_at: String,
}
