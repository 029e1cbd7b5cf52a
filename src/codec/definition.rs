use crate::api::model;
use crate::error::{ProviderError, ProviderResult};
use crate::schema::{
    DefinitionConfig, DockerSource, EnvVar, GitSource, InstanceType, Port, Route, Scaling,
};

/// Encode a deployment definition. The definition is validated first so
/// that a rejected configuration never reaches the API.
pub fn expand_definition(def: &DefinitionConfig) -> ProviderResult<model::DeploymentDefinition> {
    def.validate()?;

    Ok(model::DeploymentDefinition {
        name: Some(def.name.clone()),
        docker: def.docker.as_ref().map(expand_docker),
        git: def.git.as_ref().map(expand_git),
        env: Some(def.env.iter().map(expand_env).collect()),
        ports: Some(
            def.ports
                .iter()
                .map(|p| model::DeploymentPort {
                    port: Some(i64::from(p.port)),
                    protocol: Some(p.protocol.as_str().to_string()),
                })
                .collect(),
        ),
        routes: Some(
            def.routes
                .iter()
                .map(|r| model::DeploymentRoute {
                    port: Some(i64::from(r.port)),
                    path: Some(r.path.clone()),
                })
                .collect(),
        ),
        instance_types: Some(
            def.instance_types
                .iter()
                .map(|t| model::DeploymentInstanceType {
                    kind: Some(t.kind.clone()),
                })
                .collect(),
        ),
        scalings: Some(vec![model::DeploymentScaling {
            min: Some(i64::from(def.scaling.min)),
            max: Some(i64::from(def.scaling.max)),
        }]),
        regions: Some(def.regions.iter().cloned().collect()),
    })
}

fn expand_docker(docker: &DockerSource) -> model::DockerSource {
    model::DockerSource {
        image: Some(docker.image.clone()),
        command: docker.command.clone(),
        args: (!docker.args.is_empty()).then(|| docker.args.clone()),
        image_registry_secret: docker.image_registry_secret.clone(),
    }
}

fn expand_git(git: &GitSource) -> model::GitSource {
    model::GitSource {
        repository: Some(git.repository.clone()),
        branch: Some(git.branch.clone()),
        build_command: git.build_command.clone(),
        run_command: git.run_command.clone(),
        no_deploy_on_push: git.no_deploy_on_push,
    }
}

fn expand_env(env: &EnvVar) -> model::DeploymentEnv {
    model::DeploymentEnv {
        key: Some(env.key.clone()),
        value: env.value.clone(),
        secret: env.secret.clone(),
    }
}

/// Decode a deployment definition returned by the API.
///
/// Secret env vars only carry the secret name the API returned; no
/// plaintext value is ever synthesized for them.
pub fn flatten_definition(def: &model::DeploymentDefinition) -> ProviderResult<DefinitionConfig> {
    let ports = def
        .ports
        .iter()
        .flatten()
        .map(|p| {
            Ok(Port {
                port: port_number(p.port)?,
                protocol: p.protocol.as_deref().unwrap_or_default().parse()?,
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    let routes = def
        .routes
        .iter()
        .flatten()
        .map(|r| {
            Ok(Route {
                port: port_number(r.port)?,
                path: r.path.clone().unwrap_or_default(),
            })
        })
        .collect::<ProviderResult<Vec<_>>>()?;

    let scaling = match def.scalings.as_deref() {
        Some([first, ..]) => Scaling {
            min: count(first.min, 1)?,
            max: count(first.max, 1)?,
        },
        _ => Scaling::default(),
    };

    Ok(DefinitionConfig {
        name: def.name.clone().unwrap_or_default(),
        docker: def.docker.as_ref().map(|d| DockerSource {
            image: d.image.clone().unwrap_or_default(),
            command: d.command.clone(),
            args: d.args.clone().unwrap_or_default(),
            image_registry_secret: d.image_registry_secret.clone(),
        }),
        git: def.git.as_ref().map(|g| GitSource {
            repository: g.repository.clone().unwrap_or_default(),
            branch: g.branch.clone().unwrap_or_default(),
            build_command: g.build_command.clone(),
            run_command: g.run_command.clone(),
            no_deploy_on_push: g.no_deploy_on_push,
        }),
        env: def
            .env
            .iter()
            .flatten()
            .map(|e| EnvVar {
                key: e.key.clone().unwrap_or_default(),
                value: e.value.clone(),
                secret: e.secret.clone(),
            })
            .collect(),
        ports,
        routes,
        instance_types: def
            .instance_types
            .iter()
            .flatten()
            .map(|t| InstanceType {
                kind: t.kind.clone().unwrap_or_default(),
            })
            .collect(),
        scaling,
        regions: def.regions.iter().flatten().cloned().collect(),
    })
}

fn port_number(port: Option<i64>) -> ProviderResult<u32> {
    let raw = port.unwrap_or_default();
    u32::try_from(raw)
        .map_err(|_| ProviderError::Other(format!("API returned an invalid port number: {raw}")))
}

fn count(value: Option<i64>, default: u32) -> ProviderResult<u32> {
    value.map_or(Ok(default), |v| {
        u32::try_from(v)
            .map_err(|_| ProviderError::Other(format!("API returned an invalid scaling: {v}")))
    })
}

