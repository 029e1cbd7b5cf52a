use chrono::{TimeZone, Utc};
use koyeb_provider::api::model::{
    self, Deployment, DeploymentDefinition, DeploymentScaling, Service, ServiceStatus,
};
use koyeb_provider::codec::{
    expand_app, expand_definition, expand_domain, expand_domain_update, expand_service,
    expand_service_update, flatten_app, flatten_definition, flatten_deployment, flatten_domain,
    flatten_service,
};
use koyeb_provider::{
    AppConfig, DefinitionConfig, DockerSource, DomainConfig, GitSource, Protocol, ServiceConfig,
};

fn full_docker_definition() -> DefinitionConfig {
    DefinitionConfig::new("api")
        .docker(
            DockerSource::new("ghcr.io/acme/api:1.4")
                .command("/bin/api")
                .arg("--port")
                .arg("8000")
                .registry_secret("ghcr-creds"),
        )
        .env("RUST_LOG", "info")
        .env_secret("DATABASE_URL", "db-url")
        .port(8000, Protocol::Http)
        .port(9000, Protocol::Tcp)
        .route(8000, "/api")
        .instance_type("small")
        .scaling(1, 3)
        .region("fra")
        .region("was")
}

#[test]
fn docker_definition_round_trips() {
    let def = full_docker_definition();
    let wire = expand_definition(&def).unwrap();
    let back = flatten_definition(&wire).unwrap();
    assert_eq!(back, def);
}

#[test]
fn git_definition_round_trips() {
    let def = DefinitionConfig::new("site")
        .git(
            GitSource::new("github.com/acme/site", "main")
                .build_command("npm run build")
                .run_command("npm start")
                .no_deploy_on_push(true),
        )
        .port(3000, Protocol::Http)
        .route(3000, "/")
        .instance_type("nano")
        .region("par");

    let back = flatten_definition(&expand_definition(&def).unwrap()).unwrap();
    assert_eq!(back, def);
}

#[test]
fn round_trip_survives_json() {
    let def = full_docker_definition();
    let json = serde_json::to_string(&expand_definition(&def).unwrap()).unwrap();
    let wire: DeploymentDefinition = serde_json::from_str(&json).unwrap();
    assert!(flatten_definition(&wire).unwrap().same_as(&def));
}

#[test]
fn unset_optional_fields_are_not_sent() {
    let def = DefinitionConfig::new("web")
        .docker(DockerSource::new("koyeb/demo"))
        .port(8080, Protocol::Http)
        .instance_type("nano")
        .region("fra");
    let json = serde_json::to_value(expand_definition(&def).unwrap()).unwrap();

    let docker = json["docker"].as_object().unwrap();
    assert_eq!(docker.len(), 1);
    assert_eq!(docker["image"], "koyeb/demo");
    assert!(json.get("git").is_none());
    assert_eq!(json["scalings"][0]["min"], 1);
    assert_eq!(json["scalings"][0]["max"], 1);
}

#[test]
fn secret_env_is_sent_as_reference_only() {
    let def = full_docker_definition();
    let wire = expand_definition(&def).unwrap();
    let secret = wire
        .env
        .unwrap()
        .into_iter()
        .find(|e| e.key.as_deref() == Some("DATABASE_URL"))
        .unwrap();
    assert_eq!(secret.secret.as_deref(), Some("db-url"));
    assert_eq!(secret.value, None);
}

#[test]
fn docker_with_git_is_rejected() {
    let def = full_docker_definition().git(GitSource::new("github.com/acme/api", "main"));
    let err = expand_definition(&def).unwrap_err();
    assert!(err.to_string().contains("mutually exclusive"));
}

#[test]
fn missing_scaling_decodes_to_defaults() {
    let wire = DeploymentDefinition {
        name: Some("web".into()),
        scalings: None,
        ..DeploymentDefinition::default()
    };
    let def = flatten_definition(&wire).unwrap();
    assert_eq!(def.scaling.min, 1);
    assert_eq!(def.scaling.max, 1);
}

#[test]
fn scaling_takes_the_first_entry() {
    let wire = DeploymentDefinition {
        scalings: Some(vec![
            DeploymentScaling {
                min: Some(2),
                max: Some(5),
            },
            DeploymentScaling {
                min: Some(9),
                max: Some(9),
            },
        ]),
        ..DeploymentDefinition::default()
    };
    let def = flatten_definition(&wire).unwrap();
    assert_eq!((def.scaling.min, def.scaling.max), (2, 5));
}

#[test]
fn unknown_protocol_from_api_is_an_error() {
    let wire = DeploymentDefinition {
        ports: Some(vec![model::DeploymentPort {
            port: Some(53),
            protocol: Some("udp".into()),
        }]),
        ..DeploymentDefinition::default()
    };
    assert!(flatten_definition(&wire).is_err());
}

#[test]
fn negative_port_from_api_is_an_error() {
    let wire = DeploymentDefinition {
        ports: Some(vec![model::DeploymentPort {
            port: Some(-1),
            protocol: Some("http".into()),
        }]),
        ..DeploymentDefinition::default()
    };
    assert!(flatten_definition(&wire).is_err());
}

#[test]
fn app_encoding() {
    let body = expand_app(&AppConfig::new("demo-app"));
    assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"name":"demo-app"}"#);
}

#[test]
fn app_decoding_tags_domains() {
    let app = model::App {
        id: Some("app-1".into()),
        name: Some("demo-app".into()),
        organization_id: Some("org-1".into()),
        domains: Some(vec![model::Domain {
            id: Some("dom-1".into()),
            name: Some("demo-app-acme.koyeb.app".into()),
            kind: Some("AUTOASSIGNED".into()),
            ..model::Domain::default()
        }]),
        created_at: Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()),
        updated_at: None,
    };

    let state = flatten_app(&app);
    assert_eq!(state.id, "app-1");
    assert_eq!(state.created_at, "2023-12-31 23:59:59 +0000 UTC");
    assert_eq!(state.updated_at, "");
    assert_eq!(state.domains.len(), 1);
    assert_eq!(state.domains[0].app_name.as_deref(), Some("demo-app"));
    assert_eq!(state.domains[0].kind, "AUTOASSIGNED");
}

#[test]
fn service_encoding_carries_app_id() {
    let config = ServiceConfig::new("demo-app", full_docker_definition());
    let body = expand_service(&config, "app-1").unwrap();
    assert_eq!(body.app_id.as_deref(), Some("app-1"));
    assert_eq!(
        body.definition.unwrap().name.as_deref(),
        Some("api")
    );
}

#[test]
fn service_update_encodes_every_field() {
    let def = full_docker_definition();
    let body = expand_service_update(&def).unwrap();
    let sent = body.definition.unwrap();
    assert_eq!(sent.env.unwrap().len(), 2);
    assert_eq!(sent.ports.unwrap().len(), 2);
    assert_eq!(sent.routes.unwrap().len(), 1);
    assert_eq!(sent.instance_types.unwrap().len(), 1);
    assert_eq!(sent.regions.unwrap(), vec!["fra".to_string(), "was".to_string()]);
}

#[test]
fn service_decoding_joins_messages_and_formats_times() {
    let service = Service {
        id: Some("svc-1".into()),
        name: Some("api".into()),
        app_id: Some("app-1".into()),
        status: Some(ServiceStatus::Degraded),
        messages: Some(vec!["instance".into(), "restarting".into()]),
        paused_at: Some("0001-01-01T00:00:00Z".parse().unwrap()),
        created_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()),
        ..Service::default()
    };

    let state = flatten_service(&service, "demo-app", None);
    assert_eq!(state.status, "DEGRADED");
    assert_eq!(state.messages, "instance restarting");
    assert_eq!(state.paused_at, "");
    assert_eq!(state.created_at, "2024-06-01 08:00:00 +0000 UTC");
    assert_eq!(state.app_name, "demo-app");
    assert!(state.config().is_none());
}

#[test]
fn deployment_decoding() {
    let def = full_docker_definition();
    let deployment = Deployment {
        id: Some("dep-2".into()),
        parent_id: Some("dep-1".into()),
        status: Some("HEALTHY".into()),
        messages: Some(vec!["Deployment".into(), "is".into(), "healthy".into()]),
        version: Some("2".into()),
        definition: Some(expand_definition(&def).unwrap()),
        succeeded_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 8, 1, 2).unwrap()),
        ..Deployment::default()
    };

    let state = flatten_deployment(&deployment).unwrap();
    assert_eq!(state.parent_id, "dep-1");
    assert_eq!(state.child_id, "");
    assert_eq!(state.messages, "Deployment is healthy");
    assert_eq!(state.succeeded_at, "2024-06-01 08:01:02 +0000 UTC");
    assert_eq!(state.definition, Some(def));
}

#[test]
fn domain_encoding() {
    let create = expand_domain(
        &DomainConfig::new("demo.example.com").app("demo-app"),
        Some("app-1".into()),
    );
    assert_eq!(create.kind.as_deref(), Some("CUSTOM"));
    assert_eq!(create.app_id.as_deref(), Some("app-1"));

    let unattached = expand_domain(&DomainConfig::new("demo.example.com"), None);
    let json = serde_json::to_value(&unattached).unwrap();
    assert!(json.get("app_id").is_none());

    assert_eq!(expand_domain_update(None).app_id.as_deref(), Some(""));
    assert_eq!(
        expand_domain_update(Some("app-2".into())).app_id.as_deref(),
        Some("app-2")
    );
}

#[test]
fn domain_decoding() {
    let domain = model::Domain {
        id: Some("dom-1".into()),
        name: Some("demo.example.com".into()),
        app_id: Some("app-1".into()),
        kind: Some("CUSTOM".into()),
        status: Some("ACTIVE".into()),
        intended_cname: Some("demo-app-acme.koyeb.app".into()),
        verified_at: Some(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap()),
        ..model::Domain::default()
    };

    let state = flatten_domain(&domain, Some("demo-app".into()));
    assert_eq!(state.kind, "CUSTOM");
    assert_eq!(state.status, "ACTIVE");
    assert_eq!(state.verified_at, "2024-02-03 04:05:06 +0000 UTC");
    assert_eq!(state.config(), DomainConfig::new("demo.example.com").app("demo-app"));
}
