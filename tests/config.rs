use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use rustaccio_azure_ad::config::Config;
use std::{io::Write, sync::Mutex};

static ENV_LOCK: Mutex<()> = Mutex::new(());

const PLUGIN_YAML: &str = r#"
listen: 0.0.0.0:4900
log:
  level: debug
auth:
  azure-ad:
    tenant: contoso.onmicrosoft.com
    client_id: 11111111-2222-3333-4444-555555555555
    client_secret: s3cr3t
    organization_domain: contoso.com
    scope: GroupMember.Read.All
    allow_groups:
      - npm-readers
      - npm-publishers
      - npm-readers
    graph_url: https://graph.microsoft.us/v1.0/
    timeout_ms: 4000
"#;

fn with_env<T>(vars: &[(&str, &str)], run: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let stale: Vec<String> = std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("RUSTACCIO_AZURE_") || key == "PORT")
        .collect();
    unsafe {
        for key in &stale {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
    }
    let result = run();
    unsafe {
        for (key, _) in vars {
            std::env::remove_var(key);
        }
    }
    result
}

#[test]
fn parses_azure_ad_plugin_section() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{PLUGIN_YAML}").expect("write");

    let cfg = Config::from_yaml_file(file.path().to_path_buf()).expect("parse");
    assert_eq!(cfg.bind.to_string(), "0.0.0.0:4900");
    assert_eq!(cfg.log_level, "debug");
    assert_eq!(cfg.azure.tenant, "contoso.onmicrosoft.com");
    assert_eq!(cfg.azure.client_id, "11111111-2222-3333-4444-555555555555");
    assert_eq!(cfg.azure.client_secret, "s3cr3t");
    assert_eq!(cfg.azure.organization_domain.as_deref(), Some("contoso.com"));
    assert_eq!(cfg.azure.scope.as_deref(), Some("GroupMember.Read.All"));
    assert_eq!(cfg.azure.allow_groups, vec!["npm-readers", "npm-publishers"]);
    assert_eq!(cfg.azure.authority_url, "https://login.microsoftonline.com");
    assert_eq!(cfg.azure.graph_url, "https://graph.microsoft.us/v1.0");
    assert_eq!(cfg.azure.timeout_ms, Some(4000));
    assert!(cfg.azure.validate().is_ok());
}

#[test]
fn optional_fields_default_to_empty() {
    let cfg = Config::from_yaml_str(
        "inline",
        r#"
auth:
  azuread:
    tenant: t
    client_id: c
    client_secret: s
    organization_domain: ""
"#,
    )
    .expect("parse");
    assert_eq!(cfg.bind.to_string(), "127.0.0.1:4874");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.azure.organization_domain, None);
    assert_eq!(cfg.azure.scope, None);
    assert!(cfg.azure.allow_groups.is_empty());
    assert_eq!(cfg.azure.graph_url, "https://graph.microsoft.com/v1.0");
    assert_eq!(cfg.azure.timeout_ms, None);
}

#[test]
fn rejects_malformed_yaml() {
    let err = Config::from_yaml_str("inline", "auth: [unclosed").expect_err("invalid");
    assert!(err.starts_with("failed to parse inline"));
}

#[test]
fn env_provides_full_configuration() {
    let cfg = with_env(
        &[
            ("RUSTACCIO_AZURE_TENANT", "contoso"),
            ("RUSTACCIO_AZURE_CLIENT_ID", "client"),
            ("RUSTACCIO_AZURE_CLIENT_SECRET", "secret"),
            ("RUSTACCIO_AZURE_ALLOW_GROUPS", "qa, ops,,qa"),
            ("RUSTACCIO_AZURE_ORGANIZATION_DOMAIN", "corp.com"),
            ("RUSTACCIO_AZURE_BIND", "127.0.0.1:5000"),
            ("RUSTACCIO_AZURE_TIMEOUT_MS", "1500"),
        ],
        Config::from_env,
    )
    .expect("config");
    assert_eq!(cfg.azure.tenant, "contoso");
    assert_eq!(cfg.azure.allow_groups, vec!["qa", "ops"]);
    assert_eq!(cfg.azure.organization_domain.as_deref(), Some("corp.com"));
    assert_eq!(cfg.azure.timeout_ms, Some(1500));
    assert_eq!(cfg.bind.to_string(), "127.0.0.1:5000");
}

#[test]
fn env_requires_client_secret() {
    let err = with_env(
        &[
            ("RUSTACCIO_AZURE_TENANT", "contoso"),
            ("RUSTACCIO_AZURE_CLIENT_ID", "client"),
        ],
        Config::from_env,
    )
    .expect_err("missing secret");
    assert_eq!(err, "azure-ad client_secret is required");
}

#[test]
fn env_overrides_config_file_and_port_wins_bind() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "{PLUGIN_YAML}").expect("write");
    let path = file.path().to_path_buf();

    let cfg = with_env(
        &[
            ("RUSTACCIO_AZURE_ALLOW_GROUPS", "admins"),
            ("RUSTACCIO_AZURE_SCOPE", ""),
            ("PORT", "8080"),
        ],
        || Config::from_env_with_config_file(path),
    )
    .expect("config");
    assert_eq!(cfg.azure.tenant, "contoso.onmicrosoft.com");
    assert_eq!(cfg.azure.allow_groups, vec!["admins"]);
    assert_eq!(cfg.azure.scope, None);
    assert_eq!(cfg.bind.to_string(), "0.0.0.0:8080");
}

#[test]
fn env_accepts_base64_config() {
    let encoded = B64.encode(PLUGIN_YAML);
    let cfg = with_env(&[("RUSTACCIO_AZURE_CONFIG_BASE64", encoded.as_str())], Config::from_env)
        .expect("config");
    assert_eq!(cfg.azure.client_secret, "s3cr3t");
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn env_rejects_two_config_sources() {
    let err = with_env(
        &[
            ("RUSTACCIO_AZURE_CONFIG", "/tmp/azure.yml"),
            ("RUSTACCIO_AZURE_CONFIG_BASE64", "Zm9v"),
        ],
        Config::from_env,
    )
    .expect_err("conflict");
    assert!(err.contains("are both set"));
}

#[test]
fn accepts_verdaccio_plugin_section_name() {
    let cfg = Config::from_yaml_str(
        "inline",
        r#"
auth:
  azure-ad-login:
    tenant: t
    client_id: c
    client_secret: s
    allow_groups: [qa]
"#,
    )
    .expect("parse");
    assert_eq!(cfg.azure.tenant, "t");
    assert_eq!(cfg.azure.allow_groups, vec!["qa"]);
    assert!(cfg.azure.validate().is_ok());
}
