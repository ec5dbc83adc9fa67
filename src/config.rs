use crate::constants::{DEFAULT_AUTHORITY_URL, DEFAULT_GRAPH_URL};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use config::{Config as SettingsLoader, Environment};
use serde::Deserialize;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 4874);

/// Azure AD plugin settings. Built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureAdConfig {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: String,
    pub organization_domain: Option<String>,
    pub scope: Option<String>,
    pub allow_groups: Vec<String>,
    pub authority_url: String,
    pub graph_url: String,
    pub timeout_ms: Option<u64>,
}

impl AzureAdConfig {
    pub fn new(
        tenant: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant: tenant.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            organization_domain: None,
            scope: None,
            allow_groups: Vec::new(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            timeout_ms: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("tenant", &self.tenant),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(format!("azure-ad {field} is required"));
            }
        }
        Ok(())
    }
}

impl Default for AzureAdConfig {
    fn default() -> Self {
        Self::new("", "", "")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub log_level: String,
    pub azure: AzureAdConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawEnvConfig {
    config: Option<String>,
    config_base64: Option<String>,
    bind: Option<String>,
    log_level: Option<String>,
    tenant: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    organization_domain: Option<String>,
    scope: Option<String>,
    allow_groups: Option<String>,
    authority_url: Option<String>,
    graph_url: Option<String>,
    timeout_ms: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let env_cfg = load_plugin_env()?;
        let mut cfg = Self::defaults();
        cfg.apply_env_config_sources_if_present(&env_cfg)?;
        cfg.apply_env_overrides(&env_cfg);
        cfg.apply_port_override(load_process_env_value("port")?);
        cfg.azure.validate()?;
        Ok(cfg)
    }

    pub fn from_env_with_config_file(config_path: PathBuf) -> Result<Self, String> {
        let env_cfg = load_plugin_env()?;
        let mut cfg = Self::defaults();
        cfg.apply_env_config_sources_if_present(&env_cfg)?;
        cfg.apply_yaml_overrides(Self::from_yaml_file(config_path)?);
        cfg.apply_env_overrides(&env_cfg);
        cfg.apply_port_override(load_process_env_value("port")?);
        cfg.azure.validate()?;
        Ok(cfg)
    }

    pub fn defaults() -> Self {
        Self {
            bind: SocketAddr::from(DEFAULT_BIND),
            log_level: "info".to_string(),
            azure: AzureAdConfig::default(),
        }
    }

    fn apply_env_config_sources_if_present(
        &mut self,
        env_cfg: &RawEnvConfig,
    ) -> Result<(), String> {
        let config_path = env_cfg
            .config
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let config_b64 = env_cfg
            .config_base64
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match (config_path, config_b64) {
            (Some(_), Some(_)) => Err(
                "RUSTACCIO_AZURE_CONFIG and RUSTACCIO_AZURE_CONFIG_BASE64 are both set; use only one"
                    .to_string(),
            ),
            (Some(path), None) => {
                let loaded = Self::from_yaml_file(PathBuf::from(path))
                    .map_err(|err| format!("failed to load RUSTACCIO_AZURE_CONFIG={path}: {err}"))?;
                self.apply_yaml_overrides(loaded);
                Ok(())
            }
            (None, Some(value)) => {
                let compact = value
                    .chars()
                    .filter(|ch| !ch.is_ascii_whitespace())
                    .collect::<String>();
                let decoded = B64.decode(compact).map_err(|err| {
                    format!("failed to decode RUSTACCIO_AZURE_CONFIG_BASE64: {err}")
                })?;
                let yaml = String::from_utf8(decoded).map_err(|err| {
                    format!(
                        "failed to decode RUSTACCIO_AZURE_CONFIG_BASE64: decoded bytes are not UTF-8 ({err})"
                    )
                })?;
                let loaded = Self::from_yaml_str("RUSTACCIO_AZURE_CONFIG_BASE64", &yaml)
                    .map_err(|err| format!("failed to load RUSTACCIO_AZURE_CONFIG_BASE64: {err}"))?;
                self.apply_yaml_overrides(loaded);
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }

    fn apply_env_overrides(&mut self, env_cfg: &RawEnvConfig) {
        if let Some(bind) = parse_env_value::<SocketAddr>(env_cfg.bind.as_deref()) {
            self.bind = bind;
        }
        if let Some(value) = env_cfg.log_level.as_deref()
            && !value.trim().is_empty()
        {
            self.log_level = value.to_string();
        }

        let azure = &mut self.azure;
        if let Some(value) = env_cfg.tenant.as_deref() {
            azure.tenant = value.trim().to_string();
        }
        if let Some(value) = env_cfg.client_id.as_deref() {
            azure.client_id = value.trim().to_string();
        }
        if let Some(value) = env_cfg.client_secret.as_deref() {
            azure.client_secret = value.to_string();
        }
        if let Some(value) = env_cfg.organization_domain.as_deref() {
            azure.organization_domain = non_empty(value);
        }
        if let Some(value) = env_cfg.scope.as_deref() {
            azure.scope = non_empty(value);
        }
        if let Some(value) = env_cfg.allow_groups.as_deref() {
            azure.allow_groups = normalize_groups(value.split(','));
        }
        if let Some(value) = env_cfg.authority_url.as_deref()
            && let Some(url) = normalize_base_url(value)
        {
            azure.authority_url = url;
        }
        if let Some(value) = env_cfg.graph_url.as_deref()
            && let Some(url) = normalize_base_url(value)
        {
            azure.graph_url = url;
        }
        if let Some(value) = env_cfg.timeout_ms.as_deref() {
            if value.trim().is_empty() {
                azure.timeout_ms = None;
            } else if let Some(parsed) = parse_env_value::<u64>(Some(value)) {
                azure.timeout_ms = Some(parsed);
            }
        }
    }

    fn apply_port_override(&mut self, port_value: Option<String>) {
        // Container platforms inject PORT and expect a public bind.
        if let Some(port) = parse_env_value::<u16>(port_value.as_deref()) {
            self.bind = SocketAddr::from(([0, 0, 0, 0], port));
        }
    }

    fn apply_yaml_overrides(&mut self, loaded: Self) {
        self.bind = loaded.bind;
        self.log_level = loaded.log_level;
        self.azure = loaded.azure;
    }

    pub fn from_yaml_file(path: PathBuf) -> Result<Self, String> {
        let parsed = load_yaml_config(&path)?;
        Self::from_yaml_config(parsed)
    }

    pub fn from_yaml_str(source: &str, text: &str) -> Result<Self, String> {
        let parsed = serde_yaml::from_str::<YamlConfig>(text)
            .map_err(|err| format!("failed to parse {source}: {err}"))?;
        Self::from_yaml_config(parsed)
    }

    fn from_yaml_config(parsed: YamlConfig) -> Result<Self, String> {
        let bind = match parsed.listen {
            Some(listen) => parse_listen(&listen)?,
            None => SocketAddr::from(DEFAULT_BIND),
        };
        let log_level = parsed
            .log
            .and_then(|log| log.level)
            .unwrap_or_else(|| "info".to_string());
        let azure = parsed
            .auth
            .and_then(|auth| auth.azure_ad)
            .map(YamlAzureAd::into_config)
            .unwrap_or_default();

        Ok(Self {
            bind,
            log_level,
            azure,
        })
    }
}

fn load_yaml_config(path: &Path) -> Result<YamlConfig, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    serde_yaml::from_str::<YamlConfig>(&text)
        .map_err(|err| format!("failed to parse {}: {err}", path.display()))
}

fn load_plugin_env() -> Result<RawEnvConfig, String> {
    let settings = SettingsLoader::builder()
        .add_source(Environment::with_prefix("RUSTACCIO_AZURE").try_parsing(false))
        .build()
        .map_err(|err| format!("failed to load RUSTACCIO_AZURE_* environment: {err}"))?;

    Ok(RawEnvConfig {
        config: env_value_for_var(&settings, "RUSTACCIO_AZURE_CONFIG"),
        config_base64: env_value_for_var(&settings, "RUSTACCIO_AZURE_CONFIG_BASE64"),
        bind: env_value_for_var(&settings, "RUSTACCIO_AZURE_BIND"),
        log_level: env_value_for_var(&settings, "RUSTACCIO_AZURE_LOG_LEVEL"),
        tenant: env_value_for_var(&settings, "RUSTACCIO_AZURE_TENANT"),
        client_id: env_value_for_var(&settings, "RUSTACCIO_AZURE_CLIENT_ID"),
        client_secret: env_value_for_var(&settings, "RUSTACCIO_AZURE_CLIENT_SECRET"),
        organization_domain: env_value_for_var(&settings, "RUSTACCIO_AZURE_ORGANIZATION_DOMAIN"),
        scope: env_value_for_var(&settings, "RUSTACCIO_AZURE_SCOPE"),
        allow_groups: env_value_for_var(&settings, "RUSTACCIO_AZURE_ALLOW_GROUPS"),
        authority_url: env_value_for_var(&settings, "RUSTACCIO_AZURE_AUTHORITY_URL"),
        graph_url: env_value_for_var(&settings, "RUSTACCIO_AZURE_GRAPH_URL"),
        timeout_ms: env_value_for_var(&settings, "RUSTACCIO_AZURE_TIMEOUT_MS"),
    })
}

fn load_process_env_value(key: &str) -> Result<Option<String>, String> {
    let settings = SettingsLoader::builder()
        .add_source(Environment::default().try_parsing(false))
        .build()
        .map_err(|err| format!("failed to load process environment: {err}"))?;
    Ok(env_value(&settings, key))
}

fn env_value(settings: &SettingsLoader, key: &str) -> Option<String> {
    settings
        .get_string(key)
        .ok()
        .or_else(|| settings.get_string(&key.to_ascii_uppercase()).ok())
}

fn env_value_for_var(settings: &SettingsLoader, env_var: &str) -> Option<String> {
    let key = env_var
        .strip_prefix("RUSTACCIO_AZURE_")
        .unwrap_or(env_var)
        .to_ascii_lowercase();
    env_value(settings, &key)
}

fn parse_env_value<T>(raw: Option<&str>) -> Option<T>
where
    T: std::str::FromStr,
{
    raw.and_then(|value| value.trim().parse::<T>().ok())
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_base_url(value: &str) -> Option<String> {
    non_empty(value.trim().trim_end_matches('/'))
}

fn normalize_groups<I, S>(groups: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for group in groups {
        let group = group.as_ref().trim();
        if !group.is_empty() && !out.iter().any(|existing| existing == group) {
            out.push(group.to_string());
        }
    }
    out
}

fn parse_listen(listen: &StringOrVec) -> Result<SocketAddr, String> {
    let first = match listen {
        StringOrVec::One(value) => Some(value.as_str()),
        StringOrVec::Many(values) => values.first().map(String::as_str),
    };
    let Some(raw) = first else {
        return Ok(SocketAddr::from(DEFAULT_BIND));
    };
    let trimmed = raw
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    if let Ok(port) = trimmed.parse::<u16>() {
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }
    let with_host = if trimmed.starts_with(':') {
        format!("127.0.0.1{trimmed}")
    } else {
        trimmed.replacen("localhost", "127.0.0.1", 1)
    };
    with_host
        .parse::<SocketAddr>()
        .map_err(|err| format!("invalid listen address {raw}: {err}"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrVec {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct YamlConfig {
    listen: Option<StringOrVec>,
    log: Option<YamlLog>,
    auth: Option<YamlAuth>,
}

#[derive(Debug, Deserialize)]
struct YamlLog {
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YamlAuth {
    #[serde(
        rename = "azure-ad",
        alias = "azure-ad-login",
        alias = "azuread",
        alias = "azure_ad"
    )]
    azure_ad: Option<YamlAzureAd>,
}

#[derive(Debug, Deserialize)]
struct YamlAzureAd {
    #[serde(default)]
    tenant: String,
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    client_secret: String,
    organization_domain: Option<String>,
    scope: Option<String>,
    #[serde(default)]
    allow_groups: Vec<String>,
    authority_url: Option<String>,
    graph_url: Option<String>,
    timeout_ms: Option<u64>,
}

impl YamlAzureAd {
    fn into_config(self) -> AzureAdConfig {
        let mut cfg = AzureAdConfig::new(
            self.tenant.trim(),
            self.client_id.trim(),
            self.client_secret,
        );
        cfg.organization_domain = self.organization_domain.as_deref().and_then(non_empty);
        cfg.scope = self.scope.as_deref().and_then(non_empty);
        cfg.allow_groups = normalize_groups(&self.allow_groups);
        if let Some(url) = self.authority_url.as_deref().and_then(normalize_base_url) {
            cfg.authority_url = url;
        }
        if let Some(url) = self.graph_url.as_deref().and_then(normalize_base_url) {
            cfg.graph_url = url;
        }
        cfg.timeout_ms = self.timeout_ms;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::{AzureAdConfig, normalize_groups, parse_listen, StringOrVec};

    #[test]
    fn validate_requires_credentials() {
        let err = AzureAdConfig::new("tenant", "", "secret")
            .validate()
            .expect_err("missing client id");
        assert_eq!(err, "azure-ad client_id is required");
        assert!(AzureAdConfig::new("t", "c", "s").validate().is_ok());
    }

    #[test]
    fn normalizes_group_lists() {
        assert_eq!(
            normalize_groups([" qa", "", "ops", "qa "]),
            vec!["qa".to_string(), "ops".to_string()]
        );
    }

    #[test]
    fn parses_listen_forms() {
        let bind = parse_listen(&StringOrVec::One("4875".to_string())).expect("port");
        assert_eq!(bind.to_string(), "127.0.0.1:4875");
        let bind = parse_listen(&StringOrVec::One("0.0.0.0:4876".to_string())).expect("addr");
        assert_eq!(bind.to_string(), "0.0.0.0:4876");
        let bind = parse_listen(&StringOrVec::Many(vec!["localhost:4877".to_string()]))
            .expect("localhost");
        assert_eq!(bind.to_string(), "127.0.0.1:4877");
        let bind = parse_listen(&StringOrVec::One("http://:4878/".to_string())).expect("colon");
        assert_eq!(bind.to_string(), "127.0.0.1:4878");
    }
}
