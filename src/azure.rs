use crate::{
    config::AzureAdConfig,
    constants::{BASE_GROUP, BASE_SCOPE, GROUPS_INFO_ENDPOINT, MEMBER_GROUPS_ENDPOINT, TOKEN_ENDPOINT},
    error::AzureError,
    groups::with_base_group,
    models::AccessToken,
    username::decode_username_to_email,
};
use reqwest::{Client, Response, redirect::Policy};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument, warn};

/// Graph collection envelope: `{"value": [...]}`.
#[derive(Debug, Deserialize)]
struct GraphCollection<T> {
    value: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct DirectoryObject {
    #[serde(rename = "mailNickname", default)]
    mail_nickname: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AzureApi {
    config: Arc<AzureAdConfig>,
    scope: String,
    client: Client,
}

impl AzureApi {
    pub fn new(config: Arc<AzureAdConfig>) -> Result<Self, AzureError> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(15))
            .tcp_keepalive(Duration::from_secs(30))
            .redirect(Policy::limited(3));
        if let Some(timeout_ms) = config.timeout_ms {
            let timeout = Duration::from_millis(timeout_ms.max(250));
            builder = builder
                .timeout(timeout)
                .connect_timeout(timeout.min(Duration::from_secs(3)));
        }
        let client = builder
            .build()
            .map_err(|err| AzureError::transport("client", err))?;

        let scope = match config.scope.as_deref() {
            Some(extra) if !extra.is_empty() => format!("{BASE_SCOPE} {extra}"),
            _ => BASE_SCOPE.to_string(),
        };

        debug!(
            tenant = config.tenant,
            authority_url = config.authority_url,
            graph_url = config.graph_url,
            allow_group_count = config.allow_groups.len(),
            has_organization_domain = config.organization_domain.is_some(),
            "initialized azure ad client"
        );

        Ok(Self {
            config,
            scope,
            client,
        })
    }

    pub fn allow_groups(&self) -> &[String] {
        &self.config.allow_groups
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}{TOKEN_ENDPOINT}",
            self.config.authority_url, self.config.tenant
        )
    }

    fn graph_url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.graph_url)
    }

    pub fn decode_username_to_email(&self, username: &str) -> String {
        decode_username_to_email(username, self.config.organization_domain.as_deref())
    }

    /// Resource-owner password grant against `/oauth2/v2.0/token`.
    #[instrument(skip(self, password))]
    pub async fn request_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, AzureError> {
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
        ];
        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|err| AzureError::Authentication(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_provider_error(response)
                .await
                .unwrap_or_else(|| format!("token endpoint responded with status {}", status.as_u16()));
            warn!(status = status.as_u16(), "azure ad rejected token request");
            return Err(AzureError::Authentication(message));
        }

        response
            .json::<AccessToken>()
            .await
            .map_err(|err| AzureError::Authentication(err.to_string()))
    }

    /// Group names for the token's owner, always led by the base group.
    ///
    /// Without an allow-list nothing would filter on the result, so Graph is
    /// not contacted at all.
    #[instrument(skip(self, token))]
    pub async fn request_user_groups(&self, token: &str) -> Result<Vec<String>, AzureError> {
        if self.config.allow_groups.is_empty() {
            debug!("no allow-list configured; skipping graph group lookup");
            return Ok(vec![BASE_GROUP.to_string()]);
        }

        let ids = self.get_member_groups(token).await?;
        let names = self.get_groups_information(token, &ids).await?;
        Ok(with_base_group(names))
    }

    async fn get_member_groups(&self, token: &str) -> Result<Vec<String>, AzureError> {
        let collection: GraphCollection<String> = self
            .post_graph(
                MEMBER_GROUPS_ENDPOINT,
                token,
                &json!({ "securityEnabledOnly": false }),
            )
            .await?;
        let ids = collection.value.unwrap_or_default();
        debug!(group_id_count = ids.len(), "resolved member group ids");
        Ok(ids)
    }

    async fn get_groups_information(
        &self,
        token: &str,
        ids: &[String],
    ) -> Result<Vec<String>, AzureError> {
        // Graph rejects getByIds with an empty `ids` array.
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let collection: GraphCollection<DirectoryObject> = self
            .post_graph(
                GROUPS_INFO_ENDPOINT,
                token,
                &json!({ "ids": ids, "types": ["group"] }),
            )
            .await?;
        let names = collection
            .value
            .unwrap_or_default()
            .into_iter()
            .filter_map(|object| object.mail_nickname)
            .collect::<Vec<_>>();
        debug!(group_name_count = names.len(), "resolved group names");
        Ok(names)
    }

    async fn post_graph<T>(
        &self,
        endpoint: &'static str,
        token: &str,
        payload: &Value,
    ) -> Result<T, AzureError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.graph_url(endpoint))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(|err| AzureError::transport(endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let message = extract_provider_error(response)
                .await
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            warn!(endpoint, status = status.as_u16(), "graph request failed");
            return Err(AzureError::Transport { endpoint, message });
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AzureError::payload(endpoint, err))
    }
}

/// Pulls a readable message out of an OAuth (`error_description`) or Graph
/// (`error.message`) error body.
async fn extract_provider_error(response: Response) -> Option<String> {
    let parsed = response.json::<Value>().await.ok()?;
    parsed
        .get("error_description")
        .and_then(Value::as_str)
        .or_else(|| parsed.pointer("/error/message").and_then(Value::as_str))
        .or_else(|| parsed.get("error").and_then(Value::as_str))
        .or_else(|| parsed.get("message").and_then(Value::as_str))
        .map(ToOwned::to_owned)
}
