//! JSON endpoints mirroring the registry's external HTTP auth plugin protocol.

use crate::{
    app::AppState,
    error::RegistryError,
    models::{AuthIdentity, PackageAccess, PackageAction},
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, instrument};

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(alias = "name")]
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "name")]
    pub username: String,
    pub old_password: String,
    pub new_password: String,
}

/// `package` may be a bare name or an object carrying the permission lists;
/// top-level `access`/`publish`/`unpublish` fill whatever the object lacks.
#[derive(Debug, Deserialize)]
pub struct AllowRequest {
    #[serde(default)]
    pub package: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub identity: Option<AuthIdentity>,
    #[serde(default)]
    pub access: Option<Vec<String>>,
    #[serde(default)]
    pub publish: Option<Vec<String>>,
    #[serde(default)]
    pub unpublish: Option<Vec<String>>,
}

impl AllowRequest {
    pub fn into_parts(self) -> Result<(AuthIdentity, PackageAccess), RegistryError> {
        let identity = self.identity.unwrap_or(AuthIdentity {
            username: self.username,
            groups: self.groups,
        });

        let mut package = match self.package {
            None | Some(Value::Null) => PackageAccess::default(),
            Some(Value::String(name)) => PackageAccess {
                name: Some(name),
                ..PackageAccess::default()
            },
            Some(value @ Value::Object(_)) => serde_json::from_value(value).map_err(|err| {
                RegistryError::http(StatusCode::BAD_REQUEST, format!("invalid package: {err}"))
            })?,
            Some(_) => {
                return Err(RegistryError::http(
                    StatusCode::BAD_REQUEST,
                    "package must be a name or an object",
                ));
            }
        };
        package.access = package.access.or(self.access);
        package.publish = package.publish.or(self.publish);
        package.unpublish = package.unpublish.or(self.unpublish);

        Ok((identity, package))
    }
}

fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RegistryError> {
    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "rejecting malformed request body");
        RegistryError::http(StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}"))
    })
}

pub async fn ping() -> Json<Value> {
    Json(json!({}))
}

#[instrument(skip(state, body))]
pub async fn authenticate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    let credentials: Credentials = parse_json_body(&body)?;
    let groups = state
        .hook
        .authenticate(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(json!({ "ok": true, "groups": groups })))
}

#[instrument(skip(state, body))]
pub async fn add_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    let credentials: Credentials = parse_json_body(&body)?;
    state
        .hook
        .add_user(&credentials.username, &credentials.password)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

#[instrument(skip(state, body))]
pub async fn change_password(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    let request: ChangePasswordRequest = parse_json_body(&body)?;
    state
        .hook
        .change_password(
            &request.username,
            &request.old_password,
            &request.new_password,
        )
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn allow_access(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    allow_decision(state, PackageAction::Access, &body).await
}

pub async fn allow_publish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    allow_decision(state, PackageAction::Publish, &body).await
}

pub async fn allow_unpublish(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RegistryError> {
    allow_decision(state, PackageAction::Unpublish, &body).await
}

#[instrument(skip(state, body))]
async fn allow_decision(
    state: AppState,
    action: PackageAction,
    body: &[u8],
) -> Result<Json<Value>, RegistryError> {
    let (identity, package) = parse_json_body::<AllowRequest>(body)?.into_parts()?;
    if !package.has_permission_lists() {
        debug!(
            package = package.name.as_deref(),
            action = action.as_str(),
            "no permission lists supplied, leaving decision to the registry"
        );
        return Ok(Json(json!({})));
    }
    let allowed = match action {
        PackageAction::Access => state.hook.allow_access(&identity, &package).await?,
        PackageAction::Publish => state.hook.allow_publish(&identity, &package).await?,
        PackageAction::Unpublish => state.hook.allow_unpublish(&identity, &package).await?,
    };
    Ok(Json(json!({ "allowed": allowed })))
}
