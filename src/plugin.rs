use crate::{
    auth::AuthHook,
    azure::AzureApi,
    config::AzureAdConfig,
    constants::{
        API_ERROR_ACCESS_DENIED, API_ERROR_BAD_USERNAME_PASSWORD, API_ERROR_NOT_ENOUGH_PRIVILEGES,
        BASE_GROUP,
    },
    error::{AzureError, RegistryError},
    groups::{intersection, merge_unique},
    models::{AuthIdentity, PackageAccess, PackageAction},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Azure AD backed authentication plus group based package permissions.
#[derive(Debug, Clone)]
pub struct AzureAdPlugin {
    api: AzureApi,
}

impl AzureAdPlugin {
    pub fn new(config: Arc<AzureAdConfig>) -> Result<Self, RegistryError> {
        let api = AzureApi::new(config).map_err(|err| {
            error!(error = %err, "failed to initialize azure ad client");
            RegistryError::Internal
        })?;
        Ok(Self { api })
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>, RegistryError> {
        let principal = self.api.decode_username_to_email(username);
        debug!(principal, "trying to authenticate against azure ad");

        let groups = match self.resolve_groups(&principal, password).await {
            Ok(groups) => groups,
            Err(err) => {
                error!(principal, error = %err, "azure ad authentication failed");
                return Err(RegistryError::unauthorized(API_ERROR_BAD_USERNAME_PASSWORD));
            }
        };
        debug!(principal, groups = ?groups, "user is member of groups");

        let allow_groups = self.api.allow_groups();
        if allow_groups.is_empty() {
            info!(principal, group_count = groups.len(), "login accepted");
            return Ok(groups);
        }

        let allowed = intersection(&groups, allow_groups);
        debug!(principal, intersection = ?allowed, "intersected user groups with allow-list");
        if allowed.is_empty() {
            info!(principal, "login rejected: no allowed group membership");
            return Err(RegistryError::unauthorized(API_ERROR_NOT_ENOUGH_PRIVILEGES));
        }

        let granted = merge_unique(&[BASE_GROUP], allowed);
        info!(principal, group_count = granted.len(), "login accepted");
        Ok(granted)
    }

    async fn resolve_groups(
        &self,
        principal: &str,
        password: &str,
    ) -> Result<Vec<String>, AzureError> {
        let token = self.api.request_token(principal, password).await?;
        debug!(
            token_type = token.token_type.as_deref(),
            expires_in = token.expires_in,
            "azure ad token received"
        );
        self.api.request_user_groups(&token.access_token).await
    }

    pub fn allow_access(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        self.allow_action(PackageAction::Access, identity, package)
    }

    pub fn allow_publish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        self.allow_action(PackageAction::Publish, identity, package)
    }

    pub fn allow_unpublish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        self.allow_action(PackageAction::Unpublish, identity, package)
    }

    fn allow_action(
        &self,
        action: PackageAction,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        if is_permitted(action, identity, package) {
            debug!(
                name = identity.username.as_deref(),
                package = package.name.as_deref(),
                action = action.as_str(),
                "permission granted"
            );
            return Ok(true);
        }

        error!(
            name = identity.username.as_deref(),
            package = package.name.as_deref(),
            action = action.as_str(),
            "permission denied"
        );
        Err(RegistryError::unauthorized(API_ERROR_ACCESS_DENIED))
    }
}

fn is_permitted(action: PackageAction, identity: &AuthIdentity, package: &PackageAccess) -> bool {
    let principals = package.principals(action);
    let listed_by_name = identity
        .username
        .as_deref()
        .is_some_and(|name| principals.iter().any(|principal| principal == name));
    listed_by_name || !intersection(&identity.groups, principals).is_empty()
}

#[async_trait]
impl AuthHook for AzureAdPlugin {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>, RegistryError> {
        AzureAdPlugin::authenticate(self, username, password).await
    }

    async fn allow_access(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        AzureAdPlugin::allow_access(self, identity, package)
    }

    async fn allow_publish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        AzureAdPlugin::allow_publish(self, identity, package)
    }

    async fn allow_unpublish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError> {
        AzureAdPlugin::allow_unpublish(self, identity, package)
    }
}
