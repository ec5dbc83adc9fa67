use crate::{
    error::RegistryError,
    models::{AuthIdentity, PackageAccess},
};
use async_trait::async_trait;
use axum::http::StatusCode;

/// Entry points a host registry calls into. Every call settles exactly once:
/// `Ok` carries the groups (login) or `true` (checks), `Err` carries the
/// rejection the host should render.
#[async_trait]
pub trait AuthHook: Send + Sync {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<String>, RegistryError>;

    async fn allow_access(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError>;

    async fn allow_publish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError>;

    async fn allow_unpublish(
        &self,
        identity: &AuthIdentity,
        package: &PackageAccess,
    ) -> Result<bool, RegistryError>;

    async fn add_user(&self, _username: &str, _password: &str) -> Result<(), RegistryError> {
        Err(RegistryError::http(
            StatusCode::FORBIDDEN,
            "adduser is not supported",
        ))
    }

    async fn change_password(
        &self,
        _username: &str,
        _old_password: &str,
        _new_password: &str,
    ) -> Result<(), RegistryError> {
        Err(RegistryError::http(
            StatusCode::FORBIDDEN,
            "changePassword is not supported",
        ))
    }
}
