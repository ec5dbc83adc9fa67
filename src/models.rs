use serde::{Deserialize, Serialize};
use std::fmt;

/// The authenticated principal as the host registry sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    #[serde(default, alias = "name")]
    pub username: Option<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl AuthIdentity {
    pub fn new(username: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            username: Some(username.into()),
            groups,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageAction {
    Access,
    Publish,
    Unpublish,
}

impl PackageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
        }
    }
}

/// Per-package permission lists handed over by the host on every check.
/// A missing list means nobody is listed for that action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAccess {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub access: Option<Vec<String>>,
    #[serde(default)]
    pub publish: Option<Vec<String>>,
    #[serde(default)]
    pub unpublish: Option<Vec<String>>,
}

impl PackageAccess {
    pub fn principals(&self, action: PackageAction) -> &[String] {
        let list = match action {
            PackageAction::Access => &self.access,
            PackageAction::Publish => &self.publish,
            PackageAction::Unpublish => &self.unpublish,
        };
        list.as_deref().unwrap_or(&[])
    }

    pub fn has_permission_lists(&self) -> bool {
        self.access.is_some() || self.publish.is_some() || self.unpublish.is_some()
    }
}

/// Token endpoint response. Only `access_token` is required.
#[derive(Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub ext_expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("ext_expires_in", &self.ext_expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("has_id_token", &self.id_token.is_some())
            .finish()
    }
}
