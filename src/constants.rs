pub const BASE_GROUP: &str = "azuread";
pub const BASE_SCOPE: &str = "user.read openid profile offline_access";

pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";

pub const TOKEN_ENDPOINT: &str = "/oauth2/v2.0/token";
pub const MEMBER_GROUPS_ENDPOINT: &str = "/me/getMemberGroups";
pub const GROUPS_INFO_ENDPOINT: &str = "/directoryObjects/getByIds";

pub const API_ERROR_BAD_USERNAME_PASSWORD: &str = "bad username/password, access denied";
pub const API_ERROR_NOT_ENOUGH_PRIVILEGES: &str = "the user does not have enough privileges";
pub const API_ERROR_ACCESS_DENIED: &str = "error, try again";

pub const HEADER_JSON: &str = "application/json";
