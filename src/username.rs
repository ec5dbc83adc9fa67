const DOMAIN_SEPARATOR: &str = "..";

/// Turns a registry login handle into the user principal name Azure AD
/// expects.
///
/// `npm login` rejects `@` in usernames, so `jane..contoso.com` is accepted as
/// an alias for `jane@contoso.com`. The last separator wins. Plain handles get
/// the organization domain appended when one is configured.
pub fn decode_username_to_email(username: &str, organization_domain: Option<&str>) -> String {
    if username.contains('@') {
        return username.to_string();
    }

    if let Some(pos) = username.rfind(DOMAIN_SEPARATOR) {
        let local = &username[..pos];
        let domain = &username[pos + DOMAIN_SEPARATOR.len()..];
        return format!("{local}@{domain}");
    }

    match organization_domain.filter(|domain| !domain.is_empty()) {
        Some(domain) => format!("{username}@{domain}"),
        None => username.to_string(),
    }
}
