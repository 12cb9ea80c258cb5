//! Session token extraction from request headers

/// Session token from an `Authorization: Bearer` header or a `session` cookie
///
/// The header wins when both are present.
pub fn extract_session_token(authorization: Option<&str>, cookie: Option<&str>) -> Option<String> {
    if let Some(token) = authorization.and_then(|value| value.strip_prefix("Bearer ")) {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    cookie?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("session="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
