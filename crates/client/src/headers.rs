use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

/// Headers for an authenticated call. A missing or blank token yields no
/// `Authorization` header; surrounding quotes left by JSON storage are stripped.
pub fn auth_headers(token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(raw) = token else { return headers };
    let token = raw.trim().trim_matches('"').trim();
    if token.is_empty() {
        return headers;
    }
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(AUTHORIZATION, value);
    }
    headers
}
