//! Per-guestbook origin allow lists
//!
//! A guestbook may restrict which sites embed its messages. The list is a
//! comma-separated string of `scheme://host[:port]` origins; an empty list
//! allows everyone.

use axum::http::{
    header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, REFERER, VARY},
    HeaderMap, HeaderValue,
};
use tracing::warn;
use url::Url;

use crate::error::{AppError, Result};

/// Splits a stored allow list into lower-cased origins without trailing `/`.
pub fn parse_allowed_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().trim_end_matches('/').to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Validates an admin-supplied allow list and returns its normalised form.
///
/// Each entry must be an http(s) URL with a host and no path.
pub fn validate_origins(raw: &str) -> Result<String> {
    let mut cleaned = Vec::new();

    for part in raw.split(',') {
        let part = part.trim().trim_end_matches('/');
        if part.is_empty() {
            continue;
        }

        let url = Url::parse(part)
            .map_err(|e| AppError::InvalidRequest(format!("invalid origin \"{part}\": {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AppError::InvalidRequest(format!(
                "invalid origin \"{part}\": scheme must be http or https"
            )));
        }
        if url.path() != "/" && !url.path().is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "invalid origin \"{part}\": must not contain a path"
            )));
        }
        let Some(origin) = serialize_origin(&url) else {
            return Err(AppError::InvalidRequest(format!(
                "invalid origin \"{part}\": missing host"
            )));
        };
        cleaned.push(origin);
    }

    Ok(cleaned.join(","))
}

/// Origin of the calling page, from `Origin` or else derived from `Referer`.
///
/// An opaque `null` origin counts as absent.
pub fn request_origin(headers: &HeaderMap) -> Option<String> {
    let origin = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "null");
    if let Some(origin) = origin {
        return Some(origin.trim_end_matches('/').to_lowercase());
    }

    headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .and_then(|url| serialize_origin(&url))
}

fn serialize_origin(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?;
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Some(origin.to_lowercase())
}

// == Origin Decision ==
/// Outcome of an allowed origin check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// The guestbook has no allow list
    Unrestricted,
    /// The request carried no origin at all (direct navigation, curl)
    NoOrigin,
    /// The request origin is on the allow list
    Matched(String),
}

impl OriginDecision {
    /// Echoes a matched origin back to the browser.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let OriginDecision::Matched(origin) = self {
            if let Ok(value) = HeaderValue::from_str(origin) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(VARY, HeaderValue::from_static("Origin"));
            }
        }
    }
}

/// Checks the request against a guestbook's stored allow list.
pub fn check_origin_allowed(headers: &HeaderMap, allowed_origins: &str) -> Result<OriginDecision> {
    let allowed = parse_allowed_origins(allowed_origins);
    if allowed.is_empty() {
        return Ok(OriginDecision::Unrestricted);
    }

    let Some(origin) = request_origin(headers) else {
        return Ok(OriginDecision::NoOrigin);
    };

    if allowed.contains(&origin) {
        Ok(OriginDecision::Matched(origin))
    } else {
        warn!(origin = %origin, "rejected request from unlisted origin");
        Err(AppError::Forbidden("Origin not allowed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_parse_allowed_origins() {
        let parsed = parse_allowed_origins(" https://A.com/ , ,http://b.org");
        assert_eq!(parsed, vec!["https://a.com", "http://b.org"]);
        assert!(parse_allowed_origins("  ").is_empty());
    }

    #[test]
    fn test_validate_origins_normalises() {
        let cleaned = validate_origins("https://Example.com/, http://localhost:8080").unwrap();
        assert_eq!(cleaned, "https://example.com,http://localhost:8080");
        assert_eq!(validate_origins("").unwrap(), "");
    }

    #[test]
    fn test_validate_origins_rejects_bad_entries() {
        for bad in ["ftp://example.com", "https://example.com/blog", "example.com"] {
            let err = validate_origins(bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidRequest(_)), "{bad} accepted");
        }
    }

    #[test]
    fn test_request_origin_sources() {
        assert_eq!(
            request_origin(&headers(&[("origin", "https://Site.com/")])),
            Some("https://site.com".to_string())
        );
        assert_eq!(
            request_origin(&headers(&[
                ("origin", "null"),
                ("referer", "https://site.com/blog/post?id=3")
            ])),
            Some("https://site.com".to_string())
        );
        assert_eq!(request_origin(&HeaderMap::new()), None);
    }

    #[test]
    fn test_check_origin_allowed() {
        let list = "https://site.com";

        assert_eq!(
            check_origin_allowed(&headers(&[("origin", "https://evil.com")]), "").unwrap(),
            OriginDecision::Unrestricted
        );
        assert_eq!(
            check_origin_allowed(&HeaderMap::new(), list).unwrap(),
            OriginDecision::NoOrigin
        );
        assert_eq!(
            check_origin_allowed(&headers(&[("origin", "https://site.com")]), list).unwrap(),
            OriginDecision::Matched("https://site.com".to_string())
        );
        assert!(matches!(
            check_origin_allowed(&headers(&[("origin", "https://evil.com")]), list),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_apply_sets_headers_only_on_match() {
        let mut map = HeaderMap::new();
        OriginDecision::Unrestricted.apply(&mut map);
        assert!(map.is_empty());

        OriginDecision::Matched("https://site.com".into()).apply(&mut map);
        assert_eq!(map[ACCESS_CONTROL_ALLOW_ORIGIN], "https://site.com");
        assert_eq!(map[VARY], "Origin");
    }
}
