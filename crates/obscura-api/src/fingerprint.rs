//! Client fingerprint extraction for anonymous rate limiting.

use axum::http::HeaderMap;
use obscura_services::Fingerprint;

/// Client IP as reported by proxy headers. `X-Forwarded-For` wins (first
/// hop), then `X-Real-IP`; without either the fingerprint degrades to the
/// remaining header signals.
fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_or_empty<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("")
}

pub fn client_fingerprint(headers: &HeaderMap) -> Fingerprint {
    Fingerprint::from_parts(
        &client_ip(headers),
        header_or_empty(headers, "user-agent"),
        header_or_empty(headers, "accept-language"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let a = client_fingerprint(&headers(&[
            ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ("user-agent", "ua"),
        ]));
        let b = client_fingerprint(&headers(&[
            ("x-forwarded-for", "203.0.113.9"),
            ("user-agent", "ua"),
        ]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_real_ip_fallback_changes_fingerprint() {
        let a = client_fingerprint(&headers(&[("x-real-ip", "198.51.100.7")]));
        let b = client_fingerprint(&headers(&[("x-real-ip", "198.51.100.8")]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_headers_still_produce_fingerprint() {
        let fp = client_fingerprint(&HeaderMap::new());
        assert_eq!(fp.as_str().len(), 64);
    }
}
