//! Client IP extraction
//!
//! The origin address recorded on every audit entry comes from here. Forwarding
//! headers are only honoured as far as the configured number of trusted proxies.

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::state::SecurityConfig;

const UNKNOWN: &str = "unknown";

/// Extract and validate the client IP from request headers.
///
/// Order of preference: `X-Forwarded-For` (respecting `trusted_proxy_count`),
/// `X-Real-IP`, then the socket address. Returns `"unknown"` when none is usable.
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(header_value) = forwarded_for.to_str() {
            if let Some(ip) = extract_from_forwarded_for(header_value, trusted_proxy_count) {
                return ip;
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(header_value) = real_ip.to_str() {
            let trimmed = header_value.trim();
            if is_valid_ip(trimmed) {
                return trimmed.to_string();
            }
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    UNKNOWN.to_string()
}

/// Pick the client entry out of an `X-Forwarded-For` chain (`client, proxy1, proxy2`).
///
/// With N trusted proxies the last N entries are theirs and the client is the one
/// before them. With none, only the entry closest to us is used.
fn extract_from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    let candidate = if trusted_proxy_count == 0 || ips.len() <= trusted_proxy_count {
        ips.last()?
    } else {
        ips.get(ips.len() - trusted_proxy_count - 1)?
    };

    is_valid_ip(candidate).then(|| candidate.to_string())
}

fn is_valid_ip(ip_str: &str) -> bool {
    ip_str.parse::<IpAddr>().is_ok()
}

/// Origin address of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
    SecurityConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let security = SecurityConfig::from_ref(state);
        let socket_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientIp(extract_client_ip(
            &parts.headers,
            socket_addr.as_ref(),
            security.trusted_proxy_count,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn create_headers_with_xff(xff_value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(xff_value).unwrap());
        headers
    }

    #[test]
    fn test_extract_from_forwarded_for_single_ip() {
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1", 0).as_deref(),
            Some("192.168.1.1")
        );
        assert_eq!(
            extract_from_forwarded_for("192.168.1.1", 1).as_deref(),
            Some("192.168.1.1")
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_with_proxy() {
        // client, proxy
        assert_eq!(
            extract_from_forwarded_for("203.0.113.7, 10.0.0.1", 1).as_deref(),
            Some("203.0.113.7")
        );
        // Without trusted proxies the client-supplied entry is ignored.
        assert_eq!(
            extract_from_forwarded_for("203.0.113.7, 10.0.0.1", 0).as_deref(),
            Some("10.0.0.1")
        );
    }

    #[test]
    fn test_extract_from_forwarded_for_rejects_garbage() {
        assert_eq!(extract_from_forwarded_for("not-an-ip", 0), None);
        assert_eq!(extract_from_forwarded_for(" , ", 0), None);
    }

    #[test]
    fn test_extract_client_ip_from_xff() {
        let headers = create_headers_with_xff("198.51.100.4");
        assert_eq!(extract_client_ip(&headers, None, 0), "198.51.100.4");
    }

    #[test]
    fn test_extract_client_ip_from_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("2001:db8::1"));
        assert_eq!(extract_client_ip(&headers, None, 0), "2001:db8::1");
    }

    #[test]
    fn test_extract_client_ip_fallback_to_socket() {
        let headers = create_headers_with_xff("garbage");
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        assert_eq!(extract_client_ip(&headers, Some(&addr), 0), "127.0.0.1");
    }

    #[test]
    fn test_extract_client_ip_unknown() {
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, 2), "unknown");
    }
}
