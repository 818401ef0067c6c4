//! Reverse-proxy forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI to target the chosen backend
//! - Strip hop-by-hop headers; append X-Forwarded-For
//! - Stream the origin response back unchanged
//! - Keep the RIF guard alive for the whole exchange

use std::net::SocketAddr;
use std::str::FromStr;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri};
use axum::response::Response;
use http_body_util::BodyExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use thiserror::Error;

use crate::balancer::backend::RifGuard;

/// HTTP client shared by all forwards.
pub type ProxyClient = Client<HttpConnector, Body>;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid backend address: {0}")]
    BadAddress(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Connection-specific headers (RFC 7230 §6.1), never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Proxy one request to the backend held by `guard`.
///
/// The guard rides with the response body so the backend's RIF stays raised
/// until the origin response finishes streaming to the client (or the
/// connection aborts). On an upstream transport error the guard is released
/// here and the caller answers 503.
pub async fn forward(
    client: &ProxyClient,
    guard: RifGuard,
    peer: SocketAddr,
    mut request: Request<Body>,
) -> Result<Response, ForwardError> {
    rewrite_target(&mut request, &guard.address)?;
    strip_hop_by_hop(request.headers_mut());
    append_forwarded_for(request.headers_mut(), peer);

    let response = client.request(request).await?;

    let (parts, body) = response.into_parts();
    let body = Body::new(body.map_frame(move |frame| {
        let _hold = &guard;
        frame
    }));
    Ok(Response::from_parts(parts, body))
}

/// Point the request at `http://{address}`, preserving path and query.
fn rewrite_target(request: &mut Request<Body>, address: &str) -> Result<(), ForwardError> {
    let mut parts = request.uri().clone().into_parts();
    parts.scheme = Some(Scheme::HTTP);
    parts.authority = Some(
        Authority::from_str(address).map_err(|_| ForwardError::BadAddress(address.to_string()))?,
    );
    if parts.path_and_query.is_none() {
        parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }

    *request.uri_mut() =
        Uri::from_parts(parts).map_err(|_| ForwardError::BadAddress(address.to_string()))?;
    Ok(())
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    // Headers named by Connection are hop-by-hop too.
    let connection_named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_str(name.trim()).ok())
        .collect();

    for name in connection_named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let client_ip = peer.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{existing}, {client_ip}"),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_standard_hop_by_hop_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("accept", HeaderValue::from_static("*/*"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("connection").is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("accept").is_some());
    }

    #[test]
    fn strips_connection_named_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("x-custom-hop, x-other"));
        headers.insert("x-custom-hop", HeaderValue::from_static("1"));
        headers.insert("x-other", HeaderValue::from_static("2"));
        headers.insert("x-kept", HeaderValue::from_static("3"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("x-custom-hop").is_none());
        assert!(headers.get("x-other").is_none());
        assert!(headers.get("x-kept").is_some());
    }

    #[test]
    fn sets_forwarded_for_when_absent() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.1.2.3:4567".parse().unwrap());

        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "10.1.2.3");
    }

    #[test]
    fn appends_to_existing_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("192.168.0.9"));
        append_forwarded_for(&mut headers, "10.1.2.3:4567".parse().unwrap());

        assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "192.168.0.9, 10.1.2.3");
    }

    #[test]
    fn rewrites_target_preserving_path_and_query() {
        let mut request = Request::builder()
            .uri("/search?q=abc")
            .body(Body::empty())
            .unwrap();

        rewrite_target(&mut request, "127.0.0.1:9001").unwrap();

        assert_eq!(request.uri(), "http://127.0.0.1:9001/search?q=abc");
    }

    #[test]
    fn rejects_unparseable_address() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let err = rewrite_target(&mut request, "not a host").unwrap_err();
        assert!(matches!(err, ForwardError::BadAddress(_)));
    }
}
