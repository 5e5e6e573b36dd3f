//! Reverse proxy for paths outside the API prefix.

use crate::response::html;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::Response,
};

/// Drop connection-scoped headers that must not cross a proxy hop.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let hop_by_hop: [HeaderName; 7] = [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ];
    for name in hop_by_hop {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

/// Forward method and headers to `origin` + path + query; relay status, headers and a streamed body.
pub async fn forward(client: &reqwest::Client, origin: &str, req: Request) -> Response {
    let (parts, _body) = req.into_parts();
    let path_and_query = parts.uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = format!("{}{}", origin, path_and_query);

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    strip_hop_by_hop(&mut headers);

    tracing::debug!(method = %parts.method, target = %target, "proxy");
    let sent = client.request(parts.method, &target).headers(headers).send().await;
    let upstream = match sent {
        Ok(upstream) => upstream,
        Err(e) => {
            tracing::warn!(target = %target, error = %e, "proxy upstream unreachable");
            return upstream_unavailable(origin);
        }
    };

    let status = upstream.status();
    let mut relayed = upstream.headers().clone();
    strip_hop_by_hop(&mut relayed);

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;
    response
}

fn upstream_unavailable(origin: &str) -> Response {
    html(
        StatusCode::SERVICE_UNAVAILABLE,
        format!(
            "<!doctype html>\n<html>\n  <head><meta charset=\"utf-8\" /><title>Client not running</title></head>\n  <body>\n    <h1>Client is not running</h1>\n    <p>The studio API is up, but the frontend was not reachable at <code>{}</code>.</p>\n  </body>\n</html>\n",
            origin
        ),
    )
}
