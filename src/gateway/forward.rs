use super::filter::{ForwardedIdentity, Gateway};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use warp::http::{HeaderMap, Method, Response, StatusCode};
use warp::hyper::body::Bytes;
use warp::path::FullPath;

pub const X_USER_ID: &str = "x-user-id";
pub const X_USER_ROLES: &str = "x-user-roles";

// Dropped on the way upstream: transport headers the client owns, plus
// the identity headers, which only this gateway may set.
const SKIP_REQUEST_HEADERS: [&str; 11] = [
    "host",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "upgrade",
    X_USER_ID,
    X_USER_ROLES,
];

const SKIP_RESPONSE_HEADERS: [&str; 5] = [
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "upgrade",
];

/// Relays a gated request to the configured upstream, translating between
/// the server-side and client-side HTTP types. An identity established by
/// the gate must reach the upstream as headers; when it cannot be encoded
/// the relay answers 401 rather than forward the request unattributed.
/// Any upstream failure is a bare 502; the client learns nothing else.
pub struct Forwarder {
    client: reqwest::Client,
    upstream: String,
}

impl Forwarder {
    pub fn new(upstream_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Forwarder {
            client,
            upstream: upstream_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` means the identity could not be expressed as headers and the
    /// request must not go upstream.
    fn upstream_headers(
        headers: &HeaderMap,
        identity: Option<&ForwardedIdentity>,
    ) -> Option<reqwest::header::HeaderMap> {
        let mut out = reqwest::header::HeaderMap::new();
        for (name, value) in headers.iter() {
            if SKIP_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            let Ok(name) = reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes())
            else {
                continue;
            };
            let Ok(value) = reqwest::header::HeaderValue::from_bytes(value.as_bytes()) else {
                continue;
            };
            out.append(name, value);
        }

        if let Some(identity) = identity {
            let Ok(user) = reqwest::header::HeaderValue::from_str(&identity.username) else {
                warn!("username not header-safe, refusing to forward");
                return None;
            };
            let Ok(roles) = reqwest::header::HeaderValue::from_str(&identity.joined_roles())
            else {
                warn!(
                    "roles for {} not header-safe, refusing to forward",
                    identity.username
                );
                return None;
            };
            out.insert(X_USER_ID, user);
            out.insert(X_USER_ROLES, roles);
        }

        Some(out)
    }

    pub async fn relay(
        &self,
        identity: Option<&ForwardedIdentity>,
        method: &Method,
        path: &str,
        query: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response<Bytes> {
        let Some(headers) = Self::upstream_headers(headers, identity) else {
            return unauthorized();
        };

        let url = if query.is_empty() {
            format!("{}{}", self.upstream, path)
        } else {
            format!("{}{}?{}", self.upstream, path, query)
        };

        let Ok(method) = reqwest::Method::from_bytes(method.as_str().as_bytes()) else {
            return bad_gateway();
        };

        let outcome = self
            .client
            .request(method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await;

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!("upstream request to {} failed: {}", url, e);
                return bad_gateway();
            }
        };

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let mut builder = Response::builder().status(status);
        for (name, value) in response.headers().iter() {
            if SKIP_RESPONSE_HEADERS.contains(&name.as_str()) {
                continue;
            }
            if let Ok(name) = warp::http::header::HeaderName::from_bytes(name.as_str().as_bytes())
            {
                if let Ok(value) = warp::http::header::HeaderValue::from_bytes(value.as_bytes()) {
                    builder = builder.header(name, value);
                }
            }
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!("reading upstream response from {} failed: {}", url, e);
                return bad_gateway();
            }
        };

        builder.body(body).unwrap_or_else(|_| bad_gateway())
    }
}

fn bad_gateway() -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    response
}

// Matches the bodiless 401 recover_unauthorized produces at the gate.
fn unauthorized() -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response
}

pub async fn forward(
    identity: Option<ForwardedIdentity>,
    method: Method,
    path: FullPath,
    query: String,
    headers: HeaderMap,
    body: Bytes,
    gateway: Arc<Gateway>,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(gateway
        .forwarder
        .relay(
            identity.as_ref(),
            &method,
            path.as_str(),
            &query,
            &headers,
            body,
        )
        .await)
}
