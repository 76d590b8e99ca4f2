use super::forward::{self, Forwarder};
use super::validator::AccessValidator;
use crate::domain_model::token_fingerprint;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::{Filter, Rejection, reject};

/// Prefix whitelist. A matching path skips token validation entirely.
#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    whitelist: Vec<String>,
}

impl GatewayPolicy {
    pub fn new(whitelist: Vec<String>) -> Self {
        GatewayPolicy { whitelist }
    }

    pub fn is_whitelisted(&self, path: &str) -> bool {
        self.whitelist.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// Identity established by the gate, to be stamped onto the upstream
/// request. Only ever built from a successful validation.
#[derive(Debug, Clone)]
pub struct ForwardedIdentity {
    pub username: String,
    pub roles: BTreeSet<String>,
}

impl ForwardedIdentity {
    pub fn joined_roles(&self) -> String {
        self.roles.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Strict bearer extraction for the gate. The scheme must be exactly
/// `Bearer ` and the remainder non-empty; anything else is a missing
/// token, rejected before any validation call goes out.
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?;
    if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug)]
pub struct Unauthorized;

impl reject::Reject for Unauthorized {}

pub struct Gateway {
    pub policy: GatewayPolicy,
    pub validator: Arc<dyn AccessValidator>,
    pub forwarder: Forwarder,
}

impl Gateway {
    pub fn new(
        policy: GatewayPolicy,
        validator: Arc<dyn AccessValidator>,
        forwarder: Forwarder,
    ) -> Self {
        Gateway {
            policy,
            validator,
            forwarder,
        }
    }
}

/// The per-request state machine, ahead of everything else: whitelisted
/// paths pass with no identity; everything else needs a bearer token the
/// validator accepts, or the request dies here with 401.
fn gate(
    gateway: Arc<Gateway>,
) -> impl Filter<Extract = (Option<ForwardedIdentity>,), Error = Rejection> + Clone {
    warp::path::full()
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |path: FullPath, authorization: Option<String>| {
            let gateway = gateway.clone();
            async move {
                if gateway.policy.is_whitelisted(path.as_str()) {
                    return Ok(None);
                }

                let Some(token) = authorization.as_deref().and_then(bearer_token) else {
                    debug!("no usable bearer for {}, rejecting", path.as_str());
                    return Err(reject::custom(Unauthorized));
                };

                let check = gateway.validator.validate(token).await;
                if check.is_valid && !check.username.is_empty() {
                    debug!(
                        "token {} accepted for {} as {}",
                        token_fingerprint(token),
                        path.as_str(),
                        check.username
                    );
                    Ok(Some(ForwardedIdentity {
                        username: check.username,
                        roles: check.roles,
                    }))
                } else {
                    debug!(
                        "token {} rejected for {}",
                        token_fingerprint(token),
                        path.as_str()
                    );
                    Err(reject::custom(Unauthorized))
                }
            }
        })
}

pub fn routes(
    gateway: Arc<Gateway>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    gate(gateway.clone())
        .and(warp::method())
        .and(warp::path::full())
        .and(raw_query())
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(with(gateway))
        .and_then(forward::forward)
}

/// Every rejection leaving the gateway is the same bodiless 401; why a
/// request failed is not the client's business.
pub async fn recover_unauthorized(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if err.find::<Unauthorized>().is_none() {
        debug!("unexpected rejection at the edge: {:?}", err);
    }
    Ok(warp::reply::with_status(
        warp::reply(),
        StatusCode::UNAUTHORIZED,
    ))
}

fn raw_query() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
