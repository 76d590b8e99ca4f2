use gatehouse::api;
use gatehouse::application_impl::{
    Argon2PasswordHasher, JwtHs256Codec, RealTokenService, TokenConfig,
};
use gatehouse::application_port::{
    AccessCheck, CredentialHasher, LoginInput, RegisterInput, TokenCodec, TokenService,
};
use gatehouse::gateway::{
    self, AccessValidator, Forwarder, Gateway, GatewayPolicy, LocalValidator, RemoteValidator,
};
use gatehouse::infra_memory::{MemoryDirectory, MemorySessionStore, MemoryTxManager};
use serde_json::Value;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use warp::Filter;
use warp::http::StatusCode;

struct StubValidator {
    check: AccessCheck,
    calls: AtomicUsize,
}

impl StubValidator {
    fn new(check: AccessCheck) -> Arc<Self> {
        Arc::new(StubValidator {
            check,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AccessValidator for StubValidator {
    async fn validate(&self, _token: &str) -> AccessCheck {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.check.clone()
    }
}

/// Upstream that reports the path and identity headers it received.
fn spawn_echo_upstream() -> SocketAddr {
    let echo = warp::any()
        .and(warp::path::full())
        .and(warp::header::optional::<String>("x-user-id"))
        .and(warp::header::optional::<String>("x-user-roles"))
        .map(
            |path: warp::path::FullPath, user_id: Option<String>, user_roles: Option<String>| {
                warp::reply::json(&serde_json::json!({
                    "path": path.as_str(),
                    "userId": user_id,
                    "userRoles": user_roles,
                }))
            },
        );
    let (addr, server) = warp::serve(echo).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn gateway_over(
    validator: Arc<dyn AccessValidator>,
    upstream: SocketAddr,
    whitelist: Vec<String>,
) -> Arc<Gateway> {
    let policy = GatewayPolicy::new(whitelist);
    let forwarder = Forwarder::new(&format!("http://{upstream}"), Duration::from_secs(2)).unwrap();
    Arc::new(Gateway::new(policy, validator, forwarder))
}

fn token_service() -> Arc<dyn TokenService> {
    let directory = Arc::new(MemoryDirectory::new());
    let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(TokenConfig {
        signing_key: b"gateway-test-signing-key".to_vec(),
        access_ttl: Duration::from_secs(900),
        refresh_ttl: Duration::from_secs(3600),
    }));

    Arc::new(RealTokenService::new(
        directory.clone(),
        directory,
        credential_hasher,
        token_codec,
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryTxManager),
    ))
}

#[tokio::test]
async fn whitelisted_path_skips_validation() {
    let upstream = spawn_echo_upstream();
    let stub = StubValidator::new(AccessCheck::invalid());
    let gw = gateway_over(stub.clone(), upstream, vec!["/public/".to_string()]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/public/ping")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["path"], "/public/ping");
    assert_eq!(body["userId"], Value::Null);
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn missing_bearer_dies_at_the_gate() {
    // Nothing listens on the upstream port; reaching it would surface
    // as a 502 rather than the expected 401.
    let upstream: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let stub = StubValidator::new(AccessCheck::valid("alice", BTreeSet::new()));
    let gw = gateway_over(stub.clone(), upstream, vec![]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.body().is_empty());

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", "Basic dXNlcjpwdw==")
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn rejected_token_is_a_bodiless_401() {
    let upstream: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let stub = StubValidator::new(AccessCheck::invalid());
    let gw = gateway_over(stub.clone(), upstream, vec![]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", "Bearer forged")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.body().is_empty());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn header_unsafe_identity_is_refused_not_forwarded() {
    // Nothing listens on the upstream port; forwarding anyway would
    // surface as a 502 rather than the expected 401.
    let upstream: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let stub = StubValidator::new(AccessCheck::valid("al\rice", BTreeSet::new()));
    let gw = gateway_over(stub.clone(), upstream, vec![]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", "Bearer current-access")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.body().is_empty());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn accepted_token_forwards_with_identity_headers() {
    let upstream = spawn_echo_upstream();
    let roles = BTreeSet::from(["USER".to_string(), "ADMIN".to_string()]);
    let stub = StubValidator::new(AccessCheck::valid("alice", roles));
    let gw = gateway_over(stub.clone(), upstream, vec![]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", "Bearer current-access")
        .header("x-user-id", "mallory")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["userId"], "alice");
    assert_eq!(body["userRoles"], "ADMIN,USER");
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn spoofed_identity_headers_are_stripped_on_whitelisted_paths() {
    let upstream = spawn_echo_upstream();
    let stub = StubValidator::new(AccessCheck::invalid());
    let gw = gateway_over(stub.clone(), upstream, vec!["/public/".to_string()]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/public/ping")
        .header("x-user-id", "mallory")
        .header("x-user-roles", "ADMIN")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["userId"], Value::Null);
    assert_eq!(body["userRoles"], Value::Null);
}

#[tokio::test]
async fn remote_validator_fails_closed_on_a_dead_endpoint() {
    let validator = RemoteValidator::new(
        "http://127.0.0.1:9/auth/validate",
        Duration::from_millis(300),
    )
    .unwrap();

    let check = validator.validate("whatever").await;
    assert!(!check.is_valid);
    assert!(check.username.is_empty());
}

#[tokio::test]
async fn remote_and_local_validators_agree_with_the_service() {
    let service = token_service();
    service
        .register(RegisterInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await
        .unwrap();
    let pair = service
        .authenticate(LoginInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap();

    let local = LocalValidator::new(service.clone());
    let check = local.validate(&pair.access_token).await;
    assert!(check.is_valid);
    assert_eq!(check.username, "alice");

    let validation_api = api::routes(service.clone()).recover(api::recover_error);
    let (addr, server) = warp::serve(validation_api).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let remote =
        RemoteValidator::new(format!("http://{addr}/auth/validate"), Duration::from_secs(2))
            .unwrap();
    let check = remote.validate(&pair.access_token).await;
    assert!(check.is_valid);
    assert_eq!(check.username, "alice");
    assert_eq!(check.roles, BTreeSet::from(["USER".to_string()]));

    assert!(!remote.validate("garbage").await.is_valid);
}

#[tokio::test]
async fn gateway_end_to_end_with_the_real_service() {
    let service = token_service();
    service
        .register(RegisterInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await
        .unwrap();
    let pair = service
        .authenticate(LoginInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
        })
        .await
        .unwrap();

    let upstream = spawn_echo_upstream();
    let validator = Arc::new(LocalValidator::new(service.clone()));
    let gw = gateway_over(validator, upstream, vec![]);
    let routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", format!("Bearer {}", pair.access_token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["userId"], "alice");
    assert_eq!(body["userRoles"], "USER");

    // Once the session ends, the same token dies at the gate.
    service.logout(&pair.access_token).await.unwrap();
    let response = warp::test::request()
        .method("GET")
        .path("/api/profile")
        .header("authorization", format!("Bearer {}", pair.access_token))
        .reply(&routes)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
