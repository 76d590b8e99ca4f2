/// Example walking the whole session lifecycle against the in-memory
/// backends, with no MySQL or Redis running.
///
/// ```text
/// $ cargo run --bin flow_demo
/// ```
use gatehouse::application_impl::{
    Argon2PasswordHasher, JwtHs256Codec, RealTokenService, TokenConfig,
};
use gatehouse::application_port::{
    CredentialHasher, LoginInput, RegisterInput, TokenCodec, TokenService,
};
use gatehouse::domain_model::token_fingerprint;
use gatehouse::domain_port::{SessionStore, TxManager};
use gatehouse::infra_memory::{MemoryDirectory, MemorySessionStore, MemoryTxManager};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::new("flow_demo=debug,gatehouse=debug");

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    // region wiring

    let directory = Arc::new(MemoryDirectory::new());
    let session_store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let tx_manager: Arc<dyn TxManager> = Arc::new(MemoryTxManager);

    let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});
    let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(TokenConfig {
        signing_key: b"flow-demo-signing-key".to_vec(),
        access_ttl: Duration::from_secs(15 * 60),
        refresh_ttl: Duration::from_secs(7 * 24 * 60 * 60),
    }));

    let service = RealTokenService::new(
        directory.clone(),
        directory.clone(),
        credential_hasher,
        token_codec,
        session_store,
        tx_manager,
    );

    // endregion

    let user_id = service
        .register(RegisterInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await?;
    println!("registered alice -> {}", user_id);

    let first = service
        .authenticate(LoginInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
        })
        .await?;
    println!(
        "first login  -> access {}",
        token_fingerprint(&first.access_token)
    );

    let check = service.validate_access(&first.access_token).await;
    println!(
        "first access valid: {} as {} with {:?}",
        check.is_valid, check.username, check.roles
    );

    // A second login supersedes the first session.
    let second = service
        .authenticate(LoginInput {
            username: "alice".to_string(),
            password: "correct-horse".to_string(),
        })
        .await?;
    println!(
        "second login -> access {}",
        token_fingerprint(&second.access_token)
    );
    println!(
        "first access valid after second login: {}",
        service.validate_access(&first.access_token).await.is_valid
    );

    // Role edits surface on the next refresh, not on live tokens.
    directory.set_user_roles("alice", ["USER", "ADMIN"]);
    let before = service.validate_access(&second.access_token).await;
    println!("roles before refresh: {:?}", before.roles);

    let rotated = service.refresh(&second.refresh_token).await?;
    let after = service.validate_access(&rotated.access_token).await;
    println!("roles after refresh:  {:?}", after.roles);
    println!(
        "second access valid after refresh: {}",
        service.validate_access(&second.access_token).await.is_valid
    );

    service.logout(&rotated.access_token).await?;
    println!(
        "rotated access valid after logout: {}",
        service.validate_access(&rotated.access_token).await.is_valid
    );

    Ok(())
}
