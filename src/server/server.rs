use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Server {
    pub token_service: Arc<dyn TokenService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let cancel = CancellationToken::new();

        let (user_repo, identity_resolver, tx_manager, pool): (
            Arc<dyn UserRepo>,
            Arc<dyn IdentityResolver>,
            Arc<dyn TxManager>,
            Option<Pool<MySql>>,
        ) = match settings.store.backend.as_str() {
            "mysql" => {
                let pool = Pool::<MySql>::connect(&settings.store.mysql_dsn).await?;
                (
                    Arc::new(MySqlUserRepo::new(pool.clone())),
                    Arc::new(MySqlIdentityResolver::new(pool.clone())),
                    Arc::new(MySqlTxManager::new(pool.clone())),
                    Some(pool),
                )
            }
            "memory" => {
                // One directory serves both ports so role edits show up
                // in the next resolve.
                let directory = Arc::new(MemoryDirectory::new());
                (
                    directory.clone(),
                    directory,
                    Arc::new(MemoryTxManager),
                    None,
                )
            }
            other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
        };

        let mut sweeper_handle = None;
        let session_store: Arc<dyn SessionStore> = match settings.session.backend.as_str() {
            "redis" => {
                let redis_client = redis::Client::open(settings.session.redis_dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisSessionStore::new(redis_manager))
            }
            "memory" => {
                let store = Arc::new(MemorySessionStore::new());
                sweeper_handle = Some(spawn_sweeper(
                    store.clone(),
                    settings.session.sweep_interval_secs,
                    cancel.clone(),
                ));
                store
            }
            other => return Err(anyhow::anyhow!("Unknown session backend: {}", other)),
        };

        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(TokenConfig {
            signing_key: settings.jwt.signing_key.clone().into_bytes(),
            access_ttl: Duration::from_secs(settings.jwt.access_ttl_secs),
            refresh_ttl: Duration::from_secs(settings.jwt.refresh_ttl_secs),
        }));
        let credential_hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher {});

        let token_service: Arc<dyn TokenService> = Arc::new(RealTokenService::new(
            user_repo,
            identity_resolver,
            credential_hasher,
            token_codec,
            session_store,
            tx_manager,
        ));

        info!("server started");

        Ok(Self {
            token_service,
            sweeper_handle: Mutex::new(sweeper_handle),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.sweeper_handle.lock().ok().and_then(|mut l| l.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("sweeper handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

fn spawn_sweeper(
    store: Arc<MemorySessionStore>,
    interval_secs: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let dropped = store.sweep();
                    if dropped > 0 {
                        debug!("swept {} expired session records", dropped);
                    }
                }
            }
        }
    })
}
