use crate::application_port::*;
use crate::domain_model::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Access-token check as seen from the edge. Implementations never fail:
/// timeout, transport error, bad status and unreadable body all come back
/// as `AccessCheck::invalid()`.
#[async_trait::async_trait]
pub trait AccessValidator: Send + Sync {
    async fn validate(&self, token: &str) -> AccessCheck;
}

/// Calls the auth service's validation endpoint over HTTP with a bounded
/// timeout.
pub struct RemoteValidator {
    client: reqwest::Client,
    validate_url: String,
}

impl RemoteValidator {
    pub fn new(validate_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(RemoteValidator {
            client,
            validate_url: validate_url.into(),
        })
    }
}

#[async_trait::async_trait]
impl AccessValidator for RemoteValidator {
    async fn validate(&self, token: &str) -> AccessCheck {
        let response = match self
            .client
            .get(&self.validate_url)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "validation call failed for token {}: {}",
                    token_fingerprint(token),
                    e
                );
                return AccessCheck::invalid();
            }
        };

        if !response.status().is_success() {
            warn!("validation endpoint answered {}", response.status());
            return AccessCheck::invalid();
        }

        match response.json::<AccessCheck>().await {
            Ok(check) if check.is_valid && !check.username.is_empty() => check,
            Ok(_) => AccessCheck::invalid(),
            Err(e) => {
                warn!("validation response unreadable: {}", e);
                AccessCheck::invalid()
            }
        }
    }
}

/// In-process validation for deployments where the gateway and the auth
/// service share a binary. Same contract, no network hop.
pub struct LocalValidator {
    service: Arc<dyn TokenService>,
}

impl LocalValidator {
    pub fn new(service: Arc<dyn TokenService>) -> Self {
        LocalValidator { service }
    }
}

#[async_trait::async_trait]
impl AccessValidator for LocalValidator {
    async fn validate(&self, token: &str) -> AccessCheck {
        self.service.validate_access(token).await
    }
}
