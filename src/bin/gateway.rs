use gatehouse::gateway::{self, Forwarder, Gateway, GatewayPolicy, RemoteValidator};
use gatehouse::logger::*;
use gatehouse::settings::{Cli, Parser, parse_settings};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.gateway.address.parse()?;
    let timeout = Duration::from_millis(project_settings.gateway.timeout_ms);

    let policy = GatewayPolicy::new(project_settings.gateway.whitelist.clone());
    let validator = Arc::new(RemoteValidator::new(
        project_settings.gateway.validate_url.clone(),
        timeout,
    )?);
    let forwarder = Forwarder::new(&project_settings.gateway.upstream_url, timeout)?;
    let gw = Arc::new(Gateway::new(policy, validator, forwarder));

    let gateway_routes = gateway::routes(gw).recover(gateway::recover_unauthorized);

    match &project_settings.gateway.tls {
        Some(tls) => {
            if !fs::metadata(&tls.cert_path)?.is_file() {
                return Err(anyhow::anyhow!(
                    "TLS cert is not a regular file: {:?}",
                    tls.cert_path
                ));
            }
            if !fs::metadata(&tls.key_path)?.is_file() {
                return Err(anyhow::anyhow!(
                    "TLS key is not a regular file: {:?}",
                    tls.key_path
                ));
            }

            warp::serve(gateway_routes)
                .tls()
                .cert_path(&tls.cert_path)
                .key_path(&tls.key_path)
                .bind_with_graceful_shutdown(address, async {
                    signal::ctrl_c().await.expect("Could not register SIGINT");
                })
                .1
                .await;
        }
        None => {
            warp::serve(gateway_routes)
                .bind_with_graceful_shutdown(address, async {
                    signal::ctrl_c().await.expect("Could not register SIGINT");
                })
                .1
                .await;
        }
    }

    info!("gateway stopped");

    Ok(())
}
