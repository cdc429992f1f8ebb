use anyhow::{Context, Result};

use hnapi::cache::CacheHooks;
use hnapi::config::Config;
use hnapi::gateway::Gateway;
use hnapi::metrics;
use hnapi::models::ListingKind;
use hnapi::server::GatewayServer;

/// Start the HTTP gateway and run until Ctrl+C
///
/// A stop forced by a severe upstream error is returned as an error, so the
/// process exits non-zero.
pub async fn serve(config: Config) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics registration failed, continuing without metrics");
    }

    let gateway = Gateway::from_config(&config, CacheHooks::default())
        .await
        .context("Failed to build gateway")?;
    let server = GatewayServer::new(gateway, config).context("Failed to create server")?;

    println!("{}", server.info().display());
    println!();
    println!("API Endpoints:");
    let listings: Vec<&str> = ListingKind::ALL.iter().map(ListingKind::as_str).collect();
    println!("  GET  /{{{}}}?page=N", listings.join(","));
    println!("  GET  /item/{{id}}             - Post with comments");
    println!("  GET  /comments/{{token}}      - More comments");
    println!("  GET  /newcomments           - Newest comments");
    println!("  GET  /user/{{id}}             - User profile");
    println!("  GET  /health                - Health check");
    println!("  GET  /metrics               - Prometheus metrics endpoint");
    println!();
    println!("Press Ctrl+C to stop.\n");

    server
        .start_with_shutdown(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                }
                Err(e) => {
                    tracing::error!("Failed to wait for Ctrl+C: {}", e);
                }
            }
        })
        .await?;

    println!("hnapi server stopped.");
    Ok(())
}
