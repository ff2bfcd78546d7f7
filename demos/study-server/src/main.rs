//! Runs a Lingoforge server.
//!
//! ```text
//! LINGOFORGE_BIND=127.0.0.1:9000 RUST_LOG=lingoforge_room=debug,info cargo run -p study-server
//! ```

use lingoforge::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lingoforge::telemetry::init_tracing();

    let bind = std::env::var("LINGOFORGE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    tracing::info!(%bind, "starting study server");

    let server = LingoforgeServer::builder().bind(&bind).build().await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
