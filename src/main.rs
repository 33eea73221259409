use driftwood::config::Config;
use driftwood::http::metadata::FsMetadataProvider;
use driftwood::server::{Server, Shutdown};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = Server::bind(cfg.server, FsMetadataProvider).await?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        trigger.trigger();
    });

    server.run(shutdown).await?;
    Ok(())
}
