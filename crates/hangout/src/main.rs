use hangout::{DEFAULT_BIND, HangoutError, HangoutServer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), HangoutError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind = std::env::var("HANGOUT_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let server = HangoutServer::builder().bind(&bind).build().await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
