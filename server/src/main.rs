use log::{info, warn};
use server::config::Config;
use server::error::ServerError;
use server::network::Server;

/// Main-method of the game server.
/// Resolves configuration, binds the listener and serves until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = Config::load()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    if let Some(secret) = config.unwinnable_secret() {
        warn!(
            "Fixed secret {} is outside the accepted range, no guess can win",
            secret
        );
    }

    let server = Server::bind(&config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
