//! TCP listener that starts one game session per accepted connection

use crate::config::{Config, GameSettings};
use crate::error::ServerError;
use crate::game::GameRound;
use crate::handler::ConnectionHandler;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and hands each one to its own [`ConnectionHandler`].
///
/// Sessions share nothing: every accepted connection gets a fresh
/// [`GameRound`] drawn from the listener's RNG before its task is spawned.
/// There is no cap on simultaneous sessions.
pub struct Server {
    listener: TcpListener,
    settings: GameSettings,
    rng: StdRng,
    next_session_id: u64,
}

impl Server {
    /// Binds using the resolved configuration, seeding the RNG from the
    /// configured seed or from OS entropy.
    pub async fn bind(config: &Config) -> Result<Self, ServerError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::bind_with_rng(&config.address(), config.game.clone(), rng).await
    }

    pub async fn bind_with_rng(
        addr: &str,
        settings: GameSettings,
        rng: StdRng,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        info!("Server listening on {}", addr);

        Ok(Server {
            listener,
            settings,
            rng,
            next_session_id: 1,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever. Failures inside a session never reach
    /// this loop.
    pub async fn run(mut self) -> Result<(), ServerError> {
        info!(
            "Serving {} ({})",
            self.settings.variant.game_name(),
            self.settings.describe_input()
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.spawn_session(stream, peer),
                Err(e) => {
                    warn!("Error accepting connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }

    fn spawn_session(&mut self, stream: TcpStream, peer: SocketAddr) {
        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let round = GameRound::new(&self.settings.secret_source, &mut self.rng);
        let label = format!("session {} ({})", session_id, peer);
        info!("Client connected: {}", label);
        debug!("{}: secret is {}", label, round.secret());

        let handler =
            ConnectionHandler::new(stream, round, self.settings.clone()).with_label(label.clone());

        tokio::spawn(async move {
            match handler.run().await {
                Ok(outcome) => info!(
                    "{}: {} after {} attempts",
                    label, outcome.end, outcome.attempts
                ),
                Err(e) => error!("{}: {}", label, e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::SecretSource;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn fixed_settings(secret: i64) -> GameSettings {
        GameSettings::default().with_secret_source(SecretSource::Fixed(secret))
    }

    #[tokio::test]
    async fn test_bind_failure_is_bind_error() {
        let first = Server::bind_with_rng("127.0.0.1:0", fixed_settings(1), StdRng::seed_from_u64(0))
            .await
            .unwrap();
        let taken = first.local_addr().unwrap().to_string();

        let second =
            Server::bind_with_rng(&taken, fixed_settings(1), StdRng::seed_from_u64(0)).await;
        match second {
            Err(ServerError::Bind { addr, .. }) => assert_eq!(addr, taken),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Second bind on {} should fail", taken),
        }
    }

    #[tokio::test]
    async fn test_bad_address_is_bind_error() {
        let result =
            Server::bind_with_rng("not-an-address", fixed_settings(1), StdRng::seed_from_u64(0))
                .await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_session_ids_increment() {
        let mut server =
            Server::bind_with_rng("127.0.0.1:0", fixed_settings(3), StdRng::seed_from_u64(0))
                .await
                .unwrap();
        let addr = server.local_addr().unwrap();

        let client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = server.listener.accept().await.unwrap();
        server.spawn_session(stream, peer);
        assert_eq!(server.next_session_id, 2);

        let mut client = BufReader::new(client);
        let mut greeting = String::new();
        client.read_line(&mut greeting).await.unwrap();
        assert!(greeting.starts_with("Welcome to the Guessing Game!"));

        client.write_all(b"3\n").await.unwrap();
        let mut reply = String::new();
        client.read_line(&mut reply).await.unwrap();
        assert!(reply.starts_with("Congratulations!"));
    }

    #[tokio::test]
    async fn test_seeded_config_draws_reproducible_secrets() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            seed: Some(1234),
            ..Config::default()
        };
        let mut a = Server::bind(&config).await.unwrap();
        let mut b = Server::bind(&config).await.unwrap();

        for _ in 0..10 {
            let ra = GameRound::new(&a.settings.secret_source, &mut a.rng);
            let rb = GameRound::new(&b.settings.secret_source, &mut b.rng);
            assert_eq!(ra.secret(), rb.secret());
        }
    }
}
