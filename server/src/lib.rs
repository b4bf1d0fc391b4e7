//! # Guessing Game Server Library
//!
//! A line-oriented TCP server for a number guessing game. Each client that
//! connects gets its own secret and plays until it guesses it, sends `exit`,
//! or hangs up.
//!
//! ## Session Flow
//!
//! 1. The listener accepts a connection and draws a fresh [`game::GameRound`].
//! 2. A [`handler::ConnectionHandler`] sends a greeting describing valid input.
//! 3. Each received line is either the exit command, a rejected guess
//!    (answered with the validation error), a miss ("Try again!") or the
//!    winning guess (congratulations, then the stream is closed).
//!
//! Sessions never share state. There is no limit on how many run at once.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Guess validation ([`game::GuessValidator`]) and the per-connection secret
//! ([`game::GameRound`]), including the digit-code format and scrambled
//! secret draw of the code breaker game.
//!
//! ### Enrichment Module (`enrichment`)
//! Optional decorators applied to guess results: timestamp prefix, parity,
//! too high/too low, and digit hints.
//!
//! ### Handler Module (`handler`)
//! The per-connection state machine, generic over any async byte stream.
//!
//! ### Network Module (`network`)
//! The TCP accept loop spawning one tokio task per connection.
//!
//! ### Config Module (`config`)
//! Defaults, TOML file and command line merged into one [`config::Config`].
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::{GameSettings, Variant};
//! use server::game::SecretSource;
//! use server::network::Server;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = GameSettings::for_variant(Variant::Classic)
//!         .with_secret_source(SecretSource::Fixed(42));
//!     let server = Server::bind_with_rng("127.0.0.1:8080", settings, StdRng::from_entropy()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod enrichment;
pub mod error;
pub mod game;
pub mod handler;
pub mod network;
