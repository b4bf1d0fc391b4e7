//! # Guessing Game Client Library
//!
//! Console client for the guessing game server. It connects over TCP, prints
//! every line the server sends and forwards every line the player types.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! - TCP connection setup
//! - Relay loop between console and server
//! - Detection of the end of a game (congratulations, exit, server close)
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::{stdin, stdout, BufReader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:8080").await?;
//!     let exit = client.run(BufReader::new(stdin()), stdout()).await?;
//!     println!("Session ended: {:?}", exit);
//!     Ok(())
//! }
//! ```

pub mod network;
