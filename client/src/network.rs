//! Connection to the game server and the interactive relay loop.

use log::{debug, info};
use shared::{is_exit_command, ReplyKind, EXIT_COMMAND};
use std::error::Error;
use tokio::io::{
    split, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines,
    ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;

/// How a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientExit {
    /// The server congratulated us.
    Won,
    /// The player typed the exit command or closed the console.
    Quit,
    /// The server closed the connection.
    ServerClosed,
}

pub struct Client<S> {
    server_lines: Lines<BufReader<ReadHalf<S>>>,
    writer: WriteHalf<S>,
}

impl Client<TcpStream> {
    pub async fn connect(server_addr: &str) -> Result<Self, Box<dyn Error>> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", stream.peer_addr()?);
        Ok(Self::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(stream: S) -> Self {
        let (reader, writer) = split(stream);
        Self {
            server_lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    pub async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        self.writer.flush().await
    }

    /// Next line from the server, or `None` once it has closed the stream.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.server_lines.next_line().await
    }

    /// Relays console lines to the server and server lines to `output`
    /// until the game ends on either side.
    pub async fn run<I, O>(mut self, console: I, mut output: O) -> Result<ClientExit, Box<dyn Error>>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut console = console.lines();
        let mut console_open = true;
        let mut exit_sent = false;

        loop {
            tokio::select! {
                biased;

                line = self.server_lines.next_line() => {
                    let Some(line) = line? else {
                        if exit_sent {
                            return Ok(ClientExit::Quit);
                        }
                        output.write_all(b"Server closed the connection.\n").await?;
                        output.flush().await?;
                        return Ok(ClientExit::ServerClosed);
                    };
                    output.write_all(format!("{}\n", line).as_bytes()).await?;
                    output.flush().await?;

                    let kind = ReplyKind::classify(&line);
                    debug!("Server line classified as {:?}", kind);
                    if kind.ends_session() {
                        return Ok(ClientExit::Won);
                    }
                }
                input = console.next_line(), if console_open => {
                    match input? {
                        Some(text) => {
                            let text = text.trim();
                            if text.is_empty() {
                                continue;
                            }
                            self.send_line(text).await?;
                            if is_exit_command(text) {
                                output.write_all(b"Exiting the game.\n").await?;
                                output.flush().await?;
                                return Ok(ClientExit::Quit);
                            }
                        }
                        None => {
                            // Console closed: ask the server to end the session, then
                            // drain its remaining lines.
                            console_open = false;
                            exit_sent = true;
                            if let Err(e) = self.send_line(EXIT_COMMAND).await {
                                debug!("Server already gone: {}", e);
                                return Ok(ClientExit::Quit);
                            }
                        }
                    }
                }
            }
        }
    }
}
