//! Per-connection session driver.
//!
//! A [`ConnectionHandler`] owns one duplex stream and the [`GameRound`] for
//! that connection. It runs the line protocol until the player guesses the
//! secret, sends `exit`, goes idle past the read timeout, sends a line over
//! the length cap, or the stream closes, and then shuts the stream down
//! exactly once.
//!
//! Input is read as bytes and decoded lossily, so a line that is not valid
//! UTF-8 is rejected as a bad guess instead of ending the session.
//!
//! The handler does not care how it is scheduled: the listener spawns it on
//! a tokio task, tests drive it over in-memory streams.

use crate::config::GameSettings;
use crate::enrichment::{GuessContext, ReplyDecorator};
use crate::error::SessionError;
use crate::game::GameRound;
use log::{debug, warn};
use shared::{is_exit_command, strip_line_ending, Reply};
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// Protocol states of one session
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Greeting,
    AwaitingGuess,
    Evaluating(String),
    Finished(SessionEnd),
}

/// Why a session finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Guessed,
    Exited,
    Disconnected,
    TimedOut,
    LineTooLong,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionEnd::Guessed => "guessed the secret",
            SessionEnd::Exited => "exited",
            SessionEnd::Disconnected => "disconnected",
            SessionEnd::TimedOut => "timed out",
            SessionEnd::LineTooLong => "sent an over-long line",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    /// Guesses that passed validation
    pub attempts: u32,
}

enum Input {
    Line(String),
    Closed,
    TimedOut,
    TooLong(usize),
}

pub struct ConnectionHandler<S> {
    stream: BufReader<S>,
    round: GameRound,
    settings: GameSettings,
    decorator: Arc<dyn ReplyDecorator>,
    attempts: u32,
    label: String,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, round: GameRound, settings: GameSettings) -> Self {
        let decorator: Arc<dyn ReplyDecorator> = Arc::new(settings.enrichment);
        Self {
            stream: BufReader::new(stream),
            round,
            settings,
            decorator,
            attempts: 0,
            label: "session".to_string(),
        }
    }

    /// Replaces the configured enrichment with a custom decorator.
    pub fn with_decorator(mut self, decorator: Arc<dyn ReplyDecorator>) -> Self {
        self.decorator = decorator;
        self
    }

    /// Name used in log lines, usually the peer address.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Runs the session to completion and closes the stream.
    ///
    /// The stream is shut down on every path, including stream errors. A
    /// failed shutdown is logged and does not change the returned result.
    pub async fn run(mut self) -> Result<SessionOutcome, SessionError> {
        let result = self.drive().await;
        self.close().await;
        result
    }

    async fn drive(&mut self) -> Result<SessionOutcome, SessionError> {
        let mut state = SessionState::Greeting;

        loop {
            state = match state {
                SessionState::Greeting => {
                    let greeting = Reply::Greeting {
                        game: self.settings.variant.game_name().to_string(),
                        input: self.settings.describe_input(),
                    };
                    self.send(&greeting.to_string()).await?;
                    SessionState::AwaitingGuess
                }
                SessionState::AwaitingGuess => {
                    if self.settings.prompt_each_turn {
                        self.send(&Reply::Prompt.to_string()).await?;
                    }
                    match self.receive().await? {
                        Input::Closed => SessionState::Finished(SessionEnd::Disconnected),
                        Input::TimedOut => SessionState::Finished(SessionEnd::TimedOut),
                        Input::TooLong(limit) => {
                            let reply =
                                Reply::Error(format!("Invalid input: line exceeds {} bytes", limit));
                            self.send(&reply.to_string()).await?;
                            SessionState::Finished(SessionEnd::LineTooLong)
                        }
                        Input::Line(line) if is_exit_command(&line) => {
                            SessionState::Finished(SessionEnd::Exited)
                        }
                        Input::Line(line) => SessionState::Evaluating(line),
                    }
                }
                SessionState::Evaluating(line) => self.evaluate(&line).await?,
                SessionState::Finished(end) => {
                    return Ok(SessionOutcome {
                        end,
                        attempts: self.attempts,
                    })
                }
            };
        }
    }

    async fn evaluate(&mut self, line: &str) -> Result<SessionState, SessionError> {
        let guess = match self.settings.validator.validate(line) {
            Ok(guess) => guess,
            Err(e) => {
                debug!("{}: rejected {:?}: {}", self.label, line, e);
                self.send(&Reply::Error(e.to_string()).to_string()).await?;
                return Ok(SessionState::AwaitingGuess);
            }
        };

        self.attempts += 1;
        let matched = self.round.is_match(guess);
        debug!(
            "{}: guess #{} = {} ({})",
            self.label,
            self.attempts,
            guess,
            if matched { "hit" } else { "miss" }
        );

        let reply = if matched {
            Reply::Congratulations {
                attempts: self.attempts,
            }
        } else {
            Reply::TryAgain
        };
        let context = GuessContext {
            guess,
            secret: self.round.secret(),
            matched,
        };
        let line = self.decorator.decorate(reply.to_string(), &context);
        self.send(&line).await?;

        Ok(if matched {
            SessionState::Finished(SessionEnd::Guessed)
        } else {
            SessionState::AwaitingGuess
        })
    }

    async fn receive(&mut self) -> Result<Input, SessionError> {
        let mut bytes = Vec::new();
        let n = match self.settings.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.read_raw_line(&mut bytes)).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!("{}: no input for {:?}, closing", self.label, limit);
                    return Ok(Input::TimedOut);
                }
            },
            None => self.read_raw_line(&mut bytes).await?,
        };

        if n == 0 {
            return Ok(Input::Closed);
        }

        if let Some(limit) = self.settings.max_line_length {
            let content_len = match bytes.strip_suffix(b"\n") {
                Some(rest) => rest.strip_suffix(b"\r").unwrap_or(rest).len(),
                None => bytes.len(),
            };
            if content_len > limit {
                warn!("{}: line longer than {} bytes, closing", self.label, limit);
                return Ok(Input::TooLong(limit));
            }
        }

        let text = String::from_utf8_lossy(&bytes);
        Ok(Input::Line(strip_line_ending(&text).to_string()))
    }

    /// Reads up to and including `\n`. With a length cap, stops after the
    /// cap plus room for a `\r\n` terminator.
    async fn read_raw_line(&mut self, bytes: &mut Vec<u8>) -> io::Result<usize> {
        match self.settings.max_line_length {
            Some(limit) => {
                (&mut self.stream)
                    .take(limit as u64 + 2)
                    .read_until(b'\n', bytes)
                    .await
            }
            None => self.stream.read_until(b'\n', bytes).await,
        }
    }

    async fn send(&mut self, line: &str) -> Result<(), SessionError> {
        let mut data = String::with_capacity(line.len() + 1);
        data.push_str(line);
        data.push('\n');
        self.stream.write_all(data.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            warn!("{}: failed to close stream: {}", self.label, e);
        }
    }
}
