//! Line protocol shared by the guessing game server and client.
//!
//! Every message is a single UTF-8 line terminated by `\n`. The server sends
//! a greeting on connect and exactly one reply per guess; the client sends one
//! guess per line or the exit command.

use std::fmt;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

/// Client command that ends a session without a reply.
pub const EXIT_COMMAND: &str = "exit";

pub const PROMPT_TEXT: &str = "Enter your guess or 'exit' to quit:";
pub const TRY_AGAIN_TEXT: &str = "Try again!";
const CONGRATULATIONS_MARKER: &str = "Congratulations!";

/// Returns true if the line asks the server to end the session.
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Strips a trailing `\n` or `\r\n` from a line read off the wire.
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// A line sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Greeting { game: String, input: String },
    Prompt,
    TryAgain,
    Congratulations { attempts: u32 },
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Greeting { game, input } => write!(f, "Welcome to the {}! {}", game, input),
            Reply::Prompt => f.write_str(PROMPT_TEXT),
            Reply::TryAgain => f.write_str(TRY_AGAIN_TEXT),
            Reply::Congratulations { attempts } => {
                let noun = if *attempts == 1 { "attempt" } else { "attempts" };
                write!(
                    f,
                    "{} You guessed correctly in {} {}!",
                    CONGRATULATIONS_MARKER, attempts, noun
                )
            }
            Reply::Error(message) => f.write_str(message),
        }
    }
}

/// Coarse classification of a received server line, used by the client to
/// decide when the session is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Greeting,
    Prompt,
    TryAgain,
    Congratulations,
    Other,
}

impl ReplyKind {
    /// Classifies a line by its content. Decorated lines (timestamp prefixes,
    /// commentary suffixes) still classify by the text they wrap.
    pub fn classify(line: &str) -> Self {
        let line = strip_line_ending(line);
        if line.starts_with("Welcome to the ") {
            ReplyKind::Greeting
        } else if line == PROMPT_TEXT {
            ReplyKind::Prompt
        } else if line.contains(CONGRATULATIONS_MARKER) {
            ReplyKind::Congratulations
        } else if line.contains(TRY_AGAIN_TEXT) {
            ReplyKind::TryAgain
        } else {
            ReplyKind::Other
        }
    }

    pub fn ends_session(self) -> bool {
        self == ReplyKind::Congratulations
    }
}
