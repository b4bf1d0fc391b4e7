//! Optional decoration of guess-result lines.
//!
//! Decorators run synchronously on the line about to be written and return
//! the text that is actually sent. Validation errors are never decorated.

use clap::ValueEnum;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// What a decorator knows about the guess being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessContext {
    pub guess: i64,
    pub secret: i64,
    pub matched: bool,
}

/// Formatting hook applied to every try-again and congratulations line.
pub trait ReplyDecorator: Send + Sync {
    fn decorate(&self, reply: String, context: &GuessContext) -> String;
}

impl<F> ReplyDecorator for F
where
    F: Fn(String, &GuessContext) -> String + Send + Sync,
{
    fn decorate(&self, reply: String, context: &GuessContext) -> String {
        self(reply, context)
    }
}

/// Built-in decorators selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Enrichment {
    #[default]
    None,
    /// Prefix with `TIME: <unix seconds> `.
    Timestamp,
    /// Note whether the guess was even or odd.
    Parity,
    /// Tell the player whether a miss was too high or too low.
    Magnitude,
    /// Count matching digits of a miss, code-breaker style.
    Hint,
}

impl ReplyDecorator for Enrichment {
    fn decorate(&self, reply: String, context: &GuessContext) -> String {
        match self {
            Enrichment::None => reply,
            Enrichment::Timestamp => format!("{}{}", timestamp_prefix(unix_seconds()), reply),
            Enrichment::Parity => {
                let parity = if context.guess % 2 == 0 { "even" } else { "odd" };
                format!("{} (your guess was {})", reply, parity)
            }
            Enrichment::Magnitude if !context.matched => {
                let direction = if context.guess > context.secret {
                    "too high"
                } else {
                    "too low"
                };
                format!("{} ({})", reply, direction)
            }
            Enrichment::Hint if !context.matched => {
                let (position, digit) = digit_hint(context.guess, context.secret);
                format!(
                    "{} (Hint: {} correct position, {} correct digit but wrong position)",
                    reply, position, digit
                )
            }
            Enrichment::Magnitude | Enrichment::Hint => reply,
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

pub fn timestamp_prefix(seconds: u64) -> String {
    format!("TIME: {} ", seconds)
}

/// Counts digits in the right position, then remaining digits present
/// elsewhere. Both values are zero-padded to a common width of at least 4.
pub fn digit_hint(guess: i64, secret: i64) -> (usize, usize) {
    let guess = guess.unsigned_abs().to_string();
    let secret = secret.unsigned_abs().to_string();
    let width = guess.len().max(secret.len()).max(4);
    let guess: Vec<u8> = format!("{:0>width$}", guess, width = width).into_bytes();
    let secret: Vec<u8> = format!("{:0>width$}", secret, width = width).into_bytes();

    let mut used_secret = vec![false; width];
    let mut used_guess = vec![false; width];
    let mut correct_position = 0;
    for i in 0..width {
        if guess[i] == secret[i] {
            correct_position += 1;
            used_secret[i] = true;
            used_guess[i] = true;
        }
    }

    let mut correct_digit = 0;
    for i in 0..width {
        if used_guess[i] {
            continue;
        }
        if let Some(j) = (0..width).find(|&j| !used_secret[j] && guess[i] == secret[j]) {
            used_secret[j] = true;
            correct_digit += 1;
        }
    }

    (correct_position, correct_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miss(guess: i64, secret: i64) -> GuessContext {
        GuessContext {
            guess,
            secret,
            matched: false,
        }
    }

    #[test]
    fn test_none_leaves_reply_untouched() {
        let reply = Enrichment::None.decorate("Try again!".to_string(), &miss(3, 4));
        assert_eq!(reply, "Try again!");
    }

    #[test]
    fn test_timestamp_prefix_format() {
        assert_eq!(timestamp_prefix(1700000000), "TIME: 1700000000 ");

        let reply = Enrichment::Timestamp.decorate("Try again!".to_string(), &miss(3, 4));
        assert!(reply.starts_with("TIME: "));
        assert!(reply.ends_with(" Try again!"));
    }

    #[test]
    fn test_parity_commentary() {
        let even = Enrichment::Parity.decorate("Try again!".to_string(), &miss(10, 4));
        let odd = Enrichment::Parity.decorate("Try again!".to_string(), &miss(-7, 4));
        assert_eq!(even, "Try again! (your guess was even)");
        assert_eq!(odd, "Try again! (your guess was odd)");
    }

    #[test]
    fn test_magnitude_only_on_misses() {
        assert_eq!(
            Enrichment::Magnitude.decorate("Try again!".to_string(), &miss(80, 42)),
            "Try again! (too high)"
        );
        assert_eq!(
            Enrichment::Magnitude.decorate("Try again!".to_string(), &miss(10, 42)),
            "Try again! (too low)"
        );

        let hit = GuessContext {
            guess: 42,
            secret: 42,
            matched: true,
        };
        assert_eq!(
            Enrichment::Magnitude.decorate("Congratulations!".to_string(), &hit),
            "Congratulations!"
        );
    }

    #[test]
    fn test_digit_hint_counts() {
        assert_eq!(digit_hint(1234, 1234), (4, 0));
        assert_eq!(digit_hint(4321, 1234), (0, 4));
        assert_eq!(digit_hint(1243, 1234), (2, 2));
        assert_eq!(digit_hint(5678, 1234), (0, 0));
        // duplicates are only counted once
        assert_eq!(digit_hint(1111, 1234), (1, 0));
        // zero padding
        assert_eq!(digit_hint(12, 1200), (0, 4));
    }

    #[test]
    fn test_hint_decoration() {
        let reply = Enrichment::Hint.decorate("Try again!".to_string(), &miss(1243, 1234));
        assert_eq!(
            reply,
            "Try again! (Hint: 2 correct position, 2 correct digit but wrong position)"
        );
    }

    #[test]
    fn test_closure_decorator() {
        let shout = |reply: String, _: &GuessContext| reply.to_uppercase();
        assert_eq!(shout.decorate("Try again!".to_string(), &miss(1, 2)), "TRY AGAIN!");
    }

    #[test]
    fn test_enrichment_from_toml_name() {
        #[derive(Deserialize)]
        struct Wrapper {
            enrichment: Enrichment,
        }
        let parsed: Wrapper = toml::from_str("enrichment = \"magnitude\"").unwrap();
        assert_eq!(parsed.enrichment, Enrichment::Magnitude);
    }
}
