//! Guess validation and per-connection game rounds.

use rand::Rng;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Inclusive range of accepted guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GuessRange {
    pub min: i64,
    pub max: i64,
}

impl GuessRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl fmt::Display for GuessRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Shape of the text a guess must have before range checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessFormat {
    /// Any base-10 integer, optionally signed.
    Integer,
    /// Exactly this many ASCII digits, leading zeros allowed.
    Digits(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatIssue {
    #[error("not a valid integer")]
    NotAnInteger,
    #[error("must contain exactly {0} digits")]
    DigitCount(usize),
    #[error("must contain only digits")]
    NonDigit,
}

/// Rejection of a single guess. The `Display` output is sent to the client
/// as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GuessError {
    #[error("Invalid input: {0}")]
    InvalidFormat(FormatIssue),
    #[error("Invalid input: {value} is out of range ({range})")]
    OutOfRange { value: i64, range: GuessRange },
}

/// Parses raw guess lines and checks them against the configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessValidator {
    format: GuessFormat,
    range: Option<GuessRange>,
}

impl GuessValidator {
    pub fn new(format: GuessFormat, range: Option<GuessRange>) -> Self {
        Self { format, range }
    }

    pub fn format(&self) -> GuessFormat {
        self.format
    }

    pub fn range(&self) -> Option<GuessRange> {
        self.range
    }

    /// Validates one line of input with its terminator already removed.
    pub fn validate(&self, raw_line: &str) -> Result<i64, GuessError> {
        let text = raw_line.trim();
        let value = match self.format {
            GuessFormat::Integer => text
                .parse::<i64>()
                .map_err(|_| GuessError::InvalidFormat(FormatIssue::NotAnInteger))?,
            GuessFormat::Digits(count) => parse_digits(text, count)?,
        };

        match self.range {
            Some(range) if !range.contains(value) => Err(GuessError::OutOfRange { value, range }),
            _ => Ok(value),
        }
    }

    /// Human readable description of valid input, used in the greeting.
    pub fn describe_input(&self) -> String {
        match (self.format, self.range) {
            (GuessFormat::Digits(count), _) => format!("Enter a {}-digit code.", count),
            (GuessFormat::Integer, Some(range)) => {
                format!("Enter a number between {} and {}.", range.min, range.max)
            }
            (GuessFormat::Integer, None) => "Enter any whole number.".to_string(),
        }
    }
}

fn parse_digits(text: &str, count: usize) -> Result<i64, GuessError> {
    if text.chars().count() != count {
        return Err(GuessError::InvalidFormat(FormatIssue::DigitCount(count)));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GuessError::InvalidFormat(FormatIssue::NonDigit));
    }
    // Only overflows for absurd digit counts
    text.parse::<i64>()
        .map_err(|_| GuessError::InvalidFormat(FormatIssue::NotAnInteger))
}

/// Where a round's secret comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Fixed(i64),
    /// Uniform draw from the inclusive range.
    Random(GuessRange),
    /// Uniform draw followed by the digit scramble of [`scramble_code`].
    Scrambled(GuessRange),
}

/// One secret, fixed for the lifetime of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRound {
    secret: i64,
}

impl GameRound {
    /// Creates a round, drawing the secret from `rng` if the source is random.
    pub fn new<R: Rng + ?Sized>(source: &SecretSource, rng: &mut R) -> Self {
        let secret = match *source {
            SecretSource::Fixed(value) => value,
            SecretSource::Random(range) => rng.gen_range(range.min..=range.max),
            SecretSource::Scrambled(range) => scramble_code(rng.gen_range(range.min..=range.max)),
        };
        Self { secret }
    }

    pub fn with_secret(secret: i64) -> Self {
        Self { secret }
    }

    pub fn secret(&self) -> i64 {
        self.secret
    }

    pub fn is_match(&self, guess: i64) -> bool {
        guess == self.secret
    }
}

/// Scrambles a 4-digit code.
///
/// An even digit sum reverses the zero-padded digits; an odd sum increments
/// each digit, wrapping 9 to 0. A palindromic result becomes all sevens.
pub fn scramble_code(code: i64) -> i64 {
    let digit_sum: u32 = code
        .unsigned_abs()
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .sum();

    let padded = format!("{:04}", code.unsigned_abs());
    let scrambled: String = if digit_sum % 2 == 0 {
        padded.chars().rev().collect()
    } else {
        padded
            .chars()
            .filter_map(|c| c.to_digit(10))
            .filter_map(|d| char::from_digit((d + 1) % 10, 10))
            .collect()
    };

    let reversed: String = scrambled.chars().rev().collect();
    if scrambled == reversed {
        let sevens = "7".repeat(scrambled.trim_start_matches('0').len().max(1));
        return sevens.parse().unwrap_or(7777);
    }
    scrambled.parse().unwrap_or(0)
}
