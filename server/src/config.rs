//! Server configuration.
//!
//! Settings come from compiled-in defaults, an optional TOML file and the
//! command line, in increasing order of precedence.

use crate::enrichment::Enrichment;
use crate::game::{GuessFormat, GuessRange, GuessValidator, SecretSource};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use shared::{DEFAULT_BIND_HOST, DEFAULT_PORT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Preset combinations of secret, range and greeting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Guess a random number between 1 and 100.
    #[default]
    Classic,
    /// Break a fixed 4-digit code.
    CodeBreaker,
}

impl Variant {
    pub fn game_name(self) -> &'static str {
        match self {
            Variant::Classic => "Guessing Game",
            Variant::CodeBreaker => "Code Breaker Game",
        }
    }

    fn secret_source(self) -> SecretSource {
        match self {
            Variant::Classic => SecretSource::Random(CLASSIC_RANGE),
            Variant::CodeBreaker => SecretSource::Fixed(CODE_BREAKER_SECRET),
        }
    }

    fn guess_range(self) -> Option<GuessRange> {
        match self {
            Variant::Classic => Some(CLASSIC_RANGE),
            Variant::CodeBreaker => None,
        }
    }
}

pub const CLASSIC_RANGE: GuessRange = GuessRange::new(1, 100);
pub const CODE_BREAKER_SECRET: i64 = 1111;
pub const CODE_RANGE: GuessRange = GuessRange::new(1000, 9999);
/// Longest accepted input line in bytes, excluding the terminator.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Command-line arguments for the game server
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "TCP number guessing game server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Server IP address to bind to
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Game preset
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Use this fixed secret instead of the preset's
    #[arg(long, allow_hyphen_values = true)]
    pub secret: Option<i64>,

    /// Draw secrets with the code scramble instead of uniformly
    #[arg(long)]
    pub scramble: bool,

    /// Lowest accepted guess
    #[arg(long, allow_hyphen_values = true)]
    pub min: Option<i64>,

    /// Highest accepted guess
    #[arg(long, allow_hyphen_values = true)]
    pub max: Option<i64>,

    /// Accept any integer
    #[arg(long, conflicts_with_all = ["min", "max"])]
    pub unbounded: bool,

    /// Require guesses of exactly this many digits
    #[arg(long)]
    pub digits: Option<usize>,

    /// Decoration applied to guess results
    #[arg(long, value_enum)]
    pub enrichment: Option<Enrichment>,

    /// Send a prompt line before every read
    #[arg(long)]
    pub prompt: bool,

    /// Close sessions idle for this many seconds
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Close sessions that send a line longer than this many bytes (0 = no limit)
    #[arg(long)]
    pub max_line_length: Option<usize>,

    /// Seed for secret draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub game: GameSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Idle timeout in seconds
    pub read_timeout: Option<u64>,
    /// Input line cap in bytes, 0 for none
    pub max_line_length: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GameSection {
    pub variant: Option<Variant>,
    pub secret: Option<i64>,
    #[serde(default)]
    pub scramble: bool,
    pub range: Option<GuessRange>,
    #[serde(default)]
    pub unbounded: bool,
    pub digits: Option<usize>,
    pub enrichment: Option<Enrichment>,
    #[serde(default)]
    pub prompt: bool,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

/// Everything a single session needs to know, cloned into each handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSettings {
    pub variant: Variant,
    pub secret_source: SecretSource,
    pub validator: GuessValidator,
    pub enrichment: Enrichment,
    pub prompt_each_turn: bool,
    pub read_timeout: Option<Duration>,
    pub max_line_length: Option<usize>,
}

impl GameSettings {
    pub fn for_variant(variant: Variant) -> Self {
        Self {
            variant,
            secret_source: variant.secret_source(),
            validator: GuessValidator::new(GuessFormat::Integer, variant.guess_range()),
            enrichment: Enrichment::None,
            prompt_each_turn: false,
            read_timeout: None,
            max_line_length: Some(DEFAULT_MAX_LINE_LENGTH),
        }
    }

    pub fn with_secret_source(mut self, source: SecretSource) -> Self {
        self.secret_source = source;
        self
    }

    pub fn with_validator(mut self, validator: GuessValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn with_prompt(mut self, prompt_each_turn: bool) -> Self {
        self.prompt_each_turn = prompt_each_turn;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: Option<usize>) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Text of the greeting after "Welcome to the ...!".
    pub fn describe_input(&self) -> String {
        match (self.variant, self.validator.format(), self.validator.range()) {
            (Variant::CodeBreaker, GuessFormat::Integer, None) => format!(
                "Enter a code between {} and {}.",
                CODE_RANGE.min, CODE_RANGE.max
            ),
            _ => self.validator.describe_input(),
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub game: GameSettings,
    pub seed: Option<u64>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = match cli.config {
            Some(ref path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::FileRead(path.clone(), e))?;
                toml::from_str(&contents).map_err(|e| ConfigError::TomlParse(path.clone(), e))?
            }
            None => TomlConfig::default(),
        };
        Self::merge(cli, toml_config)
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    pub fn merge(cli: CliArgs, file: TomlConfig) -> Result<Self, ConfigError> {
        let variant = cli.variant.or(file.game.variant).unwrap_or_default();
        let defaults = GameSettings::for_variant(variant);

        let unbounded =
            cli.unbounded || (file.game.unbounded && cli.min.is_none() && cli.max.is_none());
        let range = if unbounded {
            None
        } else {
            let base = file.game.range.or(defaults.validator.range());
            match (cli.min, cli.max, base) {
                (None, None, base) => base,
                (min, max, Some(base)) => Some(GuessRange::new(
                    min.unwrap_or(base.min),
                    max.unwrap_or(base.max),
                )),
                (Some(min), Some(max), None) => Some(GuessRange::new(min, max)),
                (_, _, None) => {
                    return Err(ConfigError::Invalid(
                        "both --min and --max are needed when the variant has no range"
                            .to_string(),
                    ))
                }
            }
        };
        if let Some(range) = range {
            if range.min > range.max {
                return Err(ConfigError::Invalid(format!(
                    "range minimum {} is greater than maximum {}",
                    range.min, range.max
                )));
            }
        }

        let format = match cli.digits.or(file.game.digits) {
            Some(0) => {
                return Err(ConfigError::Invalid(
                    "digit count must be at least 1".to_string(),
                ))
            }
            Some(count) => GuessFormat::Digits(count),
            None => GuessFormat::Integer,
        };

        let scramble = cli.scramble || file.game.scramble;
        let secret_source = match (cli.secret.or(file.game.secret), defaults.secret_source) {
            (Some(secret), _) => SecretSource::Fixed(secret),
            (None, SecretSource::Random(_)) => {
                let range = range.ok_or_else(|| {
                    ConfigError::Invalid(
                        "a random secret needs a range; set --secret or drop --unbounded"
                            .to_string(),
                    )
                })?;
                if scramble {
                    SecretSource::Scrambled(range)
                } else {
                    SecretSource::Random(range)
                }
            }
            (None, _) if scramble => SecretSource::Scrambled(range.unwrap_or(CODE_RANGE)),
            (None, source) => source,
        };

        let game = defaults
            .with_secret_source(secret_source)
            .with_validator(GuessValidator::new(format, range))
            .with_enrichment(cli.enrichment.or(file.game.enrichment).unwrap_or_default())
            .with_prompt(cli.prompt || file.game.prompt)
            .with_read_timeout(
                cli.read_timeout
                    .or(file.server.read_timeout)
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs),
            )
            .with_max_line_length(
                match cli.max_line_length.or(file.server.max_line_length) {
                    Some(0) => None,
                    Some(limit) => Some(limit),
                    None => Some(DEFAULT_MAX_LINE_LENGTH),
                },
            );

        Ok(Config {
            host: cli
                .host
                .or(file.server.host)
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            port: cli.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
            game,
            seed: cli.seed.or(file.game.seed),
            log_level: cli
                .log_level
                .or(file.logging.level)
                .unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// A fixed secret the validator would reject can never be guessed.
    pub fn unwinnable_secret(&self) -> Option<i64> {
        match self.game.secret_source {
            SecretSource::Fixed(secret) => match self.game.validator.range() {
                Some(range) if !range.contains(secret) => Some(secret),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            game: GameSettings::default(),
            seed: None,
            log_level: "info".to_string(),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli() -> CliArgs {
        CliArgs::default()
    }

    #[test]
    fn test_default_config() {
        let config = Config::merge(cli(), TomlConfig::default()).unwrap();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.game.variant, Variant::Classic);
        assert_eq!(config.game.secret_source, SecretSource::Random(CLASSIC_RANGE));
        assert_eq!(config.game.validator.range(), Some(CLASSIC_RANGE));
        assert_eq!(config.game.enrichment, Enrichment::None);
        assert!(!config.game.prompt_each_turn);
        assert_eq!(config.game.read_timeout, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_code_breaker_preset() {
        let args = CliArgs {
            variant: Some(Variant::CodeBreaker),
            ..cli()
        };
        let config = Config::merge(args, TomlConfig::default()).unwrap();
        assert_eq!(config.game.secret_source, SecretSource::Fixed(1111));
        assert_eq!(config.game.validator.range(), None);
        assert_eq!(
            config.game.describe_input(),
            "Enter a code between 1000 and 9999."
        );
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            read_timeout = 30

            [game]
            variant = "classic"
            secret = 42
            range = { min = 1, max = 50 }
            enrichment = "parity"
            prompt = true

            [logging]
            level = "debug"
        "#;

        let file: TomlConfig = toml::from_str(toml_str).unwrap();
        let config = Config::merge(cli(), file).unwrap();
        assert_eq!(config.address(), "127.0.0.1:9000");
        assert_eq!(config.game.secret_source, SecretSource::Fixed(42));
        assert_eq!(config.game.validator.range(), Some(GuessRange::new(1, 50)));
        assert_eq!(config.game.enrichment, Enrichment::Parity);
        assert!(config.game.prompt_each_turn);
        assert_eq!(config.game.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: TomlConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            [game]
            secret = 10
            enrichment = "timestamp"
            "#,
        )
        .unwrap();
        let args = CliArgs {
            port: Some(7000),
            secret: Some(77),
            enrichment: Some(Enrichment::Magnitude),
            max: Some(80),
            ..cli()
        };
        let config = Config::merge(args, file).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.game.secret_source, SecretSource::Fixed(77));
        assert_eq!(config.game.enrichment, Enrichment::Magnitude);
        assert_eq!(config.game.validator.range(), Some(GuessRange::new(1, 80)));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<TomlConfig, _> = toml::from_str("[game]\nplayers = 4\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let args = CliArgs {
            min: Some(50),
            max: Some(10),
            ..cli()
        };
        let err = Config::merge(args, TomlConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unbounded_random_rejected() {
        let args = CliArgs {
            unbounded: true,
            ..cli()
        };
        assert!(Config::merge(args, TomlConfig::default()).is_err());

        let args = CliArgs {
            unbounded: true,
            secret: Some(5),
            ..cli()
        };
        let config = Config::merge(args, TomlConfig::default()).unwrap();
        assert_eq!(config.game.validator.range(), None);
    }

    #[test]
    fn test_digit_format_and_scramble() {
        let args = CliArgs {
            digits: Some(4),
            scramble: true,
            min: Some(1000),
            max: Some(9999),
            ..cli()
        };
        let config = Config::merge(args, TomlConfig::default()).unwrap();
        assert_eq!(config.game.validator.format(), GuessFormat::Digits(4));
        assert_eq!(config.game.secret_source, SecretSource::Scrambled(CODE_RANGE));
        assert_eq!(config.game.describe_input(), "Enter a 4-digit code.");

        let args = CliArgs {
            digits: Some(0),
            ..cli()
        };
        assert!(Config::merge(args, TomlConfig::default()).is_err());
    }

    #[test]
    fn test_zero_read_timeout_means_none() {
        let args = CliArgs {
            read_timeout: Some(0),
            ..cli()
        };
        let config = Config::merge(args, TomlConfig::default()).unwrap();
        assert_eq!(config.game.read_timeout, None);
    }

    #[test]
    fn test_max_line_length_resolution() {
        let config = Config::merge(cli(), TomlConfig::default()).unwrap();
        assert_eq!(config.game.max_line_length, Some(DEFAULT_MAX_LINE_LENGTH));

        let file: TomlConfig = toml::from_str("[server]\nmax_line_length = 64\n").unwrap();
        let config = Config::merge(cli(), file).unwrap();
        assert_eq!(config.game.max_line_length, Some(64));

        let args = CliArgs {
            max_line_length: Some(0),
            ..cli()
        };
        let file: TomlConfig = toml::from_str("[server]\nmax_line_length = 64\n").unwrap();
        let config = Config::merge(args, file).unwrap();
        assert_eq!(config.game.max_line_length, None);
    }

    #[test]
    fn test_unwinnable_secret_detected() {
        let args = CliArgs {
            secret: Some(500),
            ..cli()
        };
        let config = Config::merge(args, TomlConfig::default()).unwrap();
        assert_eq!(config.unwinnable_secret(), Some(500));
    }

    #[test]
    fn test_missing_config_file() {
        let args = CliArgs {
            config: Some(PathBuf::from("/nonexistent/guessing-game.toml")),
            ..cli()
        };
        let err = Config::from_args(args).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_, _)));
        assert!(err.to_string().contains("guessing-game.toml"));
    }
}
