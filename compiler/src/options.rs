use std::{env, str::FromStr, time::Duration};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{errors::msg, policy::NamingStrategy, utils::flex_eq};

pub const ENV_NAMING: &str = "QFILTER_NAMING";
pub const ENV_VALIDATION: &str = "QFILTER_VALIDATION";
pub const ENV_IDENTIFIER_RESOLUTION: &str = "QFILTER_IDENTIFIER_RESOLUTION";
pub const ENV_REGEX_OPERATOR: &str = "QFILTER_REGEX_OPERATOR";

/// How ignore and whitelist entries are matched against field names.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierResolution {
    Strict,
    /// Case and non-alphanumeric characters are ignored.
    #[default]
    Flexible,
}

impl IdentifierResolution {
    pub fn names_match(&self, a: &str, b: &str) -> bool {
        match self {
            IdentifierResolution::Strict => a == b,
            IdentifierResolution::Flexible => flex_eq(a, b),
        }
    }
}

impl FromStr for IdentifierResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(IdentifierResolution::Strict),
            "flexible" | "flex" => Ok(IdentifierResolution::Flexible),
            _ => Err(msg::unknown_identifier_resolution(s)),
        }
    }
}

/// What happens to filter text before it is parsed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Parse leniently; malformed pieces are dropped.
    Off,
    /// Reject text with structural problems.
    #[default]
    Strict,
    /// Repair structural problems, and reject only what repair cannot fix.
    Repair,
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "lenient" => Ok(ValidationMode::Off),
            "strict" => Ok(ValidationMode::Strict),
            "repair" => Ok(ValidationMode::Repair),
            _ => Err(msg::unknown_validation_mode(s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheOptions {
    pub capacity: usize,
    pub ttl_ms: u64,
    pub reap_interval_ms: u64,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl_ms: 5 * 60 * 1000,
            reap_interval_ms: 60 * 1000,
        }
    }
}

impl CacheOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Options {
    pub naming_strategy: NamingStrategy,
    pub identifier_resolution: IdentifierResolution,
    pub validation: ValidationMode,
    /// Parsed documents are cached by filter text when set.
    pub cache: Option<CacheOptions>,
    /// Overrides the process-wide regex operator for adapters built by this compiler.
    pub regex_operator: Option<String>,
}

impl Options {
    /// Defaults overridden by `QFILTER_*` environment variables. Unrecognised values are logged
    /// and ignored.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            naming_strategy: env_or(ENV_NAMING, defaults.naming_strategy),
            identifier_resolution: env_or(
                ENV_IDENTIFIER_RESOLUTION,
                defaults.identifier_resolution,
            ),
            validation: env_or(ENV_VALIDATION, defaults.validation),
            cache: defaults.cache,
            regex_operator: env::var(ENV_REGEX_OPERATOR)
                .ok()
                .filter(|op| !op.trim().is_empty()),
        }
    }

    pub fn names_match(&self, a: &str, b: &str) -> bool {
        self.identifier_resolution.names_match(a, b)
    }
}

fn env_or<T: FromStr<Err = String>>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value.parse().unwrap_or_else(|e| {
            warn!("ignoring {name}: {e}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.naming_strategy, NamingStrategy::SnakeCase);
        assert_eq!(options.identifier_resolution, IdentifierResolution::Flexible);
        assert_eq!(options.validation, ValidationMode::Strict);
        assert_eq!(options.cache, None);
        assert_eq!(CacheOptions::default().ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_names_match() {
        let mut options = Options::default();
        assert!(options.names_match("bankId", "bank_id"));
        options.identifier_resolution = IdentifierResolution::Strict;
        assert!(!options.names_match("bankId", "bank_id"));
        assert!(options.names_match("bank_id", "bank_id"));
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("Repair".parse(), Ok(ValidationMode::Repair));
        assert_eq!("off".parse(), Ok(ValidationMode::Off));
        assert!("sometimes".parse::<ValidationMode>().is_err());
        assert_eq!("strict".parse(), Ok(IdentifierResolution::Strict));
    }

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(
            env_or("QFILTER_TEST_UNSET_VARIABLE", ValidationMode::Repair),
            ValidationMode::Repair
        );
    }
}
