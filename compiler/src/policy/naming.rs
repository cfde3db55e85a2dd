use std::str::FromStr;

use heck::ToSnakeCase;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::errors::msg;

/// How field names are rewritten before they reach an adapter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamingStrategy {
    AsIs,
    /// `vendorId`, `VendorId` and `vendor id` all become `vendor_id`. Each dot-separated segment
    /// is converted on its own so `userProfile.firstName` keeps its qualifier.
    #[default]
    SnakeCase,
}

impl NamingStrategy {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingStrategy::AsIs => name.to_string(),
            NamingStrategy::SnakeCase => name.split('.').map(|s| s.to_snake_case()).join("."),
        }
    }
}

impl FromStr for NamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "as-is" | "asis" | "none" => Ok(NamingStrategy::AsIs),
            "snake-case" | "snake" => Ok(NamingStrategy::SnakeCase),
            _ => Err(msg::unknown_naming_strategy(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        let s = NamingStrategy::SnakeCase;
        assert_eq!(s.apply("vendorId"), "vendor_id");
        assert_eq!(s.apply("VendorId"), "vendor_id");
        assert_eq!(s.apply("vendor id"), "vendor_id");
        assert_eq!(s.apply("vendor_id"), "vendor_id");
        assert_eq!(s.apply("userProfile.firstName"), "user_profile.first_name");
        assert_eq!(s.apply("id"), "id");
    }

    #[test]
    fn test_as_is() {
        assert_eq!(NamingStrategy::AsIs.apply("vendorId"), "vendorId");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("snake_case".parse(), Ok(NamingStrategy::SnakeCase));
        assert_eq!("As-Is".parse(), Ok(NamingStrategy::AsIs));
        assert!("kebab".parse::<NamingStrategy>().is_err());
    }
}
