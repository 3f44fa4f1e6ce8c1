//! Process-wide switches, passed explicitly through update and draw contexts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Config;

/// Effect quality level
///
/// Ordered so that `min` picks the cheaper of two levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quality {
    /// Cheapest rendering, used for mirrored water passes
    Low,
    /// Intermediate quality
    Medium,
    /// Everything enabled
    High,
}

impl Default for Quality {
    fn default() -> Self {
        Self::High
    }
}

impl Quality {
    /// Parse a quality name, falling back to `Low` for unknown names.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::warn!("{name:?} is not a valid quality level, using Low");
            Self::Low
        })
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(format!("unknown quality level: {s}")),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        };
        f.write_str(name)
    }
}

/// Engine-wide settings read at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Upper bound for every quality-dependent effect
    pub max_quality: Quality,
    /// Submit a debug sphere for every node with a bounding radius
    pub debug_bounding_spheres: bool,
    /// Start with the update passes suspended
    pub start_paused: bool,
    /// Vegetation drawn, `0..=99`; a forest of priority `p` is drawn when
    /// `p >= 99 - vegetation_quality`
    pub vegetation_quality: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_quality: Quality::High,
            debug_bounding_spheres: false,
            start_paused: false,
            vegetation_quality: 99,
        }
    }
}

impl Config for EngineSettings {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parse_is_case_insensitive() {
        assert_eq!("low".parse::<Quality>(), Ok(Quality::Low));
        assert_eq!("MeDiUm".parse::<Quality>(), Ok(Quality::Medium));
        assert_eq!("HIGH".parse::<Quality>(), Ok(Quality::High));
        assert!("ultra".parse::<Quality>().is_err());
    }

    #[test]
    fn test_quality_from_unknown_name_is_low() {
        assert_eq!(Quality::from_name("ultra"), Quality::Low);
        assert_eq!(Quality::from_name("medium"), Quality::Medium);
    }

    #[test]
    fn test_quality_display_and_order() {
        assert_eq!(Quality::Medium.to_string(), "Medium");
        assert_eq!(Quality::High.min(Quality::Low), Quality::Low);
        assert!(Quality::Low < Quality::High);
    }
}
