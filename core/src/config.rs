//! Booking rule configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// Minimum age for booking when nothing else is configured.
pub const DEFAULT_MINIMUM_AGE: u32 = 18;

/// Upper bound on a center's default capacity when nothing else is configured.
pub const DEFAULT_MAX_DEFAULT_CAPACITY: u32 = 100_000;

/// What `set_day_capacity` does when the new capacity is below the number of
/// bookings already admitted for that day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapacityPolicy {
    /// Refuse the change with `CapacityBelowActive`
    #[default]
    Reject,
    /// Store the change; no new bookings are admitted until cancellations
    /// bring the count under the new capacity
    AllowOversell,
}

impl fmt::Display for CapacityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::AllowOversell => write!(f, "allow-oversell"),
        }
    }
}

impl FromStr for CapacityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "allow-oversell" | "allow_oversell" | "oversell" => Ok(Self::AllowOversell),
            other => Err(format!("unknown capacity policy: {other}")),
        }
    }
}

/// Configuration for the booking rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Users younger than this are rejected with `Ineligible`
    pub minimum_age: u32,
    /// Handling of capacity overrides below the active count
    pub capacity_policy: CapacityPolicy,
    /// Largest default capacity accepted at center registration
    pub max_default_capacity: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            minimum_age: DEFAULT_MINIMUM_AGE,
            capacity_policy: CapacityPolicy::default(),
            max_default_capacity: DEFAULT_MAX_DEFAULT_CAPACITY,
        }
    }
}

impl BookingConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values fall back to their defaults:
    ///
    /// - `VAXBOOK_MINIMUM_AGE` (default `18`)
    /// - `VAXBOOK_CAPACITY_POLICY`: `reject` or `allow-oversell` (default `reject`)
    /// - `VAXBOOK_MAX_DEFAULT_CAPACITY` (default `100000`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the
    /// process environment.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let minimum_age = lookup("VAXBOOK_MINIMUM_AGE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MINIMUM_AGE);

        let capacity_policy = match lookup("VAXBOOK_CAPACITY_POLICY") {
            Some(raw) => raw.parse().unwrap_or_else(|error: String| {
                tracing::warn!(%error, "Falling back to default capacity policy");
                CapacityPolicy::default()
            }),
            None => CapacityPolicy::default(),
        };

        let max_default_capacity = lookup("VAXBOOK_MAX_DEFAULT_CAPACITY")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_DEFAULT_CAPACITY);

        Self {
            minimum_age,
            capacity_policy,
            max_default_capacity,
        }
    }

    /// Set the minimum booking age.
    #[must_use]
    pub const fn with_minimum_age(mut self, minimum_age: u32) -> Self {
        self.minimum_age = minimum_age;
        self
    }

    /// Set the capacity override policy.
    #[must_use]
    pub const fn with_capacity_policy(mut self, capacity_policy: CapacityPolicy) -> Self {
        self.capacity_policy = capacity_policy;
        self
    }
}
