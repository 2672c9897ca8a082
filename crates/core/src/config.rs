//! Configuration system for the simulator core.
//!
//! This module defines all configuration structures and enums used to
//! parameterize the reorder buffer and the speculation policy. It provides:
//! 1. **Defaults:** Baseline hardware constants (ROB capacity, squash width,
//!    thread count, SMT threshold).
//! 2. **Structures:** Hierarchical config for the reorder buffer and for the
//!    speculation-safety switches.
//! 3. **Enums:** SMT sharing policy with case-insensitive string parsing.
//!
//! Configuration is supplied via JSON or use `Config::default()`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Default configuration constants for the simulator core.
///
/// These values define the baseline hardware configuration when not
/// explicitly overridden.
mod defaults {
    /// Total reorder buffer capacity in entries.
    pub const NUM_ROB_ENTRIES: usize = 192;

    /// Maximum number of instructions squashed per pump invocation.
    pub const SQUASH_WIDTH: usize = 8;

    /// Number of hardware threads.
    pub const NUM_THREADS: usize = 1;

    /// Per-thread entry cap used by the threshold sharing policy.
    pub const SMT_ROB_THRESHOLD: usize = 100;
}

/// SMT reorder buffer sharing policies.
///
/// Determines how the total ROB capacity is divided among hardware threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmtRobPolicy {
    /// Every thread may consume the full capacity.
    #[default]
    Dynamic,
    /// Capacity is divided evenly among the active threads.
    Partitioned,
    /// Every thread is capped at a fixed entry count, restored to full
    /// capacity when only one thread is active.
    Threshold,
}

/// Error returned when an SMT policy string does not name a known policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid ROB sharing policy {:?}; options are: dynamic, partitioned, threshold",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for SmtRobPolicy {
    type Err = ParsePolicyError;

    /// Parses a policy name case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamic" => Ok(SmtRobPolicy::Dynamic),
            "partitioned" => Ok(SmtRobPolicy::Partitioned),
            "threshold" => Ok(SmtRobPolicy::Threshold),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for SmtRobPolicy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reorder buffer sizing and SMT sharing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RobConfig {
    /// Total number of reorder buffer entries.
    #[serde(default = "RobConfig::default_num_rob_entries")]
    pub num_rob_entries: usize,

    /// Maximum squashes processed per pump invocation.
    #[serde(default = "RobConfig::default_squash_width")]
    pub squash_width: usize,

    /// Static upper bound on hardware threads.
    #[serde(default = "RobConfig::default_num_threads")]
    pub num_threads: usize,

    /// SMT sharing policy. Parsed case-insensitively from a string.
    #[serde(default)]
    pub smt_rob_policy: SmtRobPolicy,

    /// Per-thread entry cap, used only by the threshold policy.
    #[serde(default = "RobConfig::default_smt_rob_threshold")]
    pub smt_rob_threshold: usize,
}

impl RobConfig {
    /// Returns the default total ROB capacity.
    fn default_num_rob_entries() -> usize {
        defaults::NUM_ROB_ENTRIES
    }

    /// Returns the default squash width.
    fn default_squash_width() -> usize {
        defaults::SQUASH_WIDTH
    }

    /// Returns the default hardware thread count.
    fn default_num_threads() -> usize {
        defaults::NUM_THREADS
    }

    /// Returns the default threshold-policy entry cap.
    fn default_smt_rob_threshold() -> usize {
        defaults::SMT_ROB_THRESHOLD
    }
}

impl Default for RobConfig {
    fn default() -> Self {
        Self {
            num_rob_entries: defaults::NUM_ROB_ENTRIES,
            squash_width: defaults::SQUASH_WIDTH,
            num_threads: defaults::NUM_THREADS,
            smt_rob_policy: SmtRobPolicy::Dynamic,
            smt_rob_threshold: defaults::SMT_ROB_THRESHOLD,
        }
    }
}

/// Speculation-safety switches observed by the visibility and taint passes.
///
/// All switches default to off, which models the unprotected baseline where
/// every in-flight instruction is considered unsquashable.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SpeculationConfig {
    /// Enable speculative taint tracking (the per-tick taint pass).
    #[serde(default)]
    pub stt: bool,

    /// Enable the speculation-safety protection scheme. When off, every
    /// instruction is unsquashable (unsafe baseline).
    #[serde(default)]
    pub protection_enabled: bool,

    /// Model invisible speculation (shadow structures) rather than fences.
    #[serde(default)]
    pub invisible_spec: bool,

    /// Futuristic threat model: an instruction is safe only once all older
    /// instructions have completed, not merely once older branches resolved.
    #[serde(default)]
    pub futuristic: bool,

    /// Track implicit (control-dependent) information flow.
    #[serde(default)]
    pub imp_channel: bool,
}

/// Root configuration structure containing all simulator core settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use sttsim_core::config::{Config, SmtRobPolicy};
///
/// let config = Config::default();
/// assert_eq!(config.rob.num_rob_entries, 192);
/// assert_eq!(config.rob.smt_rob_policy, SmtRobPolicy::Dynamic);
/// assert!(!config.speculation.stt);
/// ```
///
/// Deserializing from JSON:
///
/// ```
/// use sttsim_core::config::{Config, SmtRobPolicy};
///
/// let json = r#"{
///     "rob": {
///         "num_rob_entries": 8,
///         "squash_width": 3,
///         "num_threads": 2,
///         "smt_rob_policy": "Partitioned"
///     },
///     "speculation": {
///         "stt": true,
///         "protection_enabled": true
///     }
/// }"#;
///
/// let config: Config = serde_json::from_str(json).unwrap();
/// assert_eq!(config.rob.smt_rob_policy, SmtRobPolicy::Partitioned);
/// assert_eq!(config.rob.smt_rob_threshold, 100);
/// assert!(config.speculation.stt);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Reorder buffer sizing and SMT sharing policy.
    #[serde(default)]
    pub rob: RobConfig,
    /// Speculation-safety and taint-tracking switches.
    #[serde(default)]
    pub speculation: SpeculationConfig,
}
