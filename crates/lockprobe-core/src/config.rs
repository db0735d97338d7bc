//! Campaign configuration.
//!
//! Every section has defaults matching the field-tested values for the lock,
//! so a config file only needs the fields it overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lockprobe_explore::oracle::DEFAULT_CRASH_SIGNATURES;
use lockprobe_explore::CommandSequence;
use serde::{Deserialize, Serialize};

use crate::protocol::{DEFAULT_DEVICE_NAME, DEFAULT_PASSCODE, PASSCODE_LEN};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// What to do with the rest of a sequence after a write fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Record a failure sentinel and keep sending the remaining opcodes.
    Continue,
    /// Record a failure sentinel and stop the sequence.
    Abort,
}

/// Connection lifecycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub device_name: String,
    pub passcode: [u8; PASSCODE_LEN],
    /// Pause after connecting, before polling for the boot banner.
    pub post_connect_delay_ms: u64,
    pub reboot_poll_interval_ms: u64,
    /// Give up waiting for the boot banner after this long.
    pub reboot_deadline_ms: u64,
    /// Wait after each write before harvesting its log lines.
    pub settle_delay_ms: u64,
    /// Pause after disconnecting so the link can settle.
    pub reconnect_delay_ms: u64,
    pub write_failure_policy: WriteFailurePolicy,
}

impl SupervisorConfig {
    pub fn post_connect_delay(&self) -> Duration {
        Duration::from_millis(self.post_connect_delay_ms)
    }

    pub fn reboot_poll_interval(&self) -> Duration {
        Duration::from_millis(self.reboot_poll_interval_ms)
    }

    pub fn reboot_deadline(&self) -> Duration {
        Duration::from_millis(self.reboot_deadline_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            passcode: DEFAULT_PASSCODE,
            post_connect_delay_ms: 4_000,
            reboot_poll_interval_ms: 500,
            reboot_deadline_ms: 5_000,
            settle_delay_ms: 1_500,
            reconnect_delay_ms: 4_000,
            write_failure_policy: WriteFailurePolicy::Continue,
        }
    }
}

/// Log-text patterns, matched case-insensitively as substrings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Banner printed by the bootloader after a reset.
    pub boot: Vec<String>,
    /// Fault banners that mark an execution as a crash.
    pub crash: Vec<String>,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            boot: vec!["boot:".to_string(), "esp-rom".to_string()],
            crash: DEFAULT_CRASH_SIGNATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Scheduling and corpus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Outer scheduling rounds.
    pub max_iterations: u64,
    /// Weight of a new entry whose execution was interesting.
    pub high_weight: f64,
    /// Weight of a new entry whose execution was not.
    pub low_weight: f64,
    /// Weight of each built-in seed.
    pub initial_weight: f64,
    /// Per-round multiplicative decay, in (0, 1].
    pub decay_factor: f64,
    /// Draw limit per unit of energy, bounding rounds full of duplicates.
    pub max_draws_per_energy: u32,
    /// Entries shown in the per-round ranking.
    pub snapshot_size: usize,
    /// Fixed RNG seed; entropy when absent.
    pub rng_seed: Option<u64>,
    pub seeds: Vec<CommandSequence>,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            high_weight: 10.0,
            low_weight: 1.0,
            initial_weight: 1.0,
            decay_factor: 0.9,
            max_draws_per_energy: 8,
            snapshot_size: 5,
            rng_seed: None,
            seeds: default_seeds(),
        }
    }
}

/// Built-in seeds: authenticate, authenticate+open, authenticate+open+close,
/// and the undocumented 0xAA command.
pub fn default_seeds() -> Vec<CommandSequence> {
    [
        vec![0x00],
        vec![0x00, 0x01],
        vec![0x00, 0x01, 0x02],
        vec![0xAA],
    ]
    .into_iter()
    .filter_map(|bytes| CommandSequence::new(bytes).ok())
    .collect()
}

/// Output and resume locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Each session gets a timestamped directory under this root.
    pub output_root: PathBuf,
    /// Queue file to resume from (and persist back to).
    pub resume_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("AFL_Fuzz_Outputs"),
            resume_path: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    pub supervisor: SupervisorConfig,
    pub signatures: SignatureConfig,
    pub campaign: CampaignConfig,
    pub session: SessionConfig,
}

impl FuzzConfig {
    /// Load from a JSON file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let campaign = &self.campaign;
        if !(campaign.decay_factor > 0.0 && campaign.decay_factor <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "decay_factor must be in (0, 1], got {}",
                campaign.decay_factor
            )));
        }
        for (name, weight) in [
            ("high_weight", campaign.high_weight),
            ("low_weight", campaign.low_weight),
            ("initial_weight", campaign.initial_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a finite non-negative number, got {weight}"
                )));
            }
        }
        if campaign.seeds.is_empty() {
            return Err(ConfigError::Invalid("seed list is empty".to_string()));
        }
        if campaign.max_draws_per_energy == 0 {
            return Err(ConfigError::Invalid(
                "max_draws_per_energy must be at least 1".to_string(),
            ));
        }
        if self.supervisor.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid("device_name is empty".to_string()));
        }
        if self.supervisor.reboot_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "reboot_poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FuzzConfig::default();
        config.validate().unwrap();
        assert_eq!(config.campaign.seeds.len(), 4);
        assert_eq!(config.supervisor.reboot_deadline(), Duration::from_secs(5));
        assert_eq!(
            config.supervisor.reboot_poll_interval(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: FuzzConfig = serde_json::from_str(
            r#"{
                "campaign": { "max_iterations": 3, "rng_seed": 7, "seeds": [[1, 2]] },
                "supervisor": { "write_failure_policy": "abort" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.campaign.max_iterations, 3);
        assert_eq!(config.campaign.rng_seed, Some(7));
        assert_eq!(config.campaign.seeds[0].as_bytes(), &[1, 2]);
        assert_eq!(config.campaign.decay_factor, 0.9);
        assert_eq!(config.supervisor.write_failure_policy, WriteFailurePolicy::Abort);
        assert_eq!(config.supervisor.passcode, DEFAULT_PASSCODE);
    }

    #[test]
    fn test_rejects_bad_decay() {
        for factor in [0.0, -0.5, 1.5, f64::NAN] {
            let mut config = FuzzConfig::default();
            config.campaign.decay_factor = factor;
            assert!(config.validate().is_err(), "factor {factor} accepted");
        }
    }

    #[test]
    fn test_rejects_negative_weight_and_empty_seeds() {
        let mut config = FuzzConfig::default();
        config.campaign.low_weight = -1.0;
        assert!(config.validate().is_err());

        let mut config = FuzzConfig::default();
        config.campaign.seeds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_seed_sequence_in_json() {
        let parsed = serde_json::from_str::<FuzzConfig>(r#"{ "campaign": { "seeds": [[]] } }"#);
        assert!(parsed.is_err());
    }
}
