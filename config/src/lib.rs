//! Rollup Configuration
//!
//! Shared configuration crate for the batch prover and its tools.
//!
//! Handles loading configuration from:
//! 1. ROLLUP_CONFIG env var (explicit path)
//! 2. ./rollup.toml (current directory)
//! 3. ~/.rollup/rollup.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result, bail};
use rollup_account::{ReceiverNonce, WitnessLayout};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "rollup.toml";
const CONFIG_DIR_NAME: &str = ".rollup";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_BATCH_SIZE: usize = 1;
const DEFAULT_TREE_DEPTH: usize = 5;
const DEFAULT_PROVING_KEY: &str = "./keys/proving.key";
const DEFAULT_VERIFYING_KEY: &str = "./keys/verifying.key";
const DEFAULT_VERIFIER_ARTIFACT: &str = "./keys/verifier.json";

/// Deepest account tree the circuit accepts. Indices are u64 and the tree is
/// addressed by the low `tree_depth` bits.
pub const MAX_TREE_DEPTH: usize = 32;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollupConfig {
    #[serde(default)]
    pub circuit: CircuitConfig,
    #[serde(default)]
    pub visibility: WitnessLayout,
    #[serde(default)]
    pub keys: KeysConfig,
}

/// Parameters that fix the constraint system shape.
///
/// Changing any of these invalidates previously generated keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Number of transfers proven together
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Length of the account inclusion proofs
    #[serde(default = "default_tree_depth")]
    pub tree_depth: usize,
    #[serde(default)]
    pub receiver_nonce: ReceiverNonce,
    /// Assert sum(before) == sum(after) over the whole batch
    #[serde(default = "default_true")]
    pub enforce_conservation: bool,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            tree_depth: DEFAULT_TREE_DEPTH,
            receiver_nonce: ReceiverNonce::default(),
            enforce_conservation: true,
        }
    }
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_tree_depth() -> usize {
    DEFAULT_TREE_DEPTH
}

fn default_true() -> bool {
    true
}

/// Key material locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_proving_key")]
    pub proving_key_path: String,
    #[serde(default = "default_verifying_key")]
    pub verifying_key_path: String,
    #[serde(default = "default_verifier_artifact")]
    pub verifier_artifact_path: String,
    /// Fixed seed for setup. Only meant for development; production keys
    /// must come from a ceremony.
    #[serde(default)]
    pub setup_seed: Option<u64>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            proving_key_path: DEFAULT_PROVING_KEY.into(),
            verifying_key_path: DEFAULT_VERIFYING_KEY.into(),
            verifier_artifact_path: DEFAULT_VERIFIER_ARTIFACT.into(),
            setup_seed: None,
        }
    }
}

fn default_proving_key() -> String {
    DEFAULT_PROVING_KEY.into()
}

fn default_verifying_key() -> String {
    DEFAULT_VERIFYING_KEY.into()
}

fn default_verifier_artifact() -> String {
    DEFAULT_VERIFIER_ARTIFACT.into()
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = parsed,
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Set Option<T> from env var if present and parseable
fn env_parse_option<T: std::str::FromStr>(key: &str, field: &mut Option<T>) {
    if let Ok(v) = env::var(key) {
        match v.parse() {
            Ok(parsed) => *field = Some(parsed),
            Err(_) => log::warn!("Ignoring unparseable {}={}", key, v),
        }
    }
}

/// Check if env var is set to a truthy value ("1" or "true")
fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

// ============================================================================
// Implementation
// ============================================================================

impl RollupConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                Self::parse_file(&path)?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::parse_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check ROLLUP_CONFIG env var
        if let Ok(path) = env::var("ROLLUP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./rollup.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.rollup/rollup.toml
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Circuit
        env_parse("ROLLUP_BATCH_SIZE", &mut self.circuit.batch_size);
        env_parse("ROLLUP_TREE_DEPTH", &mut self.circuit.tree_depth);
        env_parse("ROLLUP_RECEIVER_NONCE", &mut self.circuit.receiver_nonce);
        if let Some(v) = env_bool("ROLLUP_ENFORCE_CONSERVATION") {
            self.circuit.enforce_conservation = v;
        }

        // Visibility
        env_parse("ROLLUP_INDEX_VISIBILITY", &mut self.visibility.account_index);
        env_parse("ROLLUP_NONCE_VISIBILITY", &mut self.visibility.account_nonce);
        env_parse("ROLLUP_BALANCE_VISIBILITY", &mut self.visibility.account_balance);
        env_parse("ROLLUP_AMOUNT_VISIBILITY", &mut self.visibility.transfer_amount);

        // Keys
        env_string("ROLLUP_PROVING_KEY", &mut self.keys.proving_key_path);
        env_string("ROLLUP_VERIFYING_KEY", &mut self.keys.verifying_key_path);
        env_string(
            "ROLLUP_VERIFIER_ARTIFACT",
            &mut self.keys.verifier_artifact_path,
        );
        env_parse_option("ROLLUP_SETUP_SEED", &mut self.keys.setup_seed);
    }

    /// Reject shapes the circuit cannot be built for
    pub fn validate(&self) -> Result<()> {
        if self.circuit.batch_size == 0 {
            bail!("circuit.batch_size must be at least 1");
        }
        if self.circuit.tree_depth == 0 || self.circuit.tree_depth > MAX_TREE_DEPTH {
            bail!(
                "circuit.tree_depth must be between 1 and {}, got {}",
                MAX_TREE_DEPTH,
                self.circuit.tree_depth
            );
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        let mut sample = Self::default();
        sample.keys.setup_seed = Some(0);
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollup_account::Visibility;
    use std::io::Write;

    #[test]
    fn defaults_match_legacy_circuit() {
        let config = RollupConfig::default();
        assert_eq!(config.circuit.batch_size, 1);
        assert_eq!(config.circuit.tree_depth, 5);
        assert_eq!(config.circuit.receiver_nonce, ReceiverNonce::Increment);
        assert!(config.circuit.enforce_conservation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_partial_toml() {
        let config: RollupConfig = toml::from_str(
            r#"
            [circuit]
            batch_size = 4
            receiver_nonce = "unchanged"

            [visibility]
            transfer_amount = "private"
            "#,
        )
        .unwrap();

        assert_eq!(config.circuit.batch_size, 4);
        assert_eq!(config.circuit.tree_depth, DEFAULT_TREE_DEPTH);
        assert_eq!(config.circuit.receiver_nonce, ReceiverNonce::Unchanged);
        assert_eq!(config.visibility.transfer_amount, Visibility::Private);
        assert_eq!(config.visibility.account_balance, Visibility::Public);
        assert_eq!(config.keys.proving_key_path, DEFAULT_PROVING_KEY);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut config = RollupConfig::default();
        config.circuit.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = RollupConfig::default();
        config.circuit.tree_depth = MAX_TREE_DEPTH + 1;
        assert!(config.validate().is_err());

        config.circuit.tree_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_from_file_rejects_zero_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[circuit]\nbatch_size = 0").unwrap();

        assert!(RollupConfig::load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_visibility() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "[visibility]\ntransfer_amount = \"public\"").unwrap();

        // No other test depends on the amount visibility of a loaded config.
        unsafe { env::set_var("ROLLUP_AMOUNT_VISIBILITY", "private") };
        let config = RollupConfig::load_from(&path);
        unsafe { env::remove_var("ROLLUP_AMOUNT_VISIBILITY") };

        let config = config.unwrap();
        assert_eq!(config.visibility.transfer_amount, Visibility::Private);
        assert_eq!(config.visibility.account_balance, Visibility::Public);
    }

    #[test]
    fn sample_round_trips_through_toml() {
        let sample = RollupConfig::generate_sample();
        let parsed: RollupConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.keys.setup_seed, Some(0));
        assert_eq!(parsed.circuit, CircuitConfig::default());
    }
}
