//! TOML configuration for the lseal daemon.
//!
//! Every section is optional. Command-line flags and the `LSEAL_*`
//! environment variables are applied on top in `main`.

use std::path::{Path, PathBuf};

use lseal_chain::ChainMode;
use serde::Deserialize;

/// Which role the daemon plays when no subcommand is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Extend and sign the hash chain.
    Sign,
    /// Walk the signed chain and check it against the log.
    #[default]
    Validate,
}

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Role when no subcommand is given.
    pub run_mode: RunMode,
    /// Keep the sign loop alive across transient backend failures.
    pub skip_errors: bool,
    /// Pause between sign passes once the log is caught up.
    pub sign_interval_secs: u64,
    /// Replica location and identity.
    pub replica: ReplicaSection,
    /// Paging against the log store.
    pub db: DbSection,
    /// Hash chain parameters.
    pub chain: ChainSection,
    /// RSA key files.
    pub keys: KeysSection,
    /// Logging configuration.
    pub log: LogSection,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            skip_errors: false,
            sign_interval_secs: 5,
            replica: ReplicaSection::default(),
            db: DbSection::default(),
            chain: ChainSection::default(),
            keys: KeysSection::default(),
            log: LogSection::default(),
        }
    }
}

/// `[replica]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReplicaSection {
    /// JSON-lines file holding the replica's log.
    pub path: PathBuf,
    /// Replica id within the log store.
    pub id: u32,
}

impl Default for ReplicaSection {
    fn default() -> Self {
        let path = dirs::home_dir()
            .map(|h| h.join(".lseal").join("replica.jsonl"))
            .unwrap_or_else(|| PathBuf::from(".lseal/replica.jsonl"));
        Self { path, id: 0 }
    }
}

/// `[db]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DbSection {
    /// User entries per batch.
    pub batch_size: u32,
}

impl Default for DbSection {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}

/// `[chain]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChainSection {
    /// `"full"` attaches the source lseq to each record, `"compact"` does not.
    pub mode: ChainMode,
}

/// `[keys]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KeysSection {
    /// PEM public key (SPKI or PKCS#1).
    pub public_key: Option<PathBuf>,
    /// PEM private key (PKCS#8 or PKCS#1). Only the sign roles need it.
    pub private_key: Option<PathBuf>,
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                toml::from_str::<CliConfig>(&content)?
            }
            None => Self::default(),
        };
        config.expand_paths();
        Ok(config)
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        let mut config: CliConfig = toml::from_str(s)?;
        config.expand_paths();
        Ok(config)
    }

    /// Effective pause between sign passes.
    pub fn sign_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sign_interval_secs.max(1))
    }

    fn expand_paths(&mut self) {
        self.replica.path = expand_home(&self.replica.path);
        self.keys.public_key = self.keys.public_key.as_deref().map(expand_home);
        self.keys.private_key = self.keys.private_key.as_deref().map(expand_home);
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
