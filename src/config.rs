//! Service configuration, read from a TOML file at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use tracing as log;

/// Poll intervals the settings UI offers, in seconds. Arbitrary configured
/// values are snapped to the nearest preset.
pub const POLL_INTERVAL_PRESETS: [u64; 5] = [30, 60, 120, 300, 600];

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

#[derive(PartialEq, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Native alert delivery can be switched off wholesale; the feed keeps
    /// updating either way.
    #[serde(default = "default_alerts_enabled")]
    pub alerts_enabled: bool,
    /// Where the rule list lives. Defaults to `rules.json` next to the
    /// config file.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    #[serde(default)]
    pub searches: Vec<SearchConfig>,
}

#[derive(PartialEq, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    pub name: String,
    pub query: String,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_alerts_enabled() -> bool {
    true
}

impl Default for Config {
    fn default() -> Config {
        Config {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            alerts_enabled: true,
            rules_path: None,
            searches: Vec::new(),
        }
    }
}

impl Config {
    /// Reads the config file. A missing file means defaults; a malformed
    /// one is a startup error rather than something to guess around.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            log::info!("no config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("malformed config at {}", path.display()))
    }

    /// Seconds between poll cycles, snapped to the closest preset.
    pub fn poll_interval(&self) -> Duration {
        let snapped = snap_to_preset(self.poll_interval_secs);
        if snapped != self.poll_interval_secs {
            log::warn!(
                "poll-interval-secs {} is not a preset, using {snapped}",
                self.poll_interval_secs
            );
        }
        Duration::from_secs(snapped)
    }
}

fn snap_to_preset(secs: u64) -> u64 {
    POLL_INTERVAL_PRESETS
        .iter()
        .copied()
        .min_by_key(|preset| preset.abs_diff(secs))
        .expect("presets are non-empty")
}
