//! Configuration file support.
//!
//! Loads optional TOML config from `--config <path>` or
//! `~/.config/ledger-fraud-detect/config.toml`. Every field has a default, so
//! an absent or partial file is fine.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub detection: Thresholds,
    pub server: ServerConfig,
    pub generator: GeneratorConfig,
}

/// Detector and scorer thresholds. Time windows are in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    // Rings (strongly connected components)
    pub ring_min_members: usize,
    pub ring_base_risk: f64,
    pub ring_risk_per_member: f64,
    pub ring_member_score: f64,

    // Smurfing
    pub fan_window_secs: i64,
    pub fan_min_counterparties: usize,
    pub fan_out_min_transactions: usize,
    pub fan_in_median_ceiling: f64,
    pub consolidation_ratio: f64,
    pub salary_min_transactions: usize,
    pub salary_min_gap_secs: i64,
    pub salary_max_gap_secs: i64,
    pub salary_amount_tolerance: f64,
    pub salary_match_fraction: f64,
    pub fan_in_risk: f64,
    pub fan_out_risk: f64,
    pub smurf_hub_score: f64,
    pub smurf_counterparty_score: f64,

    // Shell chains
    pub shell_max_degree: u32,
    pub shell_min_path_nodes: usize,
    pub shell_max_hops: usize,
    pub shell_score: f64,

    // Velocity
    pub velocity_window_secs: i64,
    pub velocity_max_transactions: usize,
    pub velocity_score: f64,

    // Legitimate-hub suppression
    pub hub_min_degree: u32,
    pub hub_penalty: f64,

    // Explanation tags
    pub pass_through_window_secs: i64,
    pub pass_through_ratio: f64,
    pub dormancy_gap_secs: i64,

    pub max_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ring_min_members: 3,
            ring_base_risk: 85.0,
            ring_risk_per_member: 2.0,
            ring_member_score: 60.0,

            fan_window_secs: 24 * 3600,
            fan_min_counterparties: 5,
            fan_out_min_transactions: 5,
            fan_in_median_ceiling: 10_000.0,
            consolidation_ratio: 0.7,
            salary_min_transactions: 3,
            salary_min_gap_secs: 20 * 3600,
            salary_max_gap_secs: 28 * 3600,
            salary_amount_tolerance: 0.1,
            salary_match_fraction: 0.5,
            fan_in_risk: 80.0,
            fan_out_risk: 78.0,
            smurf_hub_score: 40.0,
            smurf_counterparty_score: 20.0,

            shell_max_degree: 3,
            shell_min_path_nodes: 3,
            shell_max_hops: 6,
            shell_score: 30.0,

            velocity_window_secs: 3600,
            velocity_max_transactions: 10,
            velocity_score: 25.0,

            hub_min_degree: 20,
            hub_penalty: 75.0,

            pass_through_window_secs: 2 * 3600,
            pass_through_ratio: 0.8,
            dormancy_gap_secs: 7 * 24 * 3600,

            max_score: 100.0,
        }
    }
}

impl Thresholds {
    /// Reject values the scorer cannot work with: a negative or non-finite
    /// score ceiling, non-finite weights and ratios, or empty time windows.
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_score.is_finite() || self.max_score < 0.0 {
            return Err(format!("max_score must be a non-negative number, got {}", self.max_score));
        }
        let numbers = [
            ("ring_base_risk", self.ring_base_risk),
            ("ring_risk_per_member", self.ring_risk_per_member),
            ("ring_member_score", self.ring_member_score),
            ("fan_in_median_ceiling", self.fan_in_median_ceiling),
            ("consolidation_ratio", self.consolidation_ratio),
            ("salary_amount_tolerance", self.salary_amount_tolerance),
            ("salary_match_fraction", self.salary_match_fraction),
            ("fan_in_risk", self.fan_in_risk),
            ("fan_out_risk", self.fan_out_risk),
            ("smurf_hub_score", self.smurf_hub_score),
            ("smurf_counterparty_score", self.smurf_counterparty_score),
            ("shell_score", self.shell_score),
            ("velocity_score", self.velocity_score),
            ("hub_penalty", self.hub_penalty),
            ("pass_through_ratio", self.pass_through_ratio),
        ];
        if let Some((name, value)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
            return Err(format!("{name} must be finite, got {value}"));
        }
        let windows = [
            ("fan_window_secs", self.fan_window_secs),
            ("velocity_window_secs", self.velocity_window_secs),
            ("pass_through_window_secs", self.pass_through_window_secs),
            ("dormancy_gap_secs", self.dormancy_gap_secs),
        ];
        if let Some((name, value)) = windows.iter().find(|(_, v)| *v <= 0) {
            return Err(format!("{name} must be positive, got {value}"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address, e.g. "127.0.0.1:8080"
    pub bind: String,
    /// Directory of static dashboard assets served at `/`
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub fraud_rate: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { fraud_rate: 0.05, seed: 42 }
    }
}

impl Config {
    /// Load config from `path`, or from the default location when `None`,
    /// falling back to defaults on any error.
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Config>(&content) {
                Ok(mut config) => {
                    if let Err(reason) = config.detection.validate() {
                        tracing::warn!(path = %path.display(), %reason, "invalid detection thresholds, using defaults");
                        config.detection = Thresholds::default();
                    }
                    tracing::info!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read config, using defaults");
                Self::default()
            }
        }
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("ledger-fraud-detect")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config: Config = toml::from_str(
            r#"
            [detection]
            velocity_max_transactions = 4
            hub_penalty = 50.0

            [server]
            bind = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.velocity_max_transactions, 4);
        assert_eq!(config.detection.hub_penalty, 50.0);
        assert_eq!(config.detection.fan_window_secs, 86_400);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.static_dir, PathBuf::from("static"));
        assert_eq!(config.generator.seed, 42);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/ledger-fraud-detect.toml")));
        assert_eq!(config.detection, Thresholds::default());
    }

    #[test]
    fn rejects_unusable_thresholds() {
        assert!(Thresholds::default().validate().is_ok());

        let negative = Thresholds { max_score: -1.0, ..Thresholds::default() };
        assert!(negative.validate().unwrap_err().contains("max_score"));

        let nan = Thresholds { max_score: f64::NAN, ..Thresholds::default() };
        assert!(nan.validate().is_err());

        let empty_window = Thresholds { velocity_window_secs: 0, ..Thresholds::default() };
        assert!(empty_window.validate().unwrap_err().contains("velocity_window_secs"));
    }

    #[test]
    fn invalid_thresholds_fall_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("ledger-fraud-detect-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[detection]\nmax_score = -1.0\n\n[server]\nbind = \"127.0.0.1:9100\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path));
        std::fs::remove_file(&path).ok();

        assert_eq!(config.detection, Thresholds::default());
        assert_eq!(config.server.bind, "127.0.0.1:9100");
    }
}
