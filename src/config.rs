//! Bridge Configuration
//!
//! Defaults suit a local model server on the same machine. Every field can
//! be overridden through a `VISION_BRIDGE_*` environment variable.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::agent::model::ModelConfig;
use crate::bridge::OperatingMode;
use crate::capture::frame::FrameConfig;
use crate::control::safety::MAX_ACTIONS_PER_MINUTE;

/// Prefix of every environment variable read by [`BridgeConfig::from_env`].
pub const ENV_PREFIX: &str = "VISION_BRIDGE_";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable could not be parsed or is out of range.
    #[error("{var}={value:?}: {reason}")]
    Invalid {
        /// Full variable name.
        var: String,
        /// Raw value.
        value: String,
        /// What was wrong.
        reason: String,
    },
}

/// Everything needed to build a bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Controller endpoint.
    pub bind_addr: SocketAddr,
    /// Where frames go and where actions come from.
    pub mode: OperatingMode,
    /// Model boundary (in-process mode).
    pub model: ModelConfig,
    /// Target decisions per second.
    pub decision_hz: f64,
    /// Objective sent with every decision.
    pub goal: String,
    /// Initial capture settings.
    pub frame: FrameConfig,
    /// Encoder threads (1 or 2).
    pub encoder_workers: usize,
    /// Remote mode pushes `state` every this many ticks.
    pub state_push_every_ticks: u32,
    /// Action rate ceiling.
    pub max_actions_per_minute: u32,
    /// Dump recent frames here when set.
    pub debug_frames_dir: Option<PathBuf>,
    /// Dump cadence in frames.
    pub debug_save_every: u32,
    /// Bound on encoder shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], crate::DEFAULT_PORT)),
            mode: OperatingMode::Remote,
            model: ModelConfig::default(),
            decision_hz: crate::DEFAULT_DECISION_HZ,
            goal: "explore and survive".to_string(),
            frame: FrameConfig::default(),
            encoder_workers: 1,
            state_push_every_ticks: 20,
            max_actions_per_minute: MAX_ACTIONS_PER_MINUTE,
            debug_frames_dir: None,
            debug_save_every: 30,
            shutdown_timeout: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps full variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup };
        let mut config = Self::default();

        if let Some(addr) = vars.parse("BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(mode) = vars.parse("MODE")? {
            config.mode = mode;
        }
        if let Some(url) = vars.get("LLM_BASE_URL") {
            config.model.base_url = url;
        }
        if let Some(model) = vars.get("LLM_MODEL") {
            config.model.model = model;
        }
        if let Some(tokens) = vars.parse("MAX_TOKENS")? {
            config.model.max_tokens = tokens;
        }
        if let Some(duration) = vars.parse::<u32>("DEFAULT_DURATION_MS")? {
            config.model.default_duration_ms = duration;
        }
        if let Some(hz) = vars.parse::<f64>("DECISION_HZ")? {
            vars.check("DECISION_HZ", hz.is_finite() && hz > 0.0, "must be positive")?;
            config.decision_hz = hz;
        }
        if let Some(goal) = vars.get("GOAL") {
            config.goal = goal;
        }

        let mut frame = config.frame;
        if let Some(width) = vars.parse::<u32>("CAPTURE_WIDTH")? {
            vars.check("CAPTURE_WIDTH", width > 0, "must be at least 1")?;
            frame.width = width;
        }
        if let Some(height) = vars.parse::<u32>("CAPTURE_HEIGHT")? {
            vars.check("CAPTURE_HEIGHT", height > 0, "must be at least 1")?;
            frame.height = height;
        }
        if let Some(every) = vars.parse::<u32>("CAPTURE_EVERY_N_FRAMES")? {
            vars.check("CAPTURE_EVERY_N_FRAMES", every > 0, "must be at least 1")?;
            frame.capture_every = every;
        }
        if let Some(quality) = vars.parse::<f32>("JPEG_QUALITY")? {
            vars.check("JPEG_QUALITY", (0.0..=1.0).contains(&quality), "must be in [0, 1]")?;
            frame.quality = quality;
        }
        config.frame = frame.clamped();

        if let Some(workers) = vars.parse::<usize>("ENCODER_WORKERS")? {
            config.encoder_workers = workers.clamp(1, crate::capture::pipeline::MAX_ENCODER_WORKERS);
        }
        if let Some(ticks) = vars.parse::<u32>("STATE_PUSH_EVERY_TICKS")? {
            vars.check("STATE_PUSH_EVERY_TICKS", ticks > 0, "must be at least 1")?;
            config.state_push_every_ticks = ticks;
        }
        if let Some(limit) = vars.parse::<u32>("MAX_ACTIONS_PER_MINUTE")? {
            config.max_actions_per_minute = limit.min(MAX_ACTIONS_PER_MINUTE);
        }
        if let Some(dir) = vars.get("DEBUG_FRAMES_DIR") {
            config.debug_frames_dir = Some(PathBuf::from(dir));
        }
        if let Some(every) = vars.parse::<u32>("DEBUG_SAVE_EVERY_N_FRAMES")? {
            vars.check("DEBUG_SAVE_EVERY_N_FRAMES", every > 0, "must be at least 1")?;
            config.debug_save_every = every;
        }

        Ok(config)
    }
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{}{}", ENV_PREFIX, key)).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
                var: format!("{}{}", ENV_PREFIX, key),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn check(&self, key: &str, ok: bool, reason: &str) -> Result<(), ConfigError> {
        if ok {
            return Ok(());
        }
        Err(ConfigError::Invalid {
            var: format!("{}{}", ENV_PREFIX, key),
            value: self.get(key).unwrap_or_default(),
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<BridgeConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()))
            .collect();
        BridgeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8765");
        assert_eq!(config.mode, OperatingMode::Remote);
        assert_eq!(config.decision_hz, 6.0);
        assert_eq!(config.frame, FrameConfig::default());
        assert_eq!(config.max_actions_per_minute, 1200);
        assert_eq!(config.model.default_duration_ms, 150);
        assert!(config.debug_frames_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MODE", "in_process"),
            ("BIND_ADDR", "0.0.0.0:9000"),
            ("DECISION_HZ", "2.5"),
            ("CAPTURE_WIDTH", "854"),
            ("CAPTURE_HEIGHT", "480"),
            ("CAPTURE_EVERY_N_FRAMES", "2"),
            ("JPEG_QUALITY", "0.75"),
            ("ENCODER_WORKERS", "8"),
            ("MAX_ACTIONS_PER_MINUTE", "5000"),
            ("DEBUG_FRAMES_DIR", "/tmp/frames"),
            ("GOAL", "find water"),
        ])
        .unwrap();

        assert_eq!(config.mode, OperatingMode::InProcess);
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.decision_hz, 2.5);
        assert_eq!(config.frame, FrameConfig::new(true, 854, 480, 2, 0.75));
        assert_eq!(config.encoder_workers, 2);
        assert_eq!(config.max_actions_per_minute, 1200);
        assert_eq!(config.debug_frames_dir, Some(PathBuf::from("/tmp/frames")));
        assert_eq!(config.goal, "find water");
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("DECISION_HZ", "fast")]).unwrap_err();
        assert!(err.to_string().contains("VISION_BRIDGE_DECISION_HZ"));

        let err = load(&[("DECISION_HZ", "0")]).unwrap_err();
        assert!(err.to_string().contains("must be positive"));

        assert!(load(&[("JPEG_QUALITY", "1.5")]).is_err());
        assert!(load(&[("MODE", "sideways")]).is_err());
        assert!(load(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(load(&[("CAPTURE_WIDTH", "0")]).is_err());
    }

    #[test]
    fn test_blank_values_ignored() {
        let config = load(&[("GOAL", "  "), ("DECISION_HZ", "")]).unwrap();
        assert_eq!(config.goal, "explore and survive");
        assert_eq!(config.decision_hz, 6.0);
    }
}
