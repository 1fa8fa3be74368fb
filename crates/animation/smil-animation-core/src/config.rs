//! Workplace configuration.

use serde::{Deserialize, Serialize};

/// Clock and stepping limits for one workplace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkplaceConfig {
    /// Real-time gap between two updates above which the clock is re-anchored
    /// instead of catching up.
    pub lag_threshold_ms: i64,
    /// Document milliseconds per real millisecond.
    pub playback_rate: f64,
    /// Interval boundaries processed per update before jumping to the target time.
    pub max_boundary_steps: usize,
    pub animations_enabled: bool,
    /// Initial capacity for each schedule's instance lists.
    pub instance_capacity_hint: usize,
    /// Lower bound on the re-invocation delay requested from the host.
    pub min_update_interval_ms: i64,
}

impl Default for WorkplaceConfig {
    fn default() -> Self {
        Self {
            lag_threshold_ms: 1000,
            playback_rate: 1.0,
            max_boundary_steps: 10_000,
            animations_enabled: true,
            instance_capacity_hint: 8,
            min_update_interval_ms: 10,
        }
    }
}

impl WorkplaceConfig {
    pub fn from_json(json: &str) -> crate::error::AnimationResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = WorkplaceConfig::from_json(r#"{"playback_rate": 2.0}"#).unwrap();
        assert_eq!(cfg.playback_rate, 2.0);
        assert_eq!(cfg.lag_threshold_ms, 1000);
        assert!(cfg.animations_enabled);
    }
}
