use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Single knob in `[0, 1]`: how much the lane axis takes part in zoom.
    /// Also shortens the idle relaxation half-life of separation offsets.
    pub separation_gain: f32,
    pub time_participation: f32,
    pub separation: SeparationConfig,
    pub glue: GlueConfig,
    pub semantic: SemanticConfig,
    pub transition: TransitionConfig,
    pub simulation: SimulationConfig,
    pub viewport: ViewportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            separation_gain: 0.6,
            time_participation: 1.0,
            separation: SeparationConfig::default(),
            glue: GlueConfig::default(),
            semantic: SemanticConfig::default(),
            transition: TransitionConfig::default(),
            simulation: SimulationConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeparationConfig {
    pub push_gain: f32,
    pub max_step: f32,
    pub accel_threshold_px: f32,
    pub accel_power: f32,
    pub max_accel: f32,
    pub shrink_rate: f32,
    pub max_shrink_per_frame: f32,
    pub max_radius: f32,
    /// Pixels per separation unit at scale 1.
    pub unit_px: f32,
    pub locality_radius_px: f32,
    pub radius_zoom_exponent: f32,
    pub home_scale: f32,
    pub home_band: f32,
    pub idle_delay_secs: f32,
    pub idle_half_life_secs: f32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            push_gain: 1.2,
            max_step: 0.25,
            accel_threshold_px: 28.0,
            accel_power: 3.0,
            max_accel: 40.0,
            shrink_rate: 1.6,
            max_shrink_per_frame: 0.12,
            max_radius: 3.0,
            unit_px: 40.0,
            locality_radius_px: 320.0,
            radius_zoom_exponent: 0.5,
            home_scale: 1.0,
            home_band: 0.08,
            idle_delay_secs: 1.2,
            idle_half_life_secs: 2.5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlueConfig {
    /// Drift (px) below which a gesture-end correction is discarded; scaled
    /// by `1 + separation_gain`.
    pub commit_epsilon_px: f32,
    pub freeze_vertical_at_zero_gain: bool,
    /// Wheel input has no end event; this much silence ends the gesture.
    pub wheel_idle_secs: f32,
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            commit_epsilon_px: 0.75,
            freeze_vertical_at_zero_gain: true,
            wheel_idle_secs: 0.15,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    pub drill_in_scale: f32,
    pub drill_out_scale: f32,
    pub detail_reset_scale: f32,
    pub reach_factor: f32,
    pub reach_margin_px: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            drill_in_scale: 1.8,
            drill_out_scale: 0.45,
            detail_reset_scale: 0.8,
            reach_factor: 2.5,
            reach_margin_px: 100.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransitionConfig {
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    pub live_alpha: f32,
    pub live_timeout_secs: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fade_in_secs: 0.45,
            fade_out_secs: 0.35,
            live_alpha: 0.8,
            live_timeout_secs: 6.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub repulsion: f32,
    pub softening: f32,
    pub collision_strength: f32,
    pub collision_padding: f32,
    pub link_strength: f32,
    pub link_distance: f32,
    pub center_strength: f32,
    pub radial_strength: f32,
    pub radial_spacing: f32,
    pub timeline_strength: f32,
    pub velocity_decay: f32,
    pub alpha_decay: f32,
    pub alpha_min: f32,
    pub settle_alpha: f32,
    pub max_settle_iterations: usize,
    pub max_speed: f32,
    pub paper_radius_unit: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            repulsion: 2400.0,
            softening: 100.0,
            collision_strength: 0.6,
            collision_padding: 1.2,
            link_strength: 0.04,
            link_distance: 70.0,
            center_strength: 0.02,
            radial_strength: 0.03,
            radial_spacing: 34.0,
            timeline_strength: 0.25,
            velocity_decay: 0.4,
            alpha_decay: 1.0 - 0.001_f32.powf(1.0 / 300.0),
            alpha_min: 0.001,
            settle_alpha: 0.02,
            max_settle_iterations: 300,
            max_speed: 40.0,
            paper_radius_unit: 7.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    pub timeline_width: f32,
    pub lane_spacing: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.2,
            max_scale: 12.0,
            timeline_width: 1600.0,
            lane_spacing: 90.0,
        }
    }
}

impl EngineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded engine config");
        Ok(config.sanitized())
    }

    pub fn with_separation_gain(mut self, gain: f32) -> Self {
        self.separation_gain = gain;
        self.sanitized()
    }

    fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.separation_gain) || !self.separation_gain.is_finite() {
            tracing::warn!(
                gain = self.separation_gain,
                "separation gain outside [0, 1], clamping"
            );
            self.separation_gain = if self.separation_gain.is_finite() {
                self.separation_gain.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        self.time_participation = self.time_participation.clamp(0.0, 1.0);
        self.viewport.min_scale = self.viewport.min_scale.max(0.01);
        self.viewport.max_scale = self.viewport.max_scale.max(self.viewport.min_scale);
        self
    }
}
