//! # Pipeline Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an
//! empty file is a valid configuration.
//!
//! ```toml
//! effects_mode = "display_always"
//! fps_limiting = true
//! handshake_timeout_ms = 33
//! clear_color = [0.0, 0.0, 0.0, 1.0]
//! fatal_policy = "propagate"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Whether paused cores keep presenting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectsMode {
    /// Stop presenting while the core is paused.
    #[default]
    ReflectPaused,
    /// Keep running the filter chain on the last frame while paused.
    DisplayAlways,
}

/// What happens when a GPU resource cannot be created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalErrorPolicy {
    /// Log at error level and abort the process.
    #[default]
    Abort,
    /// Return the error to the caller ("device unsupported").
    Propagate,
}

/// Sampling used by the passthrough filter chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Sharp pixels.
    #[default]
    Nearest,
    /// Smoothed pixels.
    Linear,
}

/// Presentation pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Behavior while the core is paused.
    pub effects_mode: EffectsMode,
    /// Initial FPS limiting state of the renderer.
    pub fps_limiting: bool,
    /// Bound on waiting for an alternate-thread frame (milliseconds).
    pub handshake_timeout_ms: u64,
    /// Clear color of the final pass (RGBA, 0..=1).
    pub clear_color: [f64; 4],
    /// Reaction to resource creation failures.
    pub fatal_policy: FatalErrorPolicy,
    /// Legacy renderers draw into a private framebuffer first.
    pub double_buffered: bool,
    /// Initial backing scale factor of the display layer.
    pub backing_scale_factor: f64,
    /// Skips between two skip summary log lines.
    pub skip_log_interval: u64,
    /// Request variable-refresh presentation.
    pub adaptive_sync: bool,
    /// Passthrough filter sampling.
    pub filter_mode: FilterMode,
    /// Passthrough filter snaps to whole multiples of the source size.
    pub integer_scaling: bool,
    /// Capacity of the display event channel.
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            effects_mode: EffectsMode::ReflectPaused,
            fps_limiting: true,
            handshake_timeout_ms: 50, // three 60 Hz intervals
            clear_color: [0.0, 0.0, 0.0, 1.0],
            fatal_policy: FatalErrorPolicy::Abort,
            double_buffered: false,
            backing_scale_factor: 1.0,
            skip_log_interval: 120, // two seconds of skips at 60 Hz
            adaptive_sync: false,
            filter_mode: FilterMode::Nearest,
            integer_scaling: false,
            event_capacity: 64,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] on syntax errors or
    /// out-of-range values.
    pub fn from_toml_str(source: &str) -> PipelineResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the file cannot be read
    /// or does not parse.
    pub fn load(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if serialization fails.
    pub fn to_toml_string(&self) -> PipelineResult<String> {
        toml::to_string(self).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.handshake_timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "handshake_timeout_ms must be positive".into(),
            ));
        }
        if !(self.backing_scale_factor.is_finite() && self.backing_scale_factor > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "backing_scale_factor must be positive, got {}",
                self.backing_scale_factor
            )));
        }
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(PipelineError::InvalidConfig(format!(
                "clear_color components must be within 0..=1, got {:?}",
                self.clear_color
            )));
        }
        if self.event_capacity == 0 {
            return Err(PipelineError::InvalidConfig(
                "event_capacity must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Handshake wait bound as a duration.
    #[inline]
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Builder: sets the fatal error policy.
    #[must_use]
    pub const fn with_fatal_policy(mut self, policy: FatalErrorPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    /// Builder: sets the effects mode.
    #[must_use]
    pub const fn with_effects_mode(mut self, mode: EffectsMode) -> Self {
        self.effects_mode = mode;
        self
    }

    /// Builder: enables or disables legacy double buffering.
    #[must_use]
    pub const fn with_double_buffering(mut self, enabled: bool) -> Self {
        self.double_buffered = enabled;
        self
    }

    /// Builder: sets the handshake timeout.
    #[must_use]
    pub const fn with_handshake_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.handshake_timeout_ms = timeout_ms;
        self
    }
}
