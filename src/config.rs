use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::geometry::RegionLimits;
use crate::pipeline::SchedulerConfig;

const ENV_PREFIX: &str = "LENS";

/// Session tunables. Durations are plain seconds so they can come from a file
/// or an environment variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub detection_interval_secs: f64,
    pub frame_throttle_interval_secs: f64,
    pub confidence_threshold: f32,
    pub required_stable_count: usize,
    pub max_limited_tracking_secs: f64,
    pub min_region_size: f64,
    pub edge_margin: f64,
    pub initial_region_fraction: f64,
    pub permission_retry_secs: f64,
    pub diagnostic_interval_secs: f64,
    pub command_buffer_size: usize,
    pub event_buffer_size: usize,
    pub intent_buffer_size: usize,
    pub source_language: String,
    pub target_language: String,
    pub auto_speak: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            detection_interval_secs: 0.0,
            frame_throttle_interval_secs: 0.5,
            confidence_threshold: 0.5,
            required_stable_count: 10,
            max_limited_tracking_secs: 3.0,
            min_region_size: 100.0,
            edge_margin: 16.0,
            initial_region_fraction: 0.6,
            permission_retry_secs: 1.0,
            diagnostic_interval_secs: 5.0,
            command_buffer_size: 32,
            event_buffer_size: 64,
            intent_buffer_size: 16,
            source_language: "en".to_string(),
            target_language: "es".to_string(),
            auto_speak: false,
        }
    }
}

impl Configuration {
    /// Defaults, overlaid by `path` (format from its extension) and then by
    /// `LENS_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("detection_interval_secs", self.detection_interval_secs),
            ("frame_throttle_interval_secs", self.frame_throttle_interval_secs),
            ("max_limited_tracking_secs", self.max_limited_tracking_secs),
            ("permission_retry_secs", self.permission_retry_secs),
            ("diagnostic_interval_secs", self.diagnostic_interval_secs),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{name} must be a non-negative number of seconds")));
            }
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(invalid(format!("{name} is too large to be a duration")));
            }
        }
        if self.permission_retry_secs == 0.0 {
            return Err(invalid("permission_retry_secs must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(invalid("confidence_threshold must be between 0.0 and 1.0"));
        }
        if self.required_stable_count == 0 {
            return Err(invalid("required_stable_count must be greater than 0"));
        }
        if !(self.min_region_size.is_finite() && self.min_region_size > 0.0) {
            return Err(invalid("min_region_size must be greater than 0"));
        }
        if !(self.edge_margin.is_finite() && self.edge_margin >= 0.0) {
            return Err(invalid("edge_margin must not be negative"));
        }
        if !(self.initial_region_fraction > 0.0 && self.initial_region_fraction <= 1.0) {
            return Err(invalid("initial_region_fraction must be in (0.0, 1.0]"));
        }
        if self.command_buffer_size == 0
            || self.event_buffer_size == 0
            || self.intent_buffer_size == 0
        {
            return Err(invalid("channel buffer sizes must be greater than 0"));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(invalid("source and target languages must be set"));
        }

        Ok(())
    }

    pub fn frame_throttle_interval(&self) -> Duration {
        seconds(self.frame_throttle_interval_secs)
    }

    pub fn detection_interval(&self) -> Duration {
        seconds(self.detection_interval_secs)
    }

    pub fn max_limited_tracking(&self) -> Duration {
        seconds(self.max_limited_tracking_secs)
    }

    pub fn permission_retry_interval(&self) -> Duration {
        seconds(self.permission_retry_secs)
    }

    pub fn diagnostic_interval(&self) -> Duration {
        seconds(self.diagnostic_interval_secs)
    }

    pub fn region_limits(&self) -> RegionLimits {
        RegionLimits {
            min_size: self.min_region_size,
            margin: self.edge_margin,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            frame_throttle: self.frame_throttle_interval(),
            detection_interval: self.detection_interval(),
            confidence_threshold: self.confidence_threshold,
            required_stable_count: self.required_stable_count,
            min_region_size: self.min_region_size,
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
