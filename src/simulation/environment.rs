//! # Environmental Forcing
//!
//! Stateless daily cycle that drives the collector and the tank: solar
//! irradiance as a half-sine between sunrise and sunset, and ambient air
//! temperature as a cosine wave with its minimum at 03:00 and its maximum at
//! 15:00.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use validator::{Validate, ValidationError};

/// Hour of the daily ambient minimum. The maximum follows twelve hours later.
pub const AMBIENT_MIN_HOUR: f64 = 3.0;

/// Hours in one simulated day
pub const HOURS_PER_DAY: f64 = 24.0;

/// Environmental model configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_daily_cycle"))]
pub struct EnvironmentConfig {
    /// Peak irradiance at solar noon (W/m²)
    #[validate(range(min = 0.0, max = 1500.0))]
    pub max_irradiance_w_m2: f64,
    /// Hour of sunrise (0-24)
    #[validate(range(min = 0.0, max = 24.0))]
    pub sunrise_hour: f64,
    /// Hour of sunset (0-24, must be after sunrise)
    #[validate(range(min = 0.0, max = 24.0))]
    pub sunset_hour: f64,
    /// Daily minimum ambient temperature (°C)
    #[validate(range(min = -50.0, max = 60.0))]
    pub min_ambient_temp_c: f64,
    /// Daily maximum ambient temperature (°C)
    #[validate(range(min = -50.0, max = 60.0))]
    pub max_ambient_temp_c: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            max_irradiance_w_m2: 1000.0,
            sunrise_hour: 6.0,
            sunset_hour: 18.0,
            min_ambient_temp_c: 15.0,
            max_ambient_temp_c: 25.0,
        }
    }
}

fn validate_daily_cycle(config: &EnvironmentConfig) -> Result<(), ValidationError> {
    if config.sunset_hour <= config.sunrise_hour {
        return Err(ValidationError::new("sunset_not_after_sunrise"));
    }
    if config.max_ambient_temp_c < config.min_ambient_temp_c {
        return Err(ValidationError::new("ambient_range_inverted"));
    }
    Ok(())
}

/// Wrap any real hour value into [0, 24)
pub fn wrap_hours(time_in_hours: f64) -> f64 {
    let wrapped = time_in_hours.rem_euclid(HOURS_PER_DAY);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs
    if wrapped >= HOURS_PER_DAY {
        0.0
    } else {
        wrapped
    }
}

/// Clear-sky daily cycle of irradiance and ambient temperature
#[derive(Debug, Clone)]
pub struct EnvironmentalConditions {
    config: EnvironmentConfig,
}

impl EnvironmentalConditions {
    pub fn new(config: EnvironmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Solar irradiance in W/m² at the given time of day
    ///
    /// Zero outside the daylight window, a half-sine peaking at solar noon
    /// inside it.
    pub fn irradiance(&self, time_in_hours: f64) -> f64 {
        let t = wrap_hours(time_in_hours);
        let sunrise = self.config.sunrise_hour;
        let sunset = self.config.sunset_hour;

        if sunset <= sunrise || t < sunrise || t > sunset {
            return 0.0;
        }

        let day_fraction = (t - sunrise) / (sunset - sunrise);
        (self.config.max_irradiance_w_m2 * (PI * day_fraction).sin()).max(0.0)
    }

    /// Ambient air temperature in °C at the given time of day
    pub fn ambient_temp_c(&self, time_in_hours: f64) -> f64 {
        let t = wrap_hours(time_in_hours);
        let midpoint = (self.config.min_ambient_temp_c + self.config.max_ambient_temp_c) / 2.0;
        let amplitude = (self.config.max_ambient_temp_c - self.config.min_ambient_temp_c) / 2.0;

        midpoint - amplitude * (2.0 * PI * (t - AMBIENT_MIN_HOUR) / HOURS_PER_DAY).cos()
    }

    /// Whether the sun is up at the given time of day
    pub fn is_daylight(&self, time_in_hours: f64) -> bool {
        let t = wrap_hours(time_in_hours);
        t >= self.config.sunrise_hour && t <= self.config.sunset_hour
    }
}

impl Default for EnvironmentalConditions {
    fn default() -> Self {
        Self::new(EnvironmentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(3.0)]
    #[case(5.99)]
    #[case(18.01)]
    #[case(23.5)]
    #[case(-1.0)]
    #[case(30.0)]
    fn test_no_irradiance_at_night(#[case] hour: f64) {
        let env = EnvironmentalConditions::default();
        assert_eq!(env.irradiance(hour), 0.0);
    }

    #[test]
    fn test_irradiance_peaks_at_solar_noon() {
        let env = EnvironmentalConditions::default();

        assert!((env.irradiance(12.0) - 1000.0).abs() < 1e-9);
        assert!(env.irradiance(9.0) < env.irradiance(12.0));
        assert!((env.irradiance(9.0) - env.irradiance(15.0)).abs() < 1e-9);
    }

    #[test]
    fn test_irradiance_zero_at_window_edges() {
        let env = EnvironmentalConditions::default();

        assert_eq!(env.irradiance(6.0), 0.0);
        assert!(env.irradiance(18.0) >= 0.0);
        assert!(env.irradiance(18.0) < 1e-9);
    }

    #[test]
    fn test_ambient_extremes() {
        let env = EnvironmentalConditions::default();

        assert!((env.ambient_temp_c(3.0) - 15.0).abs() < 1e-9);
        assert!((env.ambient_temp_c(15.0) - 25.0).abs() < 1e-9);
        assert!((env.ambient_temp_c(27.0) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_hours() {
        assert_eq!(wrap_hours(25.5), 1.5);
        assert_eq!(wrap_hours(-1.0), 23.0);
        assert_eq!(wrap_hours(24.0), 0.0);
        assert!(wrap_hours(-1e-18) < HOURS_PER_DAY);
    }

    #[test]
    fn test_daylight_window() {
        let env = EnvironmentalConditions::default();

        assert!(!env.is_daylight(5.0));
        assert!(env.is_daylight(12.0));
        assert!(!env.is_daylight(19.0));
    }

    #[test]
    fn test_daily_cycle_validation() {
        let config = EnvironmentConfig {
            sunrise_hour: 19.0,
            ..Default::default()
        };

        assert!(config.validate().is_err());
        assert!(EnvironmentConfig::default().validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_irradiance_non_negative(hour in -100.0f64..100.0) {
            let env = EnvironmentalConditions::default();
            prop_assert!(env.irradiance(hour) >= 0.0);
        }

        #[test]
        fn prop_ambient_within_bounds(hour in -100.0f64..100.0) {
            let env = EnvironmentalConditions::default();
            let temp = env.ambient_temp_c(hour);
            prop_assert!(temp >= 15.0 - 1e-9 && temp <= 25.0 + 1e-9);
        }
    }
}
