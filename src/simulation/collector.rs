//! # Solar Collector
//!
//! Single lumped thermal mass. Each update absorbs solar gain, exchanges heat
//! with the ambient air, and, while the pump runs, hands heat to the tank
//! inlet.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Maximum share of the collector-to-inlet energy differential
/// (`thermal_capacity · ΔT`) that may leave the collector in one tick.
///
/// Keeps the explicit integration stable at large time steps.
pub const MAX_TRANSFER_FRACTION_PER_TICK: f64 = 0.2;

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CollectorConfig {
    /// Absorber area (m²)
    #[validate(range(min = 0.1, max = 100.0))]
    pub area_m2: f64,
    /// Optical efficiency (0.0-1.0)
    #[validate(range(min = 0.0, max = 1.0))]
    pub efficiency: f64,
    /// Heat loss coefficient to ambient (W/m²K)
    #[validate(range(min = 0.0, max = 50.0))]
    pub heat_loss_coefficient_w_m2k: f64,
    /// Lumped thermal capacity of absorber and fluid (J/K)
    #[validate(range(min = 100.0))]
    pub thermal_capacity_j_k: f64,
    /// Heat transfer rate to the tank per kelvin of differential while pumping (W/K)
    #[validate(range(min = 0.0, max = 10000.0))]
    pub pump_heat_transfer_coefficient_w_k: f64,
    /// Temperature at construction and after reset (°C)
    #[validate(range(min = -50.0, max = 100.0))]
    pub initial_temp_c: f64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            area_m2: 2.0,
            efficiency: 0.75,
            heat_loss_coefficient_w_m2k: 5.0,
            thermal_capacity_j_k: 15_000.0,
            pump_heat_transfer_coefficient_w_k: 200.0,
            initial_temp_c: 20.0,
        }
    }
}

/// Flat-plate collector modelled as one thermal node
#[derive(Debug, Clone)]
pub struct SolarCollector {
    config: CollectorConfig,
    temperature_c: f64,
}

impl SolarCollector {
    pub fn new(config: CollectorConfig) -> Self {
        let temperature_c = config.initial_temp_c;
        Self {
            config,
            temperature_c,
        }
    }

    /// Create with an explicit starting temperature, overriding the config
    pub fn with_temperature(mut config: CollectorConfig, temperature_c: f64) -> Self {
        config.initial_temp_c = temperature_c;
        Self::new(config)
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn temperature_c(&self) -> f64 {
        self.temperature_c
    }

    /// Restore the initial temperature
    pub fn reset(&mut self) {
        self.temperature_c = self.config.initial_temp_c;
    }

    /// Heat the collector can hand to an inlet at `tank_inlet_temp_c` over `dt_seconds`
    ///
    /// Zero unless the collector is strictly hotter than the inlet, so heat
    /// only ever flows collector → tank.
    pub fn available_transfer_j(&self, dt_seconds: f64, tank_inlet_temp_c: f64) -> f64 {
        let delta = self.temperature_c - tank_inlet_temp_c;
        if delta <= 0.0 {
            return 0.0;
        }

        let candidate = self.config.pump_heat_transfer_coefficient_w_k * delta * dt_seconds;
        let ceiling = self.config.thermal_capacity_j_k * delta * MAX_TRANSFER_FRACTION_PER_TICK;
        candidate.min(ceiling).max(0.0)
    }

    /// Advance the collector by one time step
    ///
    /// # Arguments
    /// * `dt_seconds` - Time step in seconds
    /// * `irradiance_w_m2` - Incident solar irradiance
    /// * `ambient_temp_c` - Surrounding air temperature
    /// * `pump_on` - Whether fluid is circulating to the tank
    /// * `tank_inlet_temp_c` - Temperature of the returning tank water
    ///
    /// # Returns
    /// Heat delivered to the tank during this step (J)
    pub fn update(
        &mut self,
        dt_seconds: f64,
        irradiance_w_m2: f64,
        ambient_temp_c: f64,
        pump_on: bool,
        tank_inlet_temp_c: f64,
    ) -> f64 {
        let solar_gain_w = irradiance_w_m2 * self.config.area_m2 * self.config.efficiency;
        // Negative when the air is warmer than the absorber
        let heat_loss_w = self.config.heat_loss_coefficient_w_m2k
            * self.config.area_m2
            * (self.temperature_c - ambient_temp_c);

        let delivered_j = if pump_on {
            self.available_transfer_j(dt_seconds, tank_inlet_temp_c)
        } else {
            0.0
        };

        let net_energy_j = (solar_gain_w - heat_loss_w) * dt_seconds - delivered_j;
        self.temperature_c += net_energy_j / self.config.thermal_capacity_j_k;
        self.temperature_c = self.temperature_c.max(ambient_temp_c);

        delivered_j
    }

    /// Temperature at which solar gain balances ambient loss with no extraction
    pub fn stagnation_temp_c(&self, irradiance_w_m2: f64, ambient_temp_c: f64) -> f64 {
        if self.config.heat_loss_coefficient_w_m2k <= 0.0 {
            return f64::INFINITY;
        }
        ambient_temp_c + irradiance_w_m2 * self.config.efficiency / self.config.heat_loss_coefficient_w_m2k
    }
}

impl Default for SolarCollector {
    fn default() -> Self {
        Self::new(CollectorConfig::default())
    }
}
