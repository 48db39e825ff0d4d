//! # Stratified Storage Tank
//!
//! Ten vertically stacked water layers, index 0 at the bottom. Heat enters
//! at a chosen layer, leaks to ambient through the shell, and rises through
//! an empirically tuned one-directional mixing pass.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Number of layers in the tank
pub const LAYER_COUNT: usize = 10;

/// Layer fed by the collector
pub const INJECTION_LAYER: usize = 0;

/// Shell loss multiplier for the top layer (lid plus wall)
pub const TOP_LAYER_LOSS_FACTOR: f64 = 1.5;

/// Shell loss multiplier for the bottom layer (sits on an insulated base)
pub const BOTTOM_LAYER_LOSS_FACTOR: f64 = 0.8;

/// Tank configuration
///
/// `stratification_iterations` and `stratification_multiplier` are tuned for
/// visible layering, not derived from a physical diffusivity.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_mixing_stability"))]
pub struct TankConfig {
    /// Total water volume (m³)
    #[validate(range(min = 0.01, max = 10.0))]
    pub volume_m3: f64,
    /// Water density (kg/m³)
    #[validate(range(min = 500.0, max = 1500.0))]
    pub water_density_kg_m3: f64,
    /// Specific heat of water (J/kgK)
    #[validate(range(min = 1000.0, max = 10000.0))]
    pub specific_heat_j_kgk: f64,
    /// Shell heat loss coefficient for the whole tank (W/K)
    #[validate(range(min = 0.0, max = 100.0))]
    pub heat_loss_coefficient_w_k: f64,
    /// Fraction of an unstable layer difference mixed per pass, before the multiplier
    #[validate(range(min = 0.0, max = 0.5))]
    pub mixing_coefficient: f64,
    /// Mixing sweeps per tick
    #[validate(range(min = 1, max = 100))]
    pub stratification_iterations: u32,
    /// Amplification applied to the mixing coefficient in each sweep
    #[validate(range(min = 0.0, max = 10.0))]
    pub stratification_multiplier: f64,
    /// Temperature of every layer at construction and after reset (°C)
    #[validate(range(min = -50.0, max = 100.0))]
    pub initial_temp_c: f64,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            volume_m3: 0.2,
            water_density_kg_m3: 1000.0,
            specific_heat_j_kgk: 4186.0,
            heat_loss_coefficient_w_k: 2.0,
            mixing_coefficient: 0.05,
            stratification_iterations: 5,
            stratification_multiplier: 3.0,
            initial_temp_c: 20.0,
        }
    }
}

// A pair moving more than half its difference per sweep would overshoot and invert
fn validate_mixing_stability(config: &TankConfig) -> Result<(), ValidationError> {
    if config.mixing_coefficient * config.stratification_multiplier > 0.5 {
        return Err(ValidationError::new("mixing_overshoot"));
    }
    Ok(())
}

/// Multi-layer thermal storage tank
#[derive(Debug, Clone)]
pub struct ThermalStorageTank {
    config: TankConfig,
    layers_c: [f64; LAYER_COUNT],
    mass_per_layer_kg: f64,
}

impl ThermalStorageTank {
    pub fn new(config: TankConfig) -> Self {
        let mass_per_layer_kg =
            config.volume_m3 * config.water_density_kg_m3 / LAYER_COUNT as f64;
        Self {
            layers_c: [config.initial_temp_c; LAYER_COUNT],
            config,
            mass_per_layer_kg,
        }
    }

    /// Create with every layer at `temperature_c`, overriding the config
    pub fn with_temperature(mut config: TankConfig, temperature_c: f64) -> Self {
        config.initial_temp_c = temperature_c;
        Self::new(config)
    }

    pub fn config(&self) -> &TankConfig {
        &self.config
    }

    pub fn mass_per_layer_kg(&self) -> f64 {
        self.mass_per_layer_kg
    }

    pub fn total_mass_kg(&self) -> f64 {
        self.mass_per_layer_kg * LAYER_COUNT as f64
    }

    /// Return every layer to the initial temperature
    pub fn reset(&mut self) {
        self.layers_c = [self.config.initial_temp_c; LAYER_COUNT];
    }

    /// Inject heat into one layer. Out-of-range indices are ignored.
    pub fn add_heat(&mut self, joules: f64, layer_index: usize) {
        let Some(layer) = self.layers_c.get_mut(layer_index) else {
            return;
        };
        *layer += joules / (self.mass_per_layer_kg * self.config.specific_heat_j_kgk);
    }

    /// Advance the tank by one time step: shell losses, then stratification
    pub fn update(&mut self, dt_seconds: f64, ambient_temp_c: f64) {
        self.apply_heat_loss(dt_seconds, ambient_temp_c);
        self.stratify();
    }

    fn apply_heat_loss(&mut self, dt_seconds: f64, ambient_temp_c: f64) {
        let layer_capacity = self.mass_per_layer_kg * self.config.specific_heat_j_kgk;

        for (index, temp) in self.layers_c.iter_mut().enumerate() {
            let factor = layer_loss_factor(index);
            let loss_w = self.config.heat_loss_coefficient_w_k * factor * (*temp - ambient_temp_c)
                / LAYER_COUNT as f64;
            *temp -= loss_w * dt_seconds / layer_capacity;
            *temp = temp.max(ambient_temp_c);
        }
    }

    // Hot water rises; cold water is never pushed down.
    fn stratify(&mut self) {
        let fraction = self.config.mixing_coefficient * self.config.stratification_multiplier;

        for _ in 0..self.config.stratification_iterations {
            for i in 0..LAYER_COUNT - 1 {
                let lower = self.layers_c[i];
                let upper = self.layers_c[i + 1];
                if lower > upper {
                    let transfer = (lower - upper) * fraction;
                    self.layers_c[i] -= transfer;
                    self.layers_c[i + 1] += transfer;
                }
            }
        }
    }

    pub fn bottom_temp_c(&self) -> f64 {
        self.layers_c[0]
    }

    pub fn top_temp_c(&self) -> f64 {
        self.layers_c[LAYER_COUNT - 1]
    }

    pub fn mean_temp_c(&self) -> f64 {
        self.layers_c.iter().sum::<f64>() / LAYER_COUNT as f64
    }

    pub fn layer_temps_c(&self) -> &[f64; LAYER_COUNT] {
        &self.layers_c
    }

    /// Temperature at a normalized height (0.0 = bottom, 1.0 = top)
    ///
    /// The fraction is clamped and snapped to the nearest layer.
    pub fn temperature_at_height(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let index = (fraction * (LAYER_COUNT - 1) as f64).round() as usize;
        self.layers_c[index.min(LAYER_COUNT - 1)]
    }

    /// Stored energy above ambient (J), never negative
    pub fn thermal_energy_j(&self, ambient_temp_c: f64) -> f64 {
        let energy = self.total_mass_kg()
            * self.config.specific_heat_j_kgk
            * (self.mean_temp_c() - ambient_temp_c);
        energy.max(0.0)
    }

    /// Σ m·cp·T over all layers, relative to 0 °C (J)
    pub fn absolute_heat_content_j(&self) -> f64 {
        self.mass_per_layer_kg * self.config.specific_heat_j_kgk * self.layers_c.iter().sum::<f64>()
    }
}

impl Default for ThermalStorageTank {
    fn default() -> Self {
        Self::new(TankConfig::default())
    }
}

fn layer_loss_factor(index: usize) -> f64 {
    match index {
        0 => BOTTOM_LAYER_LOSS_FACTOR,
        i if i == LAYER_COUNT - 1 => TOP_LAYER_LOSS_FACTOR,
        _ => 1.0,
    }
}
