//! # Differential Pump Controller
//!
//! Hysteresis on/off control driven by the collector-to-tank-bottom
//! temperature difference. Two thresholds plus minimum dwell times in each
//! state prevent short-cycling when the differential hovers near a setpoint.
//! Automatic control can be switched off and the pump toggled by hand.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::{Validate, ValidationError};

/// Initial dwell time, larger than any permitted minimum on/off time, so the
/// first automatic decision is never blocked
pub const DWELL_SENTINEL_SECONDS: f64 = 1.0e9;

/// Pump running state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum PumpState {
    Off,
    On,
}

impl PumpState {
    pub fn is_on(self) -> bool {
        matches!(self, PumpState::On)
    }
}

/// Who decides the pump state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ControlMode {
    Automatic,
    Manual,
}

/// Pump controller configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_hysteresis_gap"))]
pub struct PumpConfig {
    /// Collector-minus-tank-bottom difference that starts the pump (K)
    #[validate(range(min = 0.0, max = 50.0))]
    pub turn_on_delta_c: f64,
    /// Collector-minus-tank-bottom difference that stops the pump (K)
    #[validate(range(min = -10.0, max = 50.0))]
    pub turn_off_delta_c: f64,
    /// Shortest allowed run (s)
    #[validate(range(min = 0.0, max = 86400.0))]
    pub minimum_on_time_s: f64,
    /// Shortest allowed rest (s)
    #[validate(range(min = 0.0, max = 86400.0))]
    pub minimum_off_time_s: f64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            turn_on_delta_c: 8.0,
            turn_off_delta_c: 3.0,
            minimum_on_time_s: 300.0,
            minimum_off_time_s: 300.0,
        }
    }
}

fn validate_hysteresis_gap(config: &PumpConfig) -> Result<(), ValidationError> {
    if config.turn_off_delta_c >= config.turn_on_delta_c {
        return Err(ValidationError::new("turn_off_delta_not_below_turn_on_delta"));
    }
    Ok(())
}

/// Circulation pump with hysteresis controller
#[derive(Debug, Clone)]
pub struct Pump {
    config: PumpConfig,
    state: PumpState,
    automatic_control: bool,
    time_in_current_state_s: f64,
    on_cycles: u64,
}

impl Pump {
    pub fn new(config: PumpConfig) -> Self {
        Self {
            config,
            state: PumpState::Off,
            automatic_control: true,
            time_in_current_state_s: DWELL_SENTINEL_SECONDS,
            on_cycles: 0,
        }
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    pub fn state(&self) -> PumpState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state.is_on()
    }

    pub fn automatic_control(&self) -> bool {
        self.automatic_control
    }

    pub fn mode(&self) -> ControlMode {
        if self.automatic_control {
            ControlMode::Automatic
        } else {
            ControlMode::Manual
        }
    }

    pub fn time_in_current_state_s(&self) -> f64 {
        self.time_in_current_state_s
    }

    /// Number of times the pump has been switched on, by either mode
    pub fn on_cycles(&self) -> u64 {
        self.on_cycles
    }

    /// Return to the power-on state: off, automatic, dwell unblocked
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    /// Evaluate the automatic controller
    ///
    /// Does nothing while automatic control is disabled.
    ///
    /// # Returns
    /// The new state if a transition happened
    pub fn update(
        &mut self,
        dt_seconds: f64,
        collector_temp_c: f64,
        tank_bottom_temp_c: f64,
    ) -> Option<PumpState> {
        if !self.automatic_control {
            return None;
        }

        let differential = collector_temp_c - tank_bottom_temp_c;
        let next = match self.state {
            PumpState::Off
                if differential >= self.config.turn_on_delta_c
                    && self.time_in_current_state_s >= self.config.minimum_off_time_s =>
            {
                Some(PumpState::On)
            }
            PumpState::On
                if differential <= self.config.turn_off_delta_c
                    && self.time_in_current_state_s >= self.config.minimum_on_time_s =>
            {
                Some(PumpState::Off)
            }
            _ => None,
        };

        match next {
            Some(state) => {
                self.enter(state);
                self.time_in_current_state_s = 0.0;
            }
            None => self.time_in_current_state_s += dt_seconds,
        }
        next
    }

    /// Flip between automatic and manual control
    pub fn toggle_automatic_control(&mut self) -> ControlMode {
        self.automatic_control = !self.automatic_control;
        self.mode()
    }

    /// Flip the pump by hand. Ignored while automatic control is enabled.
    ///
    /// # Returns
    /// The new state if the toggle took effect
    pub fn toggle_manual(&mut self) -> Option<PumpState> {
        if self.automatic_control {
            return None;
        }
        let next = match self.state {
            PumpState::Off => PumpState::On,
            PumpState::On => PumpState::Off,
        };
        self.enter(next);
        Some(next)
    }

    fn enter(&mut self, state: PumpState) {
        if state == PumpState::On && self.state == PumpState::Off {
            self.on_cycles += 1;
        }
        self.state = state;
    }
}

impl Default for Pump {
    fn default() -> Self {
        Self::new(PumpConfig::default())
    }
}
