//! # Solar Thermal Simulation
//!
//! Physics and control core of a solar water-heating loop.
//!
//! ## Components
//!
//! - **Environment**: Daily irradiance and ambient temperature cycle
//! - **Collector**: Lumped-mass flat-plate collector energy balance
//! - **Tank**: Ten-layer stratified storage tank
//! - **Pump**: Differential hysteresis controller with manual override
//! - **Orchestrator**: Fixed-order tick, clock, energy accounting and history
//!
//! ## Usage
//!
//! ```rust
//! use solar_thermal_sim::simulation::{SimulationConfig, SimulationOrchestrator};
//!
//! let mut sim = SimulationOrchestrator::new(SimulationConfig::default());
//! sim.set_speed(600.0);
//!
//! // One tick covers speed × tick interval of simulated time
//! for _ in 0..100 {
//!     sim.tick();
//! }
//!
//! let snapshot = sim.snapshot(false);
//! println!("{} collector {:.1} °C", snapshot.time_label, snapshot.collector_temp_c);
//! ```

pub mod collector;
pub mod environment;
pub mod orchestrator;
pub mod pump;
pub mod tank;

pub use collector::{CollectorConfig, SolarCollector, MAX_TRANSFER_FRACTION_PER_TICK};
pub use environment::{wrap_hours, EnvironmentConfig, EnvironmentalConditions, HOURS_PER_DAY};
pub use orchestrator::{
    clamp_speed, format_time_of_day, HistorySample, SimulationConfig, SimulationOrchestrator,
    SimulationSnapshot, TickOutcome, JOULES_PER_KWH, MAX_SPEED, MIN_SPEED,
};
pub use pump::{ControlMode, Pump, PumpConfig, PumpState};
pub use tank::{TankConfig, ThermalStorageTank, INJECTION_LAYER, LAYER_COUNT};
