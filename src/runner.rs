//! # Simulation Runner
//!
//! Drives the orchestrator on a fixed real-time cadence inside one tokio
//! task. The task is the only owner of simulation state: control commands
//! arrive over an mpsc channel and are applied between ticks, and every
//! tick or command publishes a fresh snapshot on a watch channel. Ticks can
//! never overlap because a single loop runs them in sequence.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;
use crate::error::{Result, SimError};
use crate::simulation::{SimulationConfig, SimulationOrchestrator, SimulationSnapshot};

const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Control operations accepted by the runner
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    SetSpeed(f64),
    ToggleAutomaticControl,
    ToggleManualPump,
}

/// Cloneable front end used by the presentation layer
#[derive(Clone)]
pub struct SimulationHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SimulationSnapshot>,
}

impl SimulationHandle {
    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    /// Request a new speed multiplier; the runner clamps it to [1, 1000]
    pub async fn set_speed(&self, multiplier: f64) -> Result<()> {
        self.send(Command::SetSpeed(multiplier)).await
    }

    pub async fn toggle_automatic_control(&self) -> Result<()> {
        self.send(Command::ToggleAutomaticControl).await
    }

    /// Flip the pump by hand; ignored unless automatic control is off
    pub async fn toggle_manual_pump(&self) -> Result<()> {
        self.send(Command::ToggleManualPump).await
    }

    /// Latest published state
    pub fn snapshot(&self) -> SimulationSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SimulationSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| {
            warn!(?command, "control command dropped, runner is gone");
            SimError::RunnerStopped
        })
    }
}

/// Owns the orchestrator and its tick loop
pub struct SimulationRunner {
    orchestrator: SimulationOrchestrator,
    config: RunnerConfig,
    running: bool,
    ticks: u64,
    commands: mpsc::Receiver<Command>,
    publisher: watch::Sender<SimulationSnapshot>,
}

impl SimulationRunner {
    pub fn new(sim_config: SimulationConfig, config: RunnerConfig) -> (Self, SimulationHandle) {
        let orchestrator = SimulationOrchestrator::new(sim_config);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (publisher, snapshots) = watch::channel(orchestrator.snapshot(false));

        let runner = Self {
            orchestrator,
            running: false,
            ticks: 0,
            commands: command_rx,
            publisher,
            config,
        };
        let handle = SimulationHandle {
            commands: command_tx,
            snapshots,
        };
        (runner, handle)
    }

    /// Run until every handle has been dropped
    pub async fn run(mut self) {
        let period = Duration::try_from_secs_f64(self.orchestrator.config().tick_interval_s)
            .ok()
            .filter(|period| !period.is_zero())
            .unwrap_or(DEFAULT_TICK_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if self.config.autostart {
            self.apply(Command::Start);
            interval.reset();
        }
        info!(
            tick_interval_ms = period.as_millis() as u64,
            speed = self.orchestrator.speed_multiplier(),
            running = self.running,
            "simulation runner started"
        );

        loop {
            tokio::select! {
                _ = interval.tick(), if self.running => self.tick(),
                command = self.commands.recv() => match command {
                    Some(command) => {
                        let was_running = self.running;
                        self.apply(command);
                        if self.running && !was_running {
                            // First tick lands one full period after start
                            interval.reset();
                        }
                    }
                    None => break,
                },
            }
        }

        info!(
            ticks = self.ticks,
            elapsed_simulated_s = self.orchestrator.elapsed_simulated_s(),
            energy_collected_kwh = self.orchestrator.energy_collected_kwh(),
            "simulation runner stopped"
        );
    }

    fn tick(&mut self) {
        self.orchestrator.tick();
        self.ticks += 1;

        if self.config.log_every_ticks > 0 && self.ticks % self.config.log_every_ticks == 0 {
            let snapshot = self.orchestrator.snapshot(self.running);
            info!(
                time_of_day = %snapshot.time_label,
                collector_temp_c = snapshot.collector_temp_c,
                tank_top_temp_c = snapshot.tank_top_temp_c,
                tank_bottom_temp_c = snapshot.tank_bottom_temp_c,
                pump = %snapshot.pump_state,
                energy_collected_kwh = snapshot.energy_collected_kwh,
                "simulation status"
            );
        }
        self.publish();
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start => {
                if !self.running {
                    self.running = true;
                    info!("simulation started");
                }
            }
            Command::Pause => {
                if self.running {
                    self.running = false;
                    info!("simulation paused");
                }
            }
            Command::Reset => {
                self.orchestrator.reset();
                info!("simulation reset");
            }
            Command::SetSpeed(multiplier) => {
                let applied = self.orchestrator.set_speed(multiplier);
                info!(requested = multiplier, applied, "speed changed");
            }
            Command::ToggleAutomaticControl => {
                let mode = self.orchestrator.toggle_automatic_control();
                info!(%mode, "pump control mode changed");
            }
            Command::ToggleManualPump => match self.orchestrator.toggle_manual_pump() {
                Some(state) => info!(pump = %state, "pump toggled manually"),
                None => debug!("manual pump toggle ignored under automatic control"),
            },
        }
        self.publish();
    }

    fn publish(&self) {
        // send_replace never fails, even with no receivers left
        self.publisher.send_replace(self.orchestrator.snapshot(self.running));
    }
}

/// Spawn a runner task and return its control handle
pub fn spawn_simulation(
    sim_config: SimulationConfig,
    config: RunnerConfig,
) -> (SimulationHandle, JoinHandle<()>) {
    let (runner, handle) = SimulationRunner::new(sim_config, config);
    let task = tokio::spawn(runner.run());
    (handle, task)
}
