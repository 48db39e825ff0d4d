use anyhow::Result;
use solar_thermal_sim::{config, runner, telemetry};
use config::Config;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;
    init_tracing(&cfg.telemetry);

    let requested = cfg.simulation.initial_speed;
    let applied = match cfg.simulation.clamped_initial_speed() {
        Some(applied) => {
            warn!(requested, applied, "initial speed outside the supported range, clamping");
            applied
        }
        None => requested,
    };

    info!(
        start_hour = cfg.simulation.start_hour,
        tick_interval_s = cfg.simulation.tick_interval_s,
        speed = applied,
        "starting solar thermal simulator"
    );

    let (handle, task) = runner::spawn_simulation(cfg.simulation.clone(), cfg.runner.clone());

    let received = telemetry::shutdown_signal().await?;
    info!(signal = %received, "shutdown signal received, pausing simulation");

    let mut updates = handle.subscribe();
    handle.pause().await?;
    let mut summary = updates.wait_for(|snapshot| !snapshot.running).await?.clone();
    summary.history.clear();
    println!("{}", serde_json::to_string_pretty(&summary)?);

    drop(handle);
    task.await?;

    warn!("shutdown complete");
    Ok(())
}
