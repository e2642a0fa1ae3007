//! Headless airfoil run
//!
//! Steps the default wind tunnel for a number of frames and logs speed
//! statistics. Uses the GPU when an adapter is available and falls back to
//! the CPU backend otherwise.
//!
//! ```sh
//! RUST_LOG=info cargo run --example headless_airfoil
//! ```

use anyhow::{Context, Result};
use flowlab::prelude::*;

const FRAMES: u32 = 60;
const REPORT_EVERY: u32 = 20;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = EngineConfig::default().with_substeps(8).snapped_to_ui();

    match pollster::block_on(WgpuBackend::request()) {
        Ok(backend) => run(backend, &config),
        Err(err) => {
            log::warn!("no usable GPU ({}), falling back to the CPU backend", err);
            run(CpuBackend::new(), &config)
        }
    }
}

fn run<B: LatticeBackend>(backend: B, config: &EngineConfig) -> Result<()> {
    let engine = SteppingEngine::new(backend, config).context("failed to build engine")?;
    let mut host = SimulationHost::new(engine);

    let solid = host
        .engine()
        .read_solid_mask()?
        .into_iter()
        .filter(|s| *s)
        .count();
    log::info!(
        "{} lattice, {} solid cells, inlet speed {:.4}",
        host.engine().mesh(),
        solid,
        host.engine().params().inlet_speed()
    );

    for frame in 1..=FRAMES {
        host.tick();
        if frame % REPORT_EVERY == 0 {
            report(&host, frame)?;
        }
    }
    Ok(())
}

fn report<B: LatticeBackend>(host: &SimulationHost<B>, frame: u32) -> Result<()> {
    let speed = host.engine().read_speed()?;
    let finite: Vec<f32> = speed.iter().copied().filter(|s| s.is_finite()).collect();
    anyhow::ensure!(
        finite.len() == speed.len(),
        "{} non-finite speed values at step {}",
        speed.len() - finite.len(),
        host.engine().step_index()
    );

    let max = finite.iter().copied().fold(0.0f32, f32::max);
    let mean = finite.iter().sum::<f32>() / finite.len().max(1) as f32;
    log::info!(
        "frame {:>3} step {:>5}: mean |u| {:.5}, max |u| {:.5}",
        frame,
        host.engine().step_index(),
        mean,
        max
    );
    Ok(())
}
