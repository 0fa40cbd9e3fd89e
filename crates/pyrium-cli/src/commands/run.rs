//! Run command - load a mods directory and drive it with the fallback timer.

use anyhow::{Context, Result};
use clap::Args;
use pyrium_vm_core::MemoryWorld;
use pyrium_vm_runtime::{PyriumRuntime, RuntimeConfig, SchedulerStats, TickSource, diagnostics};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Args)]
pub struct RunCommand {
    /// Mods directory (overrides `mods_dir` from the config)
    pub mods_dir: Option<PathBuf>,

    /// Stop after this many ticks (0 = until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    pub ticks: u64,

    /// Tick rate in ticks per second (overrides the config)
    #[arg(long)]
    pub tick_rate: Option<u32>,
}

impl RunCommand {
    pub async fn run(&self, mut config: RuntimeConfig) -> Result<()> {
        if let Some(dir) = &self.mods_dir {
            config.mods_dir = dir.clone();
        }
        if let Some(rate) = self.tick_rate {
            config.tick_rate = rate;
        }
        if config.tick_source == TickSource::External {
            tracing::info!("no host tick source in the CLI, using the fallback timer");
            config.tick_source = TickSource::Internal;
        }

        let world = Arc::new(MemoryWorld::new());
        let runtime = PyriumRuntime::new(config, world)?;
        diagnostics::log_banner(runtime.config());

        let report = runtime.load_mods().with_context(|| {
            format!(
                "failed to load mods from {}",
                runtime.config().mods_dir.display()
            )
        })?;
        diagnostics::log_report(&report);

        runtime.start()?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupted");
            }
            _ = wait_for_ticks(&runtime, self.ticks) => {}
        }

        let stats = runtime.shutdown();
        print_stats(&stats, report.loaded.len(), report.failed.len());
        Ok(())
    }
}

/// Resolve once `target` ticks were dispatched; never resolves for 0
async fn wait_for_ticks(runtime: &PyriumRuntime, target: u64) {
    if target == 0 {
        return std::future::pending::<()>().await;
    }
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    while runtime.scheduler().stats().ticks < target {
        interval.tick().await;
    }
}

fn print_stats(stats: &SchedulerStats, loaded: usize, rejected: usize) {
    println!();
    println!("Mods:        {} loaded, {} rejected", loaded, rejected);
    println!("Handlers:    {}", stats.handlers);
    println!("Ticks:       {}", stats.ticks);
    println!("Faults:      {}", stats.faults);
    println!("Panics:      {}", stats.panics);
}
