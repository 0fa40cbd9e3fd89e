//! Runtime assembly
//!
//! Ties a [`RuntimeConfig`], a [`TickScheduler`] and a host [`World`]
//! together and applies the configured tick-source strategy at startup.

use std::sync::Arc;

use pyrium_vm_bytecode::Module;
use pyrium_vm_core::World;

use crate::config::{RuntimeConfig, TickSource};
use crate::error::RuntimeResult;
use crate::mods::{self, LoadReport};
use crate::scheduler::{HandlerId, SchedulerStats, TickScheduler};

/// A configured Pyrium runtime
pub struct PyriumRuntime {
    config: RuntimeConfig,
    scheduler: TickScheduler,
    world: Arc<dyn World>,
}

impl PyriumRuntime {
    /// Create a runtime with a fresh scheduler
    pub fn new(config: RuntimeConfig, world: Arc<dyn World>) -> RuntimeResult<Self> {
        Self::with_scheduler(config, world, TickScheduler::new())
    }

    /// Create a runtime around an existing scheduler handle
    pub fn with_scheduler(
        config: RuntimeConfig,
        world: Arc<dyn World>,
        scheduler: TickScheduler,
    ) -> RuntimeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scheduler,
            world,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Scheduler handle
    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    /// Host world
    pub fn world(&self) -> &Arc<dyn World> {
        &self.world
    }

    /// Load every module from the configured mods directory
    pub fn load_mods(&self) -> RuntimeResult<LoadReport> {
        let report = mods::load_dir(
            &self.config.mods_dir,
            &self.scheduler,
            &self.world,
            &self.config.entry_function,
        )?;

        tracing::info!(
            dir = %self.config.mods_dir.display(),
            loaded = report.loaded.len(),
            registered = report.registered(),
            rejected = report.failed.len(),
            "mods loaded"
        );
        Ok(report)
    }

    /// Register an already decoded module
    pub fn register_module(&self, module: Arc<Module>) -> Option<HandlerId> {
        mods::register_module(
            &self.scheduler,
            Arc::clone(&self.world),
            module,
            &self.config.entry_function,
        )
    }

    /// Apply the configured tick source
    ///
    /// `internal` starts the fallback timer; `external` attaches immediately
    /// and leaves dispatching to the host.
    pub fn start(&self) -> RuntimeResult<()> {
        match self.config.tick_source {
            TickSource::Internal => {
                self.scheduler.start_fallback_timer(self.config.tick_rate)?;
            }
            TickSource::External => {
                self.scheduler.attach_external_source();
            }
        }
        Ok(())
    }

    /// Stop the fallback timer
    pub fn shutdown(&self) -> SchedulerStats {
        self.scheduler.shutdown();
        let stats = self.scheduler.stats();
        tracing::info!(
            ticks = stats.ticks,
            faults = stats.faults,
            panics = stats.panics,
            "runtime stopped"
        );
        stats
    }
}

impl std::fmt::Debug for PyriumRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyriumRuntime")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
