//! # Pyrium VM Runtime
//!
//! Drives compiled mods: discovers modules, gives each one a VM and feeds
//! them ticks from either the fallback timer or the host's own loop.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod mods;
pub mod runtime;
pub mod scheduler;

pub use config::{DEFAULT_CONFIG_FILE, RuntimeConfig, TickSource};
pub use error::{RuntimeError, RuntimeResult};
pub use mods::{LoadFailure, LoadReport, LoadedMod};
pub use runtime::PyriumRuntime;
pub use scheduler::{HandlerError, HandlerId, SchedulerStats, TickScheduler};
