//! Startup diagnostics

use pyrium_vm_bytecode::{BYTECODE_VERSION, Opcode};

use crate::config::RuntimeConfig;
use crate::mods::LoadReport;

/// Crate version reported in the banner
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the startup banner
pub fn log_banner(config: &RuntimeConfig) {
    tracing::info!(
        version = VERSION,
        bytecode_version = BYTECODE_VERSION,
        opcodes = Opcode::ALL.len(),
        "Pyrium runtime"
    );
    tracing::info!(
        mods_dir = %config.mods_dir.display(),
        tick_source = %config.tick_source,
        tick_rate = config.tick_rate,
        entry = %config.entry_function,
        "configuration"
    );
}

/// Log one line per loaded and rejected module
pub fn log_report(report: &LoadReport) {
    for loaded in &report.loaded {
        tracing::info!(
            module = %loaded.module.name,
            path = %loaded.path.display(),
            functions = loaded.module.functions.len(),
            instructions = loaded.module.instruction_count(),
            ticking = loaded.handler.is_some(),
            "mod"
        );
    }
    for failure in &report.failed {
        tracing::warn!(
            path = %failure.path.display(),
            error = %failure.error,
            "mod rejected"
        );
    }
}
