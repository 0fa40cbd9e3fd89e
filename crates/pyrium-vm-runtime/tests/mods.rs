//! Loading mods from a directory

use std::fs;
use std::path::Path;
use std::sync::Arc;

use pyrium_vm_bytecode::{BytecodeError, ENTRY_FUNCTION, Function, Instruction, Module, Opcode};
use pyrium_vm_core::MemoryWorld;
use pyrium_vm_runtime::{PyriumRuntime, RuntimeConfig, TickSource};

fn write_module(dir: &Path, file: &str, name: &str, function: &str, counter: &str) {
    let mut builder = Module::builder(name);
    let a = builder.intern(counter);
    builder.add_function(
        Function::builder(function)
            .instruction(Instruction::new(Opcode::VarInc).with_a(a).with_int(1))
            .build(),
    );
    fs::write(dir.join(file), builder.build().to_bytes().unwrap()).unwrap();
}

/// A structurally valid stream whose only instruction has opcode 302
fn unknown_opcode_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x5059_4243_u32.to_be_bytes());
    bytes.extend_from_slice(&1_u32.to_be_bytes());
    bytes.extend_from_slice(&0_u16.to_be_bytes()); // empty name
    bytes.extend_from_slice(&0_u32.to_be_bytes()); // pool
    bytes.extend_from_slice(&1_u32.to_be_bytes()); // functions
    bytes.extend_from_slice(&7_u16.to_be_bytes());
    bytes.extend_from_slice(b"on_tick");
    bytes.extend_from_slice(&1_u32.to_be_bytes());
    bytes.extend_from_slice(&302_u32.to_be_bytes());
    bytes.extend_from_slice(&[0; 4 + 4 + 8 + 8]);
    bytes
}

#[test]
fn loads_good_modules_and_skips_bad_ones() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "10-alpha.pybc", "alpha", ENTRY_FUNCTION, "alpha");
    write_module(dir.path(), "20-beta.pybc", "beta", ENTRY_FUNCTION, "beta");
    write_module(dir.path(), "30-library.pybc", "library", "helper", "library");
    fs::write(dir.path().join("15-garbage.pybc"), b"not bytecode at all").unwrap();
    fs::write(dir.path().join("25-future.pybc"), unknown_opcode_stream()).unwrap();
    fs::write(dir.path().join("README.md"), b"# mods").unwrap();

    let world = Arc::new(MemoryWorld::new());
    let config = RuntimeConfig::new()
        .with_mods_dir(dir.path())
        .with_tick_source(TickSource::External);
    let runtime = PyriumRuntime::new(config, world.clone()).unwrap();

    let report = runtime.load_mods().unwrap();

    let loaded: Vec<_> = report.loaded.iter().map(|m| m.module.name.as_str()).collect();
    assert_eq!(loaded, vec!["alpha", "beta", "library"]);
    assert_eq!(report.registered(), 2);
    assert_eq!(report.failed.len(), 2);
    assert!(matches!(
        report.failed[0].error,
        BytecodeError::InvalidMagic(_)
    ));
    assert!(report.failed[1].error.is_unknown_opcode());
    assert_eq!(runtime.scheduler().handler_names(), vec!["alpha", "beta"]);

    runtime.start().unwrap();
    runtime.scheduler().dispatch(1, 50.0);

    assert_eq!(world.host_var("alpha", "alpha"), Some(1));
    assert_eq!(world.host_var("beta", "beta"), Some(1));
    assert_eq!(world.host_var("library", "library"), None);
}

#[test]
fn custom_entry_function() {
    let dir = tempfile::tempdir().unwrap();
    write_module(dir.path(), "lib.pybc", "library", "helper", "helper_runs");

    let world = Arc::new(MemoryWorld::new());
    let config = RuntimeConfig::new()
        .with_mods_dir(dir.path())
        .with_entry_function("helper");
    let runtime = PyriumRuntime::new(config, world.clone()).unwrap();

    assert_eq!(runtime.load_mods().unwrap().registered(), 1);
    runtime.scheduler().dispatch(1, 50.0);
    assert_eq!(world.host_var("library", "helper_runs"), Some(1));
}

#[test]
fn empty_directory_loads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = PyriumRuntime::new(
        RuntimeConfig::new().with_mods_dir(dir.path()),
        Arc::new(MemoryWorld::new()),
    )
    .unwrap();

    let report = runtime.load_mods().unwrap();
    assert!(report.loaded.is_empty());
    assert!(report.failed.is_empty());
}
