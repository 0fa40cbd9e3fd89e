//! Decoding tests against hand-assembled PYBC streams

use pyrium_vm_bytecode::{
    BytecodeError, ConstantIndex, Function, Instruction, Module, Opcode, ENTRY_FUNCTION,
};
use std::io::Write;

/// Minimal big-endian writer for building raw streams
#[derive(Default)]
struct Raw(Vec<u8>);

impl Raw {
    fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn str(mut self, s: &str) -> Self {
        self.0.extend_from_slice(&(s.len() as u16).to_be_bytes());
        self.0.extend_from_slice(s.as_bytes());
        self
    }

    fn ins(mut self, op: u32, a: i32, b: i32, num: f64, int: i64) -> Self {
        self.0.extend_from_slice(&op.to_be_bytes());
        self.0.extend_from_slice(&a.to_be_bytes());
        self.0.extend_from_slice(&b.to_be_bytes());
        self.0.extend_from_slice(&num.to_be_bytes());
        self.0.extend_from_slice(&int.to_be_bytes());
        self
    }

    fn header(name: &str) -> Self {
        Self::default().u32(0x5059_4243).u32(1).str(name)
    }
}

fn zombie_speed_stream() -> Vec<u8> {
    Raw::header("speedy")
        .u32(1)
        .str("Zombie")
        .u32(1)
        .str("on_tick")
        .u32(1)
        .ins(103, 0, -1, 2.0, 0)
        .0
}

#[test]
fn decodes_hand_assembled_module() {
    let module = Module::from_bytes(&zombie_speed_stream()).unwrap();

    assert_eq!(module.name, "speedy");
    assert_eq!(module.version, 1);
    assert_eq!(module.constants.len(), 1);

    let on_tick = module.entry_function().unwrap();
    assert_eq!(on_tick.name, ENTRY_FUNCTION);
    assert_eq!(
        on_tick.instructions[0],
        Instruction::new(Opcode::MulEntitySpeed)
            .with_a(ConstantIndex::new(0))
            .with_b(ConstantIndex::new(-1))
            .with_num(2.0)
    );
    assert_eq!(module.string(on_tick.instructions[0].a), "Zombie");
    assert_eq!(module.string(on_tick.instructions[0].b), "");
}

#[test]
fn decoding_is_deterministic() {
    let bytes = zombie_speed_stream();
    let first = Module::from_bytes(&bytes).unwrap();
    let second = Module::from_bytes(&bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reencoding_reproduces_the_stream() {
    let bytes = zombie_speed_stream();
    let module = Module::from_bytes(&bytes).unwrap();
    assert_eq!(module.to_bytes().unwrap(), bytes);
}

#[test]
fn rejects_bad_magic() {
    let bytes = Raw::default().u32(0xDEAD_BEEF).u32(1).str("x").0;
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, BytecodeError::InvalidMagic(0xDEAD_BEEF)));
}

#[test]
fn rejects_other_versions() {
    for version in [0, 2, 99] {
        let bytes = Raw::default().u32(0x5059_4243).u32(version).str("x").0;
        let err = Module::from_bytes(&bytes).unwrap_err();
        assert!(err.is_version_error(), "version {version}: {err}");
    }
}

#[test]
fn rejects_unknown_opcode_anywhere_in_module() {
    let bytes = Raw::header("bad")
        .u32(0)
        .u32(2)
        .str("helper")
        .u32(1)
        .ins(0, 0, 0, 0.0, 0)
        .str("on_tick")
        .u32(2)
        .ins(360, 0, 0, 0.0, 1)
        .ins(302, 0, 0, 0.0, 0)
        .0;

    match Module::from_bytes(&bytes) {
        Err(BytecodeError::UnknownOpcode {
            id,
            function,
            index,
        }) => {
            assert_eq!(id, 302);
            assert_eq!(function, "on_tick");
            assert_eq!(index, 1);
        }
        other => panic!("expected unknown opcode, got {other:?}"),
    }
}

#[test]
fn rejects_truncated_stream() {
    let bytes = zombie_speed_stream();
    // Cut inside the last instruction's integer operand
    let err = Module::from_bytes(&bytes[..bytes.len() - 4]).unwrap_err();
    assert!(matches!(err, BytecodeError::Truncated));

    // A count larger than the data that follows
    let short = Raw::header("short").u32(5).str("only-one").0;
    assert!(matches!(
        Module::from_bytes(&short),
        Err(BytecodeError::Truncated)
    ));
}

#[test]
fn rejects_invalid_utf8() {
    let mut bytes = Raw::default().u32(0x5059_4243).u32(1).0;
    bytes.extend_from_slice(&[0, 2, 0xC3, 0x28]);
    let err = Module::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, BytecodeError::InvalidUtf8(10)));
}

#[test]
fn out_of_range_pool_indices_resolve_to_empty() {
    let bytes = Raw::header("lenient")
        .u32(0)
        .u32(1)
        .str("on_tick")
        .u32(1)
        .ins(1, 42, i32::MIN, 0.0, 0)
        .0;
    let module = Module::from_bytes(&bytes).unwrap();
    let ins = module.entry_function().unwrap().instructions[0];
    assert_eq!(module.string(ins.a), "");
    assert_eq!(module.string(ins.b), "");
}

#[test]
fn encoding_rejects_oversized_strings() {
    let mut builder = Module::builder("big");
    builder.intern(&"x".repeat(70_000));
    let err = builder.build().to_bytes().unwrap_err();
    assert!(matches!(err, BytecodeError::StringTooLong(70_000)));
}

#[test]
fn reads_module_from_file() {
    let mut builder = Module::builder("on-disk");
    let msg = builder.intern("hello");
    builder.add_function(
        Function::builder(ENTRY_FUNCTION)
            .instruction(Instruction::new(Opcode::Broadcast).with_a(msg))
            .build(),
    );
    let module = builder.build();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    module.write_to(&mut file).unwrap();
    file.flush().unwrap();

    let loaded = Module::from_path(file.path()).unwrap();
    assert_eq!(loaded, module);
    assert_eq!(loaded.instruction_count(), 1);
}
