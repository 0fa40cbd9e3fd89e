//! # Pyrium VM Bytecode
//!
//! This crate defines the `.pybc` container format executed by the Pyrium VM.
//!
//! ## Design Principles
//!
//! - **Fixed layout**: every instruction carries the same four operand fields
//! - **Big-endian**: bit-exact with the ahead-of-time compiler's output
//! - **Versioned**: new versions may add opcodes, never reinterpret old ids
//! - **Immutable**: a decoded [`Module`] is shared read-only across executions

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constant;
pub mod error;
pub mod function;
pub mod instruction;
pub mod module;
pub mod operand;

pub use constant::ConstantPool;
pub use error::BytecodeError;
pub use function::{ENTRY_FUNCTION, Function, FunctionBuilder};
pub use instruction::{Instruction, Opcode, OpcodeCategory, OperandMask};
pub use module::{Module, ModuleBuilder};
pub use operand::{BlockPos, ConstantIndex, Region};

/// Bytecode format version
pub const BYTECODE_VERSION: u32 = 1;

/// Magic number at the start of every module (`"PYBC"`)
pub const BYTECODE_MAGIC: u32 = 0x5059_4243;
