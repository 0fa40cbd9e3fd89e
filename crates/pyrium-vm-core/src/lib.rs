//! # Pyrium VM Core
//!
//! Execution engine for compiled Pyrium mods.
//!
//! ## Design Principles
//!
//! - **One VM per mod**: registers live in the [`Vm`] and are never shared
//! - **Shared modules**: a decoded [`Module`](pyrium_vm_bytecode::Module) is
//!   read-only and shared through `Arc` by any number of VMs
//! - **Capability based**: every side effect goes through the host's [`World`]
//! - **Linear scan**: control-flow markers toggle suppression, nothing jumps

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod condition;
pub mod error;
pub mod event;
pub mod interpreter;
pub mod memory_world;
pub mod registers;
pub mod world;

pub use condition::{Comparison, Condition};
pub use error::{CapabilityError, CapabilityResult, VmError, VmResult};
pub use event::TickEvent;
pub use interpreter::{Exit, Outcome, Vm};
pub use memory_world::{CustomMob, MemoryEntity, MemoryWorld};
pub use registers::Registers;
pub use world::{Entity, EntityRef, World};
