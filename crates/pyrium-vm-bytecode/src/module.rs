//! Bytecode module format
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! magic u32 | version u32 | name str
//! pool_count u32 | pool_count x str
//! function_count u32 | per function:
//!     name str | instruction_count u32 | per instruction:
//!         opcode u32 | a i32 | b i32 | num f64 | int i64
//! ```
//!
//! `str` is a u16 byte length followed by UTF-8 bytes.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use crate::constant::ConstantPool;
use crate::error::{BytecodeError, Result};
use crate::function::{ENTRY_FUNCTION, Function};
use crate::instruction::{Instruction, Opcode};
use crate::operand::ConstantIndex;
use crate::{BYTECODE_MAGIC, BYTECODE_VERSION};

/// Upper bound for pre-allocation driven by untrusted counts
const MAX_PREALLOC: usize = 1024;

/// A decoded bytecode module
///
/// Immutable once built; wrap it in an `Arc` to share it between VMs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    /// Module name as recorded by the compiler
    pub name: String,

    /// Format version the module was decoded from
    pub version: u32,

    /// Constant pool (shared across all functions)
    pub constants: ConstantPool,

    /// Functions keyed by name, in file order
    pub functions: IndexMap<String, Function>,
}

impl Module {
    /// Create a new module builder
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(name)
    }

    /// Get a function by name
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    /// Get the `on_tick` entry function, if the module defines one
    pub fn entry_function(&self) -> Option<&Function> {
        self.function(ENTRY_FUNCTION)
    }

    /// Resolve a string operand through the constant pool
    #[inline]
    pub fn string(&self, index: ConstantIndex) -> &str {
        self.constants.get(index)
    }

    /// Total number of instructions across all functions
    pub fn instruction_count(&self) -> usize {
        self.functions.values().map(Function::len).sum()
    }

    /// Deserialize module from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let magic = read_u32(&mut cursor)?;
        if magic != BYTECODE_MAGIC {
            return Err(BytecodeError::InvalidMagic(magic));
        }

        let version = read_u32(&mut cursor)?;
        if version != BYTECODE_VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }

        let name = read_string(&mut cursor)?;

        let pool_count = read_u32(&mut cursor)? as usize;
        let mut strings = Vec::with_capacity(pool_count.min(MAX_PREALLOC));
        for _ in 0..pool_count {
            strings.push(read_string(&mut cursor)?);
        }

        let function_count = read_u32(&mut cursor)? as usize;
        let mut functions = IndexMap::with_capacity(function_count.min(MAX_PREALLOC));
        for _ in 0..function_count {
            let function = read_function(&mut cursor)?;
            functions.insert(function.name.clone(), function);
        }

        Ok(Self {
            name,
            version,
            constants: ConstantPool::from_strings(strings),
            functions,
        })
    }

    /// Serialize module to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        bytes.write_u32::<BigEndian>(BYTECODE_MAGIC)?;
        bytes.write_u32::<BigEndian>(BYTECODE_VERSION)?;
        write_string(&mut bytes, &self.name)?;

        write_count(&mut bytes, "constant", self.constants.len())?;
        for s in self.constants.iter() {
            write_string(&mut bytes, s)?;
        }

        write_count(&mut bytes, "function", self.functions.len())?;
        for function in self.functions.values() {
            write_string(&mut bytes, &function.name)?;
            write_count(&mut bytes, "instruction", function.instructions.len())?;
            for ins in &function.instructions {
                bytes.write_u32::<BigEndian>(ins.opcode.id())?;
                bytes.write_i32::<BigEndian>(ins.a.index())?;
                bytes.write_i32::<BigEndian>(ins.b.index())?;
                bytes.write_f64::<BigEndian>(ins.num)?;
                bytes.write_i64::<BigEndian>(ins.int)?;
            }
        }

        Ok(bytes)
    }

    /// Write module to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read module from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Read module from a `.pybc` file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        Self::read_from(&mut file)
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(BytecodeError::from_read)
}

fn read_string(cursor: &mut Cursor<&[u8]>) -> Result<String> {
    let len = cursor
        .read_u16::<BigEndian>()
        .map_err(BytecodeError::from_read)? as usize;
    let offset = cursor.position();
    let mut buf = vec![0; len];
    cursor.read_exact(&mut buf).map_err(BytecodeError::from_read)?;
    String::from_utf8(buf).map_err(|_| BytecodeError::InvalidUtf8(offset))
}

fn read_function(cursor: &mut Cursor<&[u8]>) -> Result<Function> {
    let name = read_string(cursor)?;
    let count = read_u32(cursor)? as usize;
    let mut instructions = Vec::with_capacity(count.min(MAX_PREALLOC));

    for index in 0..count {
        let id = read_u32(cursor)?;
        let opcode = Opcode::from_id(id).ok_or_else(|| BytecodeError::UnknownOpcode {
            id,
            function: name.clone(),
            index,
        })?;
        let a = cursor
            .read_i32::<BigEndian>()
            .map_err(BytecodeError::from_read)?;
        let b = cursor
            .read_i32::<BigEndian>()
            .map_err(BytecodeError::from_read)?;
        let num = cursor
            .read_f64::<BigEndian>()
            .map_err(BytecodeError::from_read)?;
        let int = cursor
            .read_i64::<BigEndian>()
            .map_err(BytecodeError::from_read)?;

        instructions.push(Instruction {
            opcode,
            a: ConstantIndex::new(a),
            b: ConstantIndex::new(b),
            num,
            int,
        });
    }

    Ok(Function { name, instructions })
}

fn write_count(out: &mut Vec<u8>, what: &'static str, count: usize) -> Result<()> {
    let count = u32::try_from(count).map_err(|_| BytecodeError::CountTooLarge { what, count })?;
    out.write_u32::<BigEndian>(count)?;
    Ok(())
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    let len = u16::try_from(s.len()).map_err(|_| BytecodeError::StringTooLong(s.len()))?;
    out.write_u16::<BigEndian>(len)?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Builder for creating modules
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    constants: ConstantPool,
    functions: IndexMap<String, Function>,
}

impl ModuleBuilder {
    /// Create a new module builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constants: ConstantPool::new(),
            functions: IndexMap::new(),
        }
    }

    /// Intern a string in the constant pool
    pub fn intern(&mut self, s: &str) -> ConstantIndex {
        self.constants.add(s)
    }

    /// Add a function; a later function with the same name replaces it
    pub fn add_function(&mut self, function: Function) -> &mut Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    /// Build the module
    pub fn build(self) -> Module {
        Module {
            name: self.name,
            version: BYTECODE_VERSION,
            constants: self.constants,
            functions: self.functions,
        }
    }
}
