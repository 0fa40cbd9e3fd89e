//! Function bytecode representation

use serde::Serialize;

use crate::instruction::Instruction;

/// Reserved name of the function invoked once per simulation step
pub const ENTRY_FUNCTION: &str = "on_tick";

/// A named, ordered sequence of instructions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    /// Function name
    pub name: String,

    /// Instructions in execution order
    pub instructions: Vec<Instruction>,
}

impl Function {
    /// Create a new function builder
    pub fn builder(name: impl Into<String>) -> FunctionBuilder {
        FunctionBuilder::new(name)
    }

    /// Whether this is the per-tick entry point
    pub fn is_entry(&self) -> bool {
        self.name == ENTRY_FUNCTION
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the function has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Incremental [`Function`] construction
#[derive(Debug, Default)]
pub struct FunctionBuilder {
    name: String,
    instructions: Vec<Instruction>,
}

impl FunctionBuilder {
    /// Create a new function builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    /// Replace the instruction list
    pub fn instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Append one instruction
    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Finish the function
    pub fn build(self) -> Function {
        Function {
            name: self.name,
            instructions: self.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Opcode;

    #[test]
    fn test_function_builder() {
        let func = Function::builder(ENTRY_FUNCTION)
            .instruction(Instruction::new(Opcode::Nop))
            .instruction(Instruction::new(Opcode::Return))
            .build();

        assert!(func.is_entry());
        assert_eq!(func.len(), 2);
        assert_eq!(func.instructions[1].opcode, Opcode::Return);
    }
}
