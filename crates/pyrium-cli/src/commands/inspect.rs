//! Inspect command - decode a module and print a disassembly.

use anyhow::{Context, Result};
use clap::Args;
use pyrium_vm_bytecode::{Instruction, Module};
use std::path::PathBuf;

#[derive(Args)]
pub struct InspectCommand {
    /// Module file (`.pybc`)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub fn run(&self) -> Result<()> {
        let module = Module::from_path(&self.file)
            .with_context(|| format!("failed to decode {}", self.file.display()))?;

        for function in module.functions.values() {
            for (index, instruction) in function.instructions.iter().enumerate() {
                let stray = instruction.stray_operands();
                if !stray.is_empty() {
                    tracing::warn!(
                        function = %function.name,
                        index,
                        opcode = %instruction.opcode,
                        ?stray,
                        "operands set but not read"
                    );
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&module)?);
        } else {
            print_disassembly(&module);
        }
        Ok(())
    }
}

fn print_disassembly(module: &Module) {
    println!("Module:      {}", module.name);
    println!("Version:     {}", module.version);
    println!("Functions:   {}", module.functions.len());
    println!("Constants:   {}", module.constants.len());
    println!();

    println!("Constant pool:");
    for (index, value) in module.constants.iter().enumerate() {
        println!("  #{:<4} {:?}", index, value);
    }

    for function in module.functions.values() {
        println!();
        println!("{}:", function.name);
        for (index, instruction) in function.instructions.iter().enumerate() {
            println!("  {:04}  {}", index, format_instruction(module, instruction));
        }
    }
}

/// Render an instruction with only the operands its opcode reads
fn format_instruction(module: &Module, instruction: &Instruction) -> String {
    let used = instruction.opcode.operands();
    let mut out = format!("{:<22}", instruction.opcode.name());
    if used.a {
        out.push_str(&format!(" a={:?}", module.string(instruction.a)));
    }
    if used.b {
        out.push_str(&format!(" b={:?}", module.string(instruction.b)));
    }
    if used.num {
        out.push_str(&format!(" num={}", instruction.num));
    }
    if used.int {
        out.push_str(&format!(" int={}", instruction.int));
    }
    out.trim_end().to_string()
}
