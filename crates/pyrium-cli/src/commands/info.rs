//! Info command - show format and opcode catalog information.

use anyhow::Result;
use clap::Args;
use pyrium_vm_bytecode::{BYTECODE_MAGIC, BYTECODE_VERSION, Opcode, OpcodeCategory, OperandMask};
use pyrium_vm_runtime::diagnostics::VERSION;

#[derive(Args)]
pub struct InfoCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InfoCommand {
    pub fn run(&self) -> Result<()> {
        let info = FormatInfo::collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            self.print_human_readable(&info);
        }

        Ok(())
    }

    fn print_human_readable(&self, info: &FormatInfo) {
        println!("Pyrium VM");
        println!("=========");
        println!();
        println!("Version:     {}", info.version);
        println!("Bytecode:    v{}", info.bytecode_version);
        println!("Magic:       {}", info.magic);
        println!();
        println!("Opcodes ({}):", info.opcodes.len());
        for op in &info.opcodes {
            println!(
                "  {:>4}  {:<24} {:<11} {}",
                op.id,
                op.name,
                format!("{:?}", op.category),
                operand_list(&op.operands)
            );
        }
    }
}

fn operand_list(mask: &OperandMask) -> String {
    let names: Vec<&str> = [
        (mask.a, "a"),
        (mask.b, "b"),
        (mask.num, "num"),
        (mask.int, "int"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();

    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(",")
    }
}

#[derive(serde::Serialize)]
struct FormatInfo {
    version: &'static str,
    bytecode_version: u32,
    magic: String,
    opcodes: Vec<OpcodeInfo>,
}

#[derive(serde::Serialize)]
struct OpcodeInfo {
    id: u32,
    name: &'static str,
    category: OpcodeCategory,
    operands: OperandMask,
}

impl FormatInfo {
    fn collect() -> Self {
        Self {
            version: VERSION,
            bytecode_version: BYTECODE_VERSION,
            magic: format!("{:#010x}", BYTECODE_MAGIC),
            opcodes: Opcode::ALL
                .iter()
                .map(|&op| OpcodeInfo {
                    id: op.id(),
                    name: op.name(),
                    category: op.category(),
                    operands: op.operands(),
                })
                .collect(),
        }
    }
}
