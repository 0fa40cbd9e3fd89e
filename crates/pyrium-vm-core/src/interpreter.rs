//! Bytecode interpreter
//!
//! Executes one function per invocation as a single forward scan. There are
//! no jump targets: `IF_*` markers toggle a suppression state, `FOR_*` and
//! `WHILE_*` only update registers, and `BREAK`/`RETURN` end the invocation.
//! Nested conditionals are not supported; an inner `IF_END` closes the outer
//! suppression.

use std::sync::Arc;
use std::time::Duration;

use pyrium_vm_bytecode::{
    BlockPos, ENTRY_FUNCTION, Function, Instruction, Module, Opcode, Region,
};
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::condition::{self, Comparison, Scope};
use crate::error::{VmError, VmResult};
use crate::event::TickEvent;
use crate::registers::Registers;
use crate::world::World;

/// Entity type used by `MUL_ENTITY_SPEED` when operand A is empty
const DEFAULT_SPEED_TARGET: &str = "Zombie";

/// Y coordinate used by `SPAWN_ENTITY` when float register B is unset
const DEFAULT_SPAWN_Y: f64 = 64.0;

/// Equipment slot used when `SET_CUSTOM_MOB_EQUIP` has no `slot|` prefix
const DEFAULT_EQUIP_SLOT: &str = "mainhand";

/// How an invocation ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Exit {
    /// Ran off the end of the function
    #[default]
    End,
    /// `RETURN`
    Return,
    /// `BREAK`
    Break,
}

/// Result of one successful invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Instructions executed (suppressed ones excluded)
    pub executed: usize,
    /// How the invocation ended
    pub exit: Exit,
    /// Total of all `SLEEP` requests, if any were raised
    pub sleep_hint: Option<Duration>,
    /// Whether `YIELD` was raised
    pub yielded: bool,
}

/// Suppression state of the linear scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Suppress {
    #[default]
    None,
    /// Skip until `IF_ELSE` or `IF_END` (both consumed)
    UntilElse,
    /// Skip until `IF_END` (consumed)
    UntilEndIf,
}

#[derive(Debug, Clone, Copy)]
struct ForState {
    end: i64,
    step: i64,
}

/// Per-invocation scratch state; loop bounds do not outlive the invocation
#[derive(Default)]
struct Frame<'m> {
    suppress: Suppress,
    loops: FxHashMap<&'m str, ForState>,
}

enum Flow {
    Next,
    Exit(Exit),
}

/// Execution context for one mod
///
/// Owns the mod's registers. The module is shared; any number of VMs may
/// run the same module concurrently without observing each other.
pub struct Vm {
    module: Arc<Module>,
    world: Arc<dyn World>,
    registers: Registers,
}

impl Vm {
    /// Create a VM with empty registers
    pub fn new(module: Arc<Module>, world: Arc<dyn World>) -> Self {
        Self {
            module,
            world,
            registers: Registers::new(),
        }
    }

    /// Module being executed
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Current registers
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Clear all registers
    pub fn reset(&mut self) {
        self.registers.clear();
    }

    /// Run `on_tick` once
    pub fn run_tick(&mut self, tick: &TickEvent) -> VmResult<Outcome> {
        self.invoke(ENTRY_FUNCTION, tick)
    }

    /// Run a named function once
    pub fn invoke(&mut self, name: &str, tick: &TickEvent) -> VmResult<Outcome> {
        let module = Arc::clone(&self.module);
        let function = module
            .function(name)
            .ok_or_else(|| VmError::MissingFunction(name.to_owned()))?;

        tracing::trace!(
            module = %module.name,
            function = name,
            timestamp = tick.timestamp_nanos,
            "invoke"
        );

        self.execute(&module, function)
    }

    fn execute<'m>(&mut self, module: &'m Module, function: &'m Function) -> VmResult<Outcome> {
        let mut frame = Frame::default();
        let mut outcome = Outcome::default();

        for (index, ins) in function.instructions.iter().enumerate() {
            match frame.suppress {
                Suppress::UntilEndIf => {
                    if ins.opcode == Opcode::IfEnd {
                        frame.suppress = Suppress::None;
                    }
                    continue;
                }
                Suppress::UntilElse => {
                    if matches!(ins.opcode, Opcode::IfElse | Opcode::IfEnd) {
                        frame.suppress = Suppress::None;
                    }
                    continue;
                }
                Suppress::None => {}
            }

            outcome.executed += 1;
            match self.step(module, ins, index, &mut frame, &mut outcome)? {
                Flow::Next => {}
                Flow::Exit(exit) => {
                    outcome.exit = exit;
                    break;
                }
            }
        }

        Ok(outcome)
    }

    fn step<'m>(
        &mut self,
        module: &'m Module,
        ins: &Instruction,
        index: usize,
        frame: &mut Frame<'m>,
        outcome: &mut Outcome,
    ) -> VmResult<Flow> {
        let a = module.string(ins.a);
        let b = module.string(ins.b);
        let world = Arc::clone(&self.world);

        tracing::trace!(index, opcode = %ins.opcode, "exec");

        match ins.opcode {
            // ==================== Control ====================
            Opcode::Nop
            | Opcode::Continue
            | Opcode::WhileBegin
            | Opcode::WhileEnd
            | Opcode::ForEnd => {}

            Opcode::Log => {
                tracing::info!(target: "pyrium::mod", module = %module.name, "{a}");
            }

            Opcode::Debug => {
                tracing::debug!(
                    target: "pyrium::mod",
                    module = %module.name,
                    num = ins.num,
                    int = ins.int,
                    "{a}"
                );
            }

            Opcode::Assert => {
                if !condition::evaluate(a, &*self) {
                    return Err(VmError::assertion(a, index));
                }
            }

            Opcode::IfBegin => {
                if !condition::evaluate(a, &*self) {
                    frame.suppress = Suppress::UntilElse;
                }
            }
            Opcode::IfElse => frame.suppress = Suppress::UntilEndIf,
            Opcode::IfEnd => frame.suppress = Suppress::None,

            Opcode::WhileCheck => {
                let holds = condition::evaluate(a, &*self);
                tracing::trace!(index, condition = a, holds, "while check");
            }

            Opcode::ForInit => {
                let mut end = ins.num as i64;
                if end == 0 && !b.is_empty() {
                    if let Ok(parsed) = b.parse() {
                        end = parsed;
                    }
                }
                self.write_int(a, ins.int)?;
                frame.loops.insert(a, ForState { end, step: 1 });
            }

            Opcode::ForIter => {
                if let Some(state) = frame.loops.get(a).copied() {
                    let current = self.read_int(a);
                    if current <= state.end {
                        self.write_int(a, current.wrapping_add(state.step))?;
                    }
                }
            }

            Opcode::Break => return Ok(Flow::Exit(Exit::Break)),
            Opcode::Return => return Ok(Flow::Exit(Exit::Return)),

            // ==================== World ====================
            Opcode::SetTime => world.set_time(ins.int)?,
            Opcode::GetTime => {
                let time = world.time()?;
                self.write_int(a, time)?;
            }
            Opcode::SetWeather => world.set_weather(a)?,
            Opcode::GetWeather => {
                let weather = world.weather()?;
                self.registers.set_string(a, weather);
            }
            Opcode::SetGamerule => world.set_gamerule(a, b)?,
            Opcode::Teleport => {
                let pos = BlockPos::unpack(ins.int);
                for entity in world.entities(a)? {
                    entity.teleport(f64::from(pos.x), f64::from(pos.y), f64::from(pos.z))?;
                }
            }
            Opcode::ChangeDimension => {
                for entity in world.entities(a)? {
                    world.change_dimension(&entity, b)?;
                }
            }

            // ==================== Entities ====================
            Opcode::SpawnEntity => {
                let y = self.registers.float(b).unwrap_or(DEFAULT_SPAWN_Y);
                world.spawn_entity(a, ins.num, y, 0.0)?;
            }
            Opcode::RemoveEntity => {
                for entity in world.entities(a)? {
                    world.remove_entity(&entity)?;
                }
            }
            Opcode::FindEntities => {
                let count = world.entities(a)?.len();
                self.write_int(a, count as i64)?;
            }
            Opcode::FindEntitiesRegion => {
                let count = world.entities_in_region(a, Region::unpack(ins.int))?.len();
                self.write_int(a, count as i64)?;
            }
            Opcode::SetEntityNbt => {
                let value = format!("{:?}", ins.num);
                for entity in world.entities(a)? {
                    world.set_entity_nbt(&entity, b, &value)?;
                }
            }
            Opcode::GetEntityNbt => {
                if let Some(entity) = world.entities(a)?.last() {
                    let value = world.entity_nbt(entity, b)?;
                    self.registers.set_string(a, value);
                }
            }
            Opcode::SetEntityAttr => {
                for entity in world.entities(a)? {
                    world.set_entity_attribute(&entity, b, ins.num)?;
                }
            }
            Opcode::GetEntityAttr => {
                let value = match world.entities(a)?.last() {
                    Some(entity) => world.entity_attribute(entity, b)?,
                    None => 0.0,
                };
                self.registers.set_float(a, value);
            }
            Opcode::AddEffect => {
                for entity in world.entities(a)? {
                    world.add_effect(&entity, b, ins.num as i32, ins.int)?;
                }
            }
            Opcode::ClearEffect => {
                let effect = (!b.is_empty()).then_some(b);
                for entity in world.entities(a)? {
                    world.clear_effect(&entity, effect)?;
                }
            }
            Opcode::MulEntitySpeed => {
                let target = if a.is_empty() { DEFAULT_SPEED_TARGET } else { a };
                let factor = if ins.num == 0.0 { 1.0 } else { ins.num };
                for entity in world.entities(target)? {
                    entity.set_movement_speed(entity.movement_speed() * factor)?;
                }
            }

            // ==================== Players ====================
            Opcode::Broadcast => world.broadcast(a)?,
            Opcode::MessagePlayer => world.message_player(a, b)?,
            Opcode::GiveItem => world.give_item(a, b, ins.int)?,
            Opcode::TakeItem => world.take_item(a, b, ins.int)?,
            Opcode::ExecCmd => world.exec_command(a)?,
            Opcode::TeleportPlayer => world.teleport_player(a, ins.num, ins.int as f64, 0.0)?,

            // ==================== Blocks ====================
            Opcode::SetBlock => world.set_block(BlockPos::unpack(ins.int), a)?,
            Opcode::GetBlock => {
                let block = world.block(BlockPos::unpack(ins.int))?;
                self.registers.set_string(a, block);
            }

            // ==================== Scoreboard ====================
            Opcode::ScoreboardCreate => world.create_objective(a)?,
            Opcode::ScoreboardRemove => world.remove_objective(a)?,

            // ==================== Variables / math ====================
            Opcode::VarSet => self.write_int(a, ins.int)?,
            Opcode::VarGet => {
                let value = self.read_int(a);
                self.registers.set_int(a, value);
            }
            Opcode::VarInc | Opcode::MathAdd => {
                let value = self.read_int(a).wrapping_add(ins.int);
                self.write_int(a, value)?;
            }
            Opcode::VarDec | Opcode::MathSub => {
                let value = self.read_int(a).wrapping_sub(ins.int);
                self.write_int(a, value)?;
            }
            Opcode::MathMul => {
                let value = self.read_int(a).wrapping_mul(ins.int);
                self.write_int(a, value)?;
            }
            Opcode::MathDiv => {
                if ins.int == 0 {
                    return Err(VmError::division_by_zero(a, index));
                }
                let value = self.read_int(a).wrapping_div(ins.int);
                self.write_int(a, value)?;
            }
            Opcode::CompEq
            | Opcode::CompNe
            | Opcode::CompLt
            | Opcode::CompLe
            | Opcode::CompGt
            | Opcode::CompGe => {
                if let Some(cmp) = Comparison::for_opcode(ins.opcode) {
                    let result = cmp.apply(self.read_int(a), ins.int);
                    self.write_int(b, i64::from(result))?;
                }
            }
            Opcode::RandInt => {
                let value = rand::thread_rng().gen_range(0..ins.int.max(1));
                self.write_int(a, value)?;
            }
            Opcode::RandFloat => {
                let value = rand::thread_rng().gen_range(0.0..1.0);
                self.registers.set_float(a, value);
            }

            // ==================== Misc ====================
            Opcode::Sleep => {
                let requested = Duration::from_millis(u64::try_from(ins.int).unwrap_or(0));
                let total = outcome.sleep_hint.unwrap_or_default();
                outcome.sleep_hint = Some(total.saturating_add(requested));
            }
            Opcode::Yield => outcome.yielded = true,

            // ==================== Custom mobs ====================
            Opcode::RegisterCustomMob => world.register_custom_mob(a, b)?,
            Opcode::SetCustomMobModel => world.set_custom_mob_model(a, b)?,
            Opcode::SetCustomMobTexture => world.set_custom_mob_texture(a, b)?,
            Opcode::SetCustomMobSize => world.set_custom_mob_size(a, ins.num)?,
            Opcode::SetCustomMobAttr => world.set_custom_mob_attribute(a, b, ins.num)?,
            Opcode::SetCustomMobLootTable => world.set_custom_mob_loot_table(a, b)?,
            Opcode::SetCustomMobEquip => {
                let (slot, item) = b.split_once('|').unwrap_or((DEFAULT_EQUIP_SLOT, b));
                world.set_custom_mob_equipment(a, slot, item)?;
            }
            Opcode::SetCustomMobAi => world.set_custom_mob_ai(a, b)?,
            Opcode::SpawnCustomMob => world.spawn_custom_mob(a, BlockPos::unpack(ins.int))?,
            Opcode::RemoveCustomMobs => world.remove_custom_mobs(a)?,
        }

        Ok(Flow::Next)
    }

    fn read_int(&self, name: &str) -> i64 {
        self.registers.int(name).unwrap_or(0)
    }

    /// Integer writes are exported to the host under this module's name.
    /// Nothing reads the export back into a register.
    fn write_int(&mut self, name: &str, value: i64) -> VmResult<()> {
        self.registers.set_int(name, value);
        self.world.export_var(&self.module.name, name, value)?;
        Ok(())
    }
}

impl Scope for Vm {
    fn int(&self, name: &str) -> i64 {
        self.read_int(name)
    }

    fn string(&self, name: &str) -> Option<&str> {
        self.registers.string(name)
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("module", &self.module.name)
            .field("registers", &self.registers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_world::MemoryWorld;
    use pyrium_vm_bytecode::ModuleBuilder;

    const TICK: TickEvent = TickEvent::new(0, 50.0);

    /// Assemble `on_tick` from `(opcode, a, b, num, int)` rows
    fn module(rows: &[(Opcode, &str, &str, f64, i64)]) -> Arc<Module> {
        let mut builder = ModuleBuilder::new("test");
        let mut func = Function::builder(ENTRY_FUNCTION);
        for &(op, a, b, num, int) in rows {
            let a = builder.intern(a);
            let b = builder.intern(b);
            func = func.instruction(
                Instruction::new(op)
                    .with_a(a)
                    .with_b(b)
                    .with_num(num)
                    .with_int(int),
            );
        }
        builder.add_function(func.build());
        Arc::new(builder.build())
    }

    fn run(rows: &[(Opcode, &str, &str, f64, i64)]) -> (Vm, VmResult<Outcome>) {
        let world = Arc::new(MemoryWorld::new());
        let mut vm = Vm::new(module(rows), world);
        let result = vm.run_tick(&TICK);
        (vm, result)
    }

    #[test]
    fn test_math_wraps() {
        let (vm, result) = run(&[
            (Opcode::VarSet, "x", "", 0.0, i64::MAX),
            (Opcode::MathAdd, "x", "", 0.0, 1),
            (Opcode::VarSet, "y", "", 0.0, 7),
            (Opcode::MathMul, "y", "", 0.0, 3),
            (Opcode::MathDiv, "y", "", 0.0, 2),
            (Opcode::MathSub, "y", "", 0.0, 1),
        ]);
        result.unwrap();
        assert_eq!(vm.registers().int("x"), Some(i64::MIN));
        assert_eq!(vm.registers().int("y"), Some(9));
    }

    #[test]
    fn test_division_by_zero_faults() {
        let (vm, result) = run(&[
            (Opcode::VarSet, "x", "", 0.0, 4),
            (Opcode::MathDiv, "x", "", 0.0, 0),
            (Opcode::VarSet, "x", "", 0.0, 99),
        ]);
        assert!(matches!(
            result,
            Err(VmError::DivisionByZero { index: 1, .. })
        ));
        assert_eq!(vm.registers().int("x"), Some(4));
    }

    #[test]
    fn test_comparison_opcodes() {
        let (vm, result) = run(&[
            (Opcode::VarSet, "x", "", 0.0, 5),
            (Opcode::CompEq, "x", "eq", 0.0, 5),
            (Opcode::CompLt, "x", "lt", 0.0, 5),
            (Opcode::CompGe, "x", "ge", 0.0, 2),
        ]);
        result.unwrap();
        assert_eq!(vm.registers().int("eq"), Some(1));
        assert_eq!(vm.registers().int("lt"), Some(0));
        assert_eq!(vm.registers().int("ge"), Some(1));
    }

    #[test]
    fn test_for_is_single_pass() {
        let (vm, result) = run(&[
            (Opcode::ForInit, "i", "", 3.0, 0),
            (Opcode::VarInc, "body", "", 0.0, 1),
            (Opcode::ForIter, "i", "", 0.0, 0),
            (Opcode::ForEnd, "", "", 0.0, 0),
        ]);
        result.unwrap();
        assert_eq!(vm.registers().int("i"), Some(1));
        assert_eq!(vm.registers().int("body"), Some(1));
    }

    #[test]
    fn test_for_end_from_operand_b() {
        let (vm, result) = run(&[
            (Opcode::ForInit, "i", "4", 0.0, 4),
            (Opcode::ForIter, "i", "", 0.0, 0),
            (Opcode::ForIter, "i", "", 0.0, 0),
        ]);
        result.unwrap();
        // 4 <= 4 steps once, 5 > 4 stops
        assert_eq!(vm.registers().int("i"), Some(5));
    }

    #[test]
    fn test_for_iter_without_init_is_ignored() {
        let (vm, result) = run(&[(Opcode::ForIter, "i", "", 0.0, 0)]);
        result.unwrap();
        assert_eq!(vm.registers().int("i"), None);
    }

    #[test]
    fn test_break_and_return_end_invocation() {
        let (vm, result) = run(&[
            (Opcode::VarSet, "x", "", 0.0, 1),
            (Opcode::Break, "", "", 0.0, 0),
            (Opcode::VarSet, "x", "", 0.0, 2),
        ]);
        let outcome = result.unwrap();
        assert_eq!(outcome.exit, Exit::Break);
        assert_eq!(outcome.executed, 2);
        assert_eq!(vm.registers().int("x"), Some(1));

        let (_, result) = run(&[(Opcode::Return, "", "", 0.0, 0), (Opcode::Nop, "", "", 0.0, 0)]);
        assert_eq!(result.unwrap().exit, Exit::Return);
    }

    #[test]
    fn test_hints_do_not_block() {
        let (_, result) = run(&[
            (Opcode::Sleep, "", "", 0.0, 60_000),
            (Opcode::Sleep, "", "", 0.0, 500),
            (Opcode::Sleep, "", "", 0.0, -5),
            (Opcode::Yield, "", "", 0.0, 0),
        ]);
        let outcome = result.unwrap();
        assert_eq!(outcome.sleep_hint, Some(Duration::from_millis(60_500)));
        assert!(outcome.yielded);
    }

    #[test]
    fn test_random_ranges() {
        let (vm, result) = run(&[
            (Opcode::RandInt, "die", "", 0.0, 6),
            (Opcode::RandInt, "zero", "", 0.0, -3),
            (Opcode::RandFloat, "f", "", 0.0, 0),
        ]);
        result.unwrap();
        let die = vm.registers().int("die").unwrap();
        assert!((0..6).contains(&die));
        assert_eq!(vm.registers().int("zero"), Some(0));
        let f = vm.registers().float("f").unwrap();
        assert!((0.0..1.0).contains(&f));
    }

    #[test]
    fn test_missing_function() {
        let world = Arc::new(MemoryWorld::new());
        let mut vm = Vm::new(module(&[]), world);
        assert!(matches!(
            vm.invoke("nope", &TICK),
            Err(VmError::MissingFunction(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_registers_persist_across_ticks() {
        let world = Arc::new(MemoryWorld::new());
        let mut vm = Vm::new(module(&[(Opcode::VarInc, "n", "", 0.0, 1)]), world);
        for _ in 0..3 {
            vm.run_tick(&TICK).unwrap();
        }
        assert_eq!(vm.registers().int("n"), Some(3));

        vm.reset();
        assert!(vm.registers().is_empty());
    }
}
