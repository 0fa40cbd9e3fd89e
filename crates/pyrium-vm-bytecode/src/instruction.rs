//! Bytecode instructions (opcodes)

use serde::Serialize;

use crate::operand::ConstantIndex;

/// Which of the four operand fields an opcode reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperandMask {
    /// String operand A
    pub a: bool,
    /// String operand B
    pub b: bool,
    /// Numeric (f64) operand
    pub num: bool,
    /// Integer (i64) operand
    pub int: bool,
}

impl OperandMask {
    const fn parse(letters: &str) -> Self {
        let bytes = letters.as_bytes();
        let mut mask = Self {
            a: false,
            b: false,
            num: false,
            int: false,
        };
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'a' => mask.a = true,
                b'b' => mask.b = true,
                b'n' => mask.num = true,
                b'i' => mask.int = true,
                _ => {}
            }
            i += 1;
        }
        mask
    }
}

/// Capability domain an opcode belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpcodeCategory {
    /// No-op, logging, assertions and structured control-flow markers
    Control,
    /// Integer/float register manipulation
    Math,
    /// Time, weather, gamerules and dimensions
    World,
    /// Entity queries and mutation
    Entity,
    /// Player messaging, inventory and commands
    Player,
    /// Block get/set
    Block,
    /// Scoreboard objectives
    Scoreboard,
    /// Custom mob definition and lifecycle
    CustomMob,
    /// Advisory scheduling hints
    Misc,
}

macro_rules! opcodes {
    ($(
        $(#[doc = $doc:literal])*
        $name:ident = $id:literal, $wire:literal, $category:ident, $operands:literal;
    )*) => {
        /// Bytecode opcodes
        ///
        /// Ids are fixed by the format: a new version may add entries but
        /// never reassign an existing id.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[repr(u32)]
        pub enum Opcode {
            $(
                $(#[doc = $doc])*
                $name = $id,
            )*
        }

        impl Opcode {
            /// Every opcode in the catalog, in id order
            pub const ALL: &'static [Opcode] = &[$(Self::$name),*];

            /// Look up a catalog entry by its wire id
            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some(Self::$name),)*
                    _ => None,
                }
            }

            /// Opcode name as written by the compiler
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$name => $wire,)*
                }
            }

            /// Capability domain of this opcode
            pub fn category(self) -> OpcodeCategory {
                match self {
                    $(Self::$name => OpcodeCategory::$category,)*
                }
            }

            /// Operand fields this opcode reads
            pub fn operands(self) -> OperandMask {
                match self {
                    $(Self::$name => const { OperandMask::parse($operands) },)*
                }
            }
        }
    };
}

opcodes! {
    // ==================== Control ====================
    /// Do nothing
    Nop = 0, "NOP", Control, "";
    /// Log string A
    Log = 1, "LOG", Control, "a";
    /// Debug-log string A with both numeric operands
    Debug = 2, "DEBUG", Control, "ani";
    /// Fault the invocation when condition A is false
    Assert = 3, "ASSERT", Control, "a";
    /// Evaluate condition A; false suppresses until IF_ELSE/IF_END
    IfBegin = 10, "IF_BEGIN", Control, "a";
    /// Switch between branches
    IfElse = 11, "IF_ELSE", Control, "";
    /// End of conditional
    IfEnd = 12, "IF_END", Control, "";
    /// Loop start marker
    WhileBegin = 13, "WHILE_BEGIN", Control, "a";
    /// Loop condition check (evaluated, never jumps)
    WhileCheck = 14, "WHILE_CHECK", Control, "a";
    /// Loop end marker
    WhileEnd = 15, "WHILE_END", Control, "";
    /// Counter init: reg A = int, end = num (or B)
    ForInit = 16, "FOR_INIT", Control, "abni";
    /// Counter step: reg A += 1 while reg A <= end
    ForIter = 17, "FOR_ITER", Control, "a";
    /// Counter loop end marker
    ForEnd = 18, "FOR_END", Control, "";
    /// Terminate the invocation
    Break = 19, "BREAK", Control, "";
    /// No effect without jump targets
    Continue = 20, "CONTINUE", Control, "";
    /// Terminate the invocation
    Return = 24, "RETURN", Control, "";

    // ==================== World ====================
    /// Set world time to int
    SetTime = 50, "SET_TIME", World, "i";
    /// int reg A = world time
    GetTime = 51, "GET_TIME", World, "a";
    /// Set weather to A
    SetWeather = 52, "SET_WEATHER", World, "a";
    /// string reg A = weather
    GetWeather = 53, "GET_WEATHER", World, "a";
    /// Set gamerule A to B
    SetGamerule = 54, "SET_GAMERULE", World, "ab";
    /// Teleport entities of type A to packed position
    Teleport = 55, "TELEPORT", World, "ai";
    /// Move entities of type A to dimension B
    ChangeDimension = 56, "CHANGE_DIMENSION", World, "ab";

    // ==================== Entities ====================
    /// Spawn entity A at (num, float reg B, 0)
    SpawnEntity = 80, "SPAWN_ENTITY", Entity, "abn";
    /// Remove all entities of type A
    RemoveEntity = 81, "REMOVE_ENTITY", Entity, "a";
    /// int reg A = number of entities of type A
    FindEntities = 82, "FIND_ENTITIES", Entity, "a";
    /// int reg A = number of entities of type A in packed region
    FindEntitiesRegion = 83, "FIND_ENTITIES_REGION", Entity, "ai";
    /// Set NBT path B to num on entities of type A
    SetEntityNbt = 84, "SET_ENTITY_NBT", Entity, "abn";
    /// string reg A = NBT path B of the last entity of type A
    GetEntityNbt = 85, "GET_ENTITY_NBT", Entity, "ab";
    /// Set attribute B to num on entities of type A
    SetEntityAttr = 86, "SET_ENTITY_ATTR", Entity, "abn";
    /// float reg A = attribute B of the last entity of type A
    GetEntityAttr = 87, "GET_ENTITY_ATTR", Entity, "ab";
    /// Apply effect B (amplifier num, duration int) to entities of type A
    AddEffect = 88, "ADD_EFFECT", Entity, "abni";
    /// Clear effect B (all if empty) from entities of type A
    ClearEffect = 89, "CLEAR_EFFECT", Entity, "ab";
    /// Multiply movement speed of entities of type A by num
    MulEntitySpeed = 103, "MUL_ENTITY_SPEED", Entity, "an";

    // ==================== Players ====================
    /// Broadcast A to every player
    Broadcast = 120, "BROADCAST", Player, "a";
    /// Send B to player A
    MessagePlayer = 121, "MESSAGE_PLAYER", Player, "ab";
    /// Give player A int of item B
    GiveItem = 124, "GIVE_ITEM", Player, "abi";
    /// Take int of item B from player A
    TakeItem = 125, "TAKE_ITEM", Player, "abi";
    /// Execute raw command A
    ExecCmd = 129, "EXEC_CMD", Player, "a";
    /// Teleport player A to (num, int, 0)
    TeleportPlayer = 130, "TELEPORT_PLAYER", Player, "ani";

    // ==================== Blocks ====================
    /// Set block at packed position to A
    SetBlock = 200, "SET_BLOCK", Block, "ai";
    /// string reg A = block at packed position
    GetBlock = 201, "GET_BLOCK", Block, "ai";

    // ==================== Scoreboard ====================
    /// Create dummy objective A
    ScoreboardCreate = 240, "SCOREBOARD_CREATE", Scoreboard, "a";
    /// Remove objective A
    ScoreboardRemove = 241, "SCOREBOARD_REMOVE", Scoreboard, "a";

    // ==================== Variables / math ====================
    /// int reg A = int
    VarSet = 360, "VAR_SET", Math, "ai";
    /// Materialise int reg A from the host
    VarGet = 361, "VAR_GET", Math, "a";
    /// int reg A += int
    VarInc = 362, "VAR_INC", Math, "ai";
    /// int reg A -= int
    VarDec = 363, "VAR_DEC", Math, "ai";
    /// int reg A += int
    MathAdd = 364, "MATH_ADD", Math, "ai";
    /// int reg A -= int
    MathSub = 365, "MATH_SUB", Math, "ai";
    /// int reg A *= int
    MathMul = 366, "MATH_MUL", Math, "ai";
    /// int reg A /= int (faults on zero)
    MathDiv = 367, "MATH_DIV", Math, "ai";
    /// int reg B = (int reg A == int)
    CompEq = 368, "COMP_EQ", Math, "abi";
    /// int reg B = (int reg A != int)
    CompNe = 369, "COMP_NE", Math, "abi";
    /// int reg B = (int reg A < int)
    CompLt = 370, "COMP_LT", Math, "abi";
    /// int reg B = (int reg A <= int)
    CompLe = 371, "COMP_LE", Math, "abi";
    /// int reg B = (int reg A > int)
    CompGt = 372, "COMP_GT", Math, "abi";
    /// int reg B = (int reg A >= int)
    CompGe = 373, "COMP_GE", Math, "abi";
    /// int reg A = random in [0, max(1, int))
    RandInt = 374, "RAND_INT", Math, "ai";
    /// float reg A = random in [0, 1)
    RandFloat = 375, "RAND_FLOAT", Math, "a";

    // ==================== Misc ====================
    /// Advisory: host may pause this mod for int milliseconds
    Sleep = 490, "SLEEP", Misc, "i";
    /// Advisory: host may yield
    Yield = 491, "YIELD", Misc, "";

    // ==================== Custom mobs ====================
    /// Register custom mob A with config key B
    RegisterCustomMob = 600, "REGISTER_CUSTOM_MOB", CustomMob, "ab";
    /// Set model file B for mob A
    SetCustomMobModel = 601, "SET_CUSTOM_MOB_MODEL", CustomMob, "ab";
    /// Set texture path B for mob A
    SetCustomMobTexture = 602, "SET_CUSTOM_MOB_TEXTURE", CustomMob, "ab";
    /// Set scale num for mob A
    SetCustomMobSize = 603, "SET_CUSTOM_MOB_SIZE", CustomMob, "an";
    /// Set attribute B to num for mob A
    SetCustomMobAttr = 610, "SET_CUSTOM_MOB_ATTR", CustomMob, "abn";
    /// Set loot table B for mob A
    SetCustomMobLootTable = 611, "SET_CUSTOM_MOB_LOOT_TABLE", CustomMob, "ab";
    /// Equip mob A, B is `slot|item_id`
    SetCustomMobEquip = 612, "SET_CUSTOM_MOB_EQUIP", CustomMob, "ab";
    /// Set AI profile B for mob A
    SetCustomMobAi = 613, "SET_CUSTOM_MOB_AI", CustomMob, "ab";
    /// Spawn mob A at packed position
    SpawnCustomMob = 620, "SPAWN_CUSTOM_MOB", CustomMob, "ai";
    /// Remove every instance of mob A
    RemoveCustomMobs = 621, "REMOVE_CUSTOM_MOBS", CustomMob, "a";
}

impl Opcode {
    /// Wire id of this opcode
    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A single instruction with its fixed four-field operand layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Instruction {
    /// Instruction kind
    pub opcode: Opcode,
    /// String operand A (pool index)
    pub a: ConstantIndex,
    /// String operand B (pool index)
    pub b: ConstantIndex,
    /// Numeric operand
    pub num: f64,
    /// Integer operand
    pub int: i64,
}

impl Instruction {
    /// Create an instruction with every operand zeroed
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            a: ConstantIndex::NONE,
            b: ConstantIndex::NONE,
            num: 0.0,
            int: 0,
        }
    }

    /// Set string operand A
    pub const fn with_a(mut self, a: ConstantIndex) -> Self {
        self.a = a;
        self
    }

    /// Set string operand B
    pub const fn with_b(mut self, b: ConstantIndex) -> Self {
        self.b = b;
        self
    }

    /// Set numeric operand
    pub const fn with_num(mut self, num: f64) -> Self {
        self.num = num;
        self
    }

    /// Set integer operand
    pub const fn with_int(mut self, int: i64) -> Self {
        self.int = int;
        self
    }

    /// Names of operand fields that are set although the opcode ignores them
    pub fn stray_operands(&self) -> Vec<&'static str> {
        let used = self.opcode.operands();
        let mut stray = Vec::new();
        if !used.a && self.a != ConstantIndex::NONE {
            stray.push("a");
        }
        if !used.b && self.b != ConstantIndex::NONE {
            stray.push("b");
        }
        if !used.num && self.num != 0.0 {
            stray.push("num");
        }
        if !used.int && self.int != 0 {
            stray.push("int");
        }
        stray
    }
}
