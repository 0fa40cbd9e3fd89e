//! Host capability contracts
//!
//! The engine never touches game state directly. Every opcode with a side
//! effect maps onto one [`World`] or [`Entity`] call. Calls are synchronous;
//! the host must not re-enter the VM from inside one.

use std::fmt;
use std::sync::Arc;

use pyrium_vm_bytecode::{BlockPos, Region};

use crate::error::{CapabilityError, CapabilityResult};

/// Shared handle to a host entity
pub type EntityRef = Arc<dyn Entity>;

/// A live entity owned by the host
pub trait Entity: Send + Sync + fmt::Debug {
    /// Stable identity for the lifetime of the entity
    fn id(&self) -> u64;

    /// Entity type name (e.g. `Zombie`)
    fn entity_type(&self) -> &str;

    /// Current movement speed
    fn movement_speed(&self) -> f64;

    /// Set movement speed
    fn set_movement_speed(&self, speed: f64) -> CapabilityResult<()>;

    /// Display name
    fn name(&self) -> String;

    /// Set display name
    fn set_name(&self, name: &str) -> CapabilityResult<()>;

    /// Move the entity
    fn teleport(&self, x: f64, y: f64, z: f64) -> CapabilityResult<()>;
}

/// The game world as seen by a mod
///
/// Player teleport and scoreboard operations fall back to raw commands.
/// Custom mob operations are optional and report
/// [`CapabilityError::Unsupported`] unless the host overrides them.
pub trait World: Send + Sync {
    // ==================== Time / weather ====================

    /// Current world time in ticks
    fn time(&self) -> CapabilityResult<i64>;

    /// Set world time in ticks
    fn set_time(&self, ticks: i64) -> CapabilityResult<()>;

    /// Current weather mode
    fn weather(&self) -> CapabilityResult<String>;

    /// Set weather mode
    fn set_weather(&self, mode: &str) -> CapabilityResult<()>;

    /// Set a gamerule
    fn set_gamerule(&self, rule: &str, value: &str) -> CapabilityResult<()>;

    /// Move an entity to another dimension
    fn change_dimension(&self, entity: &EntityRef, dimension: &str) -> CapabilityResult<()>;

    // ==================== Entities ====================

    /// All entities of a type
    fn entities(&self, entity_type: &str) -> CapabilityResult<Vec<EntityRef>>;

    /// Entities of a type inside a region
    fn entities_in_region(
        &self,
        entity_type: &str,
        region: Region,
    ) -> CapabilityResult<Vec<EntityRef>>;

    /// Spawn an entity
    fn spawn_entity(&self, entity_type: &str, x: f64, y: f64, z: f64)
    -> CapabilityResult<EntityRef>;

    /// Remove an entity
    fn remove_entity(&self, entity: &EntityRef) -> CapabilityResult<()>;

    /// Read an NBT path as text
    fn entity_nbt(&self, entity: &EntityRef, path: &str) -> CapabilityResult<String>;

    /// Write an NBT path
    fn set_entity_nbt(&self, entity: &EntityRef, path: &str, value: &str)
    -> CapabilityResult<()>;

    /// Read an attribute
    fn entity_attribute(&self, entity: &EntityRef, attribute: &str) -> CapabilityResult<f64>;

    /// Write an attribute
    fn set_entity_attribute(
        &self,
        entity: &EntityRef,
        attribute: &str,
        value: f64,
    ) -> CapabilityResult<()>;

    /// Apply a status effect
    fn add_effect(
        &self,
        entity: &EntityRef,
        effect: &str,
        amplifier: i32,
        duration_ticks: i64,
    ) -> CapabilityResult<()>;

    /// Clear one effect, or all effects when `effect` is `None`
    fn clear_effect(&self, entity: &EntityRef, effect: Option<&str>) -> CapabilityResult<()>;

    // ==================== Players ====================

    /// Send a message to every player
    fn broadcast(&self, message: &str) -> CapabilityResult<()>;

    /// Send a message to one player
    fn message_player(&self, player: &str, message: &str) -> CapabilityResult<()>;

    /// Add items to a player's inventory
    fn give_item(&self, player: &str, item: &str, count: i64) -> CapabilityResult<()>;

    /// Remove items from a player's inventory
    fn take_item(&self, player: &str, item: &str, count: i64) -> CapabilityResult<()>;

    /// Run a raw server command
    fn exec_command(&self, command: &str) -> CapabilityResult<()>;

    /// Teleport a player
    fn teleport_player(&self, player: &str, x: f64, y: f64, z: f64) -> CapabilityResult<()> {
        self.exec_command(&format!("tp {player} {x} {y} {z}"))
    }

    // ==================== Blocks ====================

    /// Block id at a position
    fn block(&self, pos: BlockPos) -> CapabilityResult<String>;

    /// Place a block
    fn set_block(&self, pos: BlockPos, block: &str) -> CapabilityResult<()>;

    // ==================== Scoreboard ====================

    /// Create a dummy objective
    fn create_objective(&self, name: &str) -> CapabilityResult<()> {
        self.exec_command(&format!("scoreboard objectives add {name} dummy"))
    }

    /// Remove an objective
    fn remove_objective(&self, name: &str) -> CapabilityResult<()> {
        self.exec_command(&format!("scoreboard objectives remove {name}"))
    }

    // ==================== Custom mobs ====================

    /// Register a custom mob type
    fn register_custom_mob(&self, _id: &str, _config_key: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("register_custom_mob"))
    }

    /// Set a custom mob's model file
    fn set_custom_mob_model(&self, _id: &str, _model: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_model"))
    }

    /// Set a custom mob's texture path
    fn set_custom_mob_texture(&self, _id: &str, _texture: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_texture"))
    }

    /// Set a custom mob's scale
    fn set_custom_mob_size(&self, _id: &str, _scale: f64) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_size"))
    }

    /// Set a custom mob attribute
    fn set_custom_mob_attribute(
        &self,
        _id: &str,
        _attribute: &str,
        _value: f64,
    ) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_attribute"))
    }

    /// Set a custom mob's loot table
    fn set_custom_mob_loot_table(&self, _id: &str, _table: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_loot_table"))
    }

    /// Equip a custom mob slot
    fn set_custom_mob_equipment(&self, _id: &str, _slot: &str, _item: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_equipment"))
    }

    /// Set a custom mob's AI profile
    fn set_custom_mob_ai(&self, _id: &str, _profile: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("set_custom_mob_ai"))
    }

    /// Spawn a registered custom mob
    fn spawn_custom_mob(&self, _id: &str, _pos: BlockPos) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("spawn_custom_mob"))
    }

    /// Remove every instance of a custom mob
    fn remove_custom_mobs(&self, _id: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unsupported("remove_custom_mobs"))
    }

    // ==================== Host variables ====================

    /// Export of an integer register write made by `module`
    ///
    /// One-way: exported values are never read back into a VM, so one
    /// mod's registers cannot leak into another's.
    fn export_var(&self, _module: &str, _name: &str, _value: i64) -> CapabilityResult<()> {
        Ok(())
    }
}
