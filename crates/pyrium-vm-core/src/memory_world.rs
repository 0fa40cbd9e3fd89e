//! In-process [`World`] implementation
//!
//! Keeps all state in memory behind a single lock. Used as the demo host by
//! the CLI and as the world for engine tests; every side effect is recorded
//! so it can be inspected afterwards.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use pyrium_vm_bytecode::{BlockPos, Region};
use rustc_hash::FxHashMap;

use crate::error::{CapabilityError, CapabilityResult};
use crate::world::{Entity, EntityRef, World};

/// Block id reported for positions that were never set
pub const AIR: &str = "minecraft:air";

/// Movement speed given to spawned entities
pub const DEFAULT_SPEED: f64 = 0.23;

#[derive(Debug)]
struct EntityState {
    position: [f64; 3],
    speed: f64,
    name: String,
}

/// An entity living in a [`MemoryWorld`]
#[derive(Debug)]
pub struct MemoryEntity {
    id: u64,
    entity_type: String,
    custom_mob: Option<String>,
    state: Mutex<EntityState>,
}

impl MemoryEntity {
    fn new(id: u64, entity_type: &str, position: [f64; 3], speed: f64) -> Self {
        Self {
            id,
            entity_type: entity_type.to_owned(),
            custom_mob: None,
            state: Mutex::new(EntityState {
                position,
                speed,
                name: entity_type.to_owned(),
            }),
        }
    }

    /// Current position
    pub fn position(&self) -> [f64; 3] {
        self.state.lock().position
    }

    /// Custom mob id this entity was spawned from
    pub fn custom_mob(&self) -> Option<&str> {
        self.custom_mob.as_deref()
    }
}

impl Entity for MemoryEntity {
    fn id(&self) -> u64 {
        self.id
    }

    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn movement_speed(&self) -> f64 {
        self.state.lock().speed
    }

    fn set_movement_speed(&self, speed: f64) -> CapabilityResult<()> {
        self.state.lock().speed = speed;
        Ok(())
    }

    fn name(&self) -> String {
        self.state.lock().name.clone()
    }

    fn set_name(&self, name: &str) -> CapabilityResult<()> {
        self.state.lock().name = name.to_owned();
        Ok(())
    }

    fn teleport(&self, x: f64, y: f64, z: f64) -> CapabilityResult<()> {
        self.state.lock().position = [x, y, z];
        Ok(())
    }
}

/// Definition collected by the custom mob opcodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomMob {
    /// Config key given at registration
    pub config_key: String,
    /// Model file
    pub model: Option<String>,
    /// Texture path
    pub texture: Option<String>,
    /// Scale
    pub size: Option<f64>,
    /// Attribute overrides
    pub attributes: FxHashMap<String, f64>,
    /// Loot table
    pub loot_table: Option<String>,
    /// Equipment by slot
    pub equipment: FxHashMap<String, String>,
    /// AI profile
    pub ai: Option<String>,
}

#[derive(Debug, Default)]
struct WorldState {
    time: i64,
    weather: String,
    gamerules: FxHashMap<String, String>,
    entities: Vec<Arc<MemoryEntity>>,
    dimensions: FxHashMap<u64, String>,
    nbt: FxHashMap<(u64, String), String>,
    attributes: FxHashMap<(u64, String), f64>,
    effects: FxHashMap<u64, Vec<(String, i32, i64)>>,
    blocks: FxHashMap<BlockPos, String>,
    vars: FxHashMap<(String, String), i64>,
    broadcasts: Vec<String>,
    messages: Vec<(String, String)>,
    commands: Vec<String>,
    inventories: FxHashMap<(String, String), i64>,
    custom_mobs: FxHashMap<String, CustomMob>,
}

/// A complete world kept in memory
#[derive(Debug)]
pub struct MemoryWorld {
    state: Mutex<WorldState>,
    next_id: AtomicU64,
}

impl Default for MemoryWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWorld {
    /// Create an empty world with clear weather at time 0
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WorldState {
                weather: "clear".to_owned(),
                ..WorldState::default()
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add an entity directly, bypassing the mod API
    pub fn add_entity(&self, entity_type: &str, position: [f64; 3], speed: f64) -> Arc<MemoryEntity> {
        let entity = Arc::new(MemoryEntity::new(self.allocate_id(), entity_type, position, speed));
        self.state.lock().entities.push(Arc::clone(&entity));
        entity
    }

    /// Entities of a type, in spawn order
    pub fn entities_of(&self, entity_type: &str) -> Vec<Arc<MemoryEntity>> {
        self.state
            .lock()
            .entities
            .iter()
            .filter(|e| e.entity_type == entity_type)
            .cloned()
            .collect()
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.state.lock().entities.len()
    }

    /// Current world time
    pub fn current_time(&self) -> i64 {
        self.state.lock().time
    }

    /// Current weather
    pub fn current_weather(&self) -> String {
        self.state.lock().weather.clone()
    }

    /// Gamerule value
    pub fn gamerule(&self, rule: &str) -> Option<String> {
        self.state.lock().gamerules.get(rule).cloned()
    }

    /// Dimension an entity was moved to
    pub fn dimension_of(&self, entity_id: u64) -> Option<String> {
        self.state.lock().dimensions.get(&entity_id).cloned()
    }

    /// Active effects on an entity as `(effect, amplifier, duration)`
    pub fn effects_of(&self, entity_id: u64) -> Vec<(String, i32, i64)> {
        self.state
            .lock()
            .effects
            .get(&entity_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Block id at a position
    pub fn block_at(&self, pos: BlockPos) -> String {
        self.state
            .lock()
            .blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(|| AIR.to_owned())
    }

    /// Last integer value `module` exported under `name`
    pub fn host_var(&self, module: &str, name: &str) -> Option<i64> {
        self.state
            .lock()
            .vars
            .get(&(module.to_owned(), name.to_owned()))
            .copied()
    }

    /// Broadcast messages in order
    pub fn broadcasts(&self) -> Vec<String> {
        self.state.lock().broadcasts.clone()
    }

    /// Direct messages as `(player, message)`
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state.lock().messages.clone()
    }

    /// Raw commands in order
    pub fn commands(&self) -> Vec<String> {
        self.state.lock().commands.clone()
    }

    /// Item count held by a player
    pub fn inventory(&self, player: &str, item: &str) -> i64 {
        self.state
            .lock()
            .inventories
            .get(&(player.to_owned(), item.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    /// Registered custom mob definition
    pub fn custom_mob(&self, id: &str) -> Option<CustomMob> {
        self.state.lock().custom_mobs.get(id).cloned()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn with_custom_mob(
        &self,
        id: &str,
        f: impl FnOnce(&mut CustomMob),
    ) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        let mob = state
            .custom_mobs
            .get_mut(id)
            .ok_or_else(|| CapabilityError::not_found(format!("custom mob '{id}'")))?;
        f(mob);
        Ok(())
    }
}

fn as_entity(entity: Arc<MemoryEntity>) -> EntityRef {
    entity
}

impl World for MemoryWorld {
    fn time(&self) -> CapabilityResult<i64> {
        Ok(self.current_time())
    }

    fn set_time(&self, ticks: i64) -> CapabilityResult<()> {
        self.state.lock().time = ticks;
        Ok(())
    }

    fn weather(&self) -> CapabilityResult<String> {
        Ok(self.current_weather())
    }

    fn set_weather(&self, mode: &str) -> CapabilityResult<()> {
        self.state.lock().weather = mode.to_owned();
        Ok(())
    }

    fn set_gamerule(&self, rule: &str, value: &str) -> CapabilityResult<()> {
        self.state
            .lock()
            .gamerules
            .insert(rule.to_owned(), value.to_owned());
        Ok(())
    }

    fn change_dimension(&self, entity: &EntityRef, dimension: &str) -> CapabilityResult<()> {
        self.state
            .lock()
            .dimensions
            .insert(entity.id(), dimension.to_owned());
        Ok(())
    }

    fn entities(&self, entity_type: &str) -> CapabilityResult<Vec<EntityRef>> {
        Ok(self
            .entities_of(entity_type)
            .into_iter()
            .map(as_entity)
            .collect())
    }

    fn entities_in_region(
        &self,
        entity_type: &str,
        region: Region,
    ) -> CapabilityResult<Vec<EntityRef>> {
        Ok(self
            .entities_of(entity_type)
            .into_iter()
            .filter(|e| {
                let [x, y, z] = e.position();
                region.contains(x, y, z)
            })
            .map(as_entity)
            .collect())
    }

    fn spawn_entity(
        &self,
        entity_type: &str,
        x: f64,
        y: f64,
        z: f64,
    ) -> CapabilityResult<EntityRef> {
        if entity_type.is_empty() {
            return Err(CapabilityError::host("empty entity type"));
        }
        Ok(as_entity(self.add_entity(entity_type, [x, y, z], DEFAULT_SPEED)))
    }

    fn remove_entity(&self, entity: &EntityRef) -> CapabilityResult<()> {
        let id = entity.id();
        let mut state = self.state.lock();
        state.entities.retain(|e| e.id != id);
        state.dimensions.remove(&id);
        state.effects.remove(&id);
        state.nbt.retain(|(owner, _), _| *owner != id);
        state.attributes.retain(|(owner, _), _| *owner != id);
        Ok(())
    }

    fn entity_nbt(&self, entity: &EntityRef, path: &str) -> CapabilityResult<String> {
        Ok(self
            .state
            .lock()
            .nbt
            .get(&(entity.id(), path.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    fn set_entity_nbt(&self, entity: &EntityRef, path: &str, value: &str) -> CapabilityResult<()> {
        self.state
            .lock()
            .nbt
            .insert((entity.id(), path.to_owned()), value.to_owned());
        Ok(())
    }

    fn entity_attribute(&self, entity: &EntityRef, attribute: &str) -> CapabilityResult<f64> {
        if attribute == "generic.movement_speed" {
            return Ok(entity.movement_speed());
        }
        Ok(self
            .state
            .lock()
            .attributes
            .get(&(entity.id(), attribute.to_owned()))
            .copied()
            .unwrap_or(0.0))
    }

    fn set_entity_attribute(
        &self,
        entity: &EntityRef,
        attribute: &str,
        value: f64,
    ) -> CapabilityResult<()> {
        if attribute == "generic.movement_speed" {
            return entity.set_movement_speed(value);
        }
        self.state
            .lock()
            .attributes
            .insert((entity.id(), attribute.to_owned()), value);
        Ok(())
    }

    fn add_effect(
        &self,
        entity: &EntityRef,
        effect: &str,
        amplifier: i32,
        duration_ticks: i64,
    ) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        let effects = state.effects.entry(entity.id()).or_default();
        effects.retain(|(name, _, _)| name != effect);
        effects.push((effect.to_owned(), amplifier, duration_ticks));
        Ok(())
    }

    fn clear_effect(&self, entity: &EntityRef, effect: Option<&str>) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        match effect {
            Some(effect) => {
                if let Some(effects) = state.effects.get_mut(&entity.id()) {
                    effects.retain(|(name, _, _)| name != effect);
                }
            }
            None => {
                state.effects.remove(&entity.id());
            }
        }
        Ok(())
    }

    fn broadcast(&self, message: &str) -> CapabilityResult<()> {
        self.state.lock().broadcasts.push(message.to_owned());
        Ok(())
    }

    fn message_player(&self, player: &str, message: &str) -> CapabilityResult<()> {
        self.state
            .lock()
            .messages
            .push((player.to_owned(), message.to_owned()));
        Ok(())
    }

    fn give_item(&self, player: &str, item: &str, count: i64) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        let held = state
            .inventories
            .entry((player.to_owned(), item.to_owned()))
            .or_insert(0);
        *held = held.saturating_add(count);
        Ok(())
    }

    fn take_item(&self, player: &str, item: &str, count: i64) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        let held = state
            .inventories
            .entry((player.to_owned(), item.to_owned()))
            .or_insert(0);
        *held = held.saturating_sub(count).max(0);
        Ok(())
    }

    fn exec_command(&self, command: &str) -> CapabilityResult<()> {
        self.state.lock().commands.push(command.to_owned());
        Ok(())
    }

    fn block(&self, pos: BlockPos) -> CapabilityResult<String> {
        Ok(self.block_at(pos))
    }

    fn set_block(&self, pos: BlockPos, block: &str) -> CapabilityResult<()> {
        self.state.lock().blocks.insert(pos, block.to_owned());
        Ok(())
    }

    fn register_custom_mob(&self, id: &str, config_key: &str) -> CapabilityResult<()> {
        self.state.lock().custom_mobs.insert(
            id.to_owned(),
            CustomMob {
                config_key: config_key.to_owned(),
                ..CustomMob::default()
            },
        );
        Ok(())
    }

    fn set_custom_mob_model(&self, id: &str, model: &str) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| mob.model = Some(model.to_owned()))
    }

    fn set_custom_mob_texture(&self, id: &str, texture: &str) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| mob.texture = Some(texture.to_owned()))
    }

    fn set_custom_mob_size(&self, id: &str, scale: f64) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| mob.size = Some(scale))
    }

    fn set_custom_mob_attribute(&self, id: &str, attribute: &str, value: f64) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| {
            mob.attributes.insert(attribute.to_owned(), value);
        })
    }

    fn set_custom_mob_loot_table(&self, id: &str, table: &str) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| mob.loot_table = Some(table.to_owned()))
    }

    fn set_custom_mob_equipment(&self, id: &str, slot: &str, item: &str) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| {
            mob.equipment.insert(slot.to_owned(), item.to_owned());
        })
    }

    fn set_custom_mob_ai(&self, id: &str, profile: &str) -> CapabilityResult<()> {
        self.with_custom_mob(id, |mob| mob.ai = Some(profile.to_owned()))
    }

    fn spawn_custom_mob(&self, id: &str, pos: BlockPos) -> CapabilityResult<()> {
        let speed = {
            let state = self.state.lock();
            let mob = state
                .custom_mobs
                .get(id)
                .ok_or_else(|| CapabilityError::not_found(format!("custom mob '{id}'")))?;
            mob.attributes
                .get("generic.movement_speed")
                .copied()
                .unwrap_or(DEFAULT_SPEED)
        };

        let mut entity = MemoryEntity::new(
            self.allocate_id(),
            id,
            [f64::from(pos.x), f64::from(pos.y), f64::from(pos.z)],
            speed,
        );
        entity.custom_mob = Some(id.to_owned());
        self.state.lock().entities.push(Arc::new(entity));
        Ok(())
    }

    fn remove_custom_mobs(&self, id: &str) -> CapabilityResult<()> {
        self.state
            .lock()
            .entities
            .retain(|e| e.custom_mob.as_deref() != Some(id));
        Ok(())
    }

    fn export_var(&self, module: &str, name: &str, value: i64) -> CapabilityResult<()> {
        self.state
            .lock()
            .vars
            .insert((module.to_owned(), name.to_owned()), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_query() {
        let world = MemoryWorld::new();
        world.add_entity("Cow", [5.0, 2.0, 3.0], 0.2);
        world.add_entity("Cow", [50.0, 2.0, 3.0], 0.2);
        world.add_entity("Pig", [5.0, 2.0, 3.0], 0.2);

        let region = Region::unpack(1 | (2 << 16) | (3 << 32) | (9 << 48));
        assert_eq!(world.entities_in_region("Cow", region).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_entity_drops_side_tables() {
        let world = MemoryWorld::new();
        let cow: EntityRef = world.add_entity("Cow", [0.0; 3], 0.2);
        world.set_entity_nbt(&cow, "Tags", "x").unwrap();
        world.add_effect(&cow, "speed", 1, 20).unwrap();

        world.remove_entity(&cow).unwrap();

        assert_eq!(world.entity_count(), 0);
        assert!(world.effects_of(cow.id()).is_empty());
        assert_eq!(world.entity_nbt(&cow, "Tags").unwrap(), "");
    }

    #[test]
    fn test_entity_name() {
        let world = MemoryWorld::new();
        let sheep = world.add_entity("Sheep", [0.0; 3], 0.2);
        assert_eq!(sheep.name(), "Sheep");
        sheep.set_name("jeb_").unwrap();
        assert_eq!(sheep.name(), "jeb_");
    }

    #[test]
    fn test_custom_mob_requires_registration() {
        let world = MemoryWorld::new();
        assert!(matches!(
            world.set_custom_mob_model("boss", "boss.geo"),
            Err(CapabilityError::NotFound(_))
        ));

        world.register_custom_mob("boss", "mobs.boss").unwrap();
        world.set_custom_mob_model("boss", "boss.geo").unwrap();
        world.spawn_custom_mob("boss", BlockPos::new(1, 2, 3)).unwrap();
        assert_eq!(world.entities_of("boss")[0].custom_mob(), Some("boss"));

        world.remove_custom_mobs("boss").unwrap();
        assert_eq!(world.entity_count(), 0);
    }
}
