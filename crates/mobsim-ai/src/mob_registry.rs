//! Mob type definitions.
//!
//! A registry of known mob types with their movement, perception, combat and
//! automation tunables. Built-in types are hardcoded; hosts may register more.

use std::sync::Arc;

use mobsim_world::block_registry::{AIR, WHEAT};
use mobsim_world::BlockId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Mob category, which selects the behavior ladder and the spawn cap group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MobCategory {
    Passive,
    Hostile,
    Stationary,
}

/// One loot table entry rolled on death.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEntry {
    pub item: String,
    pub min: u32,
    pub max: u32,
    /// Probability in `0.0..=1.0` that the entry drops at all.
    pub chance: f32,
}

/// An item stack produced by a death roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    pub item: String,
    pub count: u32,
}

/// Settings for stationary units that modify blocks around their anchor.
#[derive(Debug, Clone)]
pub struct AutomationDef {
    /// Half-width of the square footprint scanned around the anchor.
    pub footprint_radius: i32,
    /// Block harvested when mature.
    pub harvest_block: BlockId,
    /// Block placed into empty cells above solid ground. `AIR` disables placing.
    pub place_block: BlockId,
    pub storage_capacity: u32,
    pub interval_min: f64,
    pub interval_max: f64,
}

/// Definition of a mob type. Speeds are blocks per second, angles degrees.
#[derive(Debug, Clone)]
pub struct MobDefinition {
    /// Namespaced identifier, e.g. `"mobsim:zombie"`.
    pub type_id: String,
    pub display_name: String,
    pub category: MobCategory,
    pub max_health: f32,
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Maximum yaw change per second.
    pub turn_rate: f32,
    /// Horizontal collision radius used by crowd separation.
    pub collision_radius: f32,
    pub height: f32,
    /// Wander targets are picked within this distance of the anchor.
    pub wander_radius: f32,
    pub aggro_range: f32,
    pub attack_range: f32,
    /// Hostiles stop closing in once inside this distance.
    pub melee_hold_distance: f32,
    /// Seconds between attacks.
    pub attack_cooldown: f64,
    pub attack_damage: f32,
    /// Flee starts inside this distance (0 disables fleeing).
    pub flee_enter_distance: f32,
    /// Flee ends beyond this distance.
    pub flee_exit_distance: f32,
    pub tempt_items: Vec<String>,
    pub tempt_range: f32,
    /// Tempted mobs stop walking once this close.
    pub tempt_stop_distance: f32,
    /// Seconds a passive mob panics after taking damage.
    pub panic_duration: f64,
    pub drops: Vec<DropEntry>,
    pub automation: Option<AutomationDef>,
}

impl MobDefinition {
    /// A definition with neutral defaults for every tunable.
    pub fn base(type_id: &str, display_name: &str, category: MobCategory) -> Self {
        Self {
            type_id: type_id.into(),
            display_name: display_name.into(),
            category,
            max_health: 10.0,
            walk_speed: 2.0,
            run_speed: 3.5,
            turn_rate: 360.0,
            collision_radius: 0.45,
            height: 1.4,
            wander_radius: 10.0,
            aggro_range: 0.0,
            attack_range: 0.0,
            melee_hold_distance: 0.0,
            attack_cooldown: 1.0,
            attack_damage: 0.0,
            flee_enter_distance: 0.0,
            flee_exit_distance: 0.0,
            tempt_items: Vec::new(),
            tempt_range: 0.0,
            tempt_stop_distance: 1.5,
            panic_duration: 3.0,
            drops: Vec::new(),
            automation: None,
        }
    }

    pub fn tempted_by(&self, item: &str) -> bool {
        self.tempt_items.iter().any(|t| t == item)
    }
}

fn loot(item: &str, min: u32, max: u32, chance: f32) -> DropEntry {
    DropEntry {
        item: item.into(),
        min,
        max,
        chance,
    }
}

/// Roll a loot table. Entries that miss their chance or roll zero are omitted.
pub fn roll_drops(table: &[DropEntry], rng: &mut impl Rng) -> Vec<ItemDrop> {
    table
        .iter()
        .filter_map(|entry| {
            if rng.gen::<f32>() >= entry.chance {
                return None;
            }
            let count = if entry.max > entry.min {
                rng.gen_range(entry.min..=entry.max)
            } else {
                entry.min
            };
            (count > 0).then(|| ItemDrop {
                item: entry.item.clone(),
                count,
            })
        })
        .collect()
}

/// Registry of supported mob types.
pub struct MobRegistry {
    mobs: Vec<Arc<MobDefinition>>,
}

impl Default for MobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MobRegistry {
    /// Build the registry with all built-in mob types.
    pub fn new() -> Self {
        let cow = MobDefinition {
            max_health: 10.0,
            walk_speed: 2.0,
            run_speed: 4.0,
            collision_radius: 0.45,
            height: 1.4,
            flee_enter_distance: 0.0,
            tempt_items: vec!["mobsim:wheat".into()],
            tempt_range: 10.0,
            drops: vec![loot("mobsim:leather", 0, 2, 1.0), loot("mobsim:beef", 1, 3, 1.0)],
            ..MobDefinition::base("mobsim:cow", "Cow", MobCategory::Passive)
        };
        let pig = MobDefinition {
            max_health: 10.0,
            walk_speed: 2.5,
            run_speed: 4.0,
            collision_radius: 0.45,
            height: 0.9,
            tempt_items: vec!["mobsim:carrot".into()],
            tempt_range: 10.0,
            drops: vec![loot("mobsim:porkchop", 1, 3, 1.0)],
            ..MobDefinition::base("mobsim:pig", "Pig", MobCategory::Passive)
        };
        let chicken = MobDefinition {
            max_health: 4.0,
            walk_speed: 2.5,
            run_speed: 4.5,
            collision_radius: 0.2,
            height: 0.7,
            wander_radius: 8.0,
            flee_enter_distance: 4.0,
            flee_exit_distance: 9.0,
            tempt_items: vec!["mobsim:wheat_seeds".into()],
            tempt_range: 8.0,
            drops: vec![loot("mobsim:feather", 0, 2, 1.0), loot("mobsim:chicken", 1, 1, 1.0)],
            ..MobDefinition::base("mobsim:chicken", "Chicken", MobCategory::Passive)
        };
        let sheep = MobDefinition {
            max_health: 8.0,
            walk_speed: 2.3,
            run_speed: 4.0,
            collision_radius: 0.45,
            height: 1.3,
            flee_enter_distance: 3.0,
            flee_exit_distance: 7.0,
            tempt_items: vec!["mobsim:wheat".into()],
            tempt_range: 10.0,
            drops: vec![loot("mobsim:wool", 1, 1, 1.0), loot("mobsim:mutton", 1, 2, 1.0)],
            ..MobDefinition::base("mobsim:sheep", "Sheep", MobCategory::Passive)
        };
        let zombie = MobDefinition {
            max_health: 20.0,
            walk_speed: 2.3,
            run_speed: 3.2,
            collision_radius: 0.3,
            height: 1.95,
            wander_radius: 12.0,
            aggro_range: 16.0,
            attack_range: 2.0,
            melee_hold_distance: 1.2,
            attack_cooldown: 1.0,
            attack_damage: 3.0,
            drops: vec![loot("mobsim:rotten_flesh", 0, 2, 1.0), loot("mobsim:iron_ingot", 1, 1, 0.025)],
            ..MobDefinition::base("mobsim:zombie", "Zombie", MobCategory::Hostile)
        };
        let skeleton = MobDefinition {
            max_health: 20.0,
            walk_speed: 2.5,
            run_speed: 3.0,
            collision_radius: 0.3,
            height: 1.99,
            wander_radius: 12.0,
            aggro_range: 16.0,
            attack_range: 2.5,
            melee_hold_distance: 1.5,
            attack_cooldown: 1.5,
            attack_damage: 2.0,
            drops: vec![loot("mobsim:bone", 0, 2, 1.0), loot("mobsim:arrow", 0, 2, 1.0)],
            ..MobDefinition::base("mobsim:skeleton", "Skeleton", MobCategory::Hostile)
        };
        let harvester = MobDefinition {
            max_health: 30.0,
            walk_speed: 0.0,
            run_speed: 0.0,
            collision_radius: 0.5,
            height: 1.0,
            wander_radius: 0.0,
            panic_duration: 0.0,
            automation: Some(AutomationDef {
                footprint_radius: 2,
                harvest_block: WHEAT,
                place_block: AIR,
                storage_capacity: 64,
                interval_min: 2.0,
                interval_max: 3.0,
            }),
            ..MobDefinition::base("mobsim:harvester", "Harvester", MobCategory::Stationary)
        };
        Self {
            mobs: [cow, pig, chicken, sheep, zombie, skeleton, harvester]
                .into_iter()
                .map(Arc::new)
                .collect(),
        }
    }

    /// Look up a mob definition by its type identifier.
    pub fn get(&self, type_id: &str) -> Option<&Arc<MobDefinition>> {
        self.mobs.iter().find(|m| m.type_id == type_id)
    }

    /// All known mob definitions.
    pub fn all(&self) -> &[Arc<MobDefinition>] {
        &self.mobs
    }

    /// Register a custom mob type, replacing any existing one with the same id.
    pub fn register_mob(&mut self, def: MobDefinition) {
        self.mobs.retain(|m| m.type_id != def.type_id);
        self.mobs.push(Arc::new(def));
    }

    /// Definitions that natural spawning may pick for a category.
    pub fn of_category(&self, category: MobCategory) -> impl Iterator<Item = &Arc<MobDefinition>> {
        self.mobs.iter().filter(move |m| m.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn registry_has_builtins() {
        let reg = MobRegistry::new();
        assert_eq!(reg.all().len(), 7);
        assert_eq!(reg.of_category(MobCategory::Passive).count(), 4);
        assert_eq!(reg.of_category(MobCategory::Hostile).count(), 2);
    }

    #[test]
    fn get_zombie() {
        let reg = MobRegistry::new();
        let z = reg.get("mobsim:zombie").unwrap();
        assert_eq!(z.display_name, "Zombie");
        assert_eq!(z.category, MobCategory::Hostile);
        assert!(z.melee_hold_distance < z.attack_range);
    }

    #[test]
    fn get_unknown_none() {
        let reg = MobRegistry::new();
        assert!(reg.get("mobsim:enderman").is_none());
    }

    #[test]
    fn flee_hysteresis_is_wider() {
        let reg = MobRegistry::new();
        for def in reg.all() {
            if def.flee_enter_distance > 0.0 {
                assert!(def.flee_exit_distance > def.flee_enter_distance, "{}", def.type_id);
            }
        }
    }

    #[test]
    fn harvester_has_automation() {
        let reg = MobRegistry::new();
        let h = reg.get("mobsim:harvester").unwrap();
        assert_eq!(h.category, MobCategory::Stationary);
        assert_eq!(h.automation.as_ref().unwrap().harvest_block, WHEAT);
    }

    #[test]
    fn register_replaces_same_id() {
        let mut reg = MobRegistry::new();
        let mut cow = MobDefinition::base("mobsim:cow", "Big Cow", MobCategory::Passive);
        cow.max_health = 50.0;
        reg.register_mob(cow);
        assert_eq!(reg.all().len(), 7);
        assert_eq!(reg.get("mobsim:cow").unwrap().max_health, 50.0);
    }

    #[test]
    fn tempted_by_item() {
        let reg = MobRegistry::new();
        let cow = reg.get("mobsim:cow").unwrap();
        assert!(cow.tempted_by("mobsim:wheat"));
        assert!(!cow.tempted_by("mobsim:carrot"));
    }

    #[test]
    fn roll_drops_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let table = vec![loot("a", 1, 3, 1.0), loot("never", 1, 1, 0.0)];
        for _ in 0..50 {
            let drops = roll_drops(&table, &mut rng);
            assert_eq!(drops.len(), 1);
            assert_eq!(drops[0].item, "a");
            assert!((1..=3).contains(&drops[0].count));
        }
    }

    #[test]
    fn zero_count_rolls_are_omitted() {
        let mut rng = StdRng::seed_from_u64(1);
        let table = vec![loot("none", 0, 0, 1.0)];
        assert!(roll_drops(&table, &mut rng).is_empty());
    }
}
