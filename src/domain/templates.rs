// Immutable game data: monster/skill/item templates, classes and spawn areas.

use crate::domain::buff::Stat;
use crate::domain::errors::DataError;
use crate::domain::ports::TerrainQuery;
use crate::domain::position::Position;
use crate::domain::spawn::{SpawnArea, SpawnAreaRegistry};
use crate::domain::terrain::{FlatTerrain, HeightGrid};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

fn default_respawn_seconds() -> f32 {
    30.0
}

fn default_max_level() -> u32 {
    99
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatrolBehavior {
    /// Stays at (and returns to) its spawn point.
    #[default]
    Stationary,
    /// Picks random points within `radius` of home.
    Wander { radius: f32 },
    /// Walks the four cardinal points `distance` away from home.
    Patrol { distance: f32 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonsterTemplate {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub max_health: u32,
    pub attack: f32,
    pub defense: f32,
    pub move_speed: f32,
    /// Seconds between attacks.
    pub attack_speed: f32,
    pub aggro_range: f32,
    #[serde(default)]
    pub patrol: PatrolBehavior,
    pub experience: u64,
    #[serde(default = "default_respawn_seconds")]
    pub respawn_seconds: f32,
}

/// Per-skill stat coefficients; power = base + sum(stat * coefficient).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct StatScaling {
    pub strength: f32,
    pub intelligence: f32,
    pub dexterity: f32,
    pub vitality: f32,
    pub level: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillTarget {
    /// Always the caster; no target id needed.
    Caster,
    /// A living player (the caster when no target id is given).
    Ally,
    /// Exactly one living monster.
    Enemy,
    /// Every living monster within `radius` of the primary target (or of the
    /// caster when none is given), nearest first, up to `max_targets`.
    EnemyArea {
        radius: f32,
        #[serde(default)]
        max_targets: Option<usize>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillEffect {
    Damage {
        base: f32,
        #[serde(default)]
        scaling: StatScaling,
    },
    Heal {
        base: f32,
        #[serde(default)]
        scaling: StatScaling,
    },
    Buff {
        stat: Stat,
        magnitude: f32,
        duration_seconds: f32,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mana_cost: u32,
    #[serde(default)]
    pub health_cost: u32,
    pub cooldown_seconds: f32,
    /// Maximum planar distance to the primary target.
    #[serde(default)]
    pub range: f32,
    pub target: SkillTarget,
    pub effect: SkillEffect,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    Consumable {
        #[serde(default)]
        heal_health: u32,
        #[serde(default)]
        heal_mana: u32,
        cooldown_seconds: f32,
    },
    Material,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemTemplate {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct PrimaryStats {
    pub strength: u32,
    pub dexterity: u32,
    pub intelligence: u32,
    pub vitality: u32,
}

impl PrimaryStats {
    pub fn grow(&mut self, by: &PrimaryStats) {
        self.strength += by.strength;
        self.dexterity += by.dexterity;
        self.intelligence += by.intelligence;
        self.vitality += by.vitality;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartingItem {
    pub item: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassConfig {
    pub base_health: u32,
    pub health_per_level: u32,
    pub base_mana: u32,
    pub mana_per_level: u32,
    pub base_attack: f32,
    pub base_defense: f32,
    /// Seconds between auto-attacks before dexterity reduction.
    pub attack_speed: f32,
    pub move_speed: f32,
    pub base_stats: PrimaryStats,
    /// Primary stats gained per level.
    pub growth: PrimaryStats,
    #[serde(default)]
    pub starting_skills: Vec<String>,
    #[serde(default)]
    pub starting_items: Vec<StartingItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldSettings {
    pub player_spawn: Position,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

// On-disk layout; lists are indexed by id after validation.
#[derive(Debug, Deserialize)]
struct GameDataFile {
    world: WorldSettings,
    #[serde(default)]
    classes: HashMap<String, ClassConfig>,
    #[serde(default)]
    monsters: Vec<MonsterTemplate>,
    #[serde(default)]
    skills: Vec<SkillTemplate>,
    #[serde(default)]
    items: Vec<ItemTemplate>,
    #[serde(default)]
    spawn_areas: Vec<SpawnArea>,
    #[serde(default)]
    terrain: Option<HeightGrid>,
}

/// Every template the simulation reads. Loaded once, swapped wholesale on reload.
#[derive(Clone)]
pub struct GameData {
    pub world: WorldSettings,
    pub classes: HashMap<String, ClassConfig>,
    pub monsters: HashMap<String, MonsterTemplate>,
    pub skills: HashMap<String, SkillTemplate>,
    pub items: HashMap<String, ItemTemplate>,
    pub spawn_areas: SpawnAreaRegistry,
    pub terrain: Arc<dyn TerrainQuery>,
}

impl std::fmt::Debug for GameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameData")
            .field("classes", &self.classes.len())
            .field("monsters", &self.monsters.len())
            .field("skills", &self.skills.len())
            .field("items", &self.items.len())
            .field("spawn_areas", &self.spawn_areas.len())
            .finish()
    }
}

fn index_by_id<T>(
    kind: &'static str,
    list: Vec<T>,
    id: impl Fn(&T) -> &str,
) -> Result<HashMap<String, T>, DataError> {
    let mut map = HashMap::with_capacity(list.len());
    for entry in list {
        let key = id(&entry).to_string();
        if map.contains_key(&key) {
            return Err(DataError::Duplicate { kind, id: key });
        }
        map.insert(key, entry);
    }
    Ok(map)
}

impl GameData {
    pub fn from_toml_str(raw: &str) -> Result<Self, DataError> {
        let file: GameDataFile = toml::from_str(raw)?;

        let monsters = index_by_id("monster", file.monsters, |m| &m.id)?;
        let skills = index_by_id("skill", file.skills, |s| &s.id)?;
        let items = index_by_id("item", file.items, |i| &i.id)?;

        let mut area_ids = std::collections::HashSet::new();
        for area in &file.spawn_areas {
            if !area_ids.insert(area.id.as_str()) {
                return Err(DataError::Duplicate {
                    kind: "spawn area",
                    id: area.id.clone(),
                });
            }
            if let Some(entry) = area
                .populations
                .iter()
                .find(|e| !monsters.contains_key(&e.monster))
            {
                return Err(DataError::UnknownMonster {
                    area: area.id.clone(),
                    monster: entry.monster.clone(),
                });
            }
        }

        for (name, class) in &file.classes {
            if let Some(skill) = class.starting_skills.iter().find(|s| !skills.contains_key(*s)) {
                return Err(DataError::UnknownClassRef {
                    class: name.clone(),
                    kind: "skill",
                    id: skill.clone(),
                });
            }
            if let Some(item) = class
                .starting_items
                .iter()
                .find(|i| !items.contains_key(&i.item))
            {
                return Err(DataError::UnknownClassRef {
                    class: name.clone(),
                    kind: "item",
                    id: item.item.clone(),
                });
            }
        }

        let terrain: Arc<dyn TerrainQuery> = match file.terrain {
            Some(grid) if grid.is_consistent() => Arc::new(grid),
            Some(_) => return Err(DataError::InvalidTerrain),
            None => Arc::new(FlatTerrain::default()),
        };

        Ok(Self {
            world: file.world,
            classes: file.classes,
            monsters,
            skills,
            items,
            spawn_areas: SpawnAreaRegistry::new(file.spawn_areas),
            terrain,
        })
    }
}
