// Named spawn regions and random spawn point selection.

use crate::domain::ports::TerrainQuery;
use crate::domain::position::Position;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::f32::consts::TAU;

/// Attempts at finding a point under the slope limit before falling back to the center.
const SPAWN_POINT_ATTEMPTS: usize = 30;

fn default_max_slope() -> f32 {
    35.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AreaShape {
    Circle { radius: f32 },
    Rectangle { width: f32, depth: f32 },
}

/// One population line of a spawn area.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnEntry {
    pub monster: String,
    pub count: u32,
    /// Overrides the template respawn time for monsters spawned from this entry.
    #[serde(default)]
    pub respawn_seconds: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnArea {
    pub id: String,
    pub shape: AreaShape,
    pub center: Position,
    #[serde(default = "default_max_slope")]
    pub max_slope: f32,
    #[serde(default)]
    pub populations: Vec<SpawnEntry>,
}

impl SpawnArea {
    pub fn contains(&self, x: f32, z: f32) -> bool {
        match self.shape {
            AreaShape::Circle { radius } => {
                let dx = x - self.center.x;
                let dz = z - self.center.z;
                dx * dx + dz * dz <= radius * radius
            }
            AreaShape::Rectangle { width, depth } => {
                (x - self.center.x).abs() <= width * 0.5 && (z - self.center.z).abs() <= depth * 0.5
            }
        }
    }

    /// Picks a uniformly distributed point inside the area whose slope is spawnable.
    ///
    /// Falls back to the area center when no sampled point passes the slope check.
    pub fn random_point(&self, rng: &mut impl Rng, terrain: &dyn TerrainQuery) -> Position {
        for _ in 0..SPAWN_POINT_ATTEMPTS {
            let (x, z) = match self.shape {
                AreaShape::Circle { radius } => {
                    random_point_in_circle(self.center.x, self.center.z, radius, rng)
                }
                AreaShape::Rectangle { width, depth } => (
                    self.center.x + rng.random_range(-0.5f32..=0.5) * width,
                    self.center.z + rng.random_range(-0.5f32..=0.5) * depth,
                ),
            };
            if terrain.is_valid_spawn(x, z, self.max_slope) {
                return Position::new(x, terrain.height_at(x, z), z);
            }
        }

        let c = self.center;
        Position::new(c.x, terrain.height_at(c.x, c.z), c.z)
    }
}

/// Uniform sample inside a circle. The radius is sqrt-scaled so points do not
/// cluster near the center.
pub fn random_point_in_circle(cx: f32, cz: f32, radius: f32, rng: &mut impl Rng) -> (f32, f32) {
    let angle = rng.random::<f32>() * TAU;
    let r = radius * rng.random::<f32>().sqrt();
    (cx + r * angle.cos(), cz + r * angle.sin())
}

/// Immutable lookup of spawn areas by id.
#[derive(Debug, Clone, Default)]
pub struct SpawnAreaRegistry {
    areas: HashMap<String, SpawnArea>,
}

impl SpawnAreaRegistry {
    pub fn new(areas: Vec<SpawnArea>) -> Self {
        Self {
            areas: areas.into_iter().map(|a| (a.id.clone(), a)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&SpawnArea> {
        self.areas.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpawnArea> {
        self.areas.values()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
