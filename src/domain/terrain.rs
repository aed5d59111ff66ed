// Terrain height queries over a precomputed grid.

use crate::domain::ports::TerrainQuery;
use serde::Deserialize;

/// Terrain with a constant ground height everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatTerrain {
    pub height: f32,
}

impl TerrainQuery for FlatTerrain {
    fn height_at(&self, _x: f32, _z: f32) -> f32 {
        self.height
    }

    fn slope_at(&self, _x: f32, _z: f32) -> f32 {
        0.0
    }
}

/// Row-major height samples laid out on a regular X/Z grid.
///
/// `heights[row * width + col]` is the height at
/// `(origin_x + col * cell_size, origin_z + row * cell_size)`. Queries outside the
/// grid clamp to the nearest edge sample.
#[derive(Debug, Clone, Deserialize)]
pub struct HeightGrid {
    pub origin_x: f32,
    pub origin_z: f32,
    pub cell_size: f32,
    pub width: usize,
    pub depth: usize,
    pub heights: Vec<f32>,
}

impl HeightGrid {
    /// Checks the sample count matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        self.width >= 2
            && self.depth >= 2
            && self.cell_size > 0.0
            && self.heights.len() == self.width * self.depth
    }

    fn sample(&self, col: usize, row: usize) -> f32 {
        let col = col.min(self.width - 1);
        let row = row.min(self.depth - 1);
        self.heights[row * self.width + col]
    }

    fn grid_coords(&self, x: f32, z: f32) -> (f32, f32) {
        let max_gx = (self.width - 1) as f32;
        let max_gz = (self.depth - 1) as f32;
        let gx = ((x - self.origin_x) / self.cell_size).clamp(0.0, max_gx);
        let gz = ((z - self.origin_z) / self.cell_size).clamp(0.0, max_gz);
        (gx, gz)
    }
}

impl TerrainQuery for HeightGrid {
    fn height_at(&self, x: f32, z: f32) -> f32 {
        let (gx, gz) = self.grid_coords(x, z);
        let col = gx.floor() as usize;
        let row = gz.floor() as usize;
        let fx = gx - col as f32;
        let fz = gz - row as f32;

        // Bilinear blend of the four surrounding samples.
        let h00 = self.sample(col, row);
        let h10 = self.sample(col + 1, row);
        let h01 = self.sample(col, row + 1);
        let h11 = self.sample(col + 1, row + 1);
        let top = h00 + (h10 - h00) * fx;
        let bottom = h01 + (h11 - h01) * fx;
        top + (bottom - top) * fz
    }

    /// Slope in degrees from central differences half a cell either side.
    fn slope_at(&self, x: f32, z: f32) -> f32 {
        let d = self.cell_size * 0.5;
        let dh_dx = (self.height_at(x + d, z) - self.height_at(x - d, z)) / (2.0 * d);
        let dh_dz = (self.height_at(x, z + d) - self.height_at(x, z - d)) / (2.0 * d);
        (dh_dx * dh_dx + dh_dz * dh_dz).sqrt().atan().to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> HeightGrid {
        // Height rises 1 unit per unit along X; flat along Z.
        HeightGrid {
            origin_x: 0.0,
            origin_z: 0.0,
            cell_size: 1.0,
            width: 3,
            depth: 3,
            heights: vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0],
        }
    }

    #[test]
    fn when_querying_between_samples_then_height_is_interpolated() {
        let grid = ramp();

        assert!((grid.height_at(0.5, 0.5) - 0.5).abs() < 1e-5);
        assert!((grid.height_at(1.75, 1.0) - 1.75).abs() < 1e-5);
    }

    #[test]
    fn when_querying_outside_grid_then_height_clamps_to_edge() {
        let grid = ramp();

        assert!((grid.height_at(-10.0, 0.0) - 0.0).abs() < 1e-5);
        assert!((grid.height_at(10.0, 10.0) - 2.0).abs() < 1e-5);
    }

    #[test]
    fn when_terrain_is_a_unit_ramp_then_slope_is_forty_five_degrees() {
        let grid = ramp();

        assert!((grid.slope_at(1.0, 1.0) - 45.0).abs() < 0.01);
    }

    #[test]
    fn when_slope_exceeds_limit_then_spawn_is_invalid() {
        let grid = ramp();

        assert!(!grid.is_valid_spawn(1.0, 1.0, 30.0));
        assert!(grid.is_valid_spawn(1.0, 1.0, 50.0));
        assert!(FlatTerrain::default().is_valid_spawn(5.0, 5.0, 0.0));
    }

    #[test]
    fn when_sample_count_mismatches_then_grid_is_inconsistent() {
        let mut grid = ramp();
        grid.heights.pop();

        assert!(!grid.is_consistent());
    }
}
