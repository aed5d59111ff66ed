use serde::{Deserialize, Serialize};

/// World-space position. Y is up; all range checks are planar (X/Z only).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn planar_distance(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Steps toward `target` on the X/Z plane by at most `max_step`.
    ///
    /// Returns true when the step reached the target. Y is left untouched so the
    /// caller can reproject it from terrain.
    pub fn step_towards(&mut self, target: &Position, max_step: f32) -> bool {
        let distance = self.planar_distance(target);
        if distance <= max_step || distance <= f32::EPSILON {
            self.x = target.x;
            self.z = target.z;
            return true;
        }

        let scale = max_step / distance;
        self.x += (target.x - self.x) * scale;
        self.z += (target.z - self.z) * scale;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_positions_differ_in_height_then_planar_distance_ignores_y() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 50.0, 4.0);

        assert!((a.planar_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn when_step_is_shorter_than_distance_then_position_advances_without_overshoot() {
        let mut p = Position::new(0.0, 0.0, 0.0);
        let target = Position::new(10.0, 0.0, 0.0);

        let arrived = p.step_towards(&target, 4.0);

        assert!(!arrived);
        assert!((p.x - 4.0).abs() < 1e-6);
        assert_eq!(p.z, 0.0);
    }

    #[test]
    fn when_step_exceeds_distance_then_position_snaps_to_target() {
        let mut p = Position::new(0.0, 0.0, 0.0);
        let target = Position::new(1.0, 0.0, 1.0);

        assert!(p.step_towards(&target, 10.0));
        assert_eq!((p.x, p.z), (1.0, 1.0));
    }
}
