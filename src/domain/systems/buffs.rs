use crate::domain::buff::{ActiveBuff, Stat, StatModifiers};
use crate::domain::combat::EntityRef;

/// Owns every active timed modifier in the world.
#[derive(Debug, Default)]
pub struct BuffTracker {
    buffs: Vec<ActiveBuff>,
    next_id: u64,
}

impl BuffTracker {
    pub fn new() -> Self {
        Self {
            buffs: Vec::new(),
            next_id: 1,
        }
    }

    /// Adds a buff. Buffs on the same stat coexist; nothing is merged.
    pub fn apply(
        &mut self,
        skill_id: &str,
        caster: EntityRef,
        target: EntityRef,
        stat: Stat,
        magnitude: f32,
        duration_seconds: f32,
    ) -> ActiveBuff {
        let id = self.next_id.max(1);
        self.next_id = id.wrapping_add(1);
        let buff = ActiveBuff {
            id,
            skill_id: skill_id.to_string(),
            caster,
            target,
            stat,
            magnitude,
            remaining: duration_seconds,
            active: true,
        };
        self.buffs.push(buff.clone());
        buff
    }

    /// Decrements every buff by `dt` and returns the ones that ran out, each
    /// exactly once.
    pub fn tick(&mut self, dt: f32) -> Vec<ActiveBuff> {
        let mut expired = Vec::new();
        self.buffs.retain_mut(|buff| {
            buff.remaining -= dt;
            if buff.remaining <= 0.0 {
                buff.active = false;
                expired.push(buff.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn modifiers(&self, target: EntityRef) -> StatModifiers {
        let mut mods = StatModifiers::default();
        for buff in self.buffs.iter().filter(|b| b.active && b.target == target) {
            mods.add(buff.stat, buff.magnitude);
        }
        mods
    }

    /// Drops every buff held by `target` (disconnect, death of a monster).
    pub fn remove_target(&mut self, target: EntityRef) -> Vec<ActiveBuff> {
        let mut removed = Vec::new();
        self.buffs.retain(|b| {
            if b.target == target {
                removed.push(b.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn for_target(&self, target: EntityRef) -> impl Iterator<Item = &ActiveBuff> {
        self.buffs.iter().filter(move |b| b.target == target)
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: EntityRef = EntityRef::Player(1);

    #[test]
    fn when_ticked_then_remaining_decreases_by_dt_until_removed_once() {
        let mut tracker = BuffTracker::new();
        tracker.apply("rage", ME, ME, Stat::Attack, 10.0, 1.0);

        let mut seen = vec![1.0f32];
        let mut expired_total = 0;
        for _ in 0..6 {
            let expired = tracker.tick(0.25);
            expired_total += expired.len();
            if let Some(b) = tracker.for_target(ME).next() {
                assert!(b.remaining < *seen.last().unwrap());
                assert_eq!(b.remaining, seen.last().unwrap() - 0.25);
                seen.push(b.remaining);
            }
        }

        assert_eq!(seen, vec![1.0, 0.75, 0.5, 0.25]);
        assert_eq!(expired_total, 1);
        assert!(tracker.is_empty());
    }

    #[test]
    fn when_buff_expires_then_it_is_reported_inactive() {
        let mut tracker = BuffTracker::new();
        tracker.apply("haste", ME, ME, Stat::MoveSpeed, 2.0, 0.5);

        assert!(tracker.tick(0.25).is_empty());
        let expired = tracker.tick(0.25);

        assert_eq!(expired.len(), 1);
        assert!(!expired[0].active);
        assert_eq!(expired[0].skill_id, "haste");
    }

    #[test]
    fn when_same_stat_is_buffed_twice_then_magnitudes_stack() {
        let mut tracker = BuffTracker::new();
        tracker.apply("rage", ME, ME, Stat::Attack, 10.0, 5.0);
        tracker.apply("rage", EntityRef::Player(2), ME, Stat::Attack, 4.0, 5.0);
        tracker.apply("shield", ME, EntityRef::Player(2), Stat::Defense, 9.0, 5.0);

        let mods = tracker.modifiers(ME);

        assert_eq!(mods.attack, 14.0);
        assert_eq!(mods.defense, 0.0);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn when_target_leaves_then_its_buffs_are_dropped() {
        let mut tracker = BuffTracker::new();
        tracker.apply("rage", ME, ME, Stat::Attack, 10.0, 5.0);
        tracker.apply("shield", ME, EntityRef::Player(2), Stat::Defense, 9.0, 5.0);

        let removed = tracker.remove_target(ME);

        assert_eq!(removed.len(), 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.tick(10.0).iter().all(|b| b.target != ME));
    }
}
