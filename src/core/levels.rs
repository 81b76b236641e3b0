// Maps accumulated XP to a level. Implementations must be monotonic
// non-decreasing in `total_xp` and never return less than 1.
pub trait LevelCurve: Sync {
    fn level_for(&self, total_xp: u64) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLevelCurve;

impl LevelCurve for StandardLevelCurve {
    fn level_for(&self, total_xp: u64) -> u32 {
        let level = (total_xp as f64 / 20.0).sqrt().floor();
        (level as u32).max(1)
    }
}
