use bevy_ecs::prelude::*;

/// The permission level of a player. Commands with a required level can only
/// be run by players at or above it.
#[derive(Component, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub struct OpLevel(u8);

impl OpLevel {
    /// The highest level. Administrators have it.
    pub const MAX: u8 = 3;

    pub fn new(lvl: u8) -> Self {
        Self(lvl.min(Self::MAX))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Sets the op level. Value is clamped to `0..=3`.
    pub fn set(&mut self, lvl: u8) {
        self.0 = lvl.min(Self::MAX);
    }

    pub fn at_least(self, required: u8) -> bool {
        self.0 >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_clamped() {
        let mut lvl = OpLevel::new(9);
        assert_eq!(lvl.get(), OpLevel::MAX);

        lvl.set(1);
        assert!(lvl.at_least(1));
        assert!(!lvl.at_least(2));
    }
}
