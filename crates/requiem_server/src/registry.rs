use std::time::Duration;

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::character::CharacterId;
use crate::clock::EpochMillis;

/// Per-character respawn deadlines for every character that is currently
/// dead.
///
/// No entry means "alive, no pending timer". Entries are created on death,
/// read when a respawn is requested and removed on respawn. The map is never
/// iterated.
#[derive(Resource, Default, Debug)]
pub struct DeathRegistry {
    deadlines: FxHashMap<CharacterId, EpochMillis>,
}

impl DeathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a death and returns the deadline after which a respawn is
    /// honored.
    ///
    /// If the character already has a deadline it is returned unchanged, so
    /// duplicate death signals never extend the timer.
    pub fn record_death(
        &mut self,
        id: CharacterId,
        now: EpochMillis,
        respawn_delay: Duration,
    ) -> EpochMillis {
        *self
            .deadlines
            .entry(id)
            .or_insert_with(|| now.after(respawn_delay))
    }

    /// The current deadline, or `None` if the character is not dead.
    pub fn deadline(&self, id: CharacterId) -> Option<EpochMillis> {
        self.deadlines.get(&id).copied()
    }

    pub fn contains(&self, id: CharacterId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Removes the record. Does nothing if there is none.
    pub fn clear(&mut self, id: CharacterId) {
        self.deadlines.remove(&id);
    }
}
