//! The seam to the external document store that owns character records.

use std::fmt;

use bevy_ecs::prelude::*;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::character::CharacterId;

#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum StoreError {
    #[error("record store rejected the write for character {id}: {reason}")]
    Rejected { id: CharacterId, reason: String },
    #[error("record store is unavailable: {0}")]
    Unavailable(String),
}

/// Persistent character records. The death authority writes the `is_dead`
/// flag through this trait but never owns its storage.
pub trait CharacterStore: Send + Sync + 'static {
    /// Returns the stored flag. Characters without a record are alive.
    fn is_dead(&self, id: CharacterId) -> bool;

    /// Persists the flag. On error nothing must have been written.
    fn set_dead(&mut self, id: CharacterId, dead: bool) -> Result<(), StoreError>;
}

/// An in-process [`CharacterStore`].
#[derive(Clone, Default, Debug)]
pub struct MemoryCharacterStore {
    dead: FxHashSet<CharacterId>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CharacterStore for MemoryCharacterStore {
    fn is_dead(&self, id: CharacterId) -> bool {
        self.dead.contains(&id)
    }

    fn set_dead(&mut self, id: CharacterId, dead: bool) -> Result<(), StoreError> {
        if dead {
            self.dead.insert(id);
        } else {
            self.dead.remove(&id);
        }

        Ok(())
    }
}

/// The [`CharacterStore`] used by the death state machine.
#[derive(Resource)]
pub struct CharacterDocuments(Box<dyn CharacterStore>);

impl CharacterDocuments {
    pub fn new(store: impl CharacterStore) -> Self {
        Self(Box::new(store))
    }

    pub fn is_dead(&self, id: CharacterId) -> bool {
        self.0.is_dead(id)
    }

    pub fn set_dead(&mut self, id: CharacterId, dead: bool) -> Result<(), StoreError> {
        self.0.set_dead(id, dead)
    }
}

impl Default for CharacterDocuments {
    fn default() -> Self {
        Self::new(MemoryCharacterStore::new())
    }
}

impl fmt::Debug for CharacterDocuments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharacterDocuments").finish_non_exhaustive()
    }
}
