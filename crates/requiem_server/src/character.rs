use std::fmt;

use bevy_ecs::prelude::*;
use derive_more::{Deref, DerefMut};
use glam::DVec3;
use uuid::Uuid;

use crate::op_level::OpLevel;

/// Stable identity of a character. Survives reconnects; the death registry is
/// keyed by it.
#[derive(Component, Copy, Clone, PartialEq, Eq, Hash, Default, Debug, Deref)]
pub struct CharacterId(pub Uuid);

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Component, Clone, PartialEq, Eq, Default, Debug, Deref, DerefMut)]
pub struct Username(pub String);

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// World position. The z axis is vertical.
#[derive(Component, Copy, Clone, PartialEq, Default, Debug, Deref, DerefMut)]
pub struct Position(pub DVec3);

impl Position {
    pub fn new(pos: impl Into<DVec3>) -> Self {
        Self(pos.into())
    }

    pub fn get(self) -> DVec3 {
        self.0
    }

    pub fn set(&mut self, pos: impl Into<DVec3>) {
        self.0 = pos.into();
    }
}

#[derive(Component, Copy, Clone, PartialEq, PartialOrd, Debug, Deref, DerefMut)]
pub struct Health(pub f32);

impl Default for Health {
    fn default() -> Self {
        Self(100.0)
    }
}

#[derive(Component, Copy, Clone, PartialEq, PartialOrd, Default, Debug, Deref, DerefMut)]
pub struct Armor(pub f32);

/// Weapon ids carried by a character.
#[derive(Component, Clone, PartialEq, Eq, Default, Debug, Deref, DerefMut)]
pub struct Weapons(pub Vec<u32>);

/// Whether the character's stored record says it is dead.
///
/// This is a read-only view for other systems. Only the death state machine
/// changes it, and only after the record store accepted the write.
#[derive(Component, Copy, Clone, PartialEq, Eq, Default, Debug, Deref)]
pub struct IsDead(pub(crate) bool);

impl IsDead {
    pub fn get(self) -> bool {
        self.0
    }
}

/// Components every player character needs for the death lifecycle.
#[derive(Bundle, Default, Debug)]
pub struct CharacterBundle {
    pub id: CharacterId,
    pub username: Username,
    pub position: Position,
    pub health: Health,
    pub armor: Armor,
    pub weapons: Weapons,
    pub is_dead: IsDead,
    pub op_level: OpLevel,
}

impl CharacterBundle {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id: CharacterId(id),
            username: Username(username.into()),
            ..Default::default()
        }
    }
}
