#![doc = include_str!("../README.md")]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::missing_crate_level_docs,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    unreachable_pub,
    clippy::dbg_macro
)]

use bevy_ecs::prelude::*;

pub mod character;
pub mod client;
pub mod clock;
pub mod death;
pub mod event_loop;
pub mod op_level;
pub mod registry;
pub mod revive;
pub mod settings;
pub mod spawn_site;
pub mod status;
pub mod store;

pub use character::{
    Armor, CharacterBundle, CharacterId, Health, IsDead, Position, Username, Weapons,
};
pub use clock::{Clock, EpochMillis, ManualClock, ServerClock, SystemClock};
pub use death::{DeadlineUpdated, DeathSignal, PendingRespawn, Respawned};
pub use registry::DeathRegistry;
pub use settings::{RespawnSettings, SettingsError};
pub use store::{CharacterDocuments, CharacterStore, MemoryCharacterStore, StoreError};
pub use {bevy_app as app, bevy_ecs as ecs, glam, requiem_protocol as protocol, uuid};

/// A marker [`Component`] for entities that should be despawned at the end of
/// the tick.
///
/// Prefer this over despawning directly so that other systems get a chance to
/// see the entity one last time.
#[derive(Component, Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Despawned;
