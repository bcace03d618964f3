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

use bevy_app::{PluginGroup, PluginGroupBuilder};

#[cfg(feature = "testing")]
pub mod testing;


#[cfg(feature = "log")]
pub use bevy_log as log;
pub use requiem_client as mirror;
use requiem_server::client::ClientPlugin;
use requiem_server::death::DeathPlugin;
use requiem_server::event_loop::EventLoopPlugin;
use requiem_server::revive::RevivePlugin;
use requiem_server::status::StatusPlugin;
pub use requiem_server::*;

/// Contains the most frequently used items in requiem projects.
///
/// This is usually glob imported like so:
///
/// ```
/// use requiem::prelude::*; // Glob import.
///
/// let mut app = App::new();
/// app.add_systems(Update, || println!("yippee!"));
/// // ...
/// ```
pub mod prelude {
    pub use bevy_app::prelude::*;
    pub use bevy_ecs; // Needed for bevy_ecs macros to function correctly.
    pub use bevy_ecs::prelude::*;
    pub use glam::DVec3;
    pub use requiem_client::{ClientSession, CountdownMirror, MirrorSettings, MirrorView};
    pub use requiem_server::character::{
        Armor, CharacterBundle, CharacterId, Health, IsDead, Position, Username, Weapons,
    };
    pub use requiem_server::client::{
        despawn_disconnected_clients, Client, ClientBundle, ClientConnection, SendMessage,
    };
    pub use requiem_server::clock::{EpochMillis, ManualClock, ServerClock};
    pub use requiem_server::death::{DeadlineUpdated, DeathSignal, PendingRespawn, Respawned};
    pub use requiem_server::event_loop::PacketEvent;
    pub use requiem_server::op_level::OpLevel;
    pub use requiem_server::registry::DeathRegistry;
    pub use requiem_server::revive::ReviveCommand;
    pub use requiem_server::settings::RespawnSettings;
    pub use requiem_server::store::{CharacterDocuments, CharacterStore};
    pub use requiem_server::Despawned;
    pub use uuid::Uuid;

    pub use super::DefaultPlugins;
}

/// This plugin group will add all the default plugins for a requiem
/// application.
///
/// [`DefaultPlugins`] obeys Cargo feature flags. Disable the `log` feature to
/// install your own `tracing` subscriber.
pub struct DefaultPlugins;

impl PluginGroup for DefaultPlugins {
    fn build(self) -> PluginGroupBuilder {
        #[allow(unused_mut)]
        let mut group = PluginGroupBuilder::start::<Self>()
            .add(ClientPlugin)
            .add(EventLoopPlugin)
            .add(StatusPlugin)
            .add(DeathPlugin)
            .add(RevivePlugin);

        #[cfg(feature = "log")]
        {
            group = group.add(bevy_log::LogPlugin::default());
        }

        group
    }
}
