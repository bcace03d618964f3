use std::time::Instant;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bytes::{Bytes, BytesMut};
use requiem_protocol::packets::SystemChatS2c;
use requiem_protocol::{Encode, Packet, PacketEncoder, WritePacket};
use tracing::warn;
use uuid::Uuid;

use crate::character::CharacterBundle;
use crate::Despawned;

pub struct ClientPlugin;

/// The [`SystemSet`] in [`PostUpdate`] where clients have their packet buffer
/// flushed. Any system that writes packets to clients should happen _before_
/// this. Otherwise, the data will arrive one tick late.
#[derive(SystemSet, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct FlushPacketsSet;

impl Plugin for ClientPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ClientDespawnSettings>()
            .add_systems(
                PostUpdate,
                (
                    flush_packets.in_set(FlushPacketsSet),
                    despawn_disconnected_clients.after(FlushPacketsSet),
                ),
            )
            .add_systems(Last, despawn_marked_entities);
    }
}

/// A connected player: their character plus the network client.
#[derive(Bundle)]
pub struct ClientBundle {
    pub character: CharacterBundle,
    pub client: Client,
}

impl ClientBundle {
    pub fn new(id: Uuid, username: impl Into<String>, conn: Box<dyn ClientConnection>) -> Self {
        Self {
            character: CharacterBundle::new(id, username),
            client: Client::new(conn),
        }
    }
}

/// The main client component. Contains the underlying network connection and
/// packet buffer.
///
/// The component is removed when the client is disconnected. You are allowed to
/// remove the component yourself.
#[derive(Component)]
pub struct Client {
    conn: Box<dyn ClientConnection>,
    enc: PacketEncoder,
}

/// Represents the bidirectional packet channel between the server and a
/// client.
pub trait ClientConnection: Send + Sync + 'static {
    /// Sends encoded clientbound packet data. This function must not block and
    /// the data should be sent as soon as possible.
    fn try_send(&mut self, bytes: BytesMut) -> anyhow::Result<()>;
    /// Receives the next pending serverbound packet. This must return
    /// immediately without blocking.
    fn try_recv(&mut self) -> anyhow::Result<Option<ReceivedPacket>>;
    /// The number of pending packets waiting to be received via
    /// [`Self::try_recv`].
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug)]
pub struct ReceivedPacket {
    /// The moment in time this packet arrived.
    pub timestamp: Instant,
    /// This packet's ID.
    pub id: i32,
    /// The content of the packet, excluding the leading varint packet ID.
    pub body: Bytes,
}

impl WritePacket for Client {
    fn write_packet_fallible<P>(&mut self, packet: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        self.enc.write_packet_fallible(packet)
    }
}

impl Client {
    pub fn new(conn: Box<dyn ClientConnection>) -> Self {
        Self {
            conn,
            enc: PacketEncoder::new(),
        }
    }

    pub fn connection(&self) -> &dyn ClientConnection {
        self.conn.as_ref()
    }

    pub fn connection_mut(&mut self) -> &mut dyn ClientConnection {
        self.conn.as_mut()
    }

    /// Flushes the packet queue to the underlying connection.
    ///
    /// This is called automatically at the end of the tick. Unless you're in a
    /// hurry, there's usually no reason to flush the client manually.
    pub fn flush_packets(&mut self) -> anyhow::Result<()> {
        let bytes = self.enc.take();
        if bytes.is_empty() {
            Ok(())
        } else {
            self.conn.try_send(bytes)
        }
    }
}

/// Sends system chat lines such as command feedback.
pub trait SendMessage {
    fn send_chat_message(&mut self, msg: impl Into<String>);
}

impl<T: WritePacket> SendMessage for T {
    fn send_chat_message(&mut self, msg: impl Into<String>) {
        self.write_packet(&SystemChatS2c {
            message: msg.into(),
        });
    }
}

#[derive(Resource, Debug)]
pub struct ClientDespawnSettings {
    /// If disconnected clients should automatically have the [`Despawned`]
    /// component added to them. Without this enabled, clients entities must be
    /// removed from the world manually.
    pub despawn_disconnected_clients: bool,
}

impl Default for ClientDespawnSettings {
    fn default() -> Self {
        Self {
            despawn_disconnected_clients: true,
        }
    }
}

fn flush_packets(mut clients: Query<(Entity, &mut Client), Changed<Client>>, mut commands: Commands) {
    for (entity, mut client) in &mut clients {
        if let Err(e) = client.flush_packets() {
            warn!("Failed to flush packet queue for client {entity:?}: {e:#}.");
            commands.entity(entity).remove::<Client>();
        }
    }
}

pub fn despawn_disconnected_clients(
    mut commands: Commands,
    mut disconnected_clients: RemovedComponents<Client>,
    cfg: Res<ClientDespawnSettings>,
) {
    if cfg.despawn_disconnected_clients {
        for entity in disconnected_clients.read() {
            if let Some(mut entity) = commands.get_entity(entity) {
                entity.insert(Despawned);
            }
        }
    }
}

fn despawn_marked_entities(entities: Query<Entity, With<Despawned>>, mut commands: Commands) {
    for entity in &entities {
        commands.entity(entity).despawn();
    }
}
