use std::time::Instant;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bytes::Bytes;
use requiem_protocol::{Decode, Packet};
use tracing::{debug, warn};

use crate::client::Client;

pub struct EventLoopPlugin;

/// The [`SystemSet`] in [`PreUpdate`] where received packets are turned into
/// [`PacketEvent`]s. Systems that decode packets should run after it.
#[derive(SystemSet, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RunEventLoopSet;

impl Plugin for EventLoopPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PacketEvent>()
            .add_systems(PreUpdate, run_event_loop.in_set(RunEventLoopSet));
    }
}

#[derive(Event, Clone, Debug)]
pub struct PacketEvent {
    /// The client this packet originated from.
    pub client: Entity,
    /// The moment in time this packet arrived.
    pub timestamp: Instant,
    /// This packet's ID.
    pub id: i32,
    /// The content of the packet, excluding the leading varint packet ID.
    pub data: Bytes,
}

impl PacketEvent {
    /// Attempts to decode this packet as the packet `P`.
    ///
    /// If the packet ID is mismatched or an error occurs, `None` is returned.
    /// Otherwise, `Some` is returned containing the decoded packet.
    #[inline]
    pub fn decode<'a, P>(&'a self) -> Option<P>
    where
        P: Packet + Decode<'a>,
    {
        if self.id == P::ID {
            let mut r = &self.data[..];

            match P::decode(&mut r) {
                Ok(pkt) => {
                    if r.is_empty() {
                        return Some(pkt);
                    }

                    warn!(
                        "missed {} bytes while decoding packet {} (ID = {})",
                        r.len(),
                        P::NAME,
                        P::ID
                    );
                    debug!("complete packet after partial decode: {pkt:?}");
                }
                Err(e) => {
                    warn!("failed to decode packet with ID of {}: {e:#}", P::ID);
                }
            }
        }

        None
    }
}

/// Drains every client's connection into [`PacketEvent`]s. Clients whose
/// connection errors are considered disconnected and lose their [`Client`].
fn run_event_loop(
    mut clients: Query<(Entity, &mut Client)>,
    mut packets: EventWriter<PacketEvent>,
    mut commands: Commands,
) {
    for (entity, mut client) in &mut clients {
        loop {
            match client.connection_mut().try_recv() {
                Ok(Some(pkt)) => {
                    packets.send(PacketEvent {
                        client: entity,
                        timestamp: pkt.timestamp,
                        id: pkt.id,
                        data: pkt.body,
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("disconnecting client: {e:#}");
                    commands.entity(entity).remove::<Client>();
                    break;
                }
            }
        }
    }
}
