//! Serverbound packets that touch the death lifecycle.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use requiem_protocol::packets::RespawnRequestC2s;

use crate::death::DeathSignal;
use crate::event_loop::{PacketEvent, RunEventLoopSet};

pub struct StatusPlugin;

impl Plugin for StatusPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DeathSignal>()
            .add_systems(PreUpdate, handle_respawn_request.after(RunEventLoopSet));
    }
}

fn handle_respawn_request(
    mut packets: EventReader<PacketEvent>,
    mut signals: EventWriter<DeathSignal>,
) {
    for packet in packets.read() {
        if packet.decode::<RespawnRequestC2s>().is_some() {
            signals.send(DeathSignal::RespawnRequested {
                entity: packet.client,
            });
        }
    }
}
