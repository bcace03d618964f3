//! The `revive` administrator command.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use tracing::{debug, warn};

use crate::character::{CharacterId, IsDead, Position, Username};
use crate::client::{Client, SendMessage};
use crate::death::{DeathSignal, EmitDeathSignalsSet};
use crate::op_level::OpLevel;
use crate::Despawned;

/// Op level required to run `revive`.
pub const REVIVE_OP_LEVEL: u8 = 3;

pub const NO_PERMISSION: &str = "You do not have permission to use this command.";
pub const CANNOT_FIND_PLAYER: &str = "Cannot find player.";

pub struct RevivePlugin;

impl Plugin for RevivePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<ReviveCommand>()
            .add_event::<DeathSignal>()
            .add_systems(Update, handle_revive_command.in_set(EmitDeathSignalsSet));
    }
}

/// A parsed `revive [target]` invocation.
#[derive(Event, Clone, PartialEq, Eq, Debug)]
pub struct ReviveCommand {
    /// The player who ran the command.
    pub issuer: Entity,
    /// Username or character id of the player to revive. `None` revives the
    /// issuer.
    pub target: Option<String>,
}

type Revivable = (
    Entity,
    &'static CharacterId,
    &'static Username,
    &'static Position,
    &'static IsDead,
);

fn handle_revive_command(
    mut revives: EventReader<ReviveCommand>,
    mut clients: Query<&mut Client>,
    ops: Query<&OpLevel>,
    characters: Query<Revivable, Without<Despawned>>,
    mut signals: EventWriter<DeathSignal>,
) {
    for command in revives.read() {
        let authorized = ops
            .get(command.issuer)
            .is_ok_and(|lvl| lvl.at_least(REVIVE_OP_LEVEL));

        if !authorized {
            warn!("{:?} is not allowed to revive", command.issuer);
            reply(&mut clients, command.issuer, NO_PERMISSION);
            continue;
        }

        let target = match &command.target {
            None => Some(command.issuer),
            Some(name) => find_target(&characters, name),
        };

        let Some((entity, id, username, position, is_dead)) =
            target.and_then(|e| characters.get(e).ok())
        else {
            reply(&mut clients, command.issuer, CANNOT_FIND_PLAYER);
            continue;
        };

        if !is_dead.get() {
            debug!("({id}) {username} is alive, nothing to revive");
            continue;
        }

        signals.send(DeathSignal::Revive {
            entity,
            position: Some(position.get()),
        });
    }
}

/// Resolves a username (ASCII case-insensitive) or a character id.
fn find_target(characters: &Query<Revivable, Without<Despawned>>, name: &str) -> Option<Entity> {
    characters
        .iter()
        .find(|(_, id, username, _, _)| {
            username.eq_ignore_ascii_case(name) || id.to_string().eq_ignore_ascii_case(name)
        })
        .map(|(entity, ..)| entity)
}

fn reply(clients: &mut Query<&mut Client>, issuer: Entity, msg: &str) {
    if let Ok(mut client) = clients.get_mut(issuer) {
        client.send_chat_message(msg);
    }
}
