//! The death state machine.
//!
//! Every character is either alive (no record in the [`DeathRegistry`]) or
//! dead with a deadline. Transitions are driven by [`DeathSignal`]s which are
//! all handled by one system, in the order they were sent.

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryData;
use bevy_ecs::system::SystemParam;
use glam::DVec3;
use requiem_protocol::packets::{DeathStateS2c, DeathTimerS2c, RespawnS2c};
use requiem_protocol::WritePacket;
use tracing::{debug, error, info};

use crate::character::{Armor, CharacterId, Health, IsDead, Position, Username, Weapons};
use crate::client::Client;
use crate::clock::{EpochMillis, ServerClock};
use crate::registry::DeathRegistry;
use crate::settings::RespawnSettings;
use crate::spawn_site::nearest_respawn_site;
use crate::store::CharacterDocuments;
use crate::Despawned;

pub struct DeathPlugin;

/// Systems that produce [`DeathSignal`]s during [`Update`]. Runs before
/// [`UpdateDeathSet`].
#[derive(SystemSet, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EmitDeathSignalsSet;

/// The [`SystemSet`] in [`Update`] where death signals are handled and
/// pending respawns are finalized.
#[derive(SystemSet, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct UpdateDeathSet;

impl Plugin for DeathPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DeathRegistry>()
            .init_resource::<CharacterDocuments>()
            .init_resource::<ServerClock>()
            .init_resource::<RespawnSettings>()
            .add_event::<DeathSignal>()
            .add_event::<DeadlineUpdated>()
            .add_event::<Respawned>()
            .configure_sets(Update, EmitDeathSignalsSet.before(UpdateDeathSet))
            .add_systems(
                Update,
                (signal_character_loaded, detect_lethal_health).in_set(EmitDeathSignalsSet),
            )
            .add_systems(
                Update,
                (handle_death_signals, finalize_pending_respawns)
                    .chain()
                    .in_set(UpdateDeathSet),
            )
            .add_systems(
                Update,
                cancel_pending_on_disconnect.before(UpdateDeathSet),
            );
    }
}

/// Everything that can move a character through the death lifecycle.
#[derive(Event, Copy, Clone, PartialEq, Debug)]
pub enum DeathSignal {
    /// The character took lethal damage.
    Died { entity: Entity },
    /// The character was loaded or re-selected.
    CharacterSelected { entity: Entity },
    /// The character's client asked to respawn. Only honored once the deadline
    /// has passed.
    RespawnRequested { entity: Entity },
    /// Administrative revive. Skips the deadline. With a position the
    /// character is put exactly there, otherwise a respawn site is chosen.
    Revive {
        entity: Entity,
        position: Option<DVec3>,
    },
}

impl DeathSignal {
    pub fn entity(&self) -> Entity {
        match *self {
            DeathSignal::Died { entity }
            | DeathSignal::CharacterSelected { entity }
            | DeathSignal::RespawnRequested { entity }
            | DeathSignal::Revive { entity, .. } => entity,
        }
    }
}

/// Sent whenever a character's respawn deadline is (re)announced.
#[derive(Event, Copy, Clone, PartialEq, Eq, Debug)]
pub struct DeadlineUpdated {
    pub entity: Entity,
    pub id: CharacterId,
    pub deadline: EpochMillis,
    /// `deadline - now` at the moment of sending. This is what the client
    /// receives.
    pub ms_remaining: i64,
}

/// Sent once a character is alive again.
#[derive(Event, Copy, Clone, PartialEq, Debug)]
pub struct Respawned {
    pub entity: Entity,
    pub id: CharacterId,
    pub position: DVec3,
}

/// A natural respawn that was accepted and is waiting out the grace pause.
///
/// Removing this component abandons the respawn; the character stays dead.
#[derive(Component, Copy, Clone, PartialEq, Debug)]
pub struct PendingRespawn {
    pub position: DVec3,
    pub finalize_at: EpochMillis,
}

#[derive(QueryData)]
#[query_data(mutable)]
pub struct DeathQuery {
    pub entity: Entity,
    pub id: &'static CharacterId,
    pub username: &'static Username,
    pub position: &'static mut Position,
    pub health: &'static mut Health,
    pub armor: &'static mut Armor,
    pub weapons: &'static mut Weapons,
    pub is_dead: &'static mut IsDead,
    pub client: Option<&'static mut Client>,
    pub pending: Option<&'static PendingRespawn>,
}

#[derive(SystemParam)]
struct DeathAuthority<'w, 's> {
    registry: ResMut<'w, DeathRegistry>,
    store: ResMut<'w, CharacterDocuments>,
    clock: Res<'w, ServerClock>,
    settings: Res<'w, RespawnSettings>,
    deadlines: EventWriter<'w, DeadlineUpdated>,
    respawns: EventWriter<'w, Respawned>,
    commands: Commands<'w, 's>,
}

impl DeathAuthority<'_, '_> {
    /// Alive -> Dead, or re-announces the deadline of a character that is
    /// already dead. The deadline is never extended.
    ///
    /// The timer is re-sent on every call so the client can re-arm its
    /// respawn key.
    fn mark_dead(&mut self, character: &mut DeathQueryItem) {
        let id = *character.id;

        if let Err(e) = self.store.set_dead(id, true) {
            error!("could not set {} ({id}) to dead: {e}", character.username);
            return;
        }

        let now = self.clock.now();
        let had_record = self.registry.contains(id);
        let deadline = self
            .registry
            .record_death(id, now, self.settings.respawn_delay());

        if had_record {
            debug!("({id}) {} is already dead until {deadline}", character.username);
        } else {
            info!("({id}) {} has died, respawn allowed at {deadline}", character.username);
        }

        let ms_remaining = deadline.millis_since(now);
        let became_dead = !character.is_dead.0;

        if became_dead {
            character.is_dead.0 = true;
        }

        if let Some(client) = character.client.as_deref_mut() {
            if became_dead {
                client.write_packet(&DeathStateS2c { is_dead: true });
            }
            client.write_packet(&DeathTimerS2c { ms_remaining });
        }

        self.deadlines.send(DeadlineUpdated {
            entity: character.entity,
            id,
            deadline,
            ms_remaining,
        });
    }

    fn character_selected(&mut self, character: &mut DeathQueryItem) {
        let id = *character.id;

        // An outstanding record keeps the character dead regardless of health.
        if self.settings.is_lethal(character.health.0) || self.registry.contains(id) {
            self.mark_dead(character);
            return;
        }

        // Healthy and no record, e.g. after a restart lost the registry. A
        // stale stored flag is cleared before anything else changes.
        if self.store.is_dead(id) {
            if let Err(e) = self.store.set_dead(id, false) {
                error!("could not set {} ({id}) to alive: {e}", character.username);
                return;
            }

            info!("({id}) {} loaded healthy, clearing stale death flag", character.username);
        }

        if character.is_dead.0 {
            character.is_dead.0 = false;
        }

        if let Some(client) = character.client.as_deref_mut() {
            client.write_packet(&DeathStateS2c { is_dead: false });
        }
    }

    fn respawn_requested(&mut self, character: &mut DeathQueryItem) {
        let id = *character.id;

        if !self.store.is_dead(id) {
            debug!("({id}) requested a respawn but is not dead");
            return;
        }

        let Some(deadline) = self.registry.deadline(id) else {
            debug!("({id}) requested a respawn but has no death record");
            return;
        };

        let now = self.clock.now();

        if now < deadline {
            debug!(
                "({id}) requested a respawn {}ms too early",
                deadline.millis_since(now)
            );
            return;
        }

        if character.pending.is_some() {
            debug!("({id}) already has a respawn pending");
            return;
        }

        self.begin_natural_respawn(character, now);
    }

    fn revive(&mut self, character: &mut DeathQueryItem, position: Option<DVec3>) {
        let id = *character.id;

        if !self.store.is_dead(id) {
            debug!("({id}) is not dead, nothing to revive");
            return;
        }

        match position {
            Some(position) => {
                if character.pending.is_some() {
                    self.commands
                        .entity(character.entity)
                        .remove::<PendingRespawn>();
                }

                self.finish_respawn(character, position);
            }
            None if character.pending.is_some() => {
                debug!("({id}) already has a respawn pending");
            }
            None => {
                let now = self.clock.now();
                self.begin_natural_respawn(character, now);
            }
        }
    }

    /// Picks the respawn site and applies the natural-path policies.
    fn begin_natural_respawn(&mut self, character: &mut DeathQueryItem, now: EpochMillis) {
        let from = character.position.0;
        let sites = &self.settings.respawn_sites;
        let site = nearest_respawn_site(from, sites).map_or(from, |i| sites[i]);

        if self.settings.clear_weapons_on_respawn {
            character.weapons.clear();
        }

        let grace = self.settings.respawn_grace();

        if grace.is_zero() {
            self.finish_respawn(character, site);
        } else {
            self.commands
                .entity(character.entity)
                .insert(PendingRespawn {
                    position: site,
                    finalize_at: now.after(grace),
                });
        }
    }

    /// Dead -> Alive. Nothing changes if the record store rejects the write.
    fn finish_respawn(&mut self, character: &mut DeathQueryItem, position: DVec3) {
        let id = *character.id;

        if let Err(e) = self.store.set_dead(id, false) {
            error!("could not set {} ({id}) to alive: {e}", character.username);
            return;
        }

        self.registry.clear(id);

        let health = self.settings.respawn_health;

        character.position.0 = position;
        character.health.0 = health;
        character.armor.0 = self.settings.respawn_armor;
        character.is_dead.0 = false;

        if let Some(client) = character.client.as_deref_mut() {
            client.write_packet(&DeathStateS2c { is_dead: false });
            client.write_packet(&RespawnS2c {
                x: position.x,
                y: position.y,
                z: position.z,
                health,
            });
        }

        info!("({id}) {} respawned at {position}", character.username);

        self.respawns.send(Respawned {
            entity: character.entity,
            id,
            position,
        });
    }
}

fn handle_death_signals(
    mut signals: EventReader<DeathSignal>,
    mut characters: Query<DeathQuery, Without<Despawned>>,
    mut authority: DeathAuthority,
) {
    for signal in signals.read() {
        let Ok(mut character) = characters.get_mut(signal.entity()) else {
            debug!("ignoring {signal:?} for an entity that is gone");
            continue;
        };

        match *signal {
            DeathSignal::Died { .. } => authority.mark_dead(&mut character),
            DeathSignal::CharacterSelected { .. } => authority.character_selected(&mut character),
            DeathSignal::RespawnRequested { .. } => authority.respawn_requested(&mut character),
            DeathSignal::Revive { position, .. } => authority.revive(&mut character, position),
        }
    }
}

fn finalize_pending_respawns(
    mut characters: Query<DeathQuery, (With<PendingRespawn>, Without<Despawned>)>,
    mut authority: DeathAuthority,
) {
    let now = authority.clock.now();

    for mut character in &mut characters {
        let Some(pending) = character.pending.copied() else {
            continue;
        };

        if now < pending.finalize_at {
            continue;
        }

        authority
            .commands
            .entity(character.entity)
            .remove::<PendingRespawn>();

        // Revived some other way in the meantime.
        if !authority.store.is_dead(*character.id) {
            continue;
        }

        authority.finish_respawn(&mut character, pending.position);
    }
}

fn signal_character_loaded(
    characters: Query<Entity, Added<CharacterId>>,
    mut signals: EventWriter<DeathSignal>,
) {
    for entity in &characters {
        signals.send(DeathSignal::CharacterSelected { entity });
    }
}

fn detect_lethal_health(
    characters: Query<(Entity, Ref<Health>, &IsDead), (Changed<Health>, Without<Despawned>)>,
    settings: Res<RespawnSettings>,
    mut signals: EventWriter<DeathSignal>,
) {
    for (entity, health, is_dead) in &characters {
        // Freshly loaded characters are handled by `CharacterSelected`.
        if health.is_added() || is_dead.get() {
            continue;
        }

        if settings.is_lethal(health.0) {
            signals.send(DeathSignal::Died { entity });
        }
    }
}

/// Runs before pending respawns are finalized so a client lost in `PreUpdate`
/// never respawns on the same tick.
fn cancel_pending_on_disconnect(
    mut disconnected: RemovedComponents<Client>,
    pending: Query<(), With<PendingRespawn>>,
    mut commands: Commands,
) {
    for entity in disconnected.read() {
        if pending.contains(entity) {
            commands.entity(entity).remove::<PendingRespawn>();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;
    use crate::character::CharacterBundle;
    use crate::clock::ManualClock;
    use crate::store::{CharacterStore, StoreError};

    struct RejectingStore;

    impl CharacterStore for RejectingStore {
        fn is_dead(&self, _id: CharacterId) -> bool {
            false
        }

        fn set_dead(&mut self, id: CharacterId, _dead: bool) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                id,
                reason: "read only".into(),
            })
        }
    }

    fn setup() -> (App, ManualClock, Entity) {
        let clock = ManualClock::new(EpochMillis(50_000));
        let mut app = App::new();

        app.add_plugins(DeathPlugin)
            .insert_resource(ServerClock::new(clock.clone()));

        let entity = app
            .world_mut()
            .spawn(CharacterBundle::new(Uuid::from_u128(1), "ghost"))
            .id();

        app.update();

        (app, clock, entity)
    }

    #[test]
    fn headless_character_dies_and_respawns() {
        let (mut app, clock, entity) = setup();

        app.world_mut().send_event(DeathSignal::Died { entity });
        app.update();

        let id = *app.world().get::<CharacterId>(entity).unwrap();
        assert!(app.world().get::<IsDead>(entity).unwrap().get());
        assert_eq!(
            app.world().resource::<DeathRegistry>().deadline(id),
            Some(EpochMillis(60_000))
        );

        clock.advance(Duration::from_millis(10_000));
        app.world_mut()
            .send_event(DeathSignal::RespawnRequested { entity });
        app.update();

        assert!(!app.world().get::<IsDead>(entity).unwrap().get());
        assert!(!app.world().resource::<DeathRegistry>().contains(id));
    }

    #[test]
    fn rejected_store_write_leaves_character_alive() {
        let (mut app, _clock, entity) = setup();

        app.insert_resource(CharacterDocuments::new(RejectingStore));
        app.world_mut().send_event(DeathSignal::Died { entity });
        app.update();

        let id = *app.world().get::<CharacterId>(entity).unwrap();
        assert!(!app.world().get::<IsDead>(entity).unwrap().get());
        assert!(!app.world().resource::<DeathRegistry>().contains(id));
        assert!(app.world_mut().resource_mut::<Events<DeadlineUpdated>>().is_empty());
    }

    #[test]
    fn signal_entity() {
        let entity = Entity::from_raw(42);

        for signal in [
            DeathSignal::Died { entity },
            DeathSignal::CharacterSelected { entity },
            DeathSignal::RespawnRequested { entity },
            DeathSignal::Revive {
                entity,
                position: None,
            },
        ] {
            assert_eq!(signal.entity(), entity);
        }
    }
}
