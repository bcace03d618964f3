use std::time::{Duration, Instant};

use crate::mirror::{ClientSession, MirrorSettings, MirrorView, RespawnAttempt};
use crate::prelude::*;
use crate::protocol::packets::RespawnRequestC2s;
use crate::protocol::PacketDecoder;
use crate::testing::{MockClientHelper, ScenarioSingleClient};

/// Moves everything the session wants to send into the server's inbox.
fn forward_requests(session: &mut ClientSession, helper: &mut MockClientHelper) -> usize {
    let mut dec = PacketDecoder::new();
    dec.queue_bytes(session.take_outgoing());

    let mut count = 0;

    while let Some(frame) = dec.try_next_packet().unwrap() {
        helper.send(&frame.decode::<RespawnRequestC2s>().unwrap());
        count += 1;
    }

    count
}

#[test]
fn client_follows_server_countdown() {
    let ScenarioSingleClient {
        mut app,
        client,
        mut helper,
        clock,
    } = ScenarioSingleClient::new();

    let mut session = ClientSession::new(MirrorSettings::default());
    let local = Instant::now();

    app.world_mut().get_mut::<Health>(client).unwrap().0 = 0.0;
    app.update();

    session.receive(&helper.take_raw(), local).unwrap();

    assert!(session.mirror().is_dead());
    assert_eq!(
        session.tick(local),
        MirrorView::Countdown { seconds_left: 10 }
    );

    // Four seconds in the key does nothing.
    let local = local + Duration::from_millis(4_000);
    clock.advance(Duration::from_millis(4_000));
    assert_eq!(
        session.press_respawn_key(local, false),
        RespawnAttempt::TooEarly
    );
    assert_eq!(session.tick(local), MirrorView::Countdown { seconds_left: 6 });

    // The countdown is over.
    let local = local + Duration::from_millis(6_001);
    clock.advance(Duration::from_millis(6_001));
    assert_eq!(session.tick(local), MirrorView::RespawnPrompt);
    assert_eq!(
        session.press_respawn_key(local, false),
        RespawnAttempt::Started {
            camera_switch: Duration::from_millis(2_000)
        }
    );

    // The request goes out after the camera switch started.
    session.tick(local + Duration::from_millis(500));
    assert_eq!(forward_requests(&mut session, &mut helper), 0);

    let local = local + Duration::from_millis(1_000);
    clock.advance(Duration::from_millis(1_000));
    session.tick(local);
    assert_eq!(forward_requests(&mut session, &mut helper), 1);

    app.update();

    session.receive(&helper.take_raw(), local).unwrap();

    assert_eq!(session.tick(local), MirrorView::Hidden);
    assert!(session.last_respawn().is_some());
    assert!(!app.world().get::<IsDead>(client).unwrap().get());
}

#[test]
fn skewed_client_clock_cannot_respawn_early() {
    let ScenarioSingleClient {
        mut app,
        client,
        mut helper,
        clock,
    } = ScenarioSingleClient::new();

    app.world_mut().get_mut::<Health>(client).unwrap().0 = 0.0;
    app.update();
    helper.clear_received();

    // A modified client sends the request right away.
    clock.advance(Duration::from_millis(3_000));
    helper.send(&RespawnRequestC2s);
    app.update();

    assert!(app.world().get::<IsDead>(client).unwrap().get());
    assert!(helper.collect_received().is_empty());
}

#[test]
fn revive_message_reaches_chat_log() {
    let ScenarioSingleClient {
        mut app,
        client,
        mut helper,
        ..
    } = ScenarioSingleClient::new();

    app.world_mut().send_event(ReviveCommand {
        issuer: client,
        target: None,
    });
    app.update();

    let mut session = ClientSession::new(MirrorSettings::default());
    session.receive(&helper.take_raw(), Instant::now()).unwrap();

    assert_eq!(session.chat_log(), [crate::revive::NO_PERMISSION]);
}
