use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bevy_app::prelude::*;
use bevy_ecs::prelude::*;
use bytes::{Buf, BufMut, BytesMut};
use requiem_protocol::decode::PacketFrame;
use requiem_protocol::{Decode, Encode, Packet, PacketDecoder, VarInt};
use requiem_server::client::{ClientBundle, ClientConnection, ReceivedPacket};
use requiem_server::clock::{EpochMillis, ManualClock, ServerClock};
use uuid::Uuid;

use crate::DefaultPlugins;

/// Time the [`ManualClock`] of a [`ScenarioSingleClient`] starts at.
pub const SCENARIO_START: EpochMillis = EpochMillis(1_700_000_000_000);

/// A death authority with one living character attached to a fake
/// connection.
pub struct ScenarioSingleClient {
    pub app: App,
    /// The character's entity. It starts alive at full health.
    pub client: Entity,
    /// Plays the remote side of the character's connection.
    pub helper: MockClientHelper,
    /// Shared with the app. Deadlines only pass when a test advances it.
    pub clock: ManualClock,
}

impl ScenarioSingleClient {
    /// Default settings, clock at [`SCENARIO_START`]. The character has
    /// already been selected and its alive notice discarded.
    pub fn new() -> Self {
        Self::with_setup(|_| {})
    }

    /// Like [`Self::new`], with `setup` run before the character joins, e.g.
    /// to swap in [`RespawnSettings`] or a different record store.
    ///
    /// [`RespawnSettings`]: requiem_server::settings::RespawnSettings
    pub fn with_setup(setup: impl FnOnce(&mut App)) -> Self {
        let clock = ManualClock::new(SCENARIO_START);
        let mut app = App::new();

        #[allow(unused_mut)]
        let mut plugins = DefaultPlugins.build();

        #[cfg(feature = "log")]
        {
            plugins = plugins.disable::<bevy_log::LogPlugin>();
        }

        app.add_plugins(plugins)
            .insert_resource(ServerClock::new(clock.clone()));

        setup(&mut app);

        app.update();

        let (client, mut helper) = create_mock_client("test");
        let client = app.world_mut().spawn(client).id();

        app.update(); // CharacterSelected

        helper.clear_received();

        ScenarioSingleClient {
            app,
            client,
            helper,
            clock,
        }
    }
}

impl Default for ScenarioSingleClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A healthy character named `name` with a random id, wired to an in-memory
/// connection. Spawn the bundle and drive the other end with the helper.
pub fn create_mock_client(name: impl Into<String>) -> (ClientBundle, MockClientHelper) {
    let conn = MockClientConnection::new();

    let bundle = ClientBundle::new(
        Uuid::from_bytes(rand::random()),
        name,
        Box::new(conn.clone()),
    );

    let helper = MockClientHelper::new(conn);

    (bundle, helper)
}

/// In-memory stand-in for a player's socket. Clones share one pair of queues.
#[derive(Clone)]
pub struct MockClientConnection {
    inner: Arc<Mutex<MockClientConnectionInner>>,
}

struct MockClientConnectionInner {
    /// Respawn requests waiting for the event loop.
    inbound: VecDeque<ReceivedPacket>,
    /// Framed bytes flushed by the server.
    outbound: BytesMut,
    /// Once set, every receive fails as if the socket closed.
    closed: bool,
}

impl MockClientConnection {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockClientConnectionInner {
                inbound: VecDeque::new(),
                outbound: BytesMut::new(),
                closed: false,
            })),
        }
    }

    /// Queues an unframed `id ++ body` message as if the player sent it.
    fn push_inbound(&self, mut bytes: BytesMut) {
        let id = VarInt::decode_partial((&mut bytes).reader()).expect("message has no id");

        let msg = ReceivedPacket {
            timestamp: Instant::now(),
            id,
            body: bytes.freeze(),
        };

        self.inner.lock().unwrap().inbound.push_back(msg);
    }

    fn take_outbound(&self) -> BytesMut {
        self.inner.lock().unwrap().outbound.split()
    }

    fn discard_outbound(&self) {
        self.inner.lock().unwrap().outbound.clear();
    }

    fn close(&self) {
        self.inner.lock().unwrap().closed = true;
    }
}

impl ClientConnection for MockClientConnection {
    fn try_send(&mut self, bytes: BytesMut) -> anyhow::Result<()> {
        self.inner.lock().unwrap().outbound.unsplit(bytes);
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<ReceivedPacket>> {
        let mut inner = self.inner.lock().unwrap();

        anyhow::ensure!(!inner.closed, "connection closed");

        Ok(inner.inbound.pop_front())
    }

    fn len(&self) -> usize {
        self.inner.lock().unwrap().inbound.len()
    }
}

impl Default for MockClientConnection {
    fn default() -> Self {
        Self::new()
    }
}

/// The player's end of a [`MockClientConnection`]: sends respawn requests and
/// reads back the death messages the server flushed.
pub struct MockClientHelper {
    conn: MockClientConnection,
    dec: PacketDecoder,
    scratch: BytesMut,
}

impl MockClientHelper {
    pub fn new(conn: MockClientConnection) -> Self {
        Self {
            conn,
            dec: PacketDecoder::new(),
            scratch: BytesMut::new(),
        }
    }

    /// Sends `packet` to the server. It is handled on the next update.
    #[track_caller]
    pub fn send<P>(&mut self, packet: &P)
    where
        P: Packet + Encode,
    {
        packet
            .encode_with_id((&mut self.scratch).writer())
            .expect("unencodable message");

        self.conn.push_inbound(self.scratch.split());
    }

    /// Everything the server flushed since the last call, as frames.
    #[track_caller]
    pub fn collect_received(&mut self) -> PacketFrames {
        self.dec.queue_bytes(self.conn.take_outbound());

        let mut res = vec![];

        while let Some(frame) = self
            .dec
            .try_next_packet()
            .expect("server sent a corrupt frame")
        {
            res.push(frame);
        }

        PacketFrames(res)
    }

    /// Raw bytes the server sent since the last call, for feeding a
    /// [`requiem_client::ClientSession`].
    pub fn take_raw(&mut self) -> BytesMut {
        self.conn.take_outbound()
    }

    /// Forgets what the server sent so far.
    pub fn clear_received(&mut self) {
        self.conn.discard_outbound();
    }

    /// Makes the next receive on the server side fail.
    pub fn disconnect(&mut self) {
        self.conn.close();
    }
}

/// Frames a character received, in arrival order.
#[derive(Clone, Debug)]
pub struct PacketFrames(pub Vec<PacketFrame>);

impl PacketFrames {
    #[track_caller]
    pub fn assert_count<P: Packet>(&self, expected_count: usize) {
        let got = self.0.iter().filter(|f| f.id == P::ID).count();

        assert_eq!(got, expected_count, "number of {} sent", P::NAME);
    }

    /// Checks that the messages named in `L` arrived in that order. Other
    /// messages in between are ignored.
    #[track_caller]
    pub fn assert_order<L: PacketList>(&self) {
        let positions: Vec<_> = self
            .0
            .iter()
            .filter_map(|f| L::packets().iter().position(|(id, _)| f.id == *id))
            .collect();

        let is_sorted = positions.windows(2).all(|w| w[0] <= w[1]);

        if !is_sorted {
            panic!(
                "death messages out of order: wanted {:?}, got {:?}",
                L::packets(),
                self.debug_order::<L>()
            );
        }
    }

    /// Decodes the earliest `P`. Panics if none was sent.
    #[track_caller]
    pub fn first<'a, P>(&'a self) -> P
    where
        P: Packet + Decode<'a>,
    {
        let Some(frame) = self.0.iter().find(|f| f.id == P::ID) else {
            panic!("server never sent {}", P::NAME);
        };

        frame.decode::<P>().unwrap()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn debug_order<L: PacketList>(&self) -> impl std::fmt::Debug {
        self.0
            .iter()
            .filter_map(|f| L::packets().iter().find(|(id, _)| f.id == *id).cloned())
            .collect::<Vec<_>>()
    }
}

/// A tuple of message types, used to name an expected order.
pub trait PacketList {
    fn packets() -> &'static [(i32, &'static str)];
}

macro_rules! impl_packet_list {
    ($($ty:ident),*) => {
        impl<$($ty: Packet,)*> PacketList for ($($ty,)*) {
            fn packets() -> &'static [(i32, &'static str)] {
                &[
                    $(
                        (
                            $ty::ID,
                            $ty::NAME
                        ),
                    )*
                ]
            }
        }
    }
}

impl_packet_list!(A);
impl_packet_list!(A, B);
impl_packet_list!(A, B, C);
impl_packet_list!(A, B, C, D);
