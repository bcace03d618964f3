use std::time::Instant;

use bytes::BytesMut;
use requiem_protocol::packets::{DeathStateS2c, DeathTimerS2c, RespawnS2c, SystemChatS2c};
use requiem_protocol::{Decode, Packet, PacketDecoder, PacketEncoder, PacketFrame, WritePacket};
use tracing::{debug, warn};

use crate::mirror::{CountdownMirror, MirrorView, RespawnAttempt};
use crate::settings::MirrorSettings;

/// One client's end of the connection to the death authority.
///
/// Bytes from the server go in through [`ClientSession::receive`] and bytes for
/// the server come out of [`ClientSession::take_outgoing`].
#[derive(Debug)]
pub struct ClientSession {
    dec: PacketDecoder,
    enc: PacketEncoder,
    mirror: CountdownMirror,
    chat: Vec<String>,
    last_respawn: Option<RespawnS2c>,
}

impl ClientSession {
    pub fn new(settings: MirrorSettings) -> Self {
        Self {
            dec: PacketDecoder::new(),
            enc: PacketEncoder::new(),
            mirror: CountdownMirror::new(settings),
            chat: vec![],
            last_respawn: None,
        }
    }

    pub fn mirror(&self) -> &CountdownMirror {
        &self.mirror
    }

    /// System chat lines received so far, oldest first.
    pub fn chat_log(&self) -> &[String] {
        &self.chat
    }

    pub fn last_respawn(&self) -> Option<&RespawnS2c> {
        self.last_respawn.as_ref()
    }

    /// Feeds bytes received from the server at `now`.
    ///
    /// Packets that fail to decode are logged and skipped. An error is only
    /// returned when the framing itself is broken and the stream cannot be
    /// resynchronized.
    pub fn receive(&mut self, bytes: &[u8], now: Instant) -> anyhow::Result<()> {
        self.dec.queue_slice(bytes);

        while let Some(frame) = self.dec.try_next_packet()? {
            self.handle_frame(&frame, now);
        }

        Ok(())
    }

    fn handle_frame(&mut self, frame: &PacketFrame, now: Instant) {
        match frame.id {
            DeathTimerS2c::ID => {
                if let Some(pkt) = decode_logged::<DeathTimerS2c>(frame) {
                    self.mirror.apply_deadline(pkt.ms_remaining, now);
                }
            }
            DeathStateS2c::ID => {
                if let Some(pkt) = decode_logged::<DeathStateS2c>(frame) {
                    self.mirror.set_dead(pkt.is_dead);
                }
            }
            SystemChatS2c::ID => {
                if let Some(pkt) = decode_logged::<SystemChatS2c>(frame) {
                    self.chat.push(pkt.message);
                }
            }
            RespawnS2c::ID => {
                if let Some(pkt) = decode_logged::<RespawnS2c>(frame) {
                    self.mirror.set_dead(false);
                    self.last_respawn = Some(pkt);
                }
            }
            id => debug!("ignoring unknown clientbound packet {id:#04x}"),
        }
    }

    pub fn press_respawn_key(&mut self, now: Instant, menu_open: bool) -> RespawnAttempt {
        self.mirror.press_respawn_key(now, menu_open)
    }

    /// Runs one frame of the mirror. Queues the respawn request if it became
    /// due and returns what to render.
    pub fn tick(&mut self, now: Instant) -> MirrorView {
        if let Some(request) = self.mirror.poll(now) {
            self.enc.write_packet(&request);
        }

        self.mirror.view(now)
    }

    /// The connection went away. Drops any request that has not been sent.
    pub fn disconnect(&mut self) {
        self.mirror.cancel_pending();
        self.enc.clear();
    }

    /// Takes all bytes queued for the server.
    pub fn take_outgoing(&mut self) -> BytesMut {
        self.enc.take()
    }
}

fn decode_logged<'a, P>(frame: &'a PacketFrame) -> Option<P>
where
    P: Packet + Decode<'a>,
{
    match frame.decode::<P>() {
        Ok(pkt) => Some(pkt),
        Err(e) => {
            warn!("failed to decode {}: {e:#}", P::NAME);
            None
        }
    }
}
