use anyhow::ensure;
use bytes::{BufMut, BytesMut};
use tracing::warn;

use crate::var_int::VarInt;
use crate::{Encode, Packet, MAX_PACKET_SIZE};

/// Outgoing queue of length-prefixed death messages.
///
/// Messages are appended in send order and the connection drains them with
/// [`PacketEncoder::take`].
#[derive(Default, Debug)]
pub struct PacketEncoder {
    buf: BytesMut,
    scratch: Vec<u8>,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `pkt` behind everything written so far. Nothing is queued if it
    /// fails to encode or is too large for one frame.
    pub fn append_packet<P>(&mut self, pkt: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        self.scratch.clear();
        pkt.encode_with_id(&mut self.scratch)?;

        let frame_len = self.scratch.len();

        ensure!(
            frame_len <= MAX_PACKET_SIZE as usize,
            "{} is {frame_len} bytes, above the {MAX_PACKET_SIZE} byte limit",
            P::NAME
        );

        VarInt(frame_len as i32).encode((&mut self.buf).writer())?;
        self.buf.extend_from_slice(&self.scratch);

        Ok(())
    }

    /// Drains the queue.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// Anything a death message can be sent through: a server-side client or the
/// client session's outgoing queue.
pub trait WritePacket {
    /// Sends `packet`, logging and dropping it if it cannot be encoded.
    fn write_packet<P>(&mut self, packet: &P)
    where
        P: Packet + Encode,
    {
        if let Err(e) = self.write_packet_fallible(packet) {
            warn!("dropping {}: {e:#}", P::NAME);
        }
    }

    /// Sends `packet` and reports encoding failures to the caller.
    fn write_packet_fallible<P>(&mut self, packet: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode;
}

impl<W: WritePacket> WritePacket for &mut W {
    fn write_packet_fallible<P>(&mut self, packet: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        (**self).write_packet_fallible(packet)
    }
}

impl WritePacket for PacketEncoder {
    fn write_packet_fallible<P>(&mut self, packet: &P) -> anyhow::Result<()>
    where
        P: Packet + Encode,
    {
        self.append_packet(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DeathTimerS2c, RespawnRequestC2s};

    #[test]
    fn timer_frame_layout() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&DeathTimerS2c { ms_remaining: 3000 })
            .unwrap();

        assert_eq!(
            &enc.take()[..],
            [0x09, 0x00, 0, 0, 0, 0, 0, 0, 0x0b, 0xb8]
        );
        assert!(enc.is_empty());
    }

    #[test]
    fn empty_request_is_just_length_and_id() {
        let mut enc = PacketEncoder::new();
        enc.write_packet(&RespawnRequestC2s);
        enc.write_packet(&RespawnRequestC2s);

        assert_eq!(&enc.take()[..], [0x01, 0x00, 0x01, 0x00]);
    }
}
