use anyhow::{bail, ensure, Context};
use bytes::{Buf, BytesMut};

use crate::var_int::{VarInt, VarIntDecodeError};
use crate::{Decode, Packet, MAX_PACKET_SIZE};

/// Reassembles death messages from whatever chunks the connection delivers.
///
/// Bytes are queued as they arrive and whole frames are handed out once their
/// length prefix is satisfied. A half-received frame stays buffered.
#[derive(Default, Debug)]
pub struct PacketDecoder {
    buf: BytesMut,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pops the next whole frame off the queue.
    ///
    /// `Ok(None)` means the queue ends mid-frame. An error means the stream is
    /// corrupt and the connection should be dropped.
    pub fn try_next_packet(&mut self) -> anyhow::Result<Option<PacketFrame>> {
        let Some((prefix_len, frame_len)) = self.peek_frame_len()? else {
            return Ok(None);
        };

        if self.buf.len() < prefix_len + frame_len {
            return Ok(None);
        }

        self.buf.advance(prefix_len);
        let mut body = self.buf.split_to(frame_len);

        let mut r = &body[..];
        let id = VarInt::decode(&mut r).context("unreadable message id")?.0;
        let id_len = body.len() - r.len();
        body.advance(id_len);

        Ok(Some(PacketFrame { id, body }))
    }

    /// Size of the length prefix and the length it announces.
    fn peek_frame_len(&self) -> anyhow::Result<Option<(usize, usize)>> {
        let frame_len = match VarInt::decode_partial(&self.buf[..]) {
            Ok(len) => len,
            Err(VarIntDecodeError::Incomplete) => return Ok(None),
            Err(VarIntDecodeError::TooLarge) => bail!("frame length prefix is malformed"),
        };

        ensure!(
            (0..=MAX_PACKET_SIZE).contains(&frame_len),
            "frame length {frame_len} is outside 0..={MAX_PACKET_SIZE}"
        );

        Ok(Some((VarInt(frame_len).written_size(), frame_len as usize)))
    }

    pub fn queue_bytes(&mut self, bytes: BytesMut) {
        self.buf.unsplit(bytes);
    }

    pub fn queue_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// One message taken off the wire, with its id already read.
#[derive(Clone, Debug)]
pub struct PacketFrame {
    pub id: i32,
    /// Everything after the id.
    pub body: BytesMut,
}

impl PacketFrame {
    /// Reads the body as `P`. Fails when the id belongs to another message,
    /// the body is malformed, or bytes are left over.
    pub fn decode<'a, P>(&'a self) -> anyhow::Result<P>
    where
        P: Packet + Decode<'a>,
    {
        ensure!(
            self.id == P::ID,
            "expected {} ({:#04x}), frame carries {:#04x}",
            P::NAME,
            P::ID,
            self.id
        );

        let mut r = &self.body[..];
        let pkt = P::decode(&mut r).with_context(|| format!("malformed {}", P::NAME))?;

        ensure!(r.is_empty(), "{} has {} trailing bytes", P::NAME, r.len());

        Ok(pkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::{DeathStateS2c, DeathTimerS2c};

    #[test]
    fn frame_arriving_byte_by_byte() {
        // len 2, id 0x01 (DeathStateS2c), is_dead = true
        let wire = [0x02_u8, 0x01, 0x01];
        let mut dec = PacketDecoder::new();

        for b in &wire[..2] {
            dec.queue_slice(&[*b]);
            assert!(dec.try_next_packet().unwrap().is_none());
        }

        dec.queue_slice(&wire[2..]);
        let frame = dec.try_next_packet().unwrap().unwrap();

        assert_eq!(frame.id, DeathStateS2c::ID);
        assert!(frame.decode::<DeathStateS2c>().unwrap().is_dead);
    }

    #[test]
    fn short_timer_body_is_an_error() {
        let frame = PacketFrame {
            id: DeathTimerS2c::ID,
            body: BytesMut::from(&[0_u8, 0, 0x0b][..]),
        };

        assert!(frame.decode::<DeathTimerS2c>().is_err());
    }
}
