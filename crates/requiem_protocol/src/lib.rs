#![doc = include_str!("../README.md")]
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    rustdoc::missing_crate_level_docs,
    rustdoc::invalid_codeblock_attributes,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::bare_urls,
    rustdoc::invalid_html_tags
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_lifetimes,
    unused_import_braces,
    unreachable_pub,
    clippy::dbg_macro
)]

pub mod decode;
pub mod encode;
mod impls;
pub mod packets;
pub mod var_int;

use std::io::Write;

use anyhow::Context;
pub use decode::{PacketDecoder, PacketFrame};
pub use encode::{PacketEncoder, WritePacket};
pub use var_int::VarInt;
pub use {anyhow, bytes};

/// The maximum number of bytes in a single packet frame.
pub const MAX_PACKET_SIZE: i32 = 2097152;

/// The `Encode` trait allows objects to be written to the wire. It is the
/// inverse of [`Decode`].
///
/// ```
/// use requiem_protocol::Encode;
///
/// let mut buf = vec![];
/// 3000_i64.encode(&mut buf).unwrap();
///
/// assert_eq!(buf, [0, 0, 0, 0, 0, 0, 0x0b, 0xb8]);
/// ```
pub trait Encode {
    /// Writes this object to the provided writer.
    ///
    /// If this type also implements [`Decode`] then successful calls to this
    /// function returning `Ok(())` must always successfully [`decode`] using
    /// the data that was written to the writer. The exact number of bytes
    /// that were originally written must be consumed during the decoding.
    ///
    /// [`decode`]: Decode::decode
    fn encode(&self, w: impl Write) -> anyhow::Result<()>;
}

/// The `Decode` trait allows objects to be read from the wire. It is the
/// inverse of [`Encode`].
///
/// `Decode` is parameterized by a lifetime. This allows the decoded value to
/// borrow data from the byte slice it was read from.
pub trait Decode<'a>: Sized {
    /// Reads this object from the provided byte slice.
    ///
    /// Implementations of `Decode` are expected to shrink the slice from the
    /// front as bytes are read.
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self>;
}

/// Types considered to be packets.
///
/// In serialized form, a packet begins with a [`VarInt`] packet ID followed by
/// the body of the packet. The implementations of [`Encode`] and [`Decode`] on
/// `Self` are expected to only encode/decode the _body_ of this packet without
/// the leading ID.
pub trait Packet: std::fmt::Debug {
    /// The leading VarInt ID of this packet.
    const ID: i32;
    /// The name of this packet for debugging purposes.
    const NAME: &'static str;
    /// The side this packet is intended for.
    const SIDE: PacketSide;

    /// Encodes this packet's VarInt ID first, followed by the packet's body.
    fn encode_with_id(&self, mut w: impl Write) -> anyhow::Result<()>
    where
        Self: Encode,
    {
        VarInt(Self::ID)
            .encode(&mut w)
            .context("failed to encode packet ID")?;
        self.encode(w)
    }
}

/// The side a packet is intended for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PacketSide {
    /// Server -> Client
    Clientbound,
    /// Client -> Server
    Serverbound,
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::packets::{DeathStateS2c, DeathTimerS2c, RespawnRequestC2s, SystemChatS2c};

    #[test]
    fn frames_survive_split_delivery() {
        let mut enc = PacketEncoder::new();

        enc.append_packet(&DeathTimerS2c { ms_remaining: 3000 })
            .unwrap();
        enc.append_packet(&DeathStateS2c { is_dead: true }).unwrap();
        enc.append_packet(&SystemChatS2c {
            message: "Cannot find player.".into(),
        })
        .unwrap();

        let bytes = enc.take();
        let (first, second) = bytes.split_at(12);

        let mut dec = PacketDecoder::new();
        dec.queue_slice(first);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(
            frame.decode::<DeathTimerS2c>().unwrap(),
            DeathTimerS2c { ms_remaining: 3000 }
        );
        assert!(dec.try_next_packet().unwrap().is_none());

        dec.queue_slice(second);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert!(frame.decode::<DeathStateS2c>().unwrap().is_dead);

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(
            frame.decode::<SystemChatS2c>().unwrap().message,
            "Cannot find player."
        );

        assert!(dec.try_next_packet().unwrap().is_none());
    }

    #[test]
    fn negative_remaining_time_is_preserved() {
        let mut enc = PacketEncoder::new();
        enc.append_packet(&DeathTimerS2c { ms_remaining: -250 })
            .unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let pkt = dec
            .try_next_packet()
            .unwrap()
            .unwrap()
            .decode::<DeathTimerS2c>()
            .unwrap();

        assert_eq!(pkt.ms_remaining, -250);
    }

    #[test]
    fn mismatched_packet_id_is_rejected() {
        let frame = PacketFrame {
            id: DeathStateS2c::ID,
            body: BytesMut::from(&[1_u8][..]),
        };

        assert!(frame.decode::<DeathTimerS2c>().is_err());
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let frame = PacketFrame {
            id: RespawnRequestC2s::ID,
            body: BytesMut::from(&[0xff_u8][..]),
        };

        assert!(frame.decode::<RespawnRequestC2s>().is_err());
    }

    #[test]
    fn oversized_length_prefix_is_an_error() {
        let mut buf = vec![];
        VarInt(MAX_PACKET_SIZE + 1).encode(&mut buf).unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_slice(&buf);

        assert!(dec.try_next_packet().is_err());
    }
}
