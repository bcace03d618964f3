use std::io::Write;

use crate::{Decode, Encode, Packet, PacketSide};

/// Mirrors the character's stored `is_dead` flag to its client.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DeathStateS2c {
    pub is_dead: bool,
}

impl Packet for DeathStateS2c {
    const ID: i32 = 0x01;
    const NAME: &'static str = "DeathStateS2c";
    const SIDE: PacketSide = PacketSide::Clientbound;
}

impl Encode for DeathStateS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.is_dead.encode(w)
    }
}

impl Decode<'_> for DeathStateS2c {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            is_dead: bool::decode(r)?,
        })
    }
}
