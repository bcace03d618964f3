use std::io::Write;

use crate::{Decode, Encode, Packet, PacketSide};

/// The client believes its countdown is over and asks to respawn. The server
/// re-validates the deadline on its own.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct RespawnRequestC2s;

impl Packet for RespawnRequestC2s {
    const ID: i32 = 0x00;
    const NAME: &'static str = "RespawnRequestC2s";
    const SIDE: PacketSide = PacketSide::Serverbound;
}

impl Encode for RespawnRequestC2s {
    fn encode(&self, _w: impl Write) -> anyhow::Result<()> {
        Ok(())
    }
}

impl Decode<'_> for RespawnRequestC2s {
    fn decode(_r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self)
    }
}
