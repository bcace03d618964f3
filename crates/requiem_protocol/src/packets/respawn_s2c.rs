use std::io::Write;

use crate::{Decode, Encode, Packet, PacketSide};

/// Sent once a respawn has been finalized. Carries the position the character
/// was moved to and the health it was restored to.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RespawnS2c {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub health: f32,
}

impl Packet for RespawnS2c {
    const ID: i32 = 0x03;
    const NAME: &'static str = "RespawnS2c";
    const SIDE: PacketSide = PacketSide::Clientbound;
}

impl Encode for RespawnS2c {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        self.x.encode(&mut w)?;
        self.y.encode(&mut w)?;
        self.z.encode(&mut w)?;
        self.health.encode(w)
    }
}

impl Decode<'_> for RespawnS2c {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            x: f64::decode(r)?,
            y: f64::decode(r)?,
            z: f64::decode(r)?,
            health: f32::decode(r)?,
        })
    }
}
