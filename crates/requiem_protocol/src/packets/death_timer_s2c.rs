use std::io::Write;

use crate::{Decode, Encode, Packet, PacketSide};

/// Milliseconds left until the server will honor a respawn request.
///
/// The value is relative so that the receiver can anchor it to its own clock.
/// Zero or negative means a respawn is already allowed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct DeathTimerS2c {
    pub ms_remaining: i64,
}

impl Packet for DeathTimerS2c {
    const ID: i32 = 0x00;
    const NAME: &'static str = "DeathTimerS2c";
    const SIDE: PacketSide = PacketSide::Clientbound;
}

impl Encode for DeathTimerS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.ms_remaining.encode(w)
    }
}

impl Decode<'_> for DeathTimerS2c {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            ms_remaining: i64::decode(r)?,
        })
    }
}
