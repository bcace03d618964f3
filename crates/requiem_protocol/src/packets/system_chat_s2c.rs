use std::io::Write;

use crate::{Decode, Encode, Packet, PacketSide};

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SystemChatS2c {
    pub message: String,
}

impl Packet for SystemChatS2c {
    const ID: i32 = 0x02;
    const NAME: &'static str = "SystemChatS2c";
    const SIDE: PacketSide = PacketSide::Clientbound;
}

impl Encode for SystemChatS2c {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.message.encode(w)
    }
}

impl Decode<'_> for SystemChatS2c {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(Self {
            message: String::decode(r)?,
        })
    }
}
