use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::{Decode, Encode};

/// LEB128-style `i32` used for frame lengths and message ids.
///
/// Seven payload bits per byte, least significant group first. The high bit
/// says another byte follows. Negative values always take five bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct VarInt(pub i32);

const PAYLOAD: u8 = 0b0111_1111;
const CONTINUE: u8 = 0b1000_0000;

impl VarInt {
    /// Longest encoding of any `i32`.
    pub const MAX_SIZE: usize = 5;

    /// Bytes [`Encode::encode`] will produce for this value.
    pub fn written_size(self) -> usize {
        let bits = 32 - (self.0 as u32).leading_zeros() as usize;
        bits.max(1).div_ceil(7)
    }

    /// Reads a value from the front of `r`.
    ///
    /// Running out of bytes is reported as [`VarIntDecodeError::Incomplete`]
    /// so a caller holding a partial frame can wait for more.
    pub fn decode_partial(mut r: impl Read) -> Result<i32, VarIntDecodeError> {
        let mut val = 0_u32;

        for group in 0..Self::MAX_SIZE {
            let byte = r.read_u8().map_err(|_| VarIntDecodeError::Incomplete)?;
            val |= u32::from(byte & PAYLOAD) << (group * 7);

            if byte & CONTINUE == 0 {
                return Ok(val as i32);
            }
        }

        Err(VarIntDecodeError::TooLarge)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum VarIntDecodeError {
    #[error("input ended inside a VarInt")]
    Incomplete,
    #[error("VarInt runs past {} bytes", VarInt::MAX_SIZE)]
    TooLarge,
}

impl Encode for VarInt {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        let mut rest = self.0 as u32;

        while rest > u32::from(PAYLOAD) {
            w.write_u8(rest as u8 & PAYLOAD | CONTINUE)?;
            rest >>= 7;
        }

        w.write_u8(rest as u8)?;
        Ok(())
    }
}

impl Decode<'_> for VarInt {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(VarInt(Self::decode_partial(r)?))
    }
}

impl From<i32> for VarInt {
    fn from(i: i32) -> Self {
        VarInt(i)
    }
}

impl From<VarInt> for i32 {
    fn from(i: VarInt) -> Self {
        i.0
    }
}
