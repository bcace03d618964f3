//! [`Encode`] and [`Decode`] for primitive types.

use std::io::Write;

use anyhow::{ensure, Context};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{Decode, Encode, VarInt};

/// The longest string, in bytes, accepted by [`Decode`] for [`String`].
pub(crate) const MAX_STRING_LEN: usize = 32767;

impl Encode for bool {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_u8(u8::from(*self))?)
    }
}

impl Decode<'_> for bool {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let n = r.read_u8()?;
        ensure!(n <= 1, "decoded boolean byte is not 0 or 1 (got {n})");
        Ok(n == 1)
    }
}

impl Encode for i64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        Ok(w.write_i64::<BigEndian>(*self)?)
    }
}

impl Decode<'_> for i64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(r.read_i64::<BigEndian>()?)
    }
}

impl Encode for f32 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.is_finite(),
            "attempt to encode non-finite f32 ({})",
            self
        );
        Ok(w.write_f32::<BigEndian>(*self)?)
    }
}

impl Decode<'_> for f32 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let f = r.read_f32::<BigEndian>()?;
        ensure!(f.is_finite(), "attempt to decode non-finite f32 ({f})");
        Ok(f)
    }
}

impl Encode for f64 {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.is_finite(),
            "attempt to encode non-finite f64 ({})",
            self
        );
        Ok(w.write_f64::<BigEndian>(*self)?)
    }
}

impl Decode<'_> for f64 {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        let f = r.read_f64::<BigEndian>()?;
        ensure!(f.is_finite(), "attempt to decode non-finite f64 ({f})");
        Ok(f)
    }
}

impl Encode for str {
    fn encode(&self, mut w: impl Write) -> anyhow::Result<()> {
        ensure!(
            self.len() <= MAX_STRING_LEN,
            "string length of {} exceeds maximum of {MAX_STRING_LEN}",
            self.len()
        );

        VarInt(self.len() as i32).encode(&mut w)?;
        Ok(w.write_all(self.as_bytes())?)
    }
}

impl Encode for String {
    fn encode(&self, w: impl Write) -> anyhow::Result<()> {
        self.as_str().encode(w)
    }
}

impl<'a> Decode<'a> for &'a str {
    fn decode(r: &mut &'a [u8]) -> anyhow::Result<Self> {
        let len = VarInt::decode(r)?.0;
        ensure!(len >= 0, "attempt to decode string with negative length");
        let len = len as usize;
        ensure!(
            len <= MAX_STRING_LEN,
            "string length of {len} exceeds maximum of {MAX_STRING_LEN}"
        );
        ensure!(
            len <= r.len(),
            "not enough data remaining ({} bytes) to decode string of {len} bytes",
            r.len()
        );

        let (res, remaining) = r.split_at(len);
        let res = std::str::from_utf8(res).context("string is not valid UTF-8")?;

        *r = remaining;

        Ok(res)
    }
}

impl Decode<'_> for String {
    fn decode(r: &mut &[u8]) -> anyhow::Result<Self> {
        Ok(<&str>::decode(r)?.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_binary_bool_is_rejected() {
        let mut r: &[u8] = &[2];
        assert!(bool::decode(&mut r).is_err());
    }

    #[test]
    fn string_longer_than_input_is_rejected() {
        let mut buf = vec![];
        VarInt(10).encode(&mut buf).unwrap();
        buf.extend_from_slice(b"short");

        let mut r = buf.as_slice();
        assert!(String::decode(&mut r).is_err());
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let mut buf = vec![];
        assert!(f64::NAN.encode(&mut buf).is_err());
        assert!(f32::INFINITY.encode(&mut buf).is_err());
    }
}
