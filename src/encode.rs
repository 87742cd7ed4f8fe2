//! Serialize data into the bytecode protocol.
//!
//! Strings and arrays use the broker's compact forms: an unsigned varint
//! length `N` followed by `N` bytes (or elements). A length of zero stands for
//! both the empty and the absent string, so the two are indistinguishable on
//! the wire.
use bytes::{BufMut, Bytes};

use crate::error::Result;

pub trait ToByte {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()>;
}

impl<'a, T: ToByte + 'a + ?Sized> ToByte for &'a T {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        (*self).encode(buffer)
    }
}

impl ToByte for bool {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self as i8);
        Ok(())
    }
}

impl ToByte for i8 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i8(*self);
        Ok(())
    }
}

impl ToByte for i16 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i16(*self);
        Ok(())
    }
}

impl ToByte for i32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i32(*self);
        Ok(())
    }
}

impl ToByte for u32 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_u32(*self);
        Ok(())
    }
}

impl ToByte for i64 {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        buffer.put_i64(*self);
        Ok(())
    }
}

/// Strings are always written in compact form.
impl ToByte for str {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        encode_unsigned_varint(buffer, self.len() as u32);
        buffer.put(self.as_bytes());
        Ok(())
    }
}

impl ToByte for String {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.as_str().encode(buffer)
    }
}

impl ToByte for Option<String> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match self {
            Some(s) => s.encode(buffer),
            None => {
                encode_unsigned_varint(buffer, 0);
                Ok(())
            }
        }
    }
}

/// A nullable byte blob with an `i32` length prefix (the `records` field).
impl ToByte for Option<Bytes> {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        match self {
            Some(xs) => xs.encode(buffer),
            None => (-1i32).encode(buffer),
        }
    }
}

impl ToByte for Bytes {
    fn encode<W: BufMut>(&self, buffer: &mut W) -> Result<()> {
        buffer.put_i32(self.len() as i32);
        buffer.put_slice(self);
        Ok(())
    }
}

impl<V: ToByte> ToByte for [V] {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        encode_compact_array(buffer, self, |buffer, x| x.encode(buffer))
    }
}

impl<V: ToByte> ToByte for Vec<V> {
    fn encode<T: BufMut>(&self, buffer: &mut T) -> Result<()> {
        self.as_slice().encode(buffer)
    }
}

/// Encode an unsigned varint (LEB128, 7 data bits per byte, high bit set on
/// every byte except the last).
pub fn encode_unsigned_varint<W: BufMut>(buffer: &mut W, mut value: u32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buffer.put_u8(byte);
        if value == 0 {
            break;
        }
    }
}

/// Renders the element count of `items` as an unsigned varint and then
/// invokes `f` for each element.
pub fn encode_compact_array<T, F, W>(buffer: &mut W, items: &[T], mut f: F) -> Result<()>
where
    F: FnMut(&mut W, &T) -> Result<()>,
    W: BufMut,
{
    encode_unsigned_varint(buffer, items.len() as u32);
    for item in items {
        f(buffer, item)?;
    }
    Ok(())
}

/// An empty tagged field section is a single zero byte.
pub fn encode_empty_tagged_fields<W: BufMut>(buffer: &mut W) {
    buffer.put_u8(0);
}
