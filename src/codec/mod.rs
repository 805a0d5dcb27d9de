//! Byte codec and the lift/lower framework.
//!
//! One [`Codec`] per logical type. Composite codecs ([`Opt`], [`Seq`],
//! [`MapOf`], [`RecordCodec`], [`EnumCodec`]) are built structurally from
//! their element codecs; nothing is duplicated per concrete type. The wire
//! format is big-endian throughout.
//!
//! Decode-side failures (underflow, trailing bytes, unknown discriminants)
//! are protocol violations: they indicate a codec mismatch between the
//! bindings and the native library, so they panic instead of surfacing as
//! recoverable errors.

pub mod compose;
pub mod compound;
pub mod primitives;
pub mod time;

pub use compose::{CustomCodec, EnumCodec, ErrorCodec, Record, RecordCodec, WireEnum};
pub use compound::{MapOf, Opt, Seq};
pub use primitives::{
    Bool, Bytes, F32, F64, I8, I16, I32, I64, Str, U8, U16, U32, U64,
};
pub use time::{Duration, Timestamp};

use crate::ffi::buffer::NativeBuffer;

/// Growable big-endian byte sink used on the lower/write path.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

macro_rules! write_fixed {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(pub fn $name(&mut self, value: $ty) {
            self.buf.extend_from_slice(&value.to_be_bytes());
        })*
    };
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    write_fixed! {
        write_u8: u8,
        write_i8: i8,
        write_u16: u16,
        write_i16: i16,
        write_u32: u32,
        write_i32: i32,
        write_u64: u64,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a signed 32-bit length prefix. Lengths past the signed range
    /// are fatal; the codec never truncates.
    pub fn write_len(&mut self, len: usize) {
        let len = i32::try_from(len).unwrap_or_else(|_| {
            panic!("length {len} exceeds the 32-bit signed range")
        });
        self.write_i32(len);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed byte slice used on the lift/read path.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! read_fixed {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(pub fn $name(&mut self) -> $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let bytes = self.read_exact(WIDTH);
            <$ty>::from_be_bytes(bytes.try_into().unwrap())
        })*
    };
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_exact(&mut self, count: usize) -> &'a [u8] {
        if count > self.remaining() {
            panic!(
                "buffer underflow: needed {count} bytes, {} remaining",
                self.remaining()
            );
        }
        let bytes = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        bytes
    }

    read_fixed! {
        read_u8: u8,
        read_i8: i8,
        read_u16: u16,
        read_i16: i16,
        read_u32: u32,
        read_i32: i32,
        read_u64: u64,
        read_i64: i64,
        read_f32: f32,
        read_f64: f64,
    }

    pub fn read_len(&mut self) -> usize {
        let len = self.read_i32();
        usize::try_from(len).unwrap_or_else(|_| panic!("negative length prefix {len}"))
    }

    /// Asserts the buffer was fully consumed. A lift that leaves bytes
    /// behind decoded against the wrong layout.
    pub fn finish(&self) {
        if self.remaining() > 0 {
            panic!(
                "{} trailing bytes left in buffer after lift; codec mismatch",
                self.remaining()
            );
        }
    }
}

/// Serialization strategy bound to exactly one logical type.
///
/// `write`/`read` operate on an open cursor and nest freely; `lower`/`lift`
/// are the buffer-boundary forms used when a whole value crosses the ABI.
/// Object references and callbacks do not serialize their payloads: they
/// cross as pointers or handles and only their 64-bit identity passes
/// through here.
pub trait Codec {
    type Value;

    fn write(&self, writer: &mut Writer, value: &Self::Value);

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value;

    /// Serializes into a native-owned buffer via the native copy-in entry
    /// point, ready to pass across the ABI.
    fn lower(&self, value: &Self::Value) -> NativeBuffer {
        let mut writer = Writer::new();
        self.write(&mut writer, value);
        NativeBuffer::from_bytes(writer.as_bytes())
    }

    /// Deserializes from a native-owned buffer, consuming it exactly and
    /// freeing it afterwards.
    fn lift(&self, buffer: NativeBuffer) -> Self::Value {
        let mut reader = Reader::new(buffer.as_slice());
        let value = self.read(&mut reader);
        reader.finish();
        value
    }

    /// Releases resources owned by the value. A no-op for plain data;
    /// containers destroy their elements, object references destroy the
    /// underlying native resource.
    fn destroy(&self, value: Self::Value) {
        let _ = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_reader_round_trip_fixed_widths() {
        let mut writer = Writer::new();
        writer.write_u8(7);
        writer.write_i32(-40);
        writer.write_u64(u64::MAX);
        writer.write_f64(2.5);

        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_u8(), 7);
        assert_eq!(reader.read_i32(), -40);
        assert_eq!(reader.read_u64(), u64::MAX);
        assert_eq!(reader.read_f64(), 2.5);
        reader.finish();
    }

    #[test]
    #[should_panic(expected = "buffer underflow")]
    fn reader_underflow_panics() {
        let mut reader = Reader::new(&[0, 1]);
        let _ = reader.read_u32();
    }

    #[test]
    #[should_panic(expected = "trailing bytes")]
    fn reader_finish_rejects_leftovers() {
        let mut reader = Reader::new(&[0, 1, 2, 3, 4]);
        let _ = reader.read_u32();
        reader.finish();
    }

    #[test]
    #[should_panic(expected = "negative length prefix")]
    fn negative_length_prefix_panics() {
        let mut writer = Writer::new();
        writer.write_i32(-1);
        let bytes = writer.into_bytes();
        let _ = Reader::new(&bytes).read_len();
    }
}
