//! Codecs for primitive widths, strings, and raw byte arrays.

use super::{Codec, Reader, Writer};

macro_rules! scalar_codec {
    ($($name:ident => $ty:ty, $write:ident, $read:ident);* $(;)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default)]
            pub struct $name;

            impl Codec for $name {
                type Value = $ty;

                fn write(&self, writer: &mut Writer, value: &$ty) {
                    writer.$write(*value);
                }

                fn read(&self, reader: &mut Reader<'_>) -> $ty {
                    reader.$read()
                }
            }
        )*
    };
}

scalar_codec! {
    U8 => u8, write_u8, read_u8;
    I8 => i8, write_i8, read_i8;
    U16 => u16, write_u16, read_u16;
    I16 => i16, write_i16, read_i16;
    U32 => u32, write_u32, read_u32;
    I32 => i32, write_i32, read_i32;
    U64 => u64, write_u64, read_u64;
    I64 => i64, write_i64, read_i64;
    F32 => f32, write_f32, read_f32;
    F64 => f64, write_f64, read_f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl Codec for Bool {
    type Value = bool;

    fn write(&self, writer: &mut Writer, value: &bool) {
        writer.write_u8(u8::from(*value));
    }

    fn read(&self, reader: &mut Reader<'_>) -> bool {
        match reader.read_u8() {
            0 => false,
            1 => true,
            other => panic!("invalid boolean byte {other}"),
        }
    }
}

/// UTF-8 string with a signed 32-bit length prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl Codec for Str {
    type Value = String;

    fn write(&self, writer: &mut Writer, value: &String) {
        writer.write_len(value.len());
        writer.write_bytes(value.as_bytes());
    }

    fn read(&self, reader: &mut Reader<'_>) -> String {
        let len = reader.read_len();
        let bytes = reader.read_exact(len);
        String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|err| panic!("invalid UTF-8 in string payload: {err}"))
    }
}

/// Raw byte array with a signed 32-bit length prefix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bytes;

impl Codec for Bytes {
    type Value = Vec<u8>;

    fn write(&self, writer: &mut Writer, value: &Vec<u8>) {
        writer.write_len(value.len());
        writer.write_bytes(value);
    }

    fn read(&self, reader: &mut Reader<'_>) -> Vec<u8> {
        let len = reader.read_len();
        reader.read_exact(len).to_vec()
    }
}
