//! Composite codecs for optionals, sequences, and maps, built by
//! delegating per element to the inner codec.

use std::collections::HashMap;
use std::hash::Hash;

use super::{Codec, Reader, Writer};

/// Presence byte (0 absent, 1 present) followed by the inner encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opt<C>(pub C);

impl<C: Codec> Codec for Opt<C> {
    type Value = Option<C::Value>;

    fn write(&self, writer: &mut Writer, value: &Self::Value) {
        match value {
            None => writer.write_u8(0),
            Some(inner) => {
                writer.write_u8(1);
                self.0.write(writer, inner);
            }
        }
    }

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value {
        match reader.read_u8() {
            0 => None,
            1 => Some(self.0.read(reader)),
            other => panic!("invalid presence byte {other} for optional value"),
        }
    }

    fn destroy(&self, value: Self::Value) {
        if let Some(inner) = value {
            self.0.destroy(inner);
        }
    }
}

/// Signed 32-bit element count followed by the elements in order. An empty
/// and an absent sequence are the same on the wire: count zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Seq<C>(pub C);

impl<C: Codec> Codec for Seq<C> {
    type Value = Vec<C::Value>;

    fn write(&self, writer: &mut Writer, value: &Self::Value) {
        writer.write_len(value.len());
        for element in value {
            self.0.write(writer, element);
        }
    }

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value {
        let count = reader.read_len();
        let mut elements = Vec::with_capacity(count);
        for _ in 0..count {
            elements.push(self.0.read(reader));
        }
        elements
    }

    fn destroy(&self, value: Self::Value) {
        for element in value {
            self.0.destroy(element);
        }
    }
}

/// Signed 32-bit pair count followed by interleaved key/value encodings.
/// Iteration order when lowering is unspecified; lifting rebuilds the same
/// mapping from the pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapOf<K, V>(pub K, pub V);

impl<K, V> Codec for MapOf<K, V>
where
    K: Codec,
    K::Value: Eq + Hash,
    V: Codec,
{
    type Value = HashMap<K::Value, V::Value>;

    fn write(&self, writer: &mut Writer, value: &Self::Value) {
        writer.write_len(value.len());
        for (key, val) in value {
            self.0.write(writer, key);
            self.1.write(writer, val);
        }
    }

    fn read(&self, reader: &mut Reader<'_>) -> Self::Value {
        let count = reader.read_len();
        let mut map = HashMap::with_capacity(count);
        for _ in 0..count {
            let key = self.0.read(reader);
            let val = self.1.read(reader);
            map.insert(key, val);
        }
        map
    }

    fn destroy(&self, value: Self::Value) {
        for (key, val) in value {
            self.0.destroy(key);
            self.1.destroy(val);
        }
    }
}
