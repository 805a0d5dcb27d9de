//! Codecs for generated structured types: records, tagged unions, error
//! unions, and externally mapped custom types.
//!
//! Generated code implements [`Record`] or [`WireEnum`] for each concrete
//! type; the codec wrappers here supply the wire framing once. Error types
//! are tagged unions whose variants double as `std::error::Error` values;
//! variant identity checks use pattern matching (or
//! `std::mem::discriminant`) rather than string comparison, and their
//! `Display` output follows the generator's rendering contract: flat errors
//! as `"<TypeName>: <message>"`, structured errors as
//! `"<VariantName>: field1=value1, field2=value2"` in declared field order.

use std::marker::PhantomData;

use super::{Codec, Reader, Writer};

/// Fixed ordered list of named fields. Position is the contract: fields are
/// encoded in declared order with no tags.
pub trait Record: Sized {
    const NAME: &'static str;

    fn write_fields(&self, writer: &mut Writer);

    fn read_fields(reader: &mut Reader<'_>) -> Self;

    /// Destroying a record destroys every field with the field's own
    /// destroy operation.
    fn destroy_fields(self) {}
}

#[derive(Debug)]
pub struct RecordCodec<R>(PhantomData<R>);

impl<R> RecordCodec<R> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<R> Default for RecordCodec<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Codec for RecordCodec<R> {
    type Value = R;

    fn write(&self, writer: &mut Writer, value: &R) {
        value.write_fields(writer);
    }

    fn read(&self, reader: &mut Reader<'_>) -> R {
        R::read_fields(reader)
    }

    fn destroy(&self, value: R) {
        value.destroy_fields();
    }
}

/// Tagged union. Discriminants are assigned by declaration order starting
/// at 1 and are stable within one build. Flat unions have empty payloads.
pub trait WireEnum: Sized {
    const NAME: &'static str;

    /// 1-based declaration-order discriminant of this value's variant.
    fn variant_tag(&self) -> i32;

    fn write_payload(&self, writer: &mut Writer);

    /// Decodes the payload for `tag`, or `None` when the tag is unknown.
    fn read_variant(tag: i32, reader: &mut Reader<'_>) -> Option<Self>;

    fn destroy_payload(self) {}
}

#[derive(Debug)]
pub struct EnumCodec<E>(PhantomData<E>);

impl<E> EnumCodec<E> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<E> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: WireEnum> Codec for EnumCodec<E> {
    type Value = E;

    fn write(&self, writer: &mut Writer, value: &E) {
        writer.write_i32(value.variant_tag());
        value.write_payload(writer);
    }

    fn read(&self, reader: &mut Reader<'_>) -> E {
        let tag = reader.read_i32();
        E::read_variant(tag, reader)
            .unwrap_or_else(|| panic!("unknown discriminant {tag} while decoding {}", E::NAME))
    }

    fn destroy(&self, value: E) {
        value.destroy_payload();
    }
}

/// Error unions share the tagged-union wire form.
pub type ErrorCodec<E> = EnumCodec<E>;

/// Delegates wholly to a builtin codec through two externally supplied pure
/// mapping functions; the mappings are the only place conversion logic
/// diverges from the builtin.
pub struct CustomCodec<C: Codec, T> {
    inner: C,
    into_builtin: fn(&T) -> C::Value,
    from_builtin: fn(C::Value) -> T,
}

impl<C: Codec, T> CustomCodec<C, T> {
    pub const fn new(
        inner: C,
        into_builtin: fn(&T) -> C::Value,
        from_builtin: fn(C::Value) -> T,
    ) -> Self {
        Self {
            inner,
            into_builtin,
            from_builtin,
        }
    }
}

impl<C: Codec, T> Codec for CustomCodec<C, T> {
    type Value = T;

    fn write(&self, writer: &mut Writer, value: &T) {
        let builtin = (self.into_builtin)(value);
        self.inner.write(writer, &builtin);
    }

    fn read(&self, reader: &mut Reader<'_>) -> T {
        (self.from_builtin)(self.inner.read(reader))
    }

    fn destroy(&self, value: T) {
        let builtin = (self.into_builtin)(&value);
        self.inner.destroy(builtin);
    }
}
