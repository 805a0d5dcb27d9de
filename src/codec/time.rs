//! Timestamp and duration codecs.
//!
//! Timestamps travel as signed 64-bit seconds plus unsigned 32-bit
//! nanoseconds. Instants before the epoch use magnitude form: seconds carry
//! the sign, nanoseconds the fractional magnitude. Instants strictly inside
//! (-1s, 0) lose their sign on the wire because the seconds field rounds to
//! zero; that boundary belongs to the cross-language format and is kept as
//! is rather than fixed locally.

use std::time::{SystemTime, UNIX_EPOCH};

use super::{Codec, Reader, Writer};

#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamp;

impl Codec for Timestamp {
    type Value = SystemTime;

    fn write(&self, writer: &mut Writer, value: &SystemTime) {
        match value.duration_since(UNIX_EPOCH) {
            Ok(since) => {
                let seconds = i64::try_from(since.as_secs())
                    .unwrap_or_else(|_| panic!("timestamp seconds exceed the signed 64-bit range"));
                writer.write_i64(seconds);
                writer.write_u32(since.subsec_nanos());
            }
            Err(err) => {
                let until = err.duration();
                let seconds = i64::try_from(until.as_secs())
                    .unwrap_or_else(|_| panic!("timestamp seconds exceed the signed 64-bit range"));
                writer.write_i64(-seconds);
                writer.write_u32(until.subsec_nanos());
            }
        }
    }

    fn read(&self, reader: &mut Reader<'_>) -> SystemTime {
        let seconds = reader.read_i64();
        let nanos = reader.read_u32();
        let magnitude = std::time::Duration::new(seconds.unsigned_abs(), nanos);
        let instant = if seconds >= 0 {
            UNIX_EPOCH.checked_add(magnitude)
        } else {
            UNIX_EPOCH.checked_sub(magnitude)
        };
        instant.unwrap_or_else(|| panic!("timestamp {seconds}s {nanos}ns out of range"))
    }
}

/// Non-negative span: signed 64-bit seconds plus unsigned 32-bit
/// nanoseconds. Negative durations are a native-side invariant and show up
/// here only as corrupt input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Duration;

impl Codec for Duration {
    type Value = std::time::Duration;

    fn write(&self, writer: &mut Writer, value: &std::time::Duration) {
        let seconds = i64::try_from(value.as_secs())
            .unwrap_or_else(|_| panic!("duration seconds exceed the signed 64-bit range"));
        writer.write_i64(seconds);
        writer.write_u32(value.subsec_nanos());
    }

    fn read(&self, reader: &mut Reader<'_>) -> std::time::Duration {
        let seconds = reader.read_i64();
        let nanos = reader.read_u32();
        let seconds = u64::try_from(seconds)
            .unwrap_or_else(|_| panic!("negative duration seconds {seconds}"));
        std::time::Duration::new(seconds, nanos)
    }
}
