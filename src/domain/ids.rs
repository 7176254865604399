//! Trace/span id normalization: wire bytes (16/8 bytes) to lowercase hex (32/16 chars).

/// Normalizes wire trace-id bytes to a 32-char lowercase hex string. Empty or
/// all-zero input encodes to 32 zero characters rather than failing, matching the
/// wire's own "unset" representation.
#[must_use]
pub fn encode_trace_id(bytes: &[u8]) -> String {
    encode_fixed::<16>(bytes)
}

/// Normalizes wire span-id bytes to a 16-char lowercase hex string.
#[must_use]
pub fn encode_span_id(bytes: &[u8]) -> String {
    encode_fixed::<8>(bytes)
}

fn encode_fixed<const N: usize>(bytes: &[u8]) -> String {
    if bytes.is_empty() || bytes.iter().all(|&b| b == 0) {
        return "0".repeat(N * 2);
    }
    let mut padded = [0u8; N];
    let start = N.saturating_sub(bytes.len());
    let copy_len = bytes.len().min(N);
    padded[start..start + copy_len].copy_from_slice(&bytes[..copy_len]);
    hex::encode(padded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_trace_id_full() {
        let bytes: Vec<u8> = (1..=16).collect();
        assert_eq!(encode_trace_id(&bytes), "0102030405060708090a0b0c0d0e0f10");
    }

    #[test]
    fn test_encode_empty_trace_id_is_all_zero() {
        assert_eq!(encode_trace_id(&[]), "0".repeat(32));
        assert_eq!(encode_trace_id(&[0u8; 16]), "0".repeat(32));
    }

    #[test]
    fn test_encode_span_id_full() {
        let bytes: Vec<u8> = (1..=8).collect();
        assert_eq!(encode_span_id(&bytes), "0102030405060708");
    }

    #[test]
    fn test_encode_empty_span_id_is_all_zero() {
        assert_eq!(encode_span_id(&[]), "0".repeat(16));
    }
}
