//! Hex to typed value decoding
//!
//! The target reports memory as hex text. The text is read as an unsigned
//! integer and its bit pattern is then reinterpreted in the variable's
//! representation, so `3f800000` decodes to `1.0f32` and `ffffffff` to `-1i32`.

use crate::error::{OcdError, Result};
use crate::types::{DecodedValue, Representation};

/// Decode hex text into a value of the given representation
///
/// Surrounding ASCII whitespace and a `0x` prefix are accepted. Text that
/// encodes more than 32 bits is rejected.
pub fn decode(hex: &[u8], representation: Representation) -> Result<DecodedValue> {
    let bits = parse_hex_u32(hex)?;
    Ok(reinterpret(bits, representation))
}

/// Reinterpret a 32-bit pattern in the given representation
pub fn reinterpret(bits: u32, representation: Representation) -> DecodedValue {
    match representation {
        Representation::Float32 => DecodedValue::Float32(f32::from_bits(bits)),
        Representation::Int32 => DecodedValue::Int32(bits as i32),
        Representation::Uint32 => DecodedValue::Uint32(bits),
    }
}

/// Parse hex text into a 32-bit pattern
pub fn parse_hex_u32(hex: &[u8]) -> Result<u32> {
    let text = std::str::from_utf8(hex)
        .map_err(|_| OcdError::Decode(format!("value is not ASCII: {:02x?}", hex)))?
        .trim();

    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    if digits.is_empty() {
        return Err(OcdError::Decode("empty value".to_string()));
    }

    let value = u64::from_str_radix(digits, 16)
        .map_err(|e| OcdError::Decode(format!("'{}' is not a hex number: {}", text, e)))?;

    u32::try_from(value)
        .map_err(|_| OcdError::Decode(format!("'{}' is wider than 32 bits", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_float_bit_pattern() {
        assert_eq!(
            decode(b"3f800000", Representation::Float32).unwrap(),
            DecodedValue::Float32(1.0)
        );
        assert_eq!(
            decode(b"40490fdb", Representation::Float32).unwrap(),
            DecodedValue::Float32(std::f32::consts::PI)
        );
        assert_eq!(
            decode(b"bf800000", Representation::Float32).unwrap(),
            DecodedValue::Float32(-1.0)
        );
    }

    #[test]
    fn test_decode_signed_and_unsigned() {
        assert_eq!(
            decode(b"ffffffff", Representation::Int32).unwrap(),
            DecodedValue::Int32(-1)
        );
        assert_eq!(
            decode(b"ffffffff", Representation::Uint32).unwrap(),
            DecodedValue::Uint32(4_294_967_295)
        );
        assert_eq!(
            decode(b"80000000", Representation::Int32).unwrap(),
            DecodedValue::Int32(i32::MIN)
        );
        assert_eq!(
            decode(b"0000002a", Representation::Int32).unwrap(),
            DecodedValue::Int32(42)
        );
    }

    #[test]
    fn test_decode_fallback_value_is_zero() {
        for &repr in Representation::all() {
            let value = decode(b"0", repr).unwrap();
            assert_eq!(value, DecodedValue::zero(repr));
            assert_eq!(value.as_f64(), 0.0);
        }
    }

    #[test]
    fn test_decode_narrow_reads_are_not_sign_extended() {
        assert_eq!(
            decode(b"ffff", Representation::Int32).unwrap(),
            DecodedValue::Int32(65535)
        );
        assert_eq!(
            decode(b"ff", Representation::Uint32).unwrap(),
            DecodedValue::Uint32(255)
        );
    }

    #[test]
    fn test_decode_accepts_prefix_and_whitespace() {
        assert_eq!(
            decode(b" 0x0000002A \r", Representation::Uint32).unwrap(),
            DecodedValue::Uint32(42)
        );
    }

    #[test]
    fn test_decode_rejects_wide_and_malformed_text() {
        assert!(decode(b"100000000", Representation::Uint32).is_err());
        assert!(decode(b"", Representation::Uint32).is_err());
        assert!(decode(b"0x", Representation::Uint32).is_err());
        assert!(decode(b"deadbeef cafef00d", Representation::Uint32).is_err());
        assert!(decode(b"xyz", Representation::Int32).is_err());
        assert!(decode(&[0xff, 0xfe], Representation::Int32).is_err());
    }

    #[test]
    fn test_decode_float_nan_pattern() {
        match decode(b"7fc00000", Representation::Float32).unwrap() {
            DecodedValue::Float32(v) => assert!(v.is_nan()),
            other => panic!("unexpected {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn test_decode_roundtrips_bit_pattern(bits in any::<u32>()) {
            let text = format!("{:08x}", bits);
            for &repr in Representation::all() {
                let value = decode(text.as_bytes(), repr).unwrap();
                prop_assert_eq!(value.to_bits(), bits);
                prop_assert_eq!(value.representation(), repr);
            }
        }

        #[test]
        fn test_decode_int32_matches_twos_complement(v in any::<i32>()) {
            let text = format!("{:08x}", v as u32);
            prop_assert_eq!(
                decode(text.as_bytes(), Representation::Int32).unwrap(),
                DecodedValue::Int32(v)
            );
        }
    }
}
