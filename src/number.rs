//! Scalar numeric encoding: the compact inline form for small exact integers, and the 8-byte
//! big-endian IEEE-754 form for everything else.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_traits::NumCast;

use crate::error::{Error, Result};
use crate::tag::{self, Tag};

/// The canonical quiet-NaN bit pattern every NaN is normalized to on encode.
pub const CANONICAL_NAN_BITS: u64 = 0x7FF8_0000_0000_0000;

/// A shardwire number: either a 64-bit signed integer or a 64-bit float.
///
/// Integers in `[-100, 100]` always take the one-byte inline form. Integers outside that range
/// take the extended 9-byte integer form (tag `212`) and always round-trip exactly as `Int` —
/// they are never silently widened to `Float`.
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// True if this number is an integer in the inline-encodable range.
    pub fn is_inline(&self) -> bool {
        matches!(self, Number::Int(v) if (tag::INLINE_INT_MIN..=tag::INLINE_INT_MAX).contains(v))
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Int(v) => Some(v),
            Number::Float(_) => None,
        }
    }

    /// Cast this number to any fixed-width target type, succeeding only when it is an integer
    /// that fits losslessly. A float never casts here, even one with no fractional part — callers
    /// that want float-to-int truncation should go through `as_f64` themselves.
    pub fn cast<T: NumCast>(&self) -> Option<T> {
        match *self {
            Number::Int(v) => NumCast::from(v),
            Number::Float(_) => None,
        }
    }

    /// Write this number's inline byte (only valid for values where [`Number::is_inline`]
    /// holds).
    fn inline_byte(&self) -> u8 {
        match *self {
            Number::Int(v) => Tag::inline_int_byte(v),
            Number::Float(_) => unreachable!("Float is never inline"),
        }
    }

    /// Encode this number onto `buf`: the one-byte inline form for small integers, tag `212` plus
    /// 8 big-endian two's-complement bytes for any other integer, or tag `203` plus 8 big-endian
    /// IEEE-754 bytes for a float.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        if self.is_inline() {
            buf.push(self.inline_byte());
            return;
        }
        match *self {
            Number::Int(v) => {
                buf.push(crate::tag::TAG_BIG_INT);
                // unwrap: writing to a Vec<u8> never fails.
                buf.write_i64::<BigEndian>(v).unwrap();
            }
            Number::Float(v) => {
                buf.push(crate::tag::TAG_FLOAT);
                let bits = if v.is_nan() { CANONICAL_NAN_BITS } else { v.to_bits() };
                buf.write_u64::<BigEndian>(bits).unwrap();
            }
        }
    }

    /// Decode the body following a `203` tag into a [`Number::Float`]. `offset` is the byte
    /// position of the tag itself, used only for error reporting.
    ///
    /// Two historical wire forms exist: the compact 8-byte big-endian IEEE-754 body this crate
    /// produces, and a legacy `%.17g`-decimal-text body terminated by a second `203` byte, from
    /// an era before a fixed-width form was adopted. The two are told apart structurally: the
    /// legacy terminator can only appear where the compact form's raw bytes happen to be valid
    /// float-literal ASCII for their entire span, which is astronomically unlikely for a real
    /// IEEE-754 bit pattern, so a second `203` within the first 8 bytes is read as the legacy
    /// form only when every intervening byte is such a character; otherwise the compact 8-byte
    /// form is assumed.
    pub fn decode_float_body(buf: &mut &[u8], offset: usize) -> Result<Number> {
        // A `%.17g` literal (plus sign, point, exponent) never exceeds this many characters;
        // bounding the terminator search keeps an unrelated `203` byte much later in the stream
        // from being mistaken for this value's legacy terminator.
        const MAX_LEGACY_LEN: usize = 32;
        let horizon = buf.len().min(MAX_LEGACY_LEN);
        if let Some(term) = buf[..horizon].iter().position(|&b| b == crate::tag::TAG_FLOAT) {
            if buf[..term].iter().all(|&b| is_legacy_float_char(b)) {
                let text = std::str::from_utf8(&buf[..term]).map_err(|_| Error::MalformedNumber {
                    offset,
                    reason: "legacy float body is not valid UTF-8".into(),
                })?;
                let v: f64 = text.trim().parse().map_err(|_| Error::MalformedNumber {
                    offset,
                    reason: format!("legacy float text {text:?} did not parse"),
                })?;
                *buf = &buf[term + 1..];
                let v = if v.is_nan() {
                    f64::from_bits(CANONICAL_NAN_BITS)
                } else {
                    v
                };
                return Ok(Number::Float(v));
            }
        }
        if buf.len() < 8 {
            return Err(Error::TruncatedInput {
                offset: offset + 1,
                needed: 8,
                remaining: buf.len(),
            });
        }
        let bits = buf.read_u64::<BigEndian>().expect("length checked above");
        let v = f64::from_bits(bits);
        let v = if v.is_nan() {
            f64::from_bits(CANONICAL_NAN_BITS)
        } else {
            v
        };
        Ok(Number::Float(v))
    }

    /// Decode the body following a `212` tag into a [`Number::Int`]: 8 big-endian
    /// two's-complement bytes, no ambiguity with the float form since it's a distinct tag.
    /// `offset` is the byte position of the tag itself, used only for error reporting.
    pub fn decode_bigint_body(buf: &mut &[u8], offset: usize) -> Result<Number> {
        if buf.len() < 8 {
            return Err(Error::TruncatedInput {
                offset: offset + 1,
                needed: 8,
                remaining: buf.len(),
            });
        }
        let v = buf.read_i64::<BigEndian>().expect("length checked above");
        Ok(Number::Int(v))
    }
}

/// True for a byte that can legally appear in a `%.17g`-style decimal float literal (digits,
/// sign, decimal point, exponent marker, or the `inf`/`nan` spellings).
fn is_legacy_float_char(b: u8) -> bool {
    matches!(b, b'0'..=b'9' | b'.' | b'-' | b'+' | b'e' | b'E' | b'i' | b'n' | b'f' | b'a' | b'N' | b'I' | b'F' | b'A')
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl PartialEq for Number {
    /// Structural equality, with NaN compared by bit pattern rather than IEEE-754 ordering (so
    /// that a canonical NaN equals itself, matching the round-trip invariant rather than
    /// `f64::eq`'s `NaN != NaN`).
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a.to_bits() == b.to_bits()
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(n: Number) -> Number {
        let mut buf = Vec::new();
        n.encode(&mut buf);
        let mut slice: &[u8] = &buf;
        let tag = slice[0];
        slice = &slice[1..];
        match Tag::from_u8(tag) {
            Some(Tag::InlineInt(v)) => Number::Int(v),
            Some(Tag::BigInt) => Number::decode_bigint_body(&mut slice, 0).unwrap(),
            _ => Number::decode_float_body(&mut slice, 0).unwrap(),
        }
    }

    #[test]
    fn small_ints_are_one_byte() {
        for v in -100..=100i64 {
            let mut buf = Vec::new();
            Number::Int(v).encode(&mut buf);
            assert_eq!(buf.len(), 1, "n={v}");
        }
    }

    #[test]
    fn small_ints_round_trip() {
        for v in -100..=100i64 {
            assert_eq!(round_trip(Number::Int(v)), Number::Int(v));
        }
    }

    #[test]
    fn out_of_range_ints_use_extended_int_form_and_round_trip() {
        for v in [101i64, -101, i64::MAX, i64::MIN, 123_456_789, -987_654_321] {
            let mut buf = Vec::new();
            Number::Int(v).encode(&mut buf);
            assert_eq!(buf.len(), 9);
            assert_eq!(buf[0], crate::tag::TAG_BIG_INT);
            assert_eq!(round_trip(Number::Int(v)), Number::Int(v));
        }
    }

    #[test]
    fn special_floats_round_trip_bitwise() {
        let values = [
            0.0f64,
            -0.0,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::from_bits(0.5f64.to_bits()) * 2f64.powi(-1022), // smallest normal
            0.5 * 2f64.powi(-1021),                              // subnormal boundary
            0.985 * 2f64.powi(1023),                             // near-max
        ];
        for v in values {
            let got = round_trip(Number::Float(v));
            match got {
                Number::Float(got) => assert_eq!(got.to_bits(), v.to_bits(), "v={v}"),
                _ => panic!("expected float"),
            }
        }
    }

    #[test]
    fn nan_encodes_canonically() {
        let got = round_trip(Number::Float(f64::NAN));
        match got {
            Number::Float(got) => assert_eq!(got.to_bits(), CANONICAL_NAN_BITS),
            _ => panic!("expected float"),
        }
        // A non-canonical NaN payload must also normalize.
        let weird_nan = f64::from_bits(0x7FF0_0000_0000_0001);
        assert!(weird_nan.is_nan());
        let got = round_trip(Number::Float(weird_nan));
        match got {
            Number::Float(got) => assert_eq!(got.to_bits(), CANONICAL_NAN_BITS),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn negative_zero_preserved() {
        let got = round_trip(Number::Float(-0.0));
        match got {
            Number::Float(got) => assert!(got.is_sign_negative()),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn cast_rejects_out_of_range_and_floats() {
        assert_eq!(Number::Int(5).cast::<u8>(), Some(5u8));
        assert_eq!(Number::Int(-1).cast::<u8>(), None);
        assert_eq!(Number::Int(1000).cast::<u8>(), None);
        assert_eq!(Number::Float(5.0).cast::<u8>(), None);
    }

    #[test]
    fn legacy_text_float_decodes() {
        let mut buf = Vec::new();
        buf.push(crate::tag::TAG_FLOAT);
        buf.extend_from_slice(b"3.5");
        buf.push(crate::tag::TAG_FLOAT);
        let mut slice: &[u8] = &buf[1..];
        let n = Number::decode_float_body(&mut slice, 0).unwrap();
        assert_eq!(n, Number::Float(3.5));
        assert!(slice.is_empty());
    }

    #[test]
    fn legacy_text_negative_float_decodes() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"-17.25");
        buf.push(crate::tag::TAG_FLOAT);
        let mut slice: &[u8] = &buf;
        let n = Number::decode_float_body(&mut slice, 0).unwrap();
        assert_eq!(n, Number::Float(-17.25));
    }

    #[test]
    fn malformed_legacy_text_is_rejected() {
        // Every byte is a legal float-literal character, but the span as a whole doesn't parse.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"1.2.3");
        buf.push(crate::tag::TAG_FLOAT);
        let mut slice: &[u8] = &buf;
        let err = Number::decode_float_body(&mut slice, 0).unwrap_err();
        assert!(matches!(err, Error::MalformedNumber { .. }));
    }
}
