//! The numeric encoding used on the stack.
//!
//! Numbers are serialized as little-endian byte sequences of their absolute
//! value, with the sign carried in the high bit of the most significant byte.
//! Zero is the empty sequence. Operands read from the stack are limited to
//! four bytes; results of arithmetic may exceed the operand range but always
//! re-encode canonically.

use thiserror::Error;

/// Ways in which a stack element can fail to decode as a number.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("non-minimal encoding of script number")]
    NonMinimalEncoding,

    #[error("script number overflow: max: {max_size}, actual: {actual}")]
    Overflow { max_size: usize, actual: usize },
}

const DEFAULT_MAX_SIZE: usize = 4;

/// Convert bytes to the integer they encode.
pub fn parse(vch: &[u8], require_minimal: bool, max_size: Option<usize>) -> Result<i64, Error> {
    match vch.last() {
        None => Ok(0),
        Some(vch_back) => {
            let max_size = max_size.unwrap_or(DEFAULT_MAX_SIZE);
            if vch.len() > max_size {
                return Err(Error::Overflow {
                    max_size,
                    actual: vch.len(),
                });
            }
            if require_minimal {
                // Check that the number is encoded with the minimum possible number of bytes.
                //
                // If the most-significant-byte - excluding the sign bit - is zero then we're not
                // minimal. Note how this test also rejects the negative-zero encoding, 0x80.
                if (vch_back & 0x7f) == 0 {
                    // One exception: if there's more than one byte and the most significant bit of
                    // the second-most-significant-byte is set then it would have conflicted with
                    // the sign bit if one fewer byte were used, and so such encodings are minimal.
                    // An example of this is +-255, which have minimal encodings [0xff, 0x00] and
                    // [0xff, 0x80] respectively.
                    if vch.len() <= 1 || (vch[vch.len() - 2] & 0x80) == 0 {
                        return Err(Error::NonMinimalEncoding);
                    }
                }
            }

            // A 9-byte value would shift by 64 below, which is not defined for i64.
            if vch.len() > 8 {
                return Err(Error::Overflow {
                    max_size: 8,
                    actual: vch.len(),
                });
            }

            let mut result: i64 = 0;
            for (i, vch_i) in vch.iter().enumerate() {
                result |= i64::from(*vch_i) << (8 * i);
            }

            // If the input vector's most significant byte is 0x80, remove it from the result's msb
            // and return a negative.
            if vch_back & 0x80 != 0 {
                return Ok(-(result & !(0x80 << (8 * (vch.len() - 1)))));
            };

            Ok(result)
        }
    }
}

/// Convert an integer to the bytes that encode it.
pub fn serialize(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let neg = value < 0;
    let mut absvalue = value.unsigned_abs();

    while absvalue != 0 {
        result.push((absvalue & 0xff) as u8);
        absvalue >>= 8;
    }

    // - If the most significant byte is >= 0x80 and the value is positive, push a new zero-byte to
    //   make the significant byte < 0x80 again.
    // - If the most significant byte is >= 0x80 and the value is negative, push a new 0x80 byte
    //   that will be popped off when converting to an integral.
    // - If the most significant byte is < 0x80 and the value is negative, add 0x80 to it, since it
    //   will be subtracted and interpreted as a negative when converting to an integral.

    if result.last().map_or(true, |last| last & 0x80 != 0) {
        result.push(if neg { 0x80 } else { 0 });
    } else if neg {
        if let Some(last) = result.last_mut() {
            *last |= 0x80;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_the_empty_sequence() {
        assert_eq!(serialize(0), Vec::<u8>::new());
        assert_eq!(parse(&[], true, None), Ok(0));
    }

    #[test]
    fn small_values_round_trip() {
        for n in -1000..=1000 {
            assert_eq!(parse(&serialize(n), true, None), Ok(n));
        }
    }

    #[test]
    fn operand_range_round_trips() {
        for n in [
            1,
            -1,
            127,
            -127,
            128,
            -128,
            255,
            -255,
            256,
            0x7fff,
            -0x8000,
            0x7f_ffff,
            i64::from(i32::MAX),
            i64::from(i32::MIN) + 1,
        ] {
            assert_eq!(parse(&serialize(n), true, None), Ok(n));
        }
    }

    #[test]
    fn sign_bit_placement() {
        assert_eq!(serialize(127), vec![0x7f]);
        assert_eq!(serialize(-127), vec![0xff]);
        assert_eq!(serialize(128), vec![0x80, 0x00]);
        assert_eq!(serialize(-128), vec![0x80, 0x80]);
        assert_eq!(serialize(255), vec![0xff, 0x00]);
        assert_eq!(serialize(-255), vec![0xff, 0x80]);
    }

    #[test]
    fn minimal_encodings_are_fixed_points() {
        for bytes in [
            vec![0x01],
            vec![0x81],
            vec![0xff, 0x00],
            vec![0xff, 0x80],
            vec![0x00, 0x01],
            vec![0x12, 0x34, 0x56],
            vec![0xff, 0xff, 0xff, 0x7f],
        ] {
            let n = parse(&bytes, true, None).expect("minimal encoding");
            assert_eq!(serialize(n), bytes);
        }
    }

    #[test]
    fn non_minimal_encodings_are_rejected_only_when_required() {
        for bytes in [
            vec![0x00],
            vec![0x80],
            vec![0x01, 0x00],
            vec![0x05, 0x80],
            vec![0xff, 0x00, 0x00],
        ] {
            assert_eq!(
                parse(&bytes, true, None),
                Err(Error::NonMinimalEncoding),
                "{bytes:02x?}"
            );
            assert!(parse(&bytes, false, None).is_ok());
        }
    }

    #[test]
    fn negative_zero_decodes_to_zero_when_lenient() {
        assert_eq!(parse(&[0x80], false, None), Ok(0));
        assert_eq!(parse(&[0x00, 0x80], false, None), Ok(0));
    }

    #[test]
    fn oversized_operands_overflow() {
        assert_eq!(
            parse(&[1, 2, 3, 4, 5], false, None),
            Err(Error::Overflow {
                max_size: 4,
                actual: 5
            })
        );
        assert!(parse(&[1, 2, 3, 4, 5], false, Some(5)).is_ok());
    }
}
