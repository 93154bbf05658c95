#![allow(non_camel_case_types)]

//! The opcodes that place data on the stack.

use enum_primitive::FromPrimitive;

use super::Error;

/// Data values that aren’t represented within their opcode byte.
///
/// Each variant remembers which of the four push encodings carried it, so a
/// parsed script serializes back to the exact bytes it came from even when
/// the encoding isn’t minimal.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LargeValue {
    /// A direct push: the opcode byte is the payload length (0x01–0x4b).
    PushdataBytelength(Vec<u8>),
    OP_PUSHDATA1(Vec<u8>),
    OP_PUSHDATA2(Vec<u8>),
    OP_PUSHDATA4(Vec<u8>),
}

use LargeValue::*;

impl LargeValue {
    pub(crate) const PUSHDATA1_BYTE: u8 = 0x4c;
    pub(crate) const PUSHDATA2_BYTE: u8 = 0x4d;
    pub(crate) const PUSHDATA4_BYTE: u8 = 0x4e;

    /// Returns a [`LargeValue`] as minimally-encoded as possible. Non-empty values that should be
    /// minimally encoded as a [`SmallValue`] still come back as [`PushdataBytelength`].
    pub fn from_slice(v: &[u8]) -> Option<LargeValue> {
        match v.len() {
            0 => None,
            1..=0x4b => Some(PushdataBytelength(v.to_vec())),
            0x4c..=0xff => Some(OP_PUSHDATA1(v.to_vec())),
            0x100..=0xffff => Some(OP_PUSHDATA2(v.to_vec())),
            _ => u32::try_from(v.len())
                .ok()
                .map(|_| OP_PUSHDATA4(v.to_vec())),
        }
    }

    fn split_value(script: &[u8], needed_bytes: usize) -> Result<(&[u8], &[u8]), Error> {
        script.split_at_checked(needed_bytes).ok_or(Error::Read {
            expected_bytes: needed_bytes,
            available_bytes: script.len(),
        })
    }

    /// First splits `size_size` bytes to determine the length of the value to read, then splits
    /// the value itself.
    fn split_tagged_value(script: &[u8], size_size: usize) -> Result<(&[u8], &[u8]), Error> {
        Self::split_value(script, size_size).and_then(|(bytes, script)| {
            let mut size = 0;
            for byte in bytes.iter().rev() {
                size <<= 8;
                size |= usize::from(*byte);
            }
            Self::split_value(script, size)
        })
    }

    /// Parse a single [`LargeValue`] from a script. Returns `Ok(None)` if the first byte doesn’t
    /// introduce one.
    pub fn parse(script: &[u8]) -> Result<Option<(LargeValue, &[u8])>, Error> {
        match script.split_first() {
            None => Err(Error::Read {
                expected_bytes: 1,
                available_bytes: 0,
            }),
            Some((leading_byte, script)) => match *leading_byte {
                1..Self::PUSHDATA1_BYTE => Self::split_value(script, usize::from(*leading_byte))
                    .map(|(v, rest)| Some((PushdataBytelength(v.to_vec()), rest))),
                Self::PUSHDATA1_BYTE => Self::split_tagged_value(script, 1)
                    .map(|(v, rest)| Some((OP_PUSHDATA1(v.to_vec()), rest))),
                Self::PUSHDATA2_BYTE => Self::split_tagged_value(script, 2)
                    .map(|(v, rest)| Some((OP_PUSHDATA2(v.to_vec()), rest))),
                Self::PUSHDATA4_BYTE => Self::split_tagged_value(script, 4)
                    .map(|(v, rest)| Some((OP_PUSHDATA4(v.to_vec()), rest))),
                _ => Ok(None),
            },
        }
    }

    /// Get the stack element represented by this [`LargeValue`].
    pub fn value(&self) -> &[u8] {
        match self {
            PushdataBytelength(v) | OP_PUSHDATA1(v) | OP_PUSHDATA2(v) | OP_PUSHDATA4(v) => v,
        }
    }

    /// Returns false if there is a smaller possible encoding of the contained value.
    pub fn is_minimal_push(&self) -> bool {
        match self {
            PushdataBytelength(data) => match data.as_slice() {
                // Single bytes expressible as OP_1NEGATE or OP_1..OP_16 have a one-byte encoding.
                [b] => *b != 0x81 && (*b < 1 || 16 < *b),
                _ => true,
            },
            OP_PUSHDATA1(data) => usize::from(Self::PUSHDATA1_BYTE) <= data.len(),
            OP_PUSHDATA2(data) => 0x100 <= data.len(),
            OP_PUSHDATA4(data) => 0x10000 <= data.len(),
        }
    }
}

impl From<&LargeValue> for Vec<u8> {
    fn from(value: &LargeValue) -> Self {
        match value {
            PushdataBytelength(v) => {
                let mut bytes = vec![v.len() as u8];
                bytes.extend_from_slice(v);
                bytes
            }
            OP_PUSHDATA1(v) => {
                let mut bytes = vec![LargeValue::PUSHDATA1_BYTE, v.len() as u8];
                bytes.extend_from_slice(v);
                bytes
            }
            OP_PUSHDATA2(v) => {
                let mut bytes = vec![LargeValue::PUSHDATA2_BYTE];
                bytes.extend_from_slice(&(v.len() as u16).to_le_bytes());
                bytes.extend_from_slice(v);
                bytes
            }
            OP_PUSHDATA4(v) => {
                let mut bytes = vec![LargeValue::PUSHDATA4_BYTE];
                bytes.extend_from_slice(&(v.len() as u32).to_le_bytes());
                bytes.extend_from_slice(v);
                bytes
            }
        }
    }
}

enum_from_primitive! {
/// Data values represented entirely by their opcode byte.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum SmallValue {
    OP_0 = 0x00,
    OP_1NEGATE = 0x4f,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,
}
}

use SmallValue::*;

impl SmallValue {
    /// Get the stack element represented by this [`SmallValue`].
    pub fn value(&self) -> Vec<u8> {
        match self {
            OP_0 => vec![],
            OP_1NEGATE => vec![0x81],
            _ => vec![u8::from(*self) - (u8::from(OP_1) - 1)],
        }
    }

    /// The number this opcode pushes.
    pub fn to_num(&self) -> i8 {
        match self {
            OP_0 => 0,
            OP_1NEGATE => -1,
            _ => (u8::from(*self) - (u8::from(OP_1) - 1)) as i8,
        }
    }

    /// The opcode that pushes the given number, for -1 and 0..=16.
    pub fn from_num(n: i8) -> Option<SmallValue> {
        match n {
            0 => Some(OP_0),
            -1 => Some(OP_1NEGATE),
            1..=16 => SmallValue::from_u8(u8::from(OP_1) + (n as u8 - 1)),
            _ => None,
        }
    }
}

impl From<SmallValue> for u8 {
    fn from(value: SmallValue) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_map_to_their_numbers() {
        assert_eq!(OP_0.value(), Vec::<u8>::new());
        assert_eq!(OP_1NEGATE.value(), vec![0x81]);
        assert_eq!(OP_1.value(), vec![1]);
        assert_eq!(OP_16.value(), vec![16]);
        for n in -1..=16 {
            let sv = SmallValue::from_num(n).expect("in range");
            assert_eq!(sv.to_num(), n);
        }
        assert_eq!(SmallValue::from_num(17), None);
        assert_eq!(SmallValue::from_num(-2), None);
    }

    #[test]
    fn from_slice_picks_the_shortest_encoding() {
        assert_eq!(LargeValue::from_slice(&[]), None);
        assert!(matches!(
            LargeValue::from_slice(&[0u8; 0x4b]),
            Some(PushdataBytelength(_))
        ));
        assert!(matches!(
            LargeValue::from_slice(&[0u8; 0x4c]),
            Some(OP_PUSHDATA1(_))
        ));
        assert!(matches!(
            LargeValue::from_slice(&[0u8; 0x100]),
            Some(OP_PUSHDATA2(_))
        ));
        assert!(matches!(
            LargeValue::from_slice(&[0u8; 0x10000]),
            Some(OP_PUSHDATA4(_))
        ));
    }

    #[test]
    fn serialization_prefixes_are_fixed_width() {
        let direct = PushdataBytelength(vec![0xaa, 0xbb]);
        assert_eq!(Vec::from(&direct), vec![0x02, 0xaa, 0xbb]);

        let pd1 = OP_PUSHDATA1(vec![0xcc; 0xff]);
        let bytes = Vec::from(&pd1);
        assert_eq!(&bytes[..2], &[0x4c, 0xff]);
        assert_eq!(bytes.len(), 2 + 0xff);

        let pd2 = OP_PUSHDATA2(vec![0xdd; 0x0102]);
        let bytes = Vec::from(&pd2);
        assert_eq!(&bytes[..3], &[0x4d, 0x02, 0x01]);

        let pd4 = OP_PUSHDATA4(vec![0xee; 5]);
        let bytes = Vec::from(&pd4);
        assert_eq!(&bytes[..5], &[0x4e, 0x05, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn parse_reads_back_each_encoding() {
        for lv in [
            PushdataBytelength(vec![1, 2, 3]),
            OP_PUSHDATA1(vec![4; 80]),
            OP_PUSHDATA2(vec![5; 300]),
            OP_PUSHDATA4(vec![6; 7]),
        ] {
            let bytes = Vec::from(&lv);
            let (parsed, rest) = LargeValue::parse(&bytes)
                .expect("parses")
                .expect("is a large value");
            assert_eq!(parsed, lv);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn truncated_payloads_fail() {
        assert_eq!(
            LargeValue::parse(&[0x05, 1, 2]),
            Err(Error::Read {
                expected_bytes: 5,
                available_bytes: 2
            })
        );
        assert_eq!(
            LargeValue::parse(&[0x4c]),
            Err(Error::Read {
                expected_bytes: 1,
                available_bytes: 0
            })
        );
        assert_eq!(
            LargeValue::parse(&[0x4d, 0x10, 0x00, 1, 2]),
            Err(Error::Read {
                expected_bytes: 16,
                available_bytes: 2
            })
        );
    }

    #[test]
    fn minimality_tracks_the_encoding() {
        assert!(PushdataBytelength(vec![0x17]).is_minimal_push());
        assert!(!PushdataBytelength(vec![0x01]).is_minimal_push());
        assert!(!PushdataBytelength(vec![0x81]).is_minimal_push());
        assert!(!OP_PUSHDATA1(vec![0; 10]).is_minimal_push());
        assert!(OP_PUSHDATA1(vec![0; 0x4c]).is_minimal_push());
        assert!(!OP_PUSHDATA2(vec![0; 0xff]).is_minimal_push());
        assert!(OP_PUSHDATA2(vec![0; 0x100]).is_minimal_push());
        assert!(!OP_PUSHDATA4(vec![0; 0x100]).is_minimal_push());
    }
}
