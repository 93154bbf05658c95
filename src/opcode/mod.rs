#![allow(non_camel_case_types)]

//! The opcode dictionary.
//!
//! Every byte value maps to exactly one token kind, and every token knows its
//! byte (or bytes, for pushes), so the mapping is bidirectional and fixed at
//! compile time.

pub mod push_value;

use enum_primitive::FromPrimitive;
use thiserror::Error;

use crate::Opcode;
pub use push_value::{LargeValue, SmallValue};

/// Parse failures. These only occur when a script ends in the middle of a
/// push; every complete byte is some token.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("expected {expected_bytes} bytes, but only {available_bytes} bytes available")]
    Read {
        expected_bytes: usize,
        available_bytes: usize,
    },
}

/// Opcodes that represent constants to be pushed onto the stack.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PushValue {
    /// Constants that are represented by a single byte.
    SmallValue(SmallValue),
    /// Constants that contain data in addition to the opcode byte.
    LargeValue(LargeValue),
}

impl PushValue {
    /// Produce a minimal `PushValue` for the given data.
    pub fn from_slice(v: &[u8]) -> Option<PushValue> {
        match v {
            [] => Some(PushValue::SmallValue(SmallValue::OP_0)),
            [0x81] => Some(PushValue::SmallValue(SmallValue::OP_1NEGATE)),
            [b @ 1..=16] => SmallValue::from_num(*b as i8).map(PushValue::SmallValue),
            _ => LargeValue::from_slice(v).map(PushValue::LargeValue),
        }
    }

    /// Get the stack element represented by this `PushValue`.
    pub fn value(&self) -> Vec<u8> {
        match self {
            PushValue::LargeValue(lv) => lv.value().to_vec(),
            PushValue::SmallValue(sv) => sv.value(),
        }
    }

    /// Returns false if there is a smaller possible encoding of the pushed value.
    pub fn is_minimal_push(&self) -> bool {
        match self {
            PushValue::LargeValue(lv) => lv.is_minimal_push(),
            PushValue::SmallValue(_) => true,
        }
    }
}

impl From<SmallValue> for PushValue {
    fn from(value: SmallValue) -> Self {
        Self::SmallValue(value)
    }
}

impl From<LargeValue> for PushValue {
    fn from(value: LargeValue) -> Self {
        Self::LargeValue(value)
    }
}

impl From<&PushValue> for Vec<u8> {
    fn from(value: &PushValue) -> Self {
        match value {
            PushValue::SmallValue(v) => vec![(*v).into()],
            PushValue::LargeValue(v) => v.into(),
        }
    }
}

enum_from_primitive! {
/// Conditional operations are evaluated regardless of whether the current branch is active.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Control {
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
}
}

enum_from_primitive! {
/// Normal operations are only executed when they are on an active branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Operation {
    // control
    OP_NOP = 0x61,
    OP_VERIFY = 0x69,

    // stack ops
    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    // splice ops
    OP_SIZE = 0x82,

    // bit logic
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,

    // numeric
    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,

    OP_ADD = 0x93,
    OP_SUB = 0x94,

    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,

    OP_WITHIN = 0xa5,

    // crypto
    OP_RIPEMD160 = 0xa6,
    OP_SHA1 = 0xa7,
    OP_SHA256 = 0xa8,
    OP_HASH160 = 0xa9,
    OP_HASH256 = 0xaa,
    OP_CODESEPARATOR = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,

    // expansion
    OP_NOP1 = 0xb0,
    OP_NOP2 = 0xb1,
    OP_NOP3 = 0xb2,
    OP_NOP4 = 0xb3,
    OP_NOP5 = 0xb4,
    OP_NOP6 = 0xb5,
    OP_NOP7 = 0xb6,
    OP_NOP8 = 0xb7,
    OP_NOP9 = 0xb8,
    OP_NOP10 = 0xb9,
}
}

impl Operation {
    /// `OP_NOP1`–`OP_NOP10` are reserved for soft-fork upgrades; executing one may be refused by
    /// policy.
    pub fn is_upgradable_nop(&self) -> bool {
        Operation::OP_NOP1 <= *self && *self <= Operation::OP_NOP10
    }
}

enum_from_primitive! {
/// Opcodes whose behavior was removed from the protocol. They fail the script even on an
/// inactive branch.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(u8)]
pub enum Disabled {
    // splice ops
    OP_CAT = 0x7e,
    OP_SUBSTR = 0x7f,
    OP_LEFT = 0x80,
    OP_RIGHT = 0x81,
    // bit logic
    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    // numeric
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,
}
}

/// Bytes with no defined operation. They fail when evaluated on an active branch, except for
/// `OP_VERIF` and `OP_VERNOTIF`, which fail unconditionally because they sit in the conditional
/// range and would otherwise influence branch tracking.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Bad {
    OP_VERIF,
    OP_VERNOTIF,
    Unknown(u8),
}

impl From<u8> for Bad {
    fn from(value: u8) -> Self {
        match value {
            0x65 => Bad::OP_VERIF,
            0x66 => Bad::OP_VERNOTIF,
            _ => Bad::Unknown(value),
        }
    }
}

impl From<Bad> for u8 {
    fn from(value: Bad) -> Self {
        match value {
            Bad::OP_VERIF => 0x65,
            Bad::OP_VERNOTIF => 0x66,
            Bad::Unknown(byte) => byte,
        }
    }
}

impl From<Control> for u8 {
    fn from(value: Control) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

impl From<Operation> for u8 {
    fn from(value: Operation) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

impl From<Disabled> for u8 {
    fn from(value: Disabled) -> Self {
        // This is how you get the discriminant, but using `as` everywhere is too much code smell
        value as u8
    }
}

/// When writing scripts we only allow well-defined opcodes, so [`Opcode`] excludes the rest.
/// Scripts read from the chain can contain anything, though, and most of it only matters if it
/// would be evaluated, so this type holds whatever parsing found.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum PossiblyBad {
    Good(Opcode),
    Disabled(Disabled),
    Bad(Bad),
    /// Raw coinbase input data, carried whole. It serializes verbatim and is never evaluated.
    CoinbaseData(Vec<u8>),
}

impl PossiblyBad {
    /// Parse a single token from the front of a byte stream, returning the remainder.
    pub fn parse(script: &[u8]) -> Result<(PossiblyBad, &[u8]), Error> {
        match LargeValue::parse(script)? {
            Some((lv, rest)) => Ok((PushValue::LargeValue(lv).into(), rest)),
            None => match script.split_first() {
                None => Err(Error::Read {
                    expected_bytes: 1,
                    available_bytes: 0,
                }),
                Some((leading_byte, rest)) => Ok((
                    if let Some(sv) = SmallValue::from_u8(*leading_byte) {
                        PushValue::SmallValue(sv).into()
                    } else if let Some(control) = Control::from_u8(*leading_byte) {
                        Opcode::Control(control).into()
                    } else if let Some(op) = Operation::from_u8(*leading_byte) {
                        Opcode::Operation(op).into()
                    } else if let Some(disabled) = Disabled::from_u8(*leading_byte) {
                        PossiblyBad::Disabled(disabled)
                    } else {
                        PossiblyBad::Bad(Bad::from(*leading_byte))
                    },
                    rest,
                )),
            },
        }
    }
}

impl From<Opcode> for PossiblyBad {
    fn from(value: Opcode) -> Self {
        PossiblyBad::Good(value)
    }
}

impl From<PushValue> for PossiblyBad {
    fn from(value: PushValue) -> Self {
        PossiblyBad::Good(Opcode::PushValue(value))
    }
}

impl From<&PossiblyBad> for Vec<u8> {
    fn from(value: &PossiblyBad) -> Self {
        match value {
            PossiblyBad::Good(opcode) => opcode.into(),
            PossiblyBad::Disabled(disabled) => vec![u8::from(*disabled)],
            PossiblyBad::Bad(bad) => vec![u8::from(*bad)],
            PossiblyBad::CoinbaseData(data) => data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_parses_to_exactly_one_token() {
        for byte in 0x4f..=0xff_u8 {
            let bytes = [byte];
            let (token, rest) = PossiblyBad::parse(&bytes).expect("single byte tokens");
            assert!(rest.is_empty());
            assert_eq!(Vec::from(&token), vec![byte], "{byte:#x}");
        }
    }

    #[test]
    fn token_classes_are_disjoint() {
        assert!(matches!(
            PossiblyBad::parse(&[0x63]),
            Ok((PossiblyBad::Good(Opcode::Control(Control::OP_IF)), _))
        ));
        assert!(matches!(
            PossiblyBad::parse(&[0x76]),
            Ok((PossiblyBad::Good(Opcode::Operation(Operation::OP_DUP)), _))
        ));
        assert!(matches!(
            PossiblyBad::parse(&[0x7e]),
            Ok((PossiblyBad::Disabled(Disabled::OP_CAT), _))
        ));
        assert!(matches!(
            PossiblyBad::parse(&[0x65]),
            Ok((PossiblyBad::Bad(Bad::OP_VERIF), _))
        ));
        // OP_RETURN and the reserved bytes have no defined operation here.
        for byte in [0x50, 0x62, 0x6a, 0x89, 0x8a, 0xba, 0xff] {
            assert!(matches!(
                PossiblyBad::parse(&[byte]),
                Ok((PossiblyBad::Bad(Bad::Unknown(b)), _)) if b == byte
            ));
        }
    }

    #[test]
    fn code_separator_is_an_operation_not_disabled() {
        assert!(matches!(
            PossiblyBad::parse(&[0xab]),
            Ok((
                PossiblyBad::Good(Opcode::Operation(Operation::OP_CODESEPARATOR)),
                _
            ))
        ));
    }

    #[test]
    fn minimal_push_selection() {
        assert_eq!(
            PushValue::from_slice(&[]),
            Some(PushValue::SmallValue(SmallValue::OP_0))
        );
        assert_eq!(
            PushValue::from_slice(&[0x81]),
            Some(PushValue::SmallValue(SmallValue::OP_1NEGATE))
        );
        assert_eq!(
            PushValue::from_slice(&[7]),
            Some(PushValue::SmallValue(SmallValue::OP_7))
        );
        assert_eq!(
            PushValue::from_slice(&[17]),
            Some(PushValue::LargeValue(LargeValue::PushdataBytelength(vec![
                17
            ])))
        );
    }

    #[test]
    fn upgradable_nop_classifier() {
        assert!(Operation::OP_NOP1.is_upgradable_nop());
        assert!(Operation::OP_NOP10.is_upgradable_nop());
        assert!(!Operation::OP_NOP.is_upgradable_nop());
        assert!(!Operation::OP_CHECKSIG.is_upgradable_nop());
    }
}
