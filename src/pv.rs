//! Convenience definitions for all push values.

use crate::{
    opcode::{LargeValue, PushValue, SmallValue::*},
    script::MAX_SCRIPT_ELEMENT_SIZE,
};

pub const _0: PushValue = PushValue::SmallValue(OP_0);
pub const _1NEGATE: PushValue = PushValue::SmallValue(OP_1NEGATE);
pub const _1: PushValue = PushValue::SmallValue(OP_1);
pub const _2: PushValue = PushValue::SmallValue(OP_2);
pub const _3: PushValue = PushValue::SmallValue(OP_3);
pub const _4: PushValue = PushValue::SmallValue(OP_4);
pub const _5: PushValue = PushValue::SmallValue(OP_5);
pub const _6: PushValue = PushValue::SmallValue(OP_6);
pub const _7: PushValue = PushValue::SmallValue(OP_7);
pub const _8: PushValue = PushValue::SmallValue(OP_8);
pub const _9: PushValue = PushValue::SmallValue(OP_9);
pub const _10: PushValue = PushValue::SmallValue(OP_10);
pub const _11: PushValue = PushValue::SmallValue(OP_11);
pub const _12: PushValue = PushValue::SmallValue(OP_12);
pub const _13: PushValue = PushValue::SmallValue(OP_13);
pub const _14: PushValue = PushValue::SmallValue(OP_14);
pub const _15: PushValue = PushValue::SmallValue(OP_15);
pub const _16: PushValue = PushValue::SmallValue(OP_16);

/// Produces a minimally-encoded data value. It fails if the slice is larger than
/// [`MAX_SCRIPT_ELEMENT_SIZE`].
pub fn push_value(value: &[u8]) -> Option<PushValue> {
    if value.len() > MAX_SCRIPT_ELEMENT_SIZE {
        None
    } else {
        PushValue::from_slice(value)
    }
}

pub fn pushdata_bytelength(value: Vec<u8>) -> PushValue {
    PushValue::LargeValue(LargeValue::PushdataBytelength(value))
}

pub fn pushdata1(value: Vec<u8>) -> PushValue {
    PushValue::LargeValue(LargeValue::OP_PUSHDATA1(value))
}

pub fn pushdata2(value: Vec<u8>) -> PushValue {
    PushValue::LargeValue(LargeValue::OP_PUSHDATA2(value))
}

pub fn pushdata4(value: Vec<u8>) -> PushValue {
    PushValue::LargeValue(LargeValue::OP_PUSHDATA4(value))
}
