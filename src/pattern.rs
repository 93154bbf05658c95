//! Reusable bits of scripts, to avoid writing byte strings by hand.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::{
    num, op,
    opcode::{PushValue, SmallValue},
    pv,
    script::Script,
    Opcode,
};

fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Produce a minimal `PushValue` that encodes the provided number.
pub fn push_num(n: i64) -> PushValue {
    pv::push_value(&num::serialize(n)).expect("all i64 can be encoded as a push")
}

/// Produce a minimal `PushValue` that encodes the provided script. This is particularly useful
/// with P2SH. Fails if the serialization exceeds the pushable size.
pub fn push_script(script: &Script) -> Option<PushValue> {
    pv::push_value(&script.to_bytes())
}

/// Creates a `PushValue` from a 20-byte value (basically, RIPEMD-160 and other hashes).
pub fn push_160b_hash(hash: &[u8; 20]) -> PushValue {
    pv::push_value(hash).expect("20 is a valid data size")
}

/// Checks equality against some constant value.
pub fn equals(expected: PushValue, verify: bool) -> [Opcode; 2] {
    [
        Opcode::PushValue(expected),
        if verify { op::EQUALVERIFY } else { op::EQUAL },
    ]
}

/// P2PKH: the standard single-signer locking script.
pub fn pay_to_pubkey_hash(pk: &[u8]) -> Vec<Opcode> {
    [
        &[op::DUP, op::HASH160][..],
        &equals(push_160b_hash(&hash160(pk)), true)[..],
        &[op::CHECKSIG][..],
    ]
    .concat()
}

/// P2SH: commits to the hash of a redeem script that the spender reveals.
pub fn pay_to_script_hash(redeem_script: &Script) -> Vec<Opcode> {
    [
        &[op::HASH160][..],
        &equals(push_160b_hash(&hash160(&redeem_script.to_bytes())), false)[..],
    ]
    .concat()
}

/// Performs a `required`-of-`pks.len()` multisig.
///
/// Both counts are expressed as single-byte opcodes, so `1 ≤ required ≤ pks.len() ≤ 16`; anything
/// else returns `None`, as do keys too large to push.
pub fn multi_sig_m_of_n(required: u8, pks: &[&[u8]]) -> Option<Vec<Opcode>> {
    let total = u8::try_from(pks.len()).ok()?;
    if required < 1 || total < required || 16 < total {
        return None;
    }

    let mut script = vec![Opcode::PushValue(PushValue::SmallValue(
        SmallValue::from_num(required as i8)?,
    ))];
    for pk in pks {
        script.push(Opcode::PushValue(pv::push_value(pk)?));
    }
    script.push(Opcode::PushValue(PushValue::SmallValue(
        SmallValue::from_num(total as i8)?,
    )));
    script.push(op::CHECKMULTISIG);
    Some(script)
}

/// Serialized form of [`multi_sig_m_of_n`].
pub fn create_multi_sig_m_of_n(required: u8, pks: &[&[u8]]) -> Option<Vec<u8>> {
    multi_sig_m_of_n(required, pks).map(|ops| Script::from(ops).to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_num_picks_single_byte_opcodes() {
        assert_eq!(push_num(0), pv::_0);
        assert_eq!(push_num(-1), pv::_1NEGATE);
        assert_eq!(push_num(16), pv::_16);
        assert_eq!(
            Vec::from(&push_num(17)),
            vec![0x01, 0x11],
        );
    }

    #[test]
    fn p2pkh_serializes_to_the_canonical_25_bytes() {
        let script = Script::from(pay_to_pubkey_hash(&[0x02; 33]));
        let bytes = script.to_bytes();
        assert_eq!(bytes.len(), 25);
        assert_eq!(bytes[0], 0x76); // OP_DUP
        assert_eq!(bytes[1], 0xa9); // OP_HASH160
        assert_eq!(bytes[2], 0x14);
        assert_eq!(bytes[23], 0x88); // OP_EQUALVERIFY
        assert_eq!(bytes[24], 0xac); // OP_CHECKSIG
    }

    #[test]
    fn p2sh_scripts_match_their_own_shape() {
        let redeem = Script::from(vec![op::_1, op::_1, op::ADD, op::_2, op::EQUAL]);
        let script = Script::from(pay_to_script_hash(&redeem));
        assert!(script.is_pay_to_script_hash());
        assert_eq!(script.to_bytes().len(), 23);
    }

    #[test]
    fn multisig_count_opcodes_are_single_bytes() {
        let keys = [[0x02; 33], [0x03; 33]];
        let bytes =
            create_multi_sig_m_of_n(1, &[&keys[0], &keys[1]]).expect("1-of-2 is well-formed");
        assert_eq!(bytes[0], 0x51); // OP_1
        assert_eq!(*bytes.last().unwrap(), 0xae); // OP_CHECKMULTISIG
        assert_eq!(bytes[bytes.len() - 2], 0x52); // OP_2
    }

    #[test]
    fn multisig_bounds_are_enforced() {
        let key = [0x02; 33];
        let keys: Vec<&[u8]> = std::iter::repeat(&key[..]).take(17).collect();
        assert_eq!(multi_sig_m_of_n(1, &keys), None);
        assert_eq!(multi_sig_m_of_n(0, &[&key]), None);
        assert_eq!(multi_sig_m_of_n(3, &[&key, &key]), None);
        assert!(multi_sig_m_of_n(2, &[&key, &key]).is_some());
    }

    #[test]
    fn push_script_respects_the_element_cap() {
        let small = Script::from(vec![op::_1]);
        assert!(push_script(&small).is_some());

        let huge = Script::from(vec![op::push_value(&[0; 520]).unwrap(); 2]);
        assert!(push_script(&huge).is_none());
    }
}
