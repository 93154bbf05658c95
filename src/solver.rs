//! Recognizers for standard script shapes.

use crate::{
    external::pubkey::PubKey,
    opcode::{LargeValue::PushdataBytelength, Operation::*, PossiblyBad::Good, PushValue},
    script::Script,
    Opcode::{Operation, PushValue as Push},
};

/// Known kinds of standard scripts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptKind {
    /// A P2PKH script.
    PubKeyHash {
        /// The Hash160 of the public key.
        hash: [u8; 20],
    },

    /// A P2SH script, used in transaction outputs to efficiently commit to other scripts.
    ScriptHash {
        /// The Hash160 of the redeem script.
        hash: [u8; 20],
    },

    /// A threshold multisig script.
    MultiSig {
        /// The number of signatures required to spend.
        required: u8,
        /// The pubkeys that can be used to sign spends.
        pubkeys: Vec<Vec<u8>>,
    },
}

/// Detects standard locking scripts.
///
/// If successful, returns the script kind and any relevant properties parsed from the script:
/// for a P2SH script the script hash, for P2PKH the key hash, etc. Returns `None` if the script
/// is non-standard.
pub fn standard(script: &Script) -> Option<ScriptKind> {
    match &script.0[..] {
        // Pay-to-Script-Hash (P2SH)
        [Good(Operation(OP_HASH160)), Good(Push(PushValue::LargeValue(PushdataBytelength(v)))), Good(Operation(OP_EQUAL))] => {
            v.as_slice()
                .try_into()
                .ok()
                .map(|hash| ScriptKind::ScriptHash { hash })
        }

        // Pay-to-Public-Key-Hash (P2PKH). A trailing OP_NOP is accepted; such outputs exist on
        // chain and spend like any other P2PKH.
        [Good(Operation(OP_DUP)), Good(Operation(OP_HASH160)), Good(Push(PushValue::LargeValue(PushdataBytelength(v)))), Good(Operation(OP_EQUALVERIFY)), Good(Operation(OP_CHECKSIG))]
        | [Good(Operation(OP_DUP)), Good(Operation(OP_HASH160)), Good(Push(PushValue::LargeValue(PushdataBytelength(v)))), Good(Operation(OP_EQUALVERIFY)), Good(Operation(OP_CHECKSIG)), Good(Operation(OP_NOP))] => {
            v.as_slice()
                .try_into()
                .ok()
                .map(|hash| ScriptKind::PubKeyHash { hash })
        }

        // Pay-to-Multi-Signature
        [Good(Push(PushValue::SmallValue(required))), pubkeys @ .., Good(Push(PushValue::SmallValue(total))), Good(Operation(OP_CHECKMULTISIG))] =>
        {
            let required = required.to_num();
            let total = total.to_num();
            if !(1..=16).contains(&required) || !(1..=16).contains(&total) || total < required {
                return None;
            }

            // The opcodes between the counts must be pushes of plausible pubkey lengths.
            let pubkeys = pubkeys
                .iter()
                .map(|token| match token {
                    Good(Push(data)) => {
                        let pubkey_bytes = data.value();
                        let expected_len = match pubkey_bytes.first() {
                            Some(2 | 3) => Some(PubKey::COMPRESSED_SIZE),
                            Some(4 | 6 | 7) => Some(PubKey::SIZE),
                            _ => None,
                        };
                        (expected_len == Some(pubkey_bytes.len())).then_some(pubkey_bytes)
                    }
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;

            (pubkeys.len() == usize::from(total as u8)).then(|| ScriptKind::MultiSig {
                required: required as u8,
                pubkeys,
            })
        }

        _ => None,
    }
}

/// The 20-byte hash committed to by a recognized P2PKH or P2SH script.
pub fn public_key_hash(script: &Script) -> Option<[u8; 20]> {
    match standard(script)? {
        ScriptKind::PubKeyHash { hash } | ScriptKind::ScriptHash { hash } => Some(hash),
        ScriptKind::MultiSig { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{op, pattern, pv, Opcode};

    #[test]
    fn recognizes_p2pkh_with_and_without_trailing_nop() {
        let pk = [0x02; 33];
        let mut ops = pattern::pay_to_pubkey_hash(&pk);
        let expected = match standard(&Script::from(ops.clone())) {
            Some(ScriptKind::PubKeyHash { hash }) => hash,
            other => panic!("not P2PKH: {other:?}"),
        };

        ops.push(op::NOP);
        assert_eq!(
            standard(&Script::from(ops.clone())),
            Some(ScriptKind::PubKeyHash { hash: expected })
        );

        // two trailing NOPs is out of shape
        ops.push(op::NOP);
        assert_eq!(standard(&Script::from(ops)), None);
    }

    #[test]
    fn recognizes_p2sh() {
        let redeem = Script::from(vec![op::_1]);
        let script = Script::from(pattern::pay_to_script_hash(&redeem));
        assert!(matches!(
            standard(&script),
            Some(ScriptKind::ScriptHash { .. })
        ));

        // the hash must be a direct 20-byte push
        let via_pushdata1 = Script(vec![
            Good(op::HASH160),
            Good(Opcode::PushValue(pv::pushdata1(vec![0x22; 20]))),
            Good(op::EQUAL),
        ]);
        assert_eq!(standard(&via_pushdata1), None);
    }

    #[test]
    fn recognizes_multisig() {
        let k1 = [0x02; 33];
        let k2 = [0x03; 33];
        let k3 = [0x04; 65];
        let ops = pattern::multi_sig_m_of_n(2, &[&k1, &k2, &k3]).unwrap();
        assert_eq!(
            standard(&Script::from(ops)),
            Some(ScriptKind::MultiSig {
                required: 2,
                pubkeys: vec![k1.to_vec(), k2.to_vec(), k3.to_vec()],
            })
        );
    }

    #[test]
    fn rejects_malformed_multisig() {
        let key = op::push_value(&[0x02; 33]).unwrap();

        // required exceeds total
        let ops = vec![op::_3, key.clone(), key.clone(), op::_2, op::CHECKMULTISIG];
        assert_eq!(standard(&Script::from(ops)), None);

        // key count mismatch
        let ops = vec![op::_1, key.clone(), op::_2, op::CHECKMULTISIG];
        assert_eq!(standard(&Script::from(ops)), None);

        // implausible key length
        let bad_key = op::push_value(&[0x02; 32]).unwrap();
        let ops = vec![op::_1, bad_key, op::_1, op::CHECKMULTISIG];
        assert_eq!(standard(&Script::from(ops)), None);
    }

    #[test]
    fn public_key_hash_extraction() {
        let pk = [0x02; 33];
        let p2pkh = Script::from(pattern::pay_to_pubkey_hash(&pk));
        assert!(public_key_hash(&p2pkh).is_some());

        let redeem = Script::from(vec![op::_1]);
        let p2sh = Script::from(pattern::pay_to_script_hash(&redeem));
        assert!(public_key_hash(&p2sh).is_some());
        assert_ne!(public_key_hash(&p2pkh), public_key_hash(&p2sh));

        let multisig =
            Script::from(pattern::multi_sig_m_of_n(1, &[&pk]).unwrap());
        assert_eq!(public_key_hash(&multisig), None);

        assert_eq!(public_key_hash(&Script::from(vec![op::_1])), None);
    }
}
