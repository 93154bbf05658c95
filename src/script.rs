//! Managing sequences of opcodes.

use thiserror::Error;

use crate::{
    interpreter,
    opcode::{self, Bad, LargeValue::PushdataBytelength, Operation::*, PossiblyBad, PushValue},
    Opcode,
};

/// Maximum allowed size of data (in bytes) that can be pushed to the stack.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum allowed script length in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Errors that can occur during script verification.
#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("script size ({0} bytes) exceeded maximum ({MAX_SCRIPT_SIZE} bytes)")]
    Size(usize),

    #[error("during parsing: {0}")]
    Opcode(#[from] opcode::Error),

    #[error("non-push opcode encountered in script sig when push-only required")]
    SigPushOnly,

    #[error("during interpretation: {0}")]
    Interpreter(#[from] interpreter::Error),
}

/// A script, as an ordered sequence of parsed tokens.
///
/// Parsing keeps the exact push encoding of each token, so a `Script` parsed
/// from the chain serializes back to the bytes it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Script(pub Vec<PossiblyBad>);

impl Script {
    /// Parse a serialized script into its token sequence.
    ///
    /// The only failures are the overall size cap and a script that ends in the middle of a push;
    /// disabled and unknown opcodes parse fine and fail at evaluation time instead.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() > MAX_SCRIPT_SIZE {
            return Err(Error::Size(bytes.len()));
        }
        let mut tokens = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() {
            let (token, rem) = PossiblyBad::parse(rest)?;
            tokens.push(token);
            rest = rem;
        }
        Ok(Script(tokens))
    }

    /// Wrap raw coinbase input data, which need not be parseable script.
    ///
    /// The result serializes verbatim and fails as a bad opcode if it is ever evaluated.
    pub fn coinbase(data: &[u8]) -> Self {
        Script(vec![PossiblyBad::CoinbaseData(data.to_vec())])
    }

    /// Convert the token sequence back to the bytes that would be included in a transaction.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(Vec::from).collect()
    }

    /// Called on the script sig under `SigPushOnly` and by P2SH verification (which makes it
    /// consensus-critical).
    pub fn is_push_only(&self) -> bool {
        self.0
            .iter()
            .all(|token| matches!(token, PossiblyBad::Good(Opcode::PushValue(_))))
    }

    /// Returns true iff this script is P2SH.
    pub fn is_pay_to_script_hash(&self) -> bool {
        match &self.0[..] {
            [PossiblyBad::Good(Opcode::Operation(OP_HASH160)), PossiblyBad::Good(Opcode::PushValue(PushValue::LargeValue(PushdataBytelength(v)))), PossiblyBad::Good(Opcode::Operation(OP_EQUAL))] => {
                v.len() == 0x14
            }
            _ => false,
        }
    }

    /// Count CHECKSIG-class operations the way block validators do.
    ///
    /// Pre-version-0.6, Bitcoin always counted CHECKMULTISIGs as 20 sigops. With
    /// pay-to-script-hash, that changed: CHECKMULTISIGs serialized in script sigs are counted
    /// more accurately, assuming they are of the form `... OP_N CHECKMULTISIG ...`.
    pub fn sig_op_count(&self, accurate: bool) -> u32 {
        let mut n = 0;
        let mut last_token: Option<&PossiblyBad> = None;
        for token in &self.0 {
            if let PossiblyBad::Good(Opcode::Operation(op)) = token {
                match op {
                    OP_CHECKSIG | OP_CHECKSIGVERIFY => n += 1,
                    OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                        n += match last_token {
                            Some(PossiblyBad::Good(Opcode::PushValue(PushValue::SmallValue(
                                sv,
                            )))) if accurate && (1..=16).contains(&sv.to_num()) => {
                                u32::from(sv.to_num() as u8)
                            }
                            _ => u32::from(interpreter::MAX_PUBKEY_COUNT),
                        }
                    }
                    _ => (),
                }
            }
            last_token = Some(token);
        }
        n
    }

    /// Does any token in this script fail unconditionally when evaluated?
    ///
    /// Such a script can never be satisfied, no matter the stack it runs on.
    pub fn is_unspendable(&self) -> bool {
        self.0.iter().any(|token| {
            matches!(
                token,
                PossiblyBad::Disabled(_)
                    | PossiblyBad::Bad(Bad::OP_VERIF | Bad::OP_VERNOTIF)
                    | PossiblyBad::CoinbaseData(_)
            )
        })
    }
}

impl From<Vec<Opcode>> for Script {
    fn from(ops: Vec<Opcode>) -> Self {
        Script(ops.into_iter().map(PossiblyBad::Good).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{op, pv};

    fn roundtrip(bytes: &[u8]) {
        let script = Script::parse(bytes).expect("parses");
        assert_eq!(script.to_bytes(), bytes);
    }

    #[test]
    fn parse_then_serialize_is_the_identity() {
        // standard P2PKH
        roundtrip(&hex::decode("76a914f47cac1e6fec195c055994e8064ffccce0044dd788ac").unwrap());
        // standard P2SH
        roundtrip(&hex::decode("a9141b8a9bda4b62cd0d0582b55455d0778c86f8628f87").unwrap());
        // every push encoding, non-minimal ones included
        roundtrip(&[0x00, 0x01, 0xaa, 0x4c, 0x01, 0xbb]);
        roundtrip(&[0x4d, 0x02, 0x00, 0xcc, 0xdd]);
        roundtrip(&[0x4e, 0x01, 0x00, 0x00, 0x00, 0xee]);
        // unknown and disabled bytes still round-trip
        roundtrip(&[0x6a, 0x7e, 0x50, 0xff]);
    }

    #[test]
    fn serialize_then_parse_is_the_identity_on_authored_scripts() {
        let script = Script::from(vec![
            op::DUP,
            op::HASH160,
            op::push_value(&[0x11; 20]).unwrap(),
            op::EQUALVERIFY,
            op::CHECKSIG,
        ]);
        assert_eq!(Script::parse(&script.to_bytes()), Ok(script));
    }

    #[test]
    fn oversized_scripts_are_rejected_before_parsing() {
        let bytes = vec![0x51; MAX_SCRIPT_SIZE + 1];
        assert_eq!(Script::parse(&bytes), Err(Error::Size(MAX_SCRIPT_SIZE + 1)));
        assert!(Script::parse(&vec![0x51; MAX_SCRIPT_SIZE]).is_ok());
    }

    #[test]
    fn truncated_pushes_are_rejected() {
        assert!(matches!(
            Script::parse(&[0x4b]),
            Err(Error::Opcode(opcode::Error::Read { .. }))
        ));
        assert!(matches!(
            Script::parse(&[0x76, 0x4d, 0xff, 0xff, 0x00]),
            Err(Error::Opcode(opcode::Error::Read { .. }))
        ));
    }

    #[test]
    fn push_only_accepts_constants_and_data() {
        let pushy = Script::from(vec![op::_0, op::_16, op::push_value(&[1, 2, 3]).unwrap()]);
        assert!(pushy.is_push_only());
        assert!(Script(vec![]).is_push_only());

        let with_op = Script::from(vec![op::_1, op::DUP]);
        assert!(!with_op.is_push_only());
        assert!(!Script::parse(&[0x7e]).unwrap().is_push_only());
        assert!(!Script::coinbase(&[1, 2, 3]).is_push_only());
    }

    #[test]
    fn p2sh_shape_requires_a_direct_20_byte_push() {
        let p2sh = Script::from(vec![
            op::HASH160,
            op::push_value(&[0x22; 20]).unwrap(),
            op::EQUAL,
        ]);
        assert!(p2sh.is_pay_to_script_hash());

        let wrong_len = Script::from(vec![
            op::HASH160,
            op::push_value(&[0x22; 21]).unwrap(),
            op::EQUAL,
        ]);
        assert!(!wrong_len.is_pay_to_script_hash());

        // PUSHDATA1 encoding of the hash does not count
        let via_pushdata1 = Script(vec![
            PossiblyBad::Good(op::HASH160),
            PossiblyBad::Good(Opcode::PushValue(pv::pushdata1(vec![0x22; 20]))),
            PossiblyBad::Good(op::EQUAL),
        ]);
        assert!(!via_pushdata1.is_pay_to_script_hash());
    }

    #[test]
    fn coinbase_data_serializes_verbatim() {
        let data = [0x03, 0x12, 0x34, 0x56, 0xff, 0x00, 0x4c];
        assert_eq!(Script::coinbase(&data).to_bytes(), data);
        assert!(Script::coinbase(&data).is_unspendable());
    }

    #[test]
    fn sig_op_counting() {
        let p2pkh = Script::from(vec![
            op::DUP,
            op::HASH160,
            op::push_value(&[0; 20]).unwrap(),
            op::EQUALVERIFY,
            op::CHECKSIG,
        ]);
        assert_eq!(p2pkh.sig_op_count(false), 1);
        assert_eq!(p2pkh.sig_op_count(true), 1);

        let multisig = Script::from(vec![
            op::_1,
            op::push_value(&[2; 33]).unwrap(),
            op::push_value(&[3; 33]).unwrap(),
            op::_2,
            op::CHECKMULTISIG,
        ]);
        assert_eq!(multisig.sig_op_count(true), 2);
        assert_eq!(multisig.sig_op_count(false), 20);

        // No preceding OP_N: fall back to the maximum even in accurate mode.
        let bare = Script::from(vec![op::CHECKMULTISIGVERIFY]);
        assert_eq!(bare.sig_op_count(true), 20);
    }

    #[test]
    fn unspendable_detection() {
        assert!(Script::parse(&[0x51, 0x7e]).unwrap().is_unspendable());
        assert!(Script::parse(&[0x65]).unwrap().is_unspendable());
        assert!(!Script::parse(&[0x51, 0x6a]).unwrap().is_unspendable());
    }

    #[test]
    fn empty_script_parses_to_no_tokens() {
        assert_eq!(Script::parse(&[]), Ok(Script(vec![])));
        assert!(Script::parse(&[]).unwrap().to_bytes().is_empty());
    }
}
