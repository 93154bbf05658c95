//! Signature encoding rules.
//!
//! This is in a separate module so we can minimize the code that has access to the internals,
//! making it easier to ensure that we check the encoding correctly.

use secp256k1::ecdsa;
use thiserror::Error;

use crate::{external::pubkey::PubKey, interpreter::Flags};

/// Ways a signature can fail its encoding checks.
#[allow(missing_docs)]
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
pub enum Error {
    #[error("signature hash type error")]
    SigHashType,

    #[error("signature DER encoding error")]
    SigDER,

    #[error("signature s value is too high")]
    SigHighS,
}

/// The transaction outputs a signature commits to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SignedOutputs {
    /// The signature commits to every output of the transaction.
    All,
    /// The signature commits only to the output at the same index as the input being signed.
    /// Inputs beyond the outputs are not protected.
    Single,
    /// The signature commits to no outputs; anyone may redirect the value.
    None,
}

/// The decoded final byte of a signature, identifying which parts of the transaction were
/// signed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashType {
    /// Which outputs the signature commits to.
    pub signed_outputs: SignedOutputs,
    /// Allows anyone to add inputs to this transaction.
    pub anyone_can_pay: bool,
}

impl HashType {
    /// Decode a hash type from its byte representation.
    ///
    /// When `is_strict`, the byte with the `anyone_can_pay` bit masked off must be one of the
    /// three defined values; otherwise undefined values fall back to committing to all outputs,
    /// which is how they are hashed in practice.
    pub fn from_bits(bits: u8, is_strict: bool) -> Option<Self> {
        if is_strict && !(1..=3).contains(&(bits & !0x80)) {
            None
        } else {
            Some(HashType {
                signed_outputs: match bits & 0x1f {
                    2 => SignedOutputs::None,
                    3 => SignedOutputs::Single,
                    _ => SignedOutputs::All,
                },
                anyone_can_pay: bits & 0x80 != 0,
            })
        }
    }
}

/// A canonical signature consists of:
/// `<30> <total len> <02> <len R> <R> <02> <len S> <S> <hashtype>`
///
/// Where R and S are not negative (their first byte has its highest bit not set), and not
/// excessively padded (do not start with a 0 byte, unless an otherwise negative number follows,
/// in which case a single 0 byte is necessary and even required).
///
/// See <https://bitcointalk.org/index.php?topic=8392.msg127623#msg127623>
///
/// This function is consensus-critical since BIP66.
pub fn is_valid_encoding(sig: &[u8]) -> bool {
    // Format: 0x30 [total-length] 0x02 [R-length] [R] 0x02 [S-length] [S] [sighash]
    // * total-length: 1-byte length descriptor of everything that follows,
    //   excluding the sighash byte.
    // * R-length: 1-byte length descriptor of the R value that follows.
    // * R: arbitrary-length big-endian encoded R value. It must use the shortest
    //   possible encoding for a positive integer (which means no null bytes at
    //   the start, except a single one when the next byte has its highest bit set).
    // * S-length: 1-byte length descriptor of the S value that follows.
    // * S: arbitrary-length big-endian encoded S value. The same rules apply.
    // * sighash: 1-byte value indicating what data is hashed (not part of the DER
    //   signature)

    // Minimum and maximum size constraints.
    if sig.len() < 9 {
        return false;
    };
    if sig.len() > 73 {
        return false;
    };

    // A signature is of type 0x30 (compound).
    if sig[0] != 0x30 {
        return false;
    };

    // Make sure the length covers the entire signature.
    if usize::from(sig[1]) != sig.len() - 3 {
        return false;
    };

    // Extract the length of the R element.
    let len_r = usize::from(sig[3]);

    // Make sure the length of the S element is still inside the signature.
    if 5 + len_r >= sig.len() {
        return false;
    };

    // Extract the length of the S element.
    let len_s = usize::from(sig[5 + len_r]);

    // Verify that the length of the signature matches the sum of the length
    // of the elements.
    if len_r + len_s + 7 != sig.len() {
        return false;
    };

    // Check whether the R element is an integer.
    if sig[2] != 0x02 {
        return false;
    };

    // Zero-length integers are not allowed for R.
    if len_r == 0 {
        return false;
    };

    // Negative numbers are not allowed for R.
    if sig[4] & 0x80 != 0 {
        return false;
    };

    // Null bytes at the start of R are not allowed, unless R would
    // otherwise be interpreted as a negative number.
    if len_r > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return false;
    };

    // Check whether the S element is an integer.
    if sig[len_r + 4] != 0x02 {
        return false;
    };

    // Zero-length integers are not allowed for S.
    if len_s == 0 {
        return false;
    };

    // Negative numbers are not allowed for S.
    if sig[len_r + 6] & 0x80 != 0 {
        return false;
    };

    // Null bytes at the start of S are not allowed, unless S would otherwise be
    // interpreted as a negative number.
    if len_s > 1 && sig[len_r + 6] == 0x00 && sig[len_r + 7] & 0x80 == 0 {
        return false;
    };

    true
}

fn is_low_der(vch_sig: &[u8]) -> bool {
    // The hash type byte tacked onto the end is not part of the DER body.
    match vch_sig.split_last() {
        None => false,
        Some((_, der)) => ecdsa::Signature::from_der(der)
            .map(|sig| PubKey::check_low_s(&sig))
            .unwrap_or(false),
    }
}

fn is_defined_hashtype(vch_sig: &[u8]) -> bool {
    match vch_sig.last() {
        None => false,
        Some(hash_type) => HashType::from_bits(*hash_type, true).is_some(),
    }
}

/// The signature-encoding gate applied by the CHECKSIG-class operations.
///
/// An empty signature is not strictly DER encoded, but is always accepted here as the compact
/// way to provide an invalid signature to CHECK(MULTI)SIG.
pub fn check_encoding(vch_sig: &[u8], flags: Flags) -> Result<(), Error> {
    if vch_sig.is_empty() {
        return Ok(());
    };
    if flags.intersects(Flags::DerSig | Flags::LowS | Flags::StrictEnc)
        && !is_valid_encoding(vch_sig)
    {
        Err(Error::SigDER)
    } else if flags.contains(Flags::LowS) && !is_low_der(vch_sig) {
        Err(Error::SigHighS)
    } else if flags.contains(Flags::StrictEnc) && !is_defined_hashtype(vch_sig) {
        Err(Error::SigHashType)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A syntactically canonical signature, with the SIGHASH_ALL byte appended.
    fn canonical_sig() -> Vec<u8> {
        let mut sig = hex::decode(
            "3044022013e15d865010c257eef133064ef69a780b4bc7ebe6eda367504e806614f940c3022062fdbc8c2d049f91db2042d6c9771de6f1ef0b3b1fea76c1ab5542e44ed29ed8",
        )
        .unwrap();
        sig.push(0x01);
        sig
    }

    #[test]
    fn canonical_der_is_accepted() {
        assert!(is_valid_encoding(&canonical_sig()));
    }

    #[test]
    fn structural_der_failures() {
        let good = canonical_sig();

        let mut not_compound = good.clone();
        not_compound[0] = 0x31;
        assert!(!is_valid_encoding(&not_compound));

        let mut wrong_total_len = good.clone();
        wrong_total_len[1] += 1;
        assert!(!is_valid_encoding(&wrong_total_len));

        let mut negative_r = good.clone();
        negative_r[4] |= 0x80;
        assert!(!is_valid_encoding(&negative_r));

        assert!(!is_valid_encoding(&good[..8]));
        assert!(!is_valid_encoding(&[0x30; 74]));
    }

    #[test]
    fn hash_type_decoding() {
        for bits in [0x01, 0x02, 0x03, 0x81, 0x82, 0x83] {
            assert!(HashType::from_bits(bits, true).is_some(), "{bits:#x}");
        }
        for bits in [0x00, 0x04, 0x1f, 0x80, 0x41] {
            assert!(HashType::from_bits(bits, true).is_none(), "{bits:#x}");
            assert!(HashType::from_bits(bits, false).is_some());
        }
        let ht = HashType::from_bits(0x82, false).unwrap();
        assert_eq!(ht.signed_outputs, SignedOutputs::None);
        assert!(ht.anyone_can_pay);
    }

    #[test]
    fn empty_signatures_pass_the_gate() {
        assert_eq!(check_encoding(&[], Flags::all()), Ok(()));
    }

    #[test]
    fn der_gate_only_applies_under_the_strict_flags() {
        let garbage = vec![0x01, 0x02, 0x03];
        assert_eq!(check_encoding(&garbage, Flags::empty()), Ok(()));
        assert_eq!(check_encoding(&garbage, Flags::DerSig), Err(Error::SigDER));
        assert_eq!(check_encoding(&garbage, Flags::LowS), Err(Error::SigDER));
        assert_eq!(
            check_encoding(&garbage, Flags::StrictEnc),
            Err(Error::SigDER)
        );
    }

    #[test]
    fn hashtype_gate_requires_strictenc() {
        let mut sig = canonical_sig();
        *sig.last_mut().unwrap() = 0x04;
        assert_eq!(check_encoding(&sig, Flags::DerSig), Ok(()));
        assert_eq!(
            check_encoding(&sig, Flags::StrictEnc),
            Err(Error::SigHashType)
        );
    }
}
