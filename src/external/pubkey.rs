//! Public-key syntax checks and ECDSA verification over secp256k1.

use lazy_static::lazy_static;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, VerifyOnly};

lazy_static! {
    static ref SECP: Secp256k1<VerifyOnly> = Secp256k1::verification_only();
}

/// A serialized public key, as found on the stack.
pub struct PubKey<'a>(pub &'a [u8]);

impl PubKey<'_> {
    /// The length of an uncompressed key (0x04 prefix).
    pub const SIZE: usize = 65;
    /// The length of a compressed key (0x02 or 0x03 prefix).
    pub const COMPRESSED_SIZE: usize = 33;

    /// Check syntactic correctness.
    ///
    /// Note that this is consensus critical as CHECKSIG calls it!
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    /// Strict length-and-prefix check, applied under `StrictEnc`.
    pub fn is_compressed_or_uncompressed(&self) -> bool {
        match self.0.first() {
            Some(0x02 | 0x03) => self.0.len() == Self::COMPRESSED_SIZE,
            Some(0x04) => self.0.len() == Self::SIZE,
            _ => false, // not a public key
        }
    }

    /// Whether the S component is in the lower half of the group order. Signatures with high S
    /// have a distinct-but-equivalent sibling, so policy can insist on the low form.
    pub fn check_low_s(sig: &ecdsa::Signature) -> bool {
        let mut normalized = *sig;
        normalized.normalize_s();
        normalized == *sig
    }

    /// Verify a decoded ECDSA signature against a 32-byte digest.
    /// If this public key is not fully valid, the return value will be false.
    pub fn verify(&self, sighash: &[u8; 32], sig: &ecdsa::Signature) -> bool {
        PublicKey::from_slice(self.0)
            .map(|pub_key| {
                SECP.verify_ecdsa(&Message::from_digest(*sighash), sig, &pub_key)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}
