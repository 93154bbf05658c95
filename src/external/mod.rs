//! Thin wrappers around the cryptographic dependencies.

pub mod pubkey;
