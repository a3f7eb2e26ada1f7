//! Cosmos SDK chain support for the deposit pipeline.
//!
//! This crate provides:
//! - Bech32 address decoding and encoding
//! - Account address derivation from compressed secp256k1 public keys
//! - Known human-readable prefixes and the Cosmos HD path

pub mod address;
pub mod error;
pub mod prefix;

pub use address::{decode, decode_with_prefix, encode, pubkey_to_address};
pub use error::CosmosError;
