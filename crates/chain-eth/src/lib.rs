//! Ethereum/EVM chain support for the deposit pipeline.
//!
//! This crate provides:
//! - EVM address parsing and EIP-55 checksums
//! - EIP-712 hashing for string-only typed data
//! - Typed-data signing and signer recovery with an in-process key
//! - ERC-20 allowance and approval call data
//! - The EVM networks a deposit can be funded from

pub mod address;
pub mod chains;
pub mod erc20;
pub mod error;
pub mod signing;
pub mod typed_data;

pub use address::{parse_address, to_checksum_address};
pub use error::EthError;
pub use signing::{recover_typed_data_signer, LocalKey, SIGNATURE_LEN};
pub use typed_data::{Eip712Domain, TypedData};
