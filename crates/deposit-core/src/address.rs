//! Chain-family address model and the re-encoding codec.
//!
//! An [`Address`] is the account bytes plus the encoding they are shown in.
//! Equality and hashing look at the bytes only, so the same account spelled
//! under two bech32 prefixes compares equal.

use std::fmt;
use std::hash::{Hash, Hasher};

use chain_eth::address::ADDRESS_LEN;
use serde::{Deserialize, Serialize};

use crate::error::DepositError;

/// How an address is rendered on its chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AddressEncoding {
    /// BIP-173 bech32 under a human-readable prefix.
    Bech32 { prefix: String },
    /// `0x` hex, EIP-55 checksummed when rendered.
    Hex,
}

impl AddressEncoding {
    pub fn bech32(prefix: impl Into<String>) -> Self {
        AddressEncoding::Bech32 {
            prefix: prefix.into().to_lowercase(),
        }
    }
}

impl fmt::Display for AddressEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressEncoding::Bech32 { prefix } => write!(f, "bech32({prefix})"),
            AddressEncoding::Hex => f.write_str("hex"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Address {
    bytes: Vec<u8>,
    encoding: AddressEncoding,
    rendered: String,
}

impl Address {
    /// Builds an address from raw account bytes, checking they fit `encoding`.
    pub fn from_bytes(bytes: Vec<u8>, encoding: AddressEncoding) -> Result<Self, DepositError> {
        let rendered = render(&bytes, &encoding)?;
        Ok(Self {
            bytes,
            encoding,
            rendered,
        })
    }

    /// Decodes `text` under a declared encoding.
    pub fn parse(text: &str, encoding: &AddressEncoding) -> Result<Self, DepositError> {
        let text = text.trim();
        let bytes = match encoding {
            AddressEncoding::Bech32 { prefix } => {
                chain_cosmos::decode_with_prefix(text, prefix)?
            }
            AddressEncoding::Hex => chain_eth::parse_address(text)
                .map_err(|e| DepositError::InvalidAddressEncoding(e.to_string()))?
                .to_vec(),
        };
        Self::from_bytes(bytes, encoding.clone())
    }

    /// Decodes `text`, picking the encoding from its shape: `0x` means hex,
    /// anything else is bech32 under whatever prefix it carries.
    pub fn detect(text: &str) -> Result<Self, DepositError> {
        let text = text.trim();
        if is_hex_text(text) {
            return Self::parse(text, &AddressEncoding::Hex);
        }
        Self::parse_bech32(text)
    }

    /// Decodes a bech32 account under whatever prefix it carries. Hex text is
    /// refused even when it is a valid EVM address.
    pub fn parse_bech32(text: &str) -> Result<Self, DepositError> {
        let text = text.trim();
        if is_hex_text(text) {
            return Err(DepositError::InvalidAddressEncoding(
                "expected a bech32 account, got a 0x address".into(),
            ));
        }
        let (prefix, bytes) = chain_cosmos::decode(text)?;
        Self::from_bytes(bytes, AddressEncoding::Bech32 { prefix })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> &AddressEncoding {
        &self.encoding
    }

    /// Bech32 prefix, if this is a bech32 address.
    pub fn prefix(&self) -> Option<&str> {
        match &self.encoding {
            AddressEncoding::Bech32 { prefix } => Some(prefix),
            AddressEncoding::Hex => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// The same account under `target`.
    pub fn reencode(&self, target: &AddressEncoding) -> Result<Self, DepositError> {
        if &self.encoding == target {
            return Ok(self.clone());
        }
        Self::from_bytes(self.bytes.clone(), target.clone())
    }
}

/// Re-encodes `address` under `target` without touching the account bytes.
pub fn reencode(address: &Address, target: &AddressEncoding) -> Result<Address, DepositError> {
    address.reencode(target)
}

fn is_hex_text(text: &str) -> bool {
    text.starts_with("0x") || text.starts_with("0X")
}

fn render(bytes: &[u8], encoding: &AddressEncoding) -> Result<String, DepositError> {
    match encoding {
        AddressEncoding::Bech32 { prefix } => Ok(chain_cosmos::encode(prefix, bytes)?),
        AddressEncoding::Hex => {
            let account: &[u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
                DepositError::InvalidAddressEncoding(format!(
                    "hex addresses are {ADDRESS_LEN} bytes, got {}",
                    bytes.len()
                ))
            })?;
            Ok(chain_eth::to_checksum_address(account))
        }
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.rendered)
    }
}
