//! ERC-20 call data for the allowance check and approval that precede a
//! bridge deposit.

use crate::address::{parse_address, ADDRESS_LEN};
use crate::error::EthError;

/// Function selector for `approve(address,uint256)`: `0x095ea7b3`.
const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Function selector for `allowance(address,address)`: `0xdd62ed3e`.
const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

const WORD: usize = 32;

fn address_word(address: &str) -> Result<[u8; WORD], EthError> {
    let bytes = parse_address(address)?;
    let mut word = [0u8; WORD];
    word[WORD - ADDRESS_LEN..].copy_from_slice(&bytes);
    Ok(word)
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn call(selector: [u8; 4], words: &[[u8; WORD]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + words.len() * WORD);
    data.extend_from_slice(&selector);
    for word in words {
        data.extend_from_slice(word);
    }
    data
}

/// Encodes `allowance(owner, spender)`.
pub fn encode_allowance(owner: &str, spender: &str) -> Result<Vec<u8>, EthError> {
    Ok(call(
        ALLOWANCE_SELECTOR,
        &[address_word(owner)?, address_word(spender)?],
    ))
}

/// Encodes `approve(spender, amount)`.
pub fn encode_approve(spender: &str, amount: u128) -> Result<Vec<u8>, EthError> {
    Ok(call(APPROVE_SELECTOR, &[address_word(spender)?, uint_word(amount)]))
}

/// Decodes a single uint256 return value.
///
/// Values above `u128::MAX` saturate; an unlimited approval reads as the
/// largest amount rather than an error.
pub fn decode_uint256(data: &[u8]) -> Result<u128, EthError> {
    if data.len() < WORD {
        return Err(EthError::EncodingError(format!(
            "expected at least 32 bytes for uint256, got {}",
            data.len()
        )));
    }

    if data[..16].iter().any(|b| *b != 0) {
        return Ok(u128::MAX);
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&data[16..WORD]);
    Ok(u128::from_be_bytes(low))
}
