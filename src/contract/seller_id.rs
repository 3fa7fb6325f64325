//! Deterministic seller ids derived from wallet addresses

use crate::error::{LedgerError, LedgerResult};

pub const SELLER_ID_PREFIX: &str = "SEL";
const ID_BYTES: usize = 7;
const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// `0x` followed by 40 hex digits.
pub fn is_valid_wallet(wallet: &str) -> bool {
    wallet
        .strip_prefix("0x")
        .map_or(false, |hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// `SEL` followed by the low nibble of each of the first seven address bytes.
pub fn generate_seller_id(wallet: &str) -> LedgerResult<String> {
    if !is_valid_wallet(wallet) {
        return Err(LedgerError::InvalidWallet(wallet.to_string()));
    }
    let addr = &wallet.as_bytes()[2..];

    let mut id = String::with_capacity(SELLER_ID_PREFIX.len() + ID_BYTES);
    id.push_str(SELLER_ID_PREFIX);
    for pair in addr.chunks(2).take(ID_BYTES) {
        let byte = u8::from_str_radix(std::str::from_utf8(pair).unwrap_or("00"), 16)
            .map_err(|_| LedgerError::InvalidWallet(wallet.to_string()))?;
        id.push(HEX_CHARS[(byte % 16) as usize] as char);
    }
    Ok(id)
}
