//! Payment id parsing and transaction-extra inspection

use super::error::{NodeError, NodeResult};

/// Size of a payment id in bytes
pub const PAYMENT_ID_SIZE: usize = 32;

const TX_EXTRA_TAG_PADDING: u8 = 0x00;
const TX_EXTRA_TAG_PUBKEY: u8 = 0x01;
const TX_EXTRA_NONCE: u8 = 0x02;
const TX_EXTRA_MERGE_MINING_TAG: u8 = 0x03;
const TX_EXTRA_NONCE_PAYMENT_ID: u8 = 0x00;

const PUBLIC_KEY_SIZE: usize = 32;

/// Parse a hex payment id (64 hex digits) into its raw bytes
pub fn parse_payment_id(text: &str) -> NodeResult<Vec<u8>> {
    let trimmed = text.trim();
    if trimmed.len() != PAYMENT_ID_SIZE * 2 {
        return Err(NodeError::InvalidPaymentId(format!(
            "expected {} hex digits, got {}",
            PAYMENT_ID_SIZE * 2,
            trimmed.len()
        )));
    }

    hex::decode(trimmed).map_err(|e| NodeError::InvalidPaymentId(e.to_string()))
}

/// Find the payment id stored in a transaction's extra nonce
///
/// Returns the id as lowercase hex, or an empty string when the payload
/// carries none or cannot be walked.
pub fn extract_payment_id(extra: &[u8]) -> String {
    let mut pos = 0;
    while pos < extra.len() {
        let tag = extra[pos];
        pos += 1;
        match tag {
            // Padding runs to the end of the payload
            TX_EXTRA_TAG_PADDING => break,
            TX_EXTRA_TAG_PUBKEY => pos += PUBLIC_KEY_SIZE,
            TX_EXTRA_NONCE => {
                let Some(&len) = extra.get(pos) else {
                    break;
                };
                pos += 1;
                let Some(nonce) = extra.get(pos..pos + len as usize) else {
                    break;
                };
                if nonce.len() == PAYMENT_ID_SIZE + 1 && nonce[0] == TX_EXTRA_NONCE_PAYMENT_ID {
                    return hex::encode(&nonce[1..]);
                }
                pos += len as usize;
            }
            TX_EXTRA_MERGE_MINING_TAG => {
                let Some((len, used)) = read_varint(&extra[pos..]) else {
                    break;
                };
                let next = usize::try_from(len)
                    .ok()
                    .and_then(|len| pos.checked_add(used)?.checked_add(len));
                match next {
                    Some(next) if next <= extra.len() => pos = next,
                    _ => break,
                }
            }
            _ => break,
        }
    }

    String::new()
}

fn read_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate().take(10) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}
