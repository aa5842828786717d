use alloc::vec;
use alloc::vec::Vec;

use num::bigint::BigUint;
use rand::Rng;

/// Minimum number of non-zero padding bytes
pub const MIN_PAD_LEN: usize = 8;

/// Encoding overhead: 00 || 02 || PS (8 bytes) || 00
pub const OVERHEAD: usize = MIN_PAD_LEN + 3;

/// Block type for encryption padding
const BLOCK_TYPE_2: u8 = 0x02;

/// Structural check applied to a decrypted block
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Conformance {
    /// Only the leading 00 || 02 bytes are checked
    Prefix,
    /// PKCS conforming according to Bleichenbacher '98 Definition 1
    Strict,
}

/// PKCS#1 v1.5 encoding errors
#[derive(Debug, PartialEq)]
pub enum Error {
    InvalidHeader,
    InvalidLength,
    InvalidPadding,
    MessageTooLong,
    MissingSeparator,
    ModulusTooSmall,
}

/// Encode a message with PKCS#1 v1.5 encryption padding (block type 2)
///
/// EM = 00 || 02 || PS || 00 || M, with PS random non-zero bytes
pub fn encode<R: Rng>(msg: &[u8], k: usize, rng: &mut R) -> Result<Vec<u8>, Error> {
    if k < OVERHEAD {
        return Err(Error::ModulusTooSmall);
    }

    if msg.len() > k - OVERHEAD {
        return Err(Error::MessageTooLong);
    }

    let pad_len = k - 3 - msg.len();

    let mut encmsg: Vec<u8> = Vec::with_capacity(k);
    encmsg.extend_from_slice(&[0x00, BLOCK_TYPE_2]);
    for _ in 0..pad_len {
        encmsg.push(rng.gen_range::<u16, u16, u16>(1, 0x100) as u8);
    }
    encmsg.push(0x00);
    encmsg.extend_from_slice(msg);

    Ok(encmsg)
}

/// Decode a k-byte PKCS#1 v1.5 encryption block, returning the message
pub fn decode(block: &[u8]) -> Result<&[u8], Error> {
    if block.len() < OVERHEAD {
        return Err(Error::InvalidLength);
    }

    if block[..2] != [0x00, BLOCK_TYPE_2] {
        return Err(Error::InvalidHeader);
    }

    if block[2..2 + MIN_PAD_LEN].iter().any(|&b| b == 0x00) {
        return Err(Error::InvalidPadding);
    }

    let sep = block[2 + MIN_PAD_LEN..]
        .iter()
        .position(|&b| b == 0x00)
        .ok_or(Error::MissingSeparator)?;

    Ok(&block[2 + MIN_PAD_LEN + sep + 1..])
}

/// Check whether a decrypted block passes the given conformance level
pub fn is_conforming(block: &[u8], conformance: Conformance) -> bool {
    match conformance {
        Conformance::Prefix => block.len() >= 2 && block[..2] == [0x00, BLOCK_TYPE_2],
        Conformance::Strict => decode(block).is_ok(),
    }
}

/// Big-endian bytes of x, left-padded with zeros to k bytes
///
/// Values wider than k bytes are returned unpadded
pub fn to_block(x: &BigUint, k: usize) -> Vec<u8> {
    let bytes = x.to_bytes_be();
    if bytes.len() >= k {
        return bytes;
    }

    let mut block = vec![0_u8; k - bytes.len()];
    block.extend_from_slice(&bytes);
    block
}
