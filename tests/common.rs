use num::bigint::BigUint;

use bleichenbacher::pkcs1::Conformance;
use bleichenbacher::RsaPaddingOracle;

// 3-byte modulus: 3691 * 3457 = 12759787
pub const TINY_P: u64 = 3691;
pub const TINY_Q: u64 = 3457;

// 5-byte modulus: 819167 * 998069 = 817585188523
pub const SMALL_P: u64 = 819167;
pub const SMALL_Q: u64 = 998069;

// 16-byte modulus, room for a 5-byte PKCS#1 message
pub const WIDE_P: u64 = 14946608615152724537;
pub const WIDE_Q: u64 = 18356656716024858401;

pub const E: u32 = 65537;

// build a padding oracle for the given primes with e = 65537
#[allow(dead_code)]
pub fn oracle(p: u64, q: u64, conformance: Conformance) -> RsaPaddingOracle {
    RsaPaddingOracle::from_primes(
        &BigUint::from(p),
        &BigUint::from(q),
        &BigUint::from(E),
        conformance,
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn tiny_oracle() -> RsaPaddingOracle {
    oracle(TINY_P, TINY_Q, Conformance::Prefix)
}

#[allow(dead_code)]
pub fn small_oracle() -> RsaPaddingOracle {
    oracle(SMALL_P, SMALL_Q, Conformance::Prefix)
}

#[allow(dead_code)]
pub fn wide_oracle() -> RsaPaddingOracle {
    oracle(WIDE_P, WIDE_Q, Conformance::Prefix)
}
