use core::convert::Infallible;

use num::bigint::BigUint;
use num::{One, Zero};

use crate::arith;
use crate::pkcs1::{self, Conformance};

/// Padding oracle queried by the attack
///
/// Reports whether a ciphertext decrypts to a structurally valid
/// PKCS#1 v1.5 block. Oracles that can fail (network, hardware tokens)
/// report errors through `Error`, which the attack propagates untouched.
pub trait PaddingOracle {
    type Error;

    /// Whether the ciphertext decrypts to a conforming block
    fn is_valid(&mut self, ciphertext: &BigUint) -> Result<bool, Self::Error>;
}

impl<F> PaddingOracle for F
where
    F: FnMut(&BigUint) -> bool,
{
    type Error = Infallible;

    fn is_valid(&mut self, ciphertext: &BigUint) -> Result<bool, Self::Error> {
        Ok(self(ciphertext))
    }
}

/// Padding oracle backed by an RSA private key
///
/// Decrypts locally and checks the block against a conformance level,
/// simulating a server that leaks padding errors.
pub struct RsaPaddingOracle {
    n: BigUint,
    e: BigUint,
    d: BigUint,
    k: usize,
    conformance: Conformance,
}

impl RsaPaddingOracle {
    /// Create a new padding oracle from the RSA primes and public exponent
    ///
    /// errors: ZeroModulus if p or q is zero, NotInvertible if e is not
    /// coprime to (p - 1)(q - 1)
    pub fn from_primes(
        p: &BigUint,
        q: &BigUint,
        e: &BigUint,
        conformance: Conformance,
    ) -> Result<Self, arith::Error> {
        if p.is_zero() || q.is_zero() {
            return Err(arith::Error::ZeroModulus);
        }

        let one = BigUint::one();
        let totient = (p - &one) * (q - &one);
        let d = arith::inv_mod(e, &totient)?;
        let n = p * q;

        Ok(Self {
            k: arith::byte_len(&n),
            n,
            e: e.clone(),
            d,
            conformance,
        })
    }

    /// Get the oracle's RSA modulus
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Get the oracle's public exponent
    pub fn e(&self) -> &BigUint {
        &self.e
    }

    /// Length of the modulus in bytes
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn conformance(&self) -> Conformance {
        self.conformance
    }

    /// Encrypt a plaintext integer under the oracle's public key
    pub fn encrypt(&self, m: &BigUint) -> BigUint {
        m.modpow(&self.e, &self.n)
    }

    /// Decrypt a ciphertext integer with the oracle's private key
    pub fn decrypt(&self, c: &BigUint) -> BigUint {
        c.modpow(&self.d, &self.n)
    }
}

impl PaddingOracle for RsaPaddingOracle {
    type Error = Infallible;

    fn is_valid(&mut self, ciphertext: &BigUint) -> Result<bool, Self::Error> {
        let block = pkcs1::to_block(&self.decrypt(ciphertext), self.k);
        Ok(pkcs1::is_conforming(&block, self.conformance))
    }
}
