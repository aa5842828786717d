use num::bigint::{BigInt, BigUint};
use num::{Integer, One, Zero};

/// Integer arithmetic errors
#[derive(Debug, PartialEq)]
pub enum Error {
    NotInvertible,
    ZeroModulus,
}

/// Exact ceiling of `a / b`
///
/// Panics on a zero divisor, same as BigUint division
pub fn ceil_div(a: &BigUint, b: &BigUint) -> BigUint {
    let (quot, rem) = a.div_rem(b);
    if rem.is_zero() {
        quot
    } else {
        quot + 1_u32
    }
}

/// Exact floor of `a / b`
pub fn floor_div(a: &BigUint, b: &BigUint) -> BigUint {
    a.div_floor(b)
}

/// Length of the modulus in bytes, i.e. ceil(bits(n) / 8)
pub fn byte_len(n: &BigUint) -> usize {
    ((n.bits() + 7) / 8) as usize
}

/// Compute a**-1 mod n using the extended Euclidean algorithm
///
/// errors: NotInvertible when gcd(a, n) != 1
pub fn inv_mod(a: &BigUint, n: &BigUint) -> Result<BigUint, Error> {
    if n.is_zero() {
        return Err(Error::ZeroModulus);
    }

    let modulus = BigInt::from(n.clone());

    // invariant: t * a == r mod n, for both (t, r) and (new_t, new_r)
    let mut t = BigInt::zero();
    let mut new_t = BigInt::one();
    let mut r = modulus.clone();
    let mut new_r = BigInt::from(a.mod_floor(n));

    while !new_r.is_zero() {
        let quot = r.div_floor(&new_r);

        let next_t = &t - &quot * &new_t;
        t = core::mem::replace(&mut new_t, next_t);

        let next_r = &r - &quot * &new_r;
        r = core::mem::replace(&mut new_r, next_r);
    }

    if !r.is_one() {
        return Err(Error::NotInvertible);
    }

    let (_, inv) = t.mod_floor(&modulus).into_parts();
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_division_bounds() {
        for a in 1_u32..200 {
            for b in 1_u32..40 {
                let (a_bn, b_bn) = (BigUint::from(a), BigUint::from(b));

                let ceil = ceil_div(&a_bn, &b_bn);
                assert!(&ceil * &b_bn >= a_bn);
                assert!((&ceil - 1_u32) * &b_bn < a_bn);

                let floor = floor_div(&a_bn, &b_bn);
                assert!(&floor * &b_bn <= a_bn);
                assert!((&floor + 1_u32) * &b_bn > a_bn);
            }
        }
    }

    #[test]
    fn check_division_large() {
        // 2**200 + 1 divided by 2**100 sits just above an exact quotient
        let two_100 = BigUint::one() << 100_usize;
        let num = (BigUint::one() << 200_usize) + 1_u32;

        assert_eq!(floor_div(&num, &two_100), two_100);
        assert_eq!(ceil_div(&num, &two_100), &two_100 + 1_u32);
        assert_eq!(ceil_div(&(&two_100 * 3_u32), &two_100), BigUint::from(3_u8));
        assert_eq!(ceil_div(&BigUint::zero(), &two_100), BigUint::zero());
    }

    #[test]
    fn check_byte_len() {
        assert_eq!(byte_len(&BigUint::from(0xff_u32)), 1);
        assert_eq!(byte_len(&BigUint::from(0x100_u32)), 2);
        assert_eq!(byte_len(&BigUint::from(0xc2b2eb_u32)), 3);
        assert_eq!(byte_len(&(BigUint::one() << 1023_usize)), 128);
    }

    #[test]
    fn check_inv_mod() {
        let n = BigUint::from(3691_u32 * 3457);

        for a in [2_u32, 3, 65537, 12759786].iter() {
            let a_bn = BigUint::from(*a);
            let inv = inv_mod(&a_bn, &n).unwrap();
            assert!(inv < n);
            assert_eq!((a_bn * inv).mod_floor(&n), BigUint::one());
        }

        // inputs larger than the modulus are reduced first
        let inv = inv_mod(&BigUint::from(12759789_u32), &n).unwrap();
        assert_eq!(inv, inv_mod(&BigUint::from(2_u8), &n).unwrap());
    }

    #[test]
    fn check_inv_mod_failures() {
        let n = BigUint::from(3691_u32 * 3457);

        assert_eq!(inv_mod(&BigUint::from(3691_u32), &n), Err(Error::NotInvertible));
        assert_eq!(inv_mod(&BigUint::zero(), &n), Err(Error::NotInvertible));
        assert_eq!(inv_mod(&BigUint::one(), &BigUint::zero()), Err(Error::ZeroModulus));
    }
}
