use core::fmt;

use num::bigint::{BigUint, RandBigInt};
use num::{CheckedSub, Integer, One, Zero};
use rand::rngs::ThreadRng;
use rand::{thread_rng, Rng};

use crate::arith::{self, ceil_div, floor_div};
use crate::interval::IntervalSet;
use crate::oracle::PaddingOracle;

/// Default cap on random blinding values drawn in phase one
///
/// A conforming blinded ciphertext is expected within ~2**16 draws
/// for full-size moduli, so this only stops degenerate oracles.
pub const DEFAULT_MAX_BLINDING_ATTEMPTS: u64 = 1 << 32;

// Smallest modulus length (bytes) with a non-zero block bound
const MIN_MODULUS_LEN: usize = 3;

/// States of the attack
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Step 1: find s0 s.t. c * s0**e mod n is conforming
    Blind,
    /// Step 2.a: first witness, scanning up from ceil(n / 3B)
    InitialSearch,
    /// Step 3: narrow the interval set with the current witness
    Narrow,
    /// Step 4: stop on a single point, otherwise pick the next search
    CheckTerminal,
    /// Step 2.b: linear scan with more than one interval left
    SearchMany,
    /// Step 2.c: r-stepped scan with one interval left
    SearchOne,
    Done,
}

/// Attack errors
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// The oracle itself failed
    Oracle(E),
    /// A configured query, blinding or search budget ran out
    OracleExhausted { phase: Phase, queries: u64 },
    CiphertextOutOfRange,
    /// No candidate interval survived narrowing, the oracle is inconsistent
    EmptyIntervalSet,
    InvalidExponent,
    ModulusTooSmall,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Oracle(e) => write!(f, "padding oracle failed: {:?}", e),
            Error::OracleExhausted { phase, queries } => write!(
                f,
                "oracle budget exhausted in {:?} phase after {} queries",
                phase, queries
            ),
            Error::CiphertextOutOfRange => write!(f, "ciphertext is not less than the modulus"),
            Error::EmptyIntervalSet => write!(f, "no candidate plaintext intervals left"),
            Error::InvalidExponent => write!(f, "public exponent must be non-zero"),
            Error::ModulusTooSmall => write!(f, "modulus must be at least three bytes"),
        }
    }
}

/// Attack limits
///
/// The defaults never stop an attack against a well-behaved oracle.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Random blinding values to try before giving up
    pub max_blinding_attempts: u64,
    /// Total oracle queries allowed, unbounded if None
    pub max_queries: Option<u64>,
    /// Values of r tried per single-interval search, unbounded if None
    pub max_search_rounds: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_blinding_attempts: DEFAULT_MAX_BLINDING_ATTEMPTS,
            max_queries: None,
            max_search_rounds: None,
        }
    }
}

/// Conforming plaintext bounds for a modulus of k bytes
///
/// B = 2**(8 * (k - 2)); conforming plaintexts lie in [2B, 3B)
#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub k: usize,
    pub b: BigUint,
    pub two_b: BigUint,
    pub three_b: BigUint,
}

impl Bounds {
    /// Compute the bounds for modulus n, None if n is shorter than three bytes
    pub fn for_modulus(n: &BigUint) -> Option<Self> {
        let k = arith::byte_len(n);
        if k < MIN_MODULUS_LEN {
            return None;
        }

        let b = BigUint::one() << (8 * (k - 2));

        Some(Self {
            k,
            two_b: &b * 2_u32,
            three_b: &b * 3_u32,
            b,
        })
    }
}

/// Narrow candidate intervals using a witness s accepted by the oracle
///
/// For each interval [a, b] and each r with
/// (a*s - 3B + 1) / n <= r <= (b*s - 2B) / n, keeps
/// [max(a, ceil((2B + rn) / s)), min(b, floor((3B - 1 + rn) / s))]
pub fn narrow_intervals(
    intervals: &IntervalSet,
    s: &BigUint,
    n: &BigUint,
    bounds: &Bounds,
) -> IntervalSet {
    let mut next = IntervalSet::new();
    let three_b_1 = &bounds.three_b - 1_u32;

    for interval in intervals {
        let (a, b) = (&interval.lo, &interval.hi);

        let b_s = b * s;
        if b_s < bounds.two_b {
            continue;
        }

        // r < 0 never lands in [2B, 3B) since n > 3B
        let a_s = a * s + 1_u32;
        let mut r = if a_s > bounds.three_b {
            ceil_div(&(a_s - &bounds.three_b), n)
        } else {
            BigUint::zero()
        };
        let r_hi = floor_div(&(b_s - &bounds.two_b), n);

        while r <= r_hi {
            let rn = &r * n;

            let lo = ceil_div(&(&bounds.two_b + &rn), s).max(a.clone());
            let hi = floor_div(&(&three_b_1 + &rn), s).min(b.clone());

            if lo <= hi {
                next.insert(lo, hi);
            }

            r += 1_u32;
        }
    }

    next
}

/// Bleichenbacher's adaptive chosen-ciphertext attack on PKCS#1 v1.5
///
/// Recovers m = c**d mod n from a padding oracle, one state transition
/// per call to [`Attack::step`]. Every transition replaces the interval set
/// wholesale, so the attack can be stopped between steps (or after a budget
/// error) and resumed later.
pub struct Attack<O, R> {
    oracle: O,
    rng: R,
    config: Config,
    n: BigUint,
    e: BigUint,
    c: BigUint,
    bounds: Bounds,
    s0: BigUint,
    s0_inv: BigUint,
    c0: BigUint,
    s: BigUint,
    intervals: IntervalSet,
    phase: Phase,
    queries: u64,
    blinding_attempts: u64,
    rounds: u64,
    plaintext: Option<BigUint>,
}

impl<O, R> Attack<O, R>
where
    O: PaddingOracle,
    R: Rng,
{
    /// Set up an attack on ciphertext c under public key (n, e)
    ///
    /// `rng` supplies the random blinding values for phase one.
    pub fn new(
        oracle: O,
        rng: R,
        n: &BigUint,
        e: &BigUint,
        c: &BigUint,
    ) -> Result<Self, Error<O::Error>> {
        if e.is_zero() {
            return Err(Error::InvalidExponent);
        }

        if c >= n {
            return Err(Error::CiphertextOutOfRange);
        }

        let bounds = Bounds::for_modulus(n).ok_or(Error::ModulusTooSmall)?;
        let intervals = IntervalSet::singleton(bounds.two_b.clone(), &bounds.three_b - 1_u32);

        Ok(Self {
            oracle,
            rng,
            config: Config::default(),
            n: n.clone(),
            e: e.clone(),
            c: c.clone(),
            bounds,
            s0: BigUint::one(),
            s0_inv: BigUint::one(),
            c0: c.clone(),
            s: BigUint::zero(),
            intervals,
            phase: Phase::Blind,
            queries: 0,
            blinding_attempts: 0,
            rounds: 0,
            plaintext: None,
        })
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Oracle queries made so far
    pub fn queries(&self) -> u64 {
        self.queries
    }

    /// Narrowing rounds completed so far
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn blinding_attempts(&self) -> u64 {
        self.blinding_attempts
    }

    /// Current candidate intervals for m * s0 mod n
    pub fn intervals(&self) -> &IntervalSet {
        &self.intervals
    }

    /// Most recently accepted witness s
    pub fn witness(&self) -> &BigUint {
        &self.s
    }

    /// Blinding pair (s0, c0)
    pub fn blinding(&self) -> (&BigUint, &BigUint) {
        (&self.s0, &self.c0)
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Perform one state transition
    ///
    /// Returns the recovered plaintext once the attack is done
    pub fn step(&mut self) -> Result<Option<BigUint>, Error<O::Error>> {
        match self.phase {
            Phase::Blind => {
                self.blind()?;
                self.phase = Phase::InitialSearch;
            }
            Phase::InitialSearch => {
                self.initial_search()?;
                self.phase = Phase::Narrow;
            }
            Phase::Narrow => {
                self.narrow();
                self.phase = Phase::CheckTerminal;
            }
            Phase::CheckTerminal => {
                self.phase = self.check_terminal()?;
            }
            Phase::SearchMany => {
                self.search_many()?;
                self.phase = Phase::Narrow;
            }
            Phase::SearchOne => {
                self.search_one()?;
                self.phase = Phase::Narrow;
            }
            Phase::Done => (),
        }

        Ok(self.plaintext.clone())
    }

    /// Run the attack to completion
    pub fn run(mut self) -> Result<BigUint, Error<O::Error>> {
        loop {
            if let Some(m) = self.step()? {
                return Ok(m);
            }
        }
    }

    fn exhausted(&self) -> Error<O::Error> {
        tracing::warn!(
            phase = ?self.phase,
            queries = self.queries,
            "oracle budget exhausted"
        );
        Error::OracleExhausted {
            phase: self.phase,
            queries: self.queries,
        }
    }

    fn query(&mut self, ciphertext: &BigUint) -> Result<bool, Error<O::Error>> {
        if let Some(max) = self.config.max_queries {
            if self.queries >= max {
                return Err(self.exhausted());
            }
        }

        self.queries += 1;
        self.oracle.is_valid(ciphertext).map_err(Error::Oracle)
    }

    // query c0 * s**e mod n
    fn query_multiplier(&mut self, s: &BigUint) -> Result<bool, Error<O::Error>> {
        let ciphertext = (&self.c0 * s.modpow(&self.e, &self.n)).mod_floor(&self.n);
        self.query(&ciphertext)
    }

    fn blind(&mut self) -> Result<(), Error<O::Error>> {
        tracing::info!("blinding ciphertext");

        // c itself was already rejected if random draws have started
        if self.blinding_attempts == 0 {
            let c = self.c.clone();
            if self.query(&c)? {
                tracing::debug!("ciphertext already conforming, skipping blinding");
                return Ok(());
            }
        }

        let two = BigUint::from(2_u8);

        while self.blinding_attempts < self.config.max_blinding_attempts {
            self.blinding_attempts += 1;

            let s0 = self.rng.gen_biguint_range(&two, &self.n);
            let s0_inv = match arith::inv_mod(&s0, &self.n) {
                Ok(inv) => inv,
                Err(_) => {
                    tracing::debug!(s0 = %s0, "blinding value not invertible, redrawing");
                    continue;
                }
            };

            // c0 = c * s0**e mod n
            let c0 = (&self.c * s0.modpow(&self.e, &self.n)).mod_floor(&self.n);
            if self.query(&c0)? {
                tracing::debug!(attempts = self.blinding_attempts, "found conforming blinding");
                self.s0 = s0;
                self.s0_inv = s0_inv;
                self.c0 = c0;
                return Ok(());
            }
        }

        Err(self.exhausted())
    }

    fn initial_search(&mut self) -> Result<(), Error<O::Error>> {
        tracing::info!("searching for the first witness");

        let mut s = ceil_div(&self.n, &self.bounds.three_b);
        while !self.query_multiplier(&s)? {
            s += 1_u32;
        }

        self.s = s;
        Ok(())
    }

    fn search_many(&mut self) -> Result<(), Error<O::Error>> {
        let mut s = &self.s + 1_u32;
        while !self.query_multiplier(&s)? {
            s += 1_u32;
        }

        self.s = s;
        Ok(())
    }

    fn search_one(&mut self) -> Result<(), Error<O::Error>> {
        let (a, b) = match self.intervals.single() {
            Some(interval) => (interval.lo.clone(), interval.hi.clone()),
            None => return Err(Error::EmptyIntervalSet),
        };
        let n = self.n.clone();
        let two_b = self.bounds.two_b.clone();
        let three_b = self.bounds.three_b.clone();

        // r = ceil(2 * (b*s - 2B) / n)
        let b_s = (&b * &self.s).checked_sub(&two_b).unwrap_or_default();
        let mut r = ceil_div(&(b_s * 2_u32), &n);
        let mut tried = 0_u64;

        loop {
            if let Some(max) = self.config.max_search_rounds {
                if tried >= max {
                    return Err(self.exhausted());
                }
            }

            // (2B + rn) / b <= s < (3B + rn) / a
            let rn = &r * &n;
            let mut s = ceil_div(&(&two_b + &rn), &b);
            let right = floor_div(&(&three_b + &rn), &a);

            while s <= right {
                if self.query_multiplier(&s)? {
                    self.s = s;
                    return Ok(());
                }
                s += 1_u32;
            }

            r += 1_u32;
            tried += 1;
        }
    }

    fn narrow(&mut self) {
        self.intervals = narrow_intervals(&self.intervals, &self.s, &self.n, &self.bounds);
        self.rounds += 1;

        tracing::debug!(
            round = self.rounds,
            intervals = self.intervals.len(),
            s = %self.s,
            "narrowed candidate intervals"
        );
    }

    fn check_terminal(&mut self) -> Result<Phase, Error<O::Error>> {
        if self.intervals.is_empty() {
            return Err(Error::EmptyIntervalSet);
        }

        let interval = match self.intervals.single() {
            Some(interval) => interval,
            None => return Ok(Phase::SearchMany),
        };

        if !interval.is_point() {
            return Ok(Phase::SearchOne);
        }

        // m = a * s0**-1 mod n
        let m = (&interval.lo * &self.s0_inv).mod_floor(&self.n);
        tracing::info!(
            rounds = self.rounds,
            queries = self.queries,
            "recovered plaintext"
        );

        self.plaintext = Some(m);
        Ok(Phase::Done)
    }
}

/// Recover the plaintext of c under public key (n, e) from a padding oracle
///
/// Blinding values are drawn from the thread-local RNG
pub fn attack<O: PaddingOracle>(
    oracle: O,
    n: &BigUint,
    e: &BigUint,
    c: &BigUint,
) -> Result<BigUint, Error<O::Error>> {
    Attack::<O, ThreadRng>::new(oracle, thread_rng(), n, e, c)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 3691 * 3457
    const TINY_N: u64 = 12759787;

    #[test]
    fn check_bounds() {
        let bounds = Bounds::for_modulus(&BigUint::from(TINY_N)).unwrap();
        assert_eq!(bounds.k, 3);
        assert_eq!(bounds.b, BigUint::from(256_u32));
        assert_eq!(bounds.two_b, BigUint::from(512_u32));
        assert_eq!(bounds.three_b, BigUint::from(768_u32));

        assert!(Bounds::for_modulus(&BigUint::from(0xffff_u32)).is_none());
        assert!(Bounds::for_modulus(&BigUint::from(0x10000_u32)).is_some());
    }

    #[test]
    fn check_narrowing_keeps_every_candidate() {
        let n = BigUint::from(TINY_N);
        let bounds = Bounds::for_modulus(&n).unwrap();

        let mut start = IntervalSet::new();
        start.insert(BigUint::from(512_u32), BigUint::from(600_u32));
        start.insert(BigUint::from(650_u32), BigUint::from(767_u32));

        for &s in [2_u64, 16615, 20000, 123457, 9999991].iter() {
            let next = narrow_intervals(&start, &BigUint::from(s), &n, &bounds);

            // exactly the candidates whose product with s stays conforming survive
            for x in 0_u64..1024 {
                let x_bn = BigUint::from(x);
                let conforming = (512..768).contains(&((x * s) % TINY_N));
                assert_eq!(
                    next.contains(&x_bn),
                    start.contains(&x_bn) && conforming,
                    "s: {}, x: {}",
                    s,
                    x
                );
            }
        }
    }

    #[test]
    fn check_narrowing_drops_empty_ranges() {
        let n = BigUint::from(TINY_N);
        let bounds = Bounds::for_modulus(&n).unwrap();
        let start = IntervalSet::singleton(BigUint::from(700_u32), BigUint::from(701_u32));

        // 700 * 2 and 701 * 2 both land above 3B
        let next = narrow_intervals(&start, &BigUint::from(2_u32), &n, &bounds);
        assert!(next.is_empty());
    }

    #[test]
    fn check_parameter_validation() {
        let oracle = |_: &BigUint| true;
        let n = BigUint::from(TINY_N);

        let res = Attack::new(oracle, thread_rng(), &n, &BigUint::zero(), &BigUint::one());
        assert!(matches!(res, Err(Error::InvalidExponent)));

        let res = Attack::new(oracle, thread_rng(), &n, &BigUint::from(3_u8), &n);
        assert!(matches!(res, Err(Error::CiphertextOutOfRange)));

        let small = BigUint::from(0xfff1_u32);
        let res = Attack::new(oracle, thread_rng(), &small, &BigUint::from(3_u8), &BigUint::one());
        assert!(matches!(res, Err(Error::ModulusTooSmall)));
    }

    #[test]
    fn check_initial_state() {
        let n = BigUint::from(TINY_N);
        let c = BigUint::from(1234_u32);
        let attack = Attack::new(|_: &BigUint| true, thread_rng(), &n, &BigUint::from(3_u8), &c)
            .unwrap();

        assert_eq!(attack.phase(), Phase::Blind);
        assert_eq!(attack.queries(), 0);
        assert_eq!(attack.blinding(), (&BigUint::one(), &c));

        let only = attack.intervals().single().unwrap();
        assert_eq!(only.lo, BigUint::from(512_u32));
        assert_eq!(only.hi, BigUint::from(767_u32));
    }

    #[test]
    fn check_error_display() {
        let err: Error<&str> = Error::OracleExhausted {
            phase: Phase::SearchOne,
            queries: 12,
        };
        assert_eq!(
            alloc::format!("{}", err),
            "oracle budget exhausted in SearchOne phase after 12 queries"
        );

        let err: Error<&str> = Error::Oracle("timeout");
        assert_eq!(alloc::format!("{}", err), "padding oracle failed: \"timeout\"");
    }
}
