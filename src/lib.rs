#![no_std]

extern crate alloc;

pub mod arith;
pub mod attack;
pub mod interval;
pub mod oracle;
pub mod pkcs1;

pub use attack::{attack, Attack, Config, Error, Phase};
pub use interval::{Interval, IntervalSet};
pub use oracle::{PaddingOracle, RsaPaddingOracle};
