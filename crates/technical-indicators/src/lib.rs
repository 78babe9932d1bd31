pub mod indicators;
pub mod summary;
pub mod trailing;

#[cfg(test)]
mod indicators_tests;

pub use indicators::*;
pub use summary::*;
pub use trailing::*;
