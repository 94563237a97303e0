//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm for fast, deterministic sampling.
//! CRITICAL: all randomness in scenario sampling and baseline search MUST
//! go through this module.

mod xorshift;

pub use xorshift::RngManager;
