//! Integration test suite for Sigil.
//!
//! Exercises the full path from seed to signed transaction: key derivation,
//! building, signing, verification and co-signer merging, plus property
//! tests over the sighash codec, digest engine, wire codec and coin selection.

pub mod helpers;
