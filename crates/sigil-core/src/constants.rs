//! Protocol constants. All monetary values in base units (1 coin = 10^8 units).

pub const COIN: u64 = 100_000_000;

/// Transaction version used for newly built transactions.
pub const TX_VERSION: u32 = 1;

/// Final input sequence number (lock time and replacement disabled).
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Fork value placed above the SigHash byte in the 4-byte digest suffix.
///
/// Networks sharing the base protocol but using replay protection set the
/// fork-id flag on the SigHash byte; the fork value itself is zero for every
/// supported network.
pub const SIGHASH_FORK_VALUE: u32 = 0;

/// Placeholder value for outputs blanked out by `SIGHASH_SINGLE`.
pub const SIGHASH_SINGLE_BLANK_VALUE: u64 = u64::MAX;

/// Upper bound on any single length prefix accepted by the wire decoder.
pub const MAX_DECODE_LEN: u64 = 4_000_000;

/// Default dust threshold in base units.
pub const DEFAULT_DUST_THRESHOLD: u64 = 546;

/// Default fee rate in base units per byte.
pub const DEFAULT_FEE_RATE: u64 = 1;

/// Estimated serialized size of a signed pay-to-pubkey-hash input.
pub const P2PKH_INPUT_SIZE: u64 = 148;

/// Serialized size of a pay-to-pubkey-hash output.
pub const P2PKH_OUTPUT_SIZE: u64 = 34;

/// Version and lock time bytes present in every transaction.
pub const TX_OVERHEAD_SIZE: u64 = 8;
