//! Protocol constants. Token amounts are in base units (u64); boosted
//! quantities carry an extra factor of [`PRECISION`].

/// Base units per whole token for the reference 9-decimal principal token.
pub const COIN: u64 = 1_000_000_000;

/// Seconds per day (UTC).
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Default length of one accounting month: 30 days.
pub const MONTH_SECONDS: u64 = 30 * SECONDS_PER_DAY;

/// Number of slots in the decay ring buffer and entries in a boost table.
pub const BOOST_SLOTS: usize = 24;

/// Longest lock, in months. A lock may never have more months remaining.
pub const MAX_LOCK_MONTHS: u64 = BOOST_SLOTS as u64;

/// Fixed-point scale of boost multipliers (10_000 = 1.0x).
pub const PRECISION: u64 = 10_000;

/// Largest boost multiplier accepted in a table (1000.0x).
///
/// Caps `Σ slot * boost` well inside u128 for any u64 principal.
pub const MAX_BOOST_FACTOR: u64 = 1_000 * PRECISION;

/// Basis points denominator for penalties and fee splits.
pub const BPS_PRECISION: u64 = 10_000;

/// Default early-withdrawal penalty: 10%.
pub const DEFAULT_PENALTY_BPS: u64 = 1_000;

/// Default share of the penalty paid to the first fee receiver: 50%.
pub const DEFAULT_FEE_SPLIT_BPS: u64 = 5_000;

/// Fixed-point scale of the reward-per-boosted-unit accumulator.
///
/// `emission (u64) * REWARD_PRECISION` stays below `u128::MAX`.
pub const REWARD_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Longest span of one reward program, first to last month: 100 years.
pub const MAX_PROGRAM_MONTHS: u64 = 1_200;

/// Default boost table: `(months)^1.2` rounded to two decimals.
///
/// Index `i` is the multiplier for a lock with `i + 1` months remaining.
pub const DEFAULT_BOOST_FACTORS: [u64; BOOST_SLOTS] = [
    10_000, 23_000, 37_400, 52_800, 69_000, 85_900, 103_300, 121_300, 139_700, 158_500, 177_700,
    197_300, 217_100, 237_300, 257_800, 278_600, 299_600, 320_900, 342_400, 364_100, 386_100,
    408_200, 430_600, 453_200,
];
