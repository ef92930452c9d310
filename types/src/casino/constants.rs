/// Highest number on a single-zero wheel.
pub const MAX_NUMBER: u8 = 36;

/// Pockets on a single-zero wheel (0..=36).
pub const WHEEL_POCKETS: usize = 37;

/// The payout formula is expressed against this many winning numbers.
pub const PAYOUT_BASE: u64 = 36;

/// Starting balance for a fresh account (first run, no prior state).
pub const STARTING_BALANCE: u64 = 1_000;

/// Credit granted by the "add free credit" action (demo top-up).
pub const FREE_CREDIT_AMOUNT: u64 = 1_000;

/// Red numbers on a roulette wheel.
pub const RED_NUMBERS: [u8; 18] = [1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36];

/// Pocket order around a single-zero wheel, clockwise from zero.
pub const EUROPEAN_WHEEL_ORDER: [u8; WHEEL_POCKETS] = [
    0, 32, 15, 19, 4, 21, 2, 25, 17, 34, 6, 27, 13, 36, 11, 30, 8, 23, 10, 5, 24, 16, 33, 1, 20,
    14, 31, 9, 22, 18, 29, 7, 28, 12, 35, 3, 26,
];

/// Chip values offered by the table.
pub const CHIP_DENOMINATIONS: [u64; 6] = [1, 5, 25, 100, 500, 1_000];

/// Vertical offset between stacked chips on one bet area.
pub const CHIP_STACK_OFFSET: f32 = 0.01;

/// Current layout version of [`super::Snapshot`].
pub const SNAPSHOT_VERSION: u32 = 1;

/// Check if a number is red.
pub fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}
