/// Longest bookable interval: one full day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Items (appointments + blocks) accepted in a single layout pass.
pub const MAX_ITEMS_PER_DAY: usize = 2_000;

/// Longest free-text reason on a schedule block.
pub const MAX_REASON_LEN: usize = 256;

/// Buffered day events per subscriber before lagging receivers drop some.
pub const DAY_CHANNEL_CAPACITY: usize = 256;
