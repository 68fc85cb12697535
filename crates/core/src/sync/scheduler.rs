//! Auto-sync scheduler constants.

/// Default unattended sync cadence in seconds.
pub const AUTO_SYNC_DEFAULT_INTERVAL_SECS: u64 = 60 * 5;

/// Minimum accepted cadence; shorter requests are clamped up to this.
pub const AUTO_SYNC_MIN_INTERVAL_SECS: u64 = 60;

/// Maximum jitter (seconds) added to each periodic tick so unattended
/// instances don't align their requests.
pub const AUTO_SYNC_INTERVAL_JITTER_SECS: u64 = 5;
