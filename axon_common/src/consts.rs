//! System-wide constants for the AXON workspace.
//!
//! Single source of truth for default periods and filter limits.
//! Imported by all crates; do not duplicate these values.

/// Default watchdog sweep interval in milliseconds.
pub const DEFAULT_WATCHDOG_SWEEP_MS: u64 = 1000;

/// Default watchdog heartbeat threshold in milliseconds.
pub const DEFAULT_HEARTBEAT_THRESHOLD_MS: u64 = 1000;

/// Default timer authority poll interval in milliseconds.
pub const DEFAULT_TIMER_POLL_MS: u64 = 10;

/// Default odometry sampling interval in milliseconds.
pub const DEFAULT_ODOMETRY_SAMPLE_MS: u64 = 10;

/// Default velocity control step interval in milliseconds.
pub const DEFAULT_VELOCITY_CONTROL_MS: u64 = 10;

/// Minimum absolute jump (sensor units) for a reading to be considered spurious.
pub const SPURIOUS_MIN_DELTA: f64 = 10_000.0;

/// Minimum `floor(log2(hi / lo))` for a reading to be considered spurious
/// (≈ 8 orders of magnitude).
pub const SPURIOUS_MIN_EXPONENT: f64 = 27.0;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/axon/axon.toml";
