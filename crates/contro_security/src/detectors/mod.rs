//! Bundled detectors.
//!
//! - [`SpamDetector`] watches `message` events for floods, mass mentions and
//!   blacklisted authors.
//! - [`RaidDetector`] watches `member_join` events for join floods and locks
//!   the guild down when one starts.

mod raid;
mod spam;

pub use raid::{RAID_DETECTOR, RaidDetector};
pub use spam::{SPAM_DETECTOR, SpamDetector};

/// Reject zero-valued limits that would make a window meaningless.
fn require_positive(config: &crate::SecurityConfig, names: &[&str]) -> Result<(), String> {
    for name in names {
        if config.rate_limits.get(*name) == Some(&0) {
            return Err(format!("rate limit '{}' must be positive", name));
        }
    }
    Ok(())
}
