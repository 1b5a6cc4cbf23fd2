//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Longest physical resource name the backends accept
pub const PHYSICAL_NAME_LIMIT: usize = 255;

const SHORT_ID_LEN: usize = 12;
const BASE32_CHARS: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Version information for the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Backoff options for completion polling
#[derive(Debug, Clone)]
pub struct CooldownOptions {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for CooldownOptions {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Calculate exponential backoff delay
pub fn calc_exp_backoff(options: &CooldownOptions, attempt: u32) -> Duration {
    let delay_secs = options.base_delay.as_secs_f64() * options.multiplier.powi(attempt as i32);
    let capped_delay = delay_secs.min(options.max_delay.as_secs_f64());
    Duration::from_secs_f64(capped_delay)
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Stable 12 character lower-case id derived from a UUID
///
/// Encodes the top 60 bits of the UUID in base32, so the same resource
/// always maps to the same physical name.
pub fn short_id(uuid: &Uuid) -> String {
    let bits = (uuid.as_u128() >> 64) as u64;
    (0..SHORT_ID_LEN)
        .map(|i| {
            let shift = 64 - 5 * (i + 1);
            BASE32_CHARS[((bits >> shift) & 0x1f) as usize] as char
        })
        .collect()
}

/// Build `{stack}-{resource}-{short_id}`, trimming the prefix to fit the limit
pub fn physical_name(stack_name: &str, resource_name: &str, uuid: &Uuid) -> String {
    let suffix = short_id(uuid);
    let prefix = format!("{}-{}", stack_name, resource_name);
    let room = PHYSICAL_NAME_LIMIT - suffix.len() - 1;
    let prefix: String = if prefix.chars().count() > room {
        prefix.chars().take(room).collect()
    } else {
        prefix
    };
    format!("{}-{}", prefix, suffix)
}
