//! Action gating

use rpc_models::{Action, SoftwareConfig};

/// Whether a deployment runs for `action`
///
/// Component configs carry their own per-action blocks and run for every
/// action; everything else is gated by the `actions` allow-list.
pub fn should_trigger(action: Action, config: Option<&SoftwareConfig>, allow_list: &[Action]) -> bool {
    if config.map(SoftwareConfig::is_component).unwrap_or(false) {
        return true;
    }
    allow_list.contains(&action)
}
