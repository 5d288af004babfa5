//! Workspace-wide constants.
//!
//! Single source of truth for defaults shared by the device engine,
//! the simulation transport and the supervisor binary.

/// Default move timeout in milliseconds when neither the caller nor the
/// device configuration provides one.
pub const DEFAULT_MOVE_TIMEOUT_MS: u64 = 10_000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dal/devices.toml";

/// Canonical service name of the supervisor binary.
pub const DAL_SERVICE_NAME: &str = "dal";

/// Template variable holding the device base address.
pub const PREFIX_VAR: &str = "prefix";

/// Template variable holding the device name.
pub const NAME_VAR: &str = "name";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(DEFAULT_MOVE_TIMEOUT_MS > 0);
        assert!(DEFAULT_CONFIG_PATH.ends_with(".toml"));
        assert_ne!(PREFIX_VAR, NAME_VAR);
    }
}
