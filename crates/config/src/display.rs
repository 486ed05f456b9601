//! Configuration of how balances are rendered.

use serde::{Deserialize, Serialize};
use vault_units::DisplayOptions;

/// Contains the balance display settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Fractional digits shown before a balance is truncated
    pub max_fraction_digits: usize,
    /// Separate thousands in the whole part
    pub group_thousands: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let defaults = DisplayOptions::default();
        Self {
            max_fraction_digits: defaults.max_fraction_digits,
            group_thousands: defaults.group_thousands,
        }
    }
}

impl From<&DisplayConfig> for DisplayOptions {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            max_fraction_digits: config.max_fraction_digits,
            group_thousands: config.group_thousands,
        }
    }
}
