//! Bridge configuration
//!
//! Diagnostic categories are toggled through `SIGBRIDGE_LOGGING_RULES`,
//! a `;`-separated list of `category=true|false` rules:
//!
//! ```text
//! SIGBRIDGE_LOGGING_RULES="sigbridge.slots.warning=true"
//! ```
//!
//! Categories without a rule are off.

use rustc_hash::FxHashMap;

/// Environment variable holding logging rules
pub const LOGGING_RULES_ENV: &str = "SIGBRIDGE_LOGGING_RULES";

/// Warning emitted when a slot is registered dynamically instead of declared
pub const SLOTS_WARNING_CATEGORY: &str = "sigbridge.slots.warning";

/// Feature switch turning native `name:read:write` declarations into
/// property objects
pub const TRUE_PROPERTY_FEATURE: &str = "sigbridge.feature.true_property";

/// Runtime configuration of a bridge instance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeConfig {
    rules: FxHashMap<String, bool>,
}

impl BridgeConfig {
    /// Configuration with every category off
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from `SIGBRIDGE_LOGGING_RULES`
    pub fn from_env() -> Self {
        match std::env::var(LOGGING_RULES_ENV) {
            Ok(rules) => Self::from_rules(&rules),
            Err(_) => Self::default(),
        }
    }

    /// Parse a rules string. Malformed entries are skipped.
    pub fn from_rules(rules: &str) -> Self {
        let mut config = Self::default();
        for entry in rules.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let Some((category, value)) = entry.split_once('=') else {
                log::debug!(target: "sigbridge::config", "ignoring logging rule {:?}", entry);
                continue;
            };
            let enabled = match value.trim() {
                "true" => true,
                "false" => false,
                _ => {
                    log::debug!(target: "sigbridge::config", "ignoring logging rule {:?}", entry);
                    continue;
                }
            };
            config.rules.insert(category.trim().to_string(), enabled);
        }
        config
    }

    /// Set a category explicitly
    pub fn with_category(mut self, category: &str, enabled: bool) -> Self {
        self.rules.insert(category.to_string(), enabled);
        self
    }

    /// Whether a category is enabled
    pub fn is_enabled(&self, category: &str) -> bool {
        self.rules.get(category).copied().unwrap_or(false)
    }

    /// Whether the dynamic slot warning is enabled
    pub fn slot_warnings(&self) -> bool {
        self.is_enabled(SLOTS_WARNING_CATEGORY)
    }

    /// Whether native property declarations resolve as properties
    pub fn true_property(&self) -> bool {
        self.is_enabled(TRUE_PROPERTY_FEATURE)
    }
}
