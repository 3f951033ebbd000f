//! # Retry policies for ad attempts.
//!
//! The game API ships retry flags as "boolean or object": `true`/`false`, or an
//! object carrying provider-specific override details (its presence alone enables
//! the retry). [`RetryPolicy`] is the typed form, resolved once when the
//! configuration is loaded.
//!
//! - [`RetryPolicy::Disabled`] no retry.
//! - [`RetryPolicy::Enabled`] retry once.
//! - [`RetryPolicy::EnabledWithOverride`] retry once; the override details are kept
//!   for collaborators that care about them.
//!
//! ## Mapping
//! ```text
//! absent / null / false / other  → Disabled
//! true                           → Enabled
//! { ... }                        → EnabledWithOverride({ ... })
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Policy controlling whether one more attempt is made.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RetryPolicy {
    /// Never retry (default).
    #[default]
    Disabled,
    /// Retry once.
    Enabled,
    /// Retry once; carries the raw override object from the configuration.
    EnabledWithOverride(Map<String, Value>),
}

impl RetryPolicy {
    /// Returns `true` unless the policy is [`RetryPolicy::Disabled`].
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, RetryPolicy::Disabled)
    }

    /// Interprets a raw configuration value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(true) => RetryPolicy::Enabled,
            Value::Object(map) => RetryPolicy::EnabledWithOverride(map.clone()),
            _ => RetryPolicy::Disabled,
        }
    }
}

impl<'de> Deserialize<'de> for RetryPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(RetryPolicy::from_value(&value))
    }
}
