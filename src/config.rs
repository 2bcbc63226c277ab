//! Issuance policy.
//!
//! Loaded from TOML or built in code:
//!
//! ```toml
//! max_validity_days = 3650
//! default_validity_days = 90
//!
//! [serial]
//! kind = "sequential"
//! start = 1000
//! ```

use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::{PqCertKitError, Result};
use crate::serial::{RandomSerial, SequentialSerial, SerialNumberAllocator};

/// Limits and defaults applied by a [`crate::issuer::CertificateIssuer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
pub struct IssuancePolicy {
    /// Longest validity period, in days, that will be issued.
    #[serde(default = "default_max_validity_days")]
    #[builder(default = default_max_validity_days())]
    pub max_validity_days: u32,

    /// Validity used when the caller does not ask for one.
    #[serde(default = "default_validity_days")]
    #[builder(default = default_validity_days())]
    pub default_validity_days: u32,

    /// How serial numbers are allocated.
    #[serde(default)]
    #[builder(default)]
    pub serial: SerialStrategy,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            max_validity_days: default_max_validity_days(),
            default_validity_days: default_validity_days(),
            serial: SerialStrategy::default(),
        }
    }
}

fn default_max_validity_days() -> u32 {
    36_500
}

fn default_validity_days() -> u32 {
    365
}

impl IssuancePolicy {
    /// Parse a policy from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let policy: Self = toml::from_str(toml_str)
            .map_err(|e| PqCertKitError::config(format!("Invalid TOML: {e}")))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Serialize the policy to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PqCertKitError::config(format!("TOML serialize: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_validity_days == 0 {
            return Err(PqCertKitError::config("max_validity_days must be positive"));
        }
        if self.default_validity_days > self.max_validity_days {
            return Err(PqCertKitError::config(format!(
                "default_validity_days ({}) exceeds max_validity_days ({})",
                self.default_validity_days, self.max_validity_days
            )));
        }
        Ok(())
    }

    /// Rejects validity periods longer than the policy allows.
    pub fn check_validity_days(&self, days: u32) -> Result<()> {
        if days > self.max_validity_days {
            return Err(PqCertKitError::InvalidInput(format!(
                "validity of {days} days exceeds the maximum of {}",
                self.max_validity_days
            )));
        }
        Ok(())
    }
}

/// Serial number allocation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerialStrategy {
    /// Random positive 128-bit serials.
    #[default]
    Random,

    /// Counter starting at `start`.
    Sequential {
        #[serde(default = "default_serial_start")]
        start: u64,
    },
}

fn default_serial_start() -> u64 {
    1
}

impl SerialStrategy {
    /// Creates a fresh allocator for this strategy.
    pub fn allocator(&self) -> Arc<dyn SerialNumberAllocator> {
        match self {
            SerialStrategy::Random => Arc::new(RandomSerial),
            SerialStrategy::Sequential { start } => Arc::new(SequentialSerial::new(*start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = IssuancePolicy::from_toml("").unwrap();
        assert_eq!(policy, IssuancePolicy::default());
        assert_eq!(policy.max_validity_days, 36_500);
        assert_eq!(policy.default_validity_days, 365);
        assert_eq!(policy.serial, SerialStrategy::Random);
    }

    #[test]
    fn test_parse_sequential() {
        let policy = IssuancePolicy::from_toml(
            r#"
            max_validity_days = 3650
            default_validity_days = 90

            [serial]
            kind = "sequential"
            start = 1000
            "#,
        )
        .unwrap();
        assert_eq!(policy.serial, SerialStrategy::Sequential { start: 1000 });
        assert_eq!(
            policy.serial.allocator().next_serial().unwrap(),
            vec![0x01, 0, 0, 0, 0, 0, 0, 0x03, 0xe8]
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let policy = IssuancePolicy::builder()
            .max_validity_days(730)
            .serial(SerialStrategy::Sequential { start: 7 })
            .build();
        let text = policy.to_toml().unwrap();
        assert_eq!(IssuancePolicy::from_toml(&text).unwrap(), policy);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = IssuancePolicy::from_toml("max_validity_days = 10\nlifetime = 3\n").unwrap_err();
        assert!(matches!(err, PqCertKitError::Config(_)));
    }

    #[test]
    fn test_inconsistent_policy_rejected() {
        let err =
            IssuancePolicy::from_toml("max_validity_days = 10\ndefault_validity_days = 30\n")
                .unwrap_err();
        assert!(matches!(err, PqCertKitError::Config(_)));
    }

    #[test]
    fn test_max_validity() {
        let policy = IssuancePolicy::default();
        policy.check_validity_days(36_500).unwrap();
        assert!(matches!(
            policy.check_validity_days(36_501),
            Err(PqCertKitError::InvalidInput(_))
        ));
    }
}
