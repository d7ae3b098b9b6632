//! Tenant-level environment configuration.

use serde::{Deserialize, Serialize};

/// Tenant configuration fetched at bootstrap.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub fraud_settings: FraudSettings,
}

/// Fraud-prevention settings for native clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FraudSettings {
    #[serde(default)]
    pub device_attestation_mode: AttestationMode,
}

/// Whether and how strictly device attestation is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationMode {
    #[default]
    Disabled,
    Onboarding,
    Enforced,
}
