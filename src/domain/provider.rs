use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business profile of a provider. Only the fields the booking engine
/// reads are modelled here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub provider_id: Uuid,
    pub business_name: String,
    pub verification_status: VerificationStatus,
    /// Percentage retained by the platform. `None` means the configured default applies.
    pub commission_rate: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Approved,
    Pending,
    Rejected,
    Resubmitted,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Approved => "approved",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Rejected => "rejected",
            VerificationStatus::Resubmitted => "resubmitted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approved" => Some(VerificationStatus::Approved),
            "pending" => Some(VerificationStatus::Pending),
            "rejected" => Some(VerificationStatus::Rejected),
            "resubmitted" => Some(VerificationStatus::Resubmitted),
            _ => None,
        }
    }

    pub fn can_receive_bookings(&self) -> bool {
        matches!(self, VerificationStatus::Approved)
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProviderProfileRequest {
    pub provider_id: Uuid,
    pub business_name: String,
    pub verification_status: VerificationStatus,
    pub commission_rate: Option<Decimal>,
}
