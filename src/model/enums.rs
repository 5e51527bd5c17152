//! Closed vocabularies used by the record types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a member of a closed vocabulary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {vocabulary}")]
pub struct UnknownVariant {
    pub vocabulary: &'static str,
    pub value: String,
}

/// Declares a snake_case string enum with `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $vocab:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        vocabulary: $vocab,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Which kind of entity owns a satellite record
    OwnerType, "owner type" {
        Institution => "institution",
        Subsidiary => "subsidiary",
    }
}

impl OwnerType {
    /// Graph label of the owning node
    pub fn label(&self) -> &'static str {
        match self {
            OwnerType::Institution => "Institution",
            OwnerType::Subsidiary => "Subsidiary",
        }
    }
}

string_enum! {
    BusinessType, "business type" {
        HedgeFund => "hedge_fund",
        Bank => "bank",
        BrokerDealer => "broker_dealer",
        Insurance => "insurance",
        AssetManager => "asset_manager",
        PensionFund => "pension_fund",
        Other => "other",
    }
}

string_enum! {
    OperationalStatus, "operational status" {
        Active => "active",
        Dormant => "dormant",
        Liquidating => "liquidating",
    }
}

string_enum! {
    RiskRating, "risk rating" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl RiskRating {
    /// Rating band for a mean risk-factor score on the 1..=5 scale
    pub fn from_score(score: f64) -> Self {
        if score < 2.5 {
            RiskRating::Low
        } else if score < 3.5 {
            RiskRating::Medium
        } else {
            RiskRating::High
        }
    }
}

string_enum! {
    AccountType, "account type" {
        Checking => "checking",
        Savings => "savings",
        Investment => "investment",
    }
}

string_enum! {
    TransactionType, "transaction type" {
        Ach => "ach",
        Wire => "wire",
        Check => "check",
        Lockbox => "lockbox",
    }
}

string_enum! {
    TransactionStatus, "transaction status" {
        Completed => "completed",
        Pending => "pending",
        Failed => "failed",
        Reversed => "reversed",
    }
}

string_enum! {
    ComplianceEventType, "compliance event type" {
        Onboarding => "onboarding",
        AccountOpened => "account_opened",
        AccountClosed => "account_closed",
        PeriodicReview => "periodic_review",
        RiskLevelChange => "risk_level_change",
        EnhancedDueDiligence => "enhanced_due_diligence",
        KycUpdate => "kyc_update",
        AdverseMedia => "adverse_media",
        SanctionsScreening => "sanctions_screening",
        DocumentExpiry => "document_expiry",
        OwnershipChange => "ownership_change",
        Remediation => "remediation",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        for event_type in ComplianceEventType::ALL {
            let parsed: ComplianceEventType = event_type.as_str().parse().unwrap();
            assert_eq!(&parsed, event_type);
        }
        assert_eq!(ComplianceEventType::ALL.len(), 12);
    }

    #[test]
    fn test_unknown_variant() {
        let err = "offshore".parse::<BusinessType>().unwrap_err();
        assert_eq!(err.vocabulary, "business type");
        assert_eq!(err.to_string(), "'offshore' is not a valid business type");
    }

    #[test]
    fn test_risk_rating_bands() {
        assert_eq!(RiskRating::from_score(1.0), RiskRating::Low);
        assert_eq!(RiskRating::from_score(2.4), RiskRating::Low);
        assert_eq!(RiskRating::from_score(3.0), RiskRating::Medium);
        assert_eq!(RiskRating::from_score(3.5), RiskRating::High);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&BusinessType::BrokerDealer).unwrap();
        assert_eq!(json, "\"broker_dealer\"");
        assert_eq!(OwnerType::Subsidiary.label(), "Subsidiary");
    }
}
