//! Entity kinds and the fixed parent-before-child write order

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::enums::UnknownVariant;

/// Every record kind the generator produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Entity,
    Institution,
    Subsidiary,
    Address,
    BeneficialOwner,
    RiskAssessment,
    AuthorizedPerson,
    Document,
    JurisdictionPresence,
    Account,
    Transaction,
    ComplianceEvent,
}

impl EntityKind {
    /// Topological write order shared by both stores.
    ///
    /// The six satellite kinds between `Subsidiary` and `Account` only depend on
    /// entities, so their relative order is arbitrary.
    pub const WRITE_ORDER: [EntityKind; 12] = [
        EntityKind::Entity,
        EntityKind::Institution,
        EntityKind::Subsidiary,
        EntityKind::Address,
        EntityKind::BeneficialOwner,
        EntityKind::RiskAssessment,
        EntityKind::AuthorizedPerson,
        EntityKind::Document,
        EntityKind::JurisdictionPresence,
        EntityKind::Account,
        EntityKind::Transaction,
        EntityKind::ComplianceEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Entity => "entity",
            EntityKind::Institution => "institution",
            EntityKind::Subsidiary => "subsidiary",
            EntityKind::Address => "address",
            EntityKind::BeneficialOwner => "beneficial_owner",
            EntityKind::RiskAssessment => "risk_assessment",
            EntityKind::AuthorizedPerson => "authorized_person",
            EntityKind::Document => "document",
            EntityKind::JurisdictionPresence => "jurisdiction_presence",
            EntityKind::Account => "account",
            EntityKind::Transaction => "transaction",
            EntityKind::ComplianceEvent => "compliance_event",
        }
    }

    /// Relational table holding this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Entity => "entities",
            EntityKind::Institution => "institutions",
            EntityKind::Subsidiary => "subsidiaries",
            EntityKind::Address => "addresses",
            EntityKind::BeneficialOwner => "beneficial_owners",
            EntityKind::RiskAssessment => "risk_assessments",
            EntityKind::AuthorizedPerson => "authorized_persons",
            EntityKind::Document => "documents",
            EntityKind::JurisdictionPresence => "jurisdiction_presences",
            EntityKind::Account => "accounts",
            EntityKind::Transaction => "transactions",
            EntityKind::ComplianceEvent => "compliance_events",
        }
    }

    /// Graph node label for this kind
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Entity => "Entity",
            EntityKind::Institution => "Institution",
            EntityKind::Subsidiary => "Subsidiary",
            EntityKind::Address => "Address",
            EntityKind::BeneficialOwner => "BeneficialOwner",
            EntityKind::RiskAssessment => "RiskAssessment",
            EntityKind::AuthorizedPerson => "AuthorizedPerson",
            EntityKind::Document => "Document",
            EntityKind::JurisdictionPresence => "JurisdictionPresence",
            EntityKind::Account => "Account",
            EntityKind::Transaction => "Transaction",
            EntityKind::ComplianceEvent => "ComplianceEvent",
        }
    }

    /// Primary-key column (relational) and key property (graph)
    pub fn key_field(&self) -> &'static str {
        match self {
            EntityKind::Entity => "entity_id",
            EntityKind::Institution => "institution_id",
            EntityKind::Subsidiary => "subsidiary_id",
            EntityKind::Address => "address_id",
            EntityKind::BeneficialOwner => "owner_id",
            EntityKind::RiskAssessment => "assessment_id",
            EntityKind::AuthorizedPerson => "person_id",
            EntityKind::Document => "document_id",
            EntityKind::JurisdictionPresence => "presence_id",
            EntityKind::Account => "account_id",
            EntityKind::Transaction => "transaction_id",
            EntityKind::ComplianceEvent => "event_id",
        }
    }

    /// Position in [`EntityKind::WRITE_ORDER`]
    pub fn write_rank(&self) -> usize {
        EntityKind::WRITE_ORDER
            .iter()
            .position(|k| k == self)
            .unwrap_or(EntityKind::WRITE_ORDER.len())
    }

    /// Satellite kinds reference an entity through `entity_id` + `entity_type`
    pub fn is_satellite(&self) -> bool {
        !matches!(
            self,
            EntityKind::Entity | EntityKind::Institution | EntityKind::Subsidiary
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::WRITE_ORDER
            .iter()
            .find(|k| k.as_str() == s || k.table_name() == s)
            .copied()
            .ok_or_else(|| UnknownVariant {
                vocabulary: "entity kind",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_order_parents_first() {
        let rank = |k: EntityKind| k.write_rank();
        assert!(rank(EntityKind::Entity) < rank(EntityKind::Institution));
        assert!(rank(EntityKind::Institution) < rank(EntityKind::Subsidiary));
        assert!(rank(EntityKind::Subsidiary) < rank(EntityKind::Address));
        assert!(rank(EntityKind::JurisdictionPresence) < rank(EntityKind::Account));
        assert!(rank(EntityKind::Account) < rank(EntityKind::Transaction));
        assert!(rank(EntityKind::Transaction) < rank(EntityKind::ComplianceEvent));
    }

    #[test]
    fn test_parse_by_name_or_table() {
        assert_eq!("beneficial_owner".parse::<EntityKind>().unwrap(), EntityKind::BeneficialOwner);
        assert_eq!("beneficial_owners".parse::<EntityKind>().unwrap(), EntityKind::BeneficialOwner);
        assert!("owners".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_satellites() {
        assert!(!EntityKind::Institution.is_satellite());
        assert!(EntityKind::Account.is_satellite());
        assert!(EntityKind::ComplianceEvent.is_satellite());
    }
}
