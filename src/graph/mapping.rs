//! Record-to-graph mapping
//!
//! Every record becomes one node keyed by its primary key, plus the
//! relationships listed for its kind. Relationship endpoints that belong to an
//! earlier kind in the write order must already exist; `Country` and
//! `BusinessDate` endpoints are merged on demand.

use chrono::NaiveDate;

use super::property::{properties_from_row, PropertyMap, PropertyValue};
use super::types::{EdgeType, Label};
use crate::model::{EntityKind, EntityRef, OwnerType, Record, DATE_FORMAT};

pub const COUNTRY: &str = "Country";
pub const COUNTRY_KEY: &str = "code";
pub const BUSINESS_DATE: &str = "BusinessDate";
pub const BUSINESS_DATE_KEY: &str = "date";

/// Relationship type names
pub mod rel {
    pub const IS_ENTITY: &str = "IS_ENTITY";
    pub const INCORPORATED_IN: &str = "INCORPORATED_IN";
    pub const INCORPORATED_ON: &str = "INCORPORATED_ON";
    pub const OWNS_SUBSIDIARY: &str = "OWNS_SUBSIDIARY";
    pub const ACQUIRED_ON: &str = "ACQUIRED_ON";
    pub const HAS_ADDRESS: &str = "HAS_ADDRESS";
    pub const LOCATED_IN: &str = "LOCATED_IN";
    pub const OWNED_BY: &str = "OWNED_BY";
    pub const CITIZEN_OF: &str = "CITIZEN_OF";
    pub const HAS_RISK_ASSESSMENT: &str = "HAS_RISK_ASSESSMENT";
    pub const ASSESSED_ON: &str = "ASSESSED_ON";
    pub const HAS_AUTHORIZED_PERSON: &str = "HAS_AUTHORIZED_PERSON";
    pub const HAS_DOCUMENT: &str = "HAS_DOCUMENT";
    pub const ISSUED_IN: &str = "ISSUED_IN";
    pub const ISSUED_ON: &str = "ISSUED_ON";
    pub const HAS_PRESENCE: &str = "HAS_PRESENCE";
    pub const IN_JURISDICTION: &str = "IN_JURISDICTION";
    pub const HAS_ACCOUNT: &str = "HAS_ACCOUNT";
    pub const OPENED_ON: &str = "OPENED_ON";
    pub const BELONGS_TO: &str = "BELONGS_TO";
    pub const SENT: &str = "SENT";
    pub const RECEIVED: &str = "RECEIVED";
    pub const OCCURRED_ON: &str = "OCCURRED_ON";
    pub const HAS_COMPLIANCE_EVENT: &str = "HAS_COMPLIANCE_EVENT";
    pub const RELATED_TO: &str = "RELATED_TO";
}

/// A node addressed by its label and unique key
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKey {
    pub label: Label,
    pub key: &'static str,
    pub value: String,
}

impl NodeKey {
    pub fn new(label: &str, key: &'static str, value: impl Into<String>) -> Self {
        NodeKey {
            label: Label::new(label),
            key,
            value: value.into(),
        }
    }

    fn of_owner(entity: &EntityRef) -> Self {
        let key = match entity.owner_type {
            OwnerType::Institution => EntityKind::Institution.key_field(),
            OwnerType::Subsidiary => EntityKind::Subsidiary.key_field(),
        };
        NodeKey::new(entity.owner_type.label(), key, entity.id.to_string())
    }

    fn of_kind(kind: EntityKind, id: uuid::Uuid) -> Self {
        NodeKey::new(kind.label(), kind.key_field(), id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EndpointMode {
    /// Must already exist; a missing node fails the record
    Existing,
    /// Created from its key when absent
    Merge,
}

/// Direction relative to the record's own node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `(record)-[r]->(other)`
    Outgoing,
    /// `(other)-[r]->(record)`
    Incoming,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipWrite {
    pub rel_type: EdgeType,
    pub direction: Direction,
    pub other: NodeKey,
    pub mode: EndpointMode,
    pub properties: PropertyMap,
}

/// Node plus relationships for one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordWrite {
    pub node: NodeKey,
    pub properties: PropertyMap,
    pub relationships: Vec<RelationshipWrite>,
}

impl RecordWrite {
    fn new(record: &Record) -> Self {
        let kind = record.kind();
        RecordWrite {
            node: NodeKey::of_kind(kind, record.id()),
            properties: properties_from_row(&record.to_row()),
            relationships: Vec::new(),
        }
    }

    fn link(mut self, rel_type: &str, direction: Direction, other: NodeKey) -> Self {
        self.relationships.push(RelationshipWrite {
            rel_type: EdgeType::new(rel_type),
            direction,
            other,
            mode: EndpointMode::Existing,
            properties: PropertyMap::new(),
        });
        self
    }

    fn link_with(
        mut self,
        rel_type: &str,
        direction: Direction,
        other: NodeKey,
        properties: PropertyMap,
    ) -> Self {
        self = self.link(rel_type, direction, other);
        if let Some(last) = self.relationships.last_mut() {
            last.properties = properties;
        }
        self
    }

    fn country(mut self, rel_type: &str, code: &str, properties: PropertyMap) -> Self {
        self.relationships.push(RelationshipWrite {
            rel_type: EdgeType::new(rel_type),
            direction: Direction::Outgoing,
            other: NodeKey::new(COUNTRY, COUNTRY_KEY, code),
            mode: EndpointMode::Merge,
            properties,
        });
        self
    }

    fn business_date(mut self, rel_type: &str, date: NaiveDate) -> Self {
        self.relationships.push(RelationshipWrite {
            rel_type: EdgeType::new(rel_type),
            direction: Direction::Outgoing,
            other: NodeKey::new(BUSINESS_DATE, BUSINESS_DATE_KEY, date.format(DATE_FORMAT).to_string()),
            mode: EndpointMode::Merge,
            properties: PropertyMap::new(),
        });
        self
    }
}

impl RelationshipWrite {
    /// Properties of a merge-created endpoint node
    pub fn endpoint_properties(&self) -> PropertyMap {
        let value = if self.other.label.as_str() == BUSINESS_DATE {
            NaiveDate::parse_from_str(&self.other.value, DATE_FORMAT)
                .map(PropertyValue::Date)
                .unwrap_or_else(|_| PropertyValue::String(self.other.value.clone()))
        } else {
            PropertyValue::String(self.other.value.clone())
        };
        let mut props = PropertyMap::new();
        props.insert(self.other.key.to_string(), value);
        props
    }
}

fn props(pairs: Vec<(&str, PropertyValue)>) -> PropertyMap {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Node and relationships for `record`
pub fn record_write(record: &Record) -> RecordWrite {
    use Direction::{Incoming, Outgoing};

    let write = RecordWrite::new(record);
    match record {
        Record::Entity(_) => write,
        Record::Institution(r) => write
            .link(
                rel::IS_ENTITY,
                Outgoing,
                NodeKey::of_kind(EntityKind::Entity, r.institution_id),
            )
            .country(
                rel::INCORPORATED_IN,
                &r.incorporation_country,
                props(vec![("date", r.incorporation_date.into())]),
            )
            .business_date(rel::INCORPORATED_ON, r.incorporation_date),
        Record::Subsidiary(r) => write
            .link(
                rel::IS_ENTITY,
                Outgoing,
                NodeKey::of_kind(EntityKind::Entity, r.subsidiary_id),
            )
            .link_with(
                rel::OWNS_SUBSIDIARY,
                Incoming,
                NodeKey::of_kind(EntityKind::Institution, r.parent_institution_id),
                props(vec![
                    (
                        "ownership_percentage",
                        r.parent_ownership_percentage.as_f64().into(),
                    ),
                    ("acquisition_date", r.acquisition_date.into()),
                ]),
            )
            .country(
                rel::INCORPORATED_IN,
                &r.incorporation_country,
                props(vec![("date", r.incorporation_date.into())]),
            )
            .business_date(rel::ACQUIRED_ON, r.acquisition_date),
        Record::Address(r) => write
            .link(rel::HAS_ADDRESS, Incoming, NodeKey::of_owner(&r.entity))
            .country(rel::LOCATED_IN, &r.country, PropertyMap::new()),
        Record::BeneficialOwner(r) => write
            .link_with(
                rel::OWNED_BY,
                Incoming,
                NodeKey::of_owner(&r.entity),
                props(vec![(
                    "ownership_percentage",
                    r.ownership_percentage.as_f64().into(),
                )]),
            )
            .country(rel::CITIZEN_OF, &r.nationality, PropertyMap::new()),
        Record::RiskAssessment(r) => write
            .link(rel::HAS_RISK_ASSESSMENT, Incoming, NodeKey::of_owner(&r.entity))
            .business_date(rel::ASSESSED_ON, r.assessment_date),
        Record::AuthorizedPerson(r) => {
            write.link(rel::HAS_AUTHORIZED_PERSON, Incoming, NodeKey::of_owner(&r.entity))
        }
        Record::Document(r) => write
            .link(rel::HAS_DOCUMENT, Incoming, NodeKey::of_owner(&r.entity))
            .country(rel::ISSUED_IN, &r.issuing_country, PropertyMap::new())
            .business_date(rel::ISSUED_ON, r.issue_date),
        Record::JurisdictionPresence(r) => write
            .link(rel::HAS_PRESENCE, Incoming, NodeKey::of_owner(&r.entity))
            .country(rel::IN_JURISDICTION, &r.jurisdiction, PropertyMap::new()),
        Record::Account(r) => write
            .link(rel::HAS_ACCOUNT, Incoming, NodeKey::of_owner(&r.entity))
            .business_date(rel::OPENED_ON, r.opening_date),
        Record::Transaction(r) => {
            let account = NodeKey::of_kind(EntityKind::Account, r.account_id);
            let write = write.link(rel::BELONGS_TO, Outgoing, account.clone());
            let write = if r.is_debit {
                write.link(rel::SENT, Incoming, account)
            } else {
                write.link(rel::RECEIVED, Outgoing, account)
            };
            write.business_date(rel::OCCURRED_ON, r.transaction_date)
        }
        Record::ComplianceEvent(r) => write
            .link(rel::HAS_COMPLIANCE_EVENT, Incoming, NodeKey::of_owner(&r.entity))
            .link(
                rel::RELATED_TO,
                Outgoing,
                NodeKey::of_kind(EntityKind::Account, r.related_account_id),
            )
            .business_date(rel::OCCURRED_ON, r.event_date),
    }
}

/// Unique key per label: every kind plus the shared reference nodes
pub fn constraints() -> Vec<(Label, &'static str)> {
    EntityKind::WRITE_ORDER
        .iter()
        .map(|kind| (Label::new(kind.label()), kind.key_field()))
        .chain([
            (Label::new(COUNTRY), COUNTRY_KEY),
            (Label::new(BUSINESS_DATE), BUSINESS_DATE_KEY),
        ])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{FactorySettings, OwnerContext, RecordFactory};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn factory() -> RecordFactory<StdRng> {
        RecordFactory::new(StdRng::seed_from_u64(21), FactorySettings::default())
    }

    fn types(write: &RecordWrite) -> Vec<&str> {
        write.relationships.iter().map(|r| r.rel_type.as_str()).collect()
    }

    #[test]
    fn test_subsidiary_mapping() {
        let mut factory = factory();
        let institution = factory.institution().unwrap();
        let subsidiary = factory.subsidiary(&institution).unwrap();
        let write = record_write(&Record::Subsidiary(subsidiary.clone()));

        assert_eq!(write.node.label, Label::new("Subsidiary"));
        assert_eq!(write.node.value, subsidiary.subsidiary_id.to_string());
        assert_eq!(
            types(&write),
            vec![rel::IS_ENTITY, rel::OWNS_SUBSIDIARY, rel::INCORPORATED_IN, rel::ACQUIRED_ON]
        );

        let owns = &write.relationships[1];
        assert_eq!(owns.direction, Direction::Incoming);
        assert_eq!(owns.mode, EndpointMode::Existing);
        assert_eq!(owns.other.value, institution.institution_id.to_string());
        assert!(owns.properties.contains_key("ownership_percentage"));
        assert_eq!(
            owns.properties.get("acquisition_date").and_then(|v| v.as_date()),
            Some(subsidiary.acquisition_date)
        );
    }

    #[test]
    fn test_transaction_side_follows_debit_flag() {
        let mut factory = factory();
        let institution = factory.institution().unwrap();
        let owner = OwnerContext::for_institution(&institution);
        let account = factory.account(&owner).unwrap();
        let mut tx = factory.transaction(&owner, &account).unwrap();

        tx.is_debit = true;
        let write = record_write(&Record::Transaction(tx.clone()));
        assert_eq!(types(&write), vec![rel::BELONGS_TO, rel::SENT, rel::OCCURRED_ON]);
        assert_eq!(write.relationships[1].direction, Direction::Incoming);

        tx.is_debit = false;
        let write = record_write(&Record::Transaction(tx));
        assert_eq!(types(&write), vec![rel::BELONGS_TO, rel::RECEIVED, rel::OCCURRED_ON]);
        assert_eq!(write.relationships[1].direction, Direction::Outgoing);
    }

    #[test]
    fn test_satellite_owner_and_merge_endpoints() {
        let mut factory = factory();
        let institution = factory.institution().unwrap();
        let owner = OwnerContext::for_institution(&institution);
        let document = factory.document(&owner);
        let write = record_write(&Record::Document(document.clone()));

        let has = &write.relationships[0];
        assert_eq!(has.other.label, Label::new("Institution"));
        assert_eq!(has.other.key, "institution_id");

        let issued_on = &write.relationships[2];
        assert_eq!(issued_on.mode, EndpointMode::Merge);
        assert_eq!(
            issued_on.endpoint_properties().get(BUSINESS_DATE_KEY).and_then(|v| v.as_date()),
            Some(document.issue_date)
        );
    }

    #[test]
    fn test_null_columns_are_not_properties() {
        let mut factory = factory();
        let institution = factory.institution().unwrap();
        let entity = factory.institution_entity(&institution);
        let write = record_write(&Record::Entity(entity));
        assert!(!write.properties.contains_key("parent_entity_id"));
        assert!(write.relationships.is_empty());
    }

    #[test]
    fn test_constraints_cover_every_label() {
        let constraints = constraints();
        assert_eq!(constraints.len(), EntityKind::WRITE_ORDER.len() + 2);
        assert!(constraints.contains(&(Label::new("Country"), "code")));
    }
}
