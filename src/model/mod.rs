//! Domain data model
//!
//! - [`EntityKind`]: the twelve record kinds and their write order
//! - [`Record`]: tagged union over the per-kind record structs
//! - [`Row`]: flat column view shared by validation, both stores and the CSV export

pub mod enums;
pub mod kind;
pub mod records;
pub mod row;

pub use enums::{
    AccountType, BusinessType, ComplianceEventType, OperationalStatus, OwnerType, RiskRating,
    TransactionStatus, TransactionType, UnknownVariant,
};
pub use kind::EntityKind;
pub use records::{
    Account, Address, AuthorizedPerson, BeneficialOwner, ComplianceEvent, ContactInfo,
    CustomerInfo, Document, Entity, EntityRef, FinancialMetrics, GeoCoordinates, Institution,
    JurisdictionPresence, Percentage, Record, RiskAssessment, RiskFactors, Subsidiary,
    Transaction,
};
pub use row::{FieldValue, Row, DATE_FORMAT, TIMESTAMP_FORMAT};
