//! Record types for every entity kind
//!
//! Each kind is a plain struct; [`Record`] is the tagged union the pipeline moves
//! around. Optional groups that must be all-or-nothing are modelled as a single
//! `Option` of a struct (see [`CustomerInfo`]).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use uuid::Uuid;

use super::enums::{
    AccountType, BusinessType, ComplianceEventType, OperationalStatus, OwnerType, RiskRating,
    TransactionStatus, TransactionType,
};
use super::kind::EntityKind;
use super::row::Row;

/// A percentage held as integer hundredths so that splits sum exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Percentage(u32);

impl Percentage {
    /// 100.00%
    pub const FULL: Percentage = Percentage(10_000);

    pub fn from_hundredths(hundredths: u32) -> Self {
        Percentage(hundredths)
    }

    /// Rounds to the nearest hundredth of a percent; negative input clamps to zero
    pub fn from_f64(value: f64) -> Self {
        Percentage((value * 100.0).round().max(0.0) as u32)
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Percentage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Percentage::from_f64)
    }
}

/// Owning entity of a satellite record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub id: Uuid,
    pub owner_type: OwnerType,
}

/// Polymorphic root for institutions and subsidiaries
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_id: Uuid,
    pub entity_type: OwnerType,
    /// Set for subsidiaries only
    pub parent_entity_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Reserved for consumers; never set by the generator
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    pub institution_id: Uuid,
    pub legal_name: String,
    pub business_type: BusinessType,
    pub incorporation_country: String,
    pub incorporation_date: NaiveDate,
    pub onboarding_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub operational_status: OperationalStatus,
    pub primary_currency: String,
    pub regulatory_status: String,
    pub primary_business_activity: String,
    pub primary_regulator: String,
    pub licenses: Vec<String>,
    pub aml_program_status: String,
    pub kyc_refresh_date: NaiveDate,
    pub last_audit_date: NaiveDate,
    pub next_audit_date: NaiveDate,
    pub relationship_manager: String,
    pub relationship_status: String,
    pub swift_code: String,
    pub lei_code: String,
    pub tax_id: String,
    pub website: String,
    pub primary_contact_name: String,
    pub primary_contact_email: String,
    pub primary_contact_phone: String,
    pub annual_revenue: f64,
    pub employee_count: i64,
    pub year_established: i32,
    pub customer_status: String,
    pub last_review_date: NaiveDate,
    pub industry_codes: Vec<String>,
    pub public_company: bool,
    pub stock_symbol: Option<String>,
    pub stock_exchange: Option<String>,
}

/// Customer relationship of a subsidiary; present iff the subsidiary is a customer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerInfo {
    pub customer_id: Uuid,
    pub onboarding_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinancialMetrics {
    pub revenue: f64,
    pub profit_margin: f64,
    pub asset_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subsidiary {
    pub subsidiary_id: Uuid,
    pub parent_institution_id: Uuid,
    pub legal_name: String,
    pub tax_id: String,
    pub incorporation_country: String,
    pub incorporation_date: NaiveDate,
    pub acquisition_date: NaiveDate,
    pub business_type: BusinessType,
    pub operational_status: OperationalStatus,
    pub parent_ownership_percentage: Percentage,
    pub consolidation_status: String,
    pub capital_investment: f64,
    pub functional_currency: String,
    pub material_subsidiary: bool,
    pub risk_classification: RiskRating,
    pub regulatory_status: String,
    pub local_licenses: Vec<String>,
    pub integration_status: String,
    pub financial_metrics: FinancialMetrics,
    pub reporting_frequency: String,
    pub requires_local_audit: bool,
    pub corporate_governance_model: String,
    pub is_regulated: bool,
    pub industry_codes: Vec<String>,
    pub customer: Option<CustomerInfo>,
}

impl Subsidiary {
    pub fn is_customer(&self) -> bool {
        self.customer.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub address_id: Uuid,
    pub entity: EntityRef,
    pub address_type: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state_province: String,
    pub postal_code: String,
    pub country: String,
    pub status: String,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub primary_address: bool,
    pub validation_status: String,
    pub last_verified: NaiveDate,
    pub geo_coordinates: GeoCoordinates,
    pub timezone: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeneficialOwner {
    pub owner_id: Uuid,
    pub entity: EntityRef,
    pub name: String,
    pub nationality: String,
    pub country_of_residence: String,
    pub ownership_percentage: Percentage,
    pub dob: NaiveDate,
    pub verification_date: NaiveDate,
    pub pep_status: bool,
    pub sanctions_status: bool,
    pub adverse_media_status: bool,
    pub verification_source: String,
    pub notes: Option<String>,
}

/// Five risk factors, each scored 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskFactors {
    pub geographic: u8,
    pub product: u8,
    pub client: u8,
    pub transaction: u8,
    pub delivery_channel: u8,
}

impl RiskFactors {
    pub fn scores(&self) -> [u8; 5] {
        [
            self.geographic,
            self.product,
            self.client,
            self.transaction,
            self.delivery_channel,
        ]
    }

    pub fn mean(&self) -> f64 {
        let scores = self.scores();
        scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub assessment_id: Uuid,
    pub entity: EntityRef,
    pub assessment_date: NaiveDate,
    pub risk_rating: RiskRating,
    pub risk_score: f64,
    pub assessment_type: String,
    pub risk_factors: RiskFactors,
    pub conducted_by: String,
    pub approved_by: String,
    pub findings: String,
    pub assessor: String,
    pub next_review_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    pub office: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizedPerson {
    pub person_id: Uuid,
    pub entity: EntityRef,
    pub name: String,
    pub title: String,
    pub authorization_level: String,
    pub authorization_type: String,
    pub authorization_start: NaiveDate,
    pub authorization_end: Option<NaiveDate>,
    pub contact_info: ContactInfo,
    pub is_active: bool,
    pub last_verification_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub document_id: Uuid,
    pub entity: EntityRef,
    pub document_type: String,
    pub document_number: String,
    pub issuing_authority: String,
    pub issuing_country: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub verification_status: String,
    pub verification_date: NaiveDate,
    pub document_category: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JurisdictionPresence {
    pub presence_id: Uuid,
    pub entity: EntityRef,
    pub jurisdiction: String,
    pub registration_date: NaiveDate,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub status: String,
    pub local_registration_id: String,
    pub local_registration_date: NaiveDate,
    pub local_registration_authority: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: Uuid,
    pub entity: EntityRef,
    pub account_type: AccountType,
    pub account_number: String,
    pub currency: String,
    pub status: String,
    pub opening_date: NaiveDate,
    pub balance: f64,
    pub risk_rating: RiskRating,
    pub last_activity_date: NaiveDate,
    pub purpose: String,
    pub average_monthly_balance: f64,
    pub custodian_bank: String,
    pub account_officer: String,
    pub custodian_country: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub value_date: NaiveDate,
    pub amount: f64,
    pub currency: String,
    pub transaction_status: TransactionStatus,
    pub is_debit: bool,
    /// Owning account; equals either the debit or the credit side
    pub account_id: Uuid,
    pub debit_account_id: Uuid,
    pub credit_account_id: Uuid,
    pub entity: EntityRef,
    pub counterparty_account: String,
    pub counterparty_name: String,
    pub counterparty_bank: String,
    pub originating_country: String,
    pub destination_country: String,
    pub purpose: String,
    pub reference_number: String,
    pub screening_alert: bool,
    pub risk_score: Option<i64>,
    pub processing_fee: f64,
    pub exchange_rate: f64,
    pub batch_id: Option<Uuid>,
    pub check_number: Option<String>,
    pub wire_reference: Option<String>,
}

impl Transaction {
    /// The side of the pair that is not the owning account
    pub fn counterparty_side(&self) -> Uuid {
        if self.is_debit {
            self.credit_account_id
        } else {
            self.debit_account_id
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceEvent {
    pub event_id: Uuid,
    pub entity: EntityRef,
    pub event_date: NaiveDate,
    pub event_type: ComplianceEventType,
    pub event_description: String,
    pub old_state: Option<String>,
    pub new_state: String,
    pub decision: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub decision_maker: String,
    pub next_review_date: NaiveDate,
    pub related_account_id: Uuid,
    pub notes: Option<String>,
}

/// One generated record of any kind
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Entity(Entity),
    Institution(Institution),
    Subsidiary(Subsidiary),
    Address(Address),
    BeneficialOwner(BeneficialOwner),
    RiskAssessment(RiskAssessment),
    AuthorizedPerson(AuthorizedPerson),
    Document(Document),
    JurisdictionPresence(JurisdictionPresence),
    Account(Account),
    Transaction(Transaction),
    ComplianceEvent(ComplianceEvent),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Entity(_) => EntityKind::Entity,
            Record::Institution(_) => EntityKind::Institution,
            Record::Subsidiary(_) => EntityKind::Subsidiary,
            Record::Address(_) => EntityKind::Address,
            Record::BeneficialOwner(_) => EntityKind::BeneficialOwner,
            Record::RiskAssessment(_) => EntityKind::RiskAssessment,
            Record::AuthorizedPerson(_) => EntityKind::AuthorizedPerson,
            Record::Document(_) => EntityKind::Document,
            Record::JurisdictionPresence(_) => EntityKind::JurisdictionPresence,
            Record::Account(_) => EntityKind::Account,
            Record::Transaction(_) => EntityKind::Transaction,
            Record::ComplianceEvent(_) => EntityKind::ComplianceEvent,
        }
    }

    /// Primary key of the record
    pub fn id(&self) -> Uuid {
        match self {
            Record::Entity(r) => r.entity_id,
            Record::Institution(r) => r.institution_id,
            Record::Subsidiary(r) => r.subsidiary_id,
            Record::Address(r) => r.address_id,
            Record::BeneficialOwner(r) => r.owner_id,
            Record::RiskAssessment(r) => r.assessment_id,
            Record::AuthorizedPerson(r) => r.person_id,
            Record::Document(r) => r.document_id,
            Record::JurisdictionPresence(r) => r.presence_id,
            Record::Account(r) => r.account_id,
            Record::Transaction(r) => r.transaction_id,
            Record::ComplianceEvent(r) => r.event_id,
        }
    }

    /// Owning entity for satellite kinds
    pub fn owner(&self) -> Option<EntityRef> {
        match self {
            Record::Entity(_) | Record::Institution(_) | Record::Subsidiary(_) => None,
            Record::Address(r) => Some(r.entity),
            Record::BeneficialOwner(r) => Some(r.entity),
            Record::RiskAssessment(r) => Some(r.entity),
            Record::AuthorizedPerson(r) => Some(r.entity),
            Record::Document(r) => Some(r.entity),
            Record::JurisdictionPresence(r) => Some(r.entity),
            Record::Account(r) => Some(r.entity),
            Record::Transaction(r) => Some(r.entity),
            Record::ComplianceEvent(r) => Some(r.entity),
        }
    }

    /// Flat column view of the record
    pub fn to_row(&self) -> Row {
        match self {
            Record::Entity(r) => r.to_row(),
            Record::Institution(r) => r.to_row(),
            Record::Subsidiary(r) => r.to_row(),
            Record::Address(r) => r.to_row(),
            Record::BeneficialOwner(r) => r.to_row(),
            Record::RiskAssessment(r) => r.to_row(),
            Record::AuthorizedPerson(r) => r.to_row(),
            Record::Document(r) => r.to_row(),
            Record::JurisdictionPresence(r) => r.to_row(),
            Record::Account(r) => r.to_row(),
            Record::Transaction(r) => r.to_row(),
            Record::ComplianceEvent(r) => r.to_row(),
        }
    }
}

fn owned_row(id_column: &'static str, id: Uuid, entity: &EntityRef) -> Row {
    Row::new()
        .text(id_column, id.to_string())
        .text("entity_id", entity.id.to_string())
        .text("entity_type", entity.owner_type.as_str())
}

impl Entity {
    pub fn to_row(&self) -> Row {
        Row::new()
            .text("entity_id", self.entity_id.to_string())
            .text("entity_type", self.entity_type.as_str())
            .opt_text(
                "parent_entity_id",
                self.parent_entity_id.map(|id| id.to_string()).as_deref(),
            )
            .timestamp("created_at", self.created_at)
            .timestamp("updated_at", self.updated_at)
            .opt_timestamp("deleted_at", self.deleted_at)
    }
}

impl Institution {
    pub fn to_row(&self) -> Row {
        Row::new()
            .text("institution_id", self.institution_id.to_string())
            .text("legal_name", self.legal_name.as_str())
            .text("business_type", self.business_type.as_str())
            .text("incorporation_country", self.incorporation_country.as_str())
            .date("incorporation_date", self.incorporation_date)
            .date("onboarding_date", self.onboarding_date)
            .text("risk_rating", self.risk_rating.as_str())
            .text("operational_status", self.operational_status.as_str())
            .text("primary_currency", self.primary_currency.as_str())
            .text("regulatory_status", self.regulatory_status.as_str())
            .text("primary_business_activity", self.primary_business_activity.as_str())
            .text("primary_regulator", self.primary_regulator.as_str())
            .json("licenses", json!(self.licenses))
            .text("aml_program_status", self.aml_program_status.as_str())
            .date("kyc_refresh_date", self.kyc_refresh_date)
            .date("last_audit_date", self.last_audit_date)
            .date("next_audit_date", self.next_audit_date)
            .text("relationship_manager", self.relationship_manager.as_str())
            .text("relationship_status", self.relationship_status.as_str())
            .text("swift_code", self.swift_code.as_str())
            .text("lei_code", self.lei_code.as_str())
            .text("tax_id", self.tax_id.as_str())
            .text("website", self.website.as_str())
            .text("primary_contact_name", self.primary_contact_name.as_str())
            .text("primary_contact_email", self.primary_contact_email.as_str())
            .text("primary_contact_phone", self.primary_contact_phone.as_str())
            .real("annual_revenue", self.annual_revenue)
            .integer("employee_count", self.employee_count)
            .integer("year_established", i64::from(self.year_established))
            .text("customer_status", self.customer_status.as_str())
            .date("last_review_date", self.last_review_date)
            .json("industry_codes", json!(self.industry_codes))
            .boolean("public_company", self.public_company)
            .opt_text("stock_symbol", self.stock_symbol.as_deref())
            .opt_text("stock_exchange", self.stock_exchange.as_deref())
    }
}

impl Subsidiary {
    pub fn to_row(&self) -> Row {
        let customer = self.customer.as_ref();
        Row::new()
            .text("subsidiary_id", self.subsidiary_id.to_string())
            .text("parent_institution_id", self.parent_institution_id.to_string())
            .text("legal_name", self.legal_name.as_str())
            .text("tax_id", self.tax_id.as_str())
            .text("incorporation_country", self.incorporation_country.as_str())
            .date("incorporation_date", self.incorporation_date)
            .date("acquisition_date", self.acquisition_date)
            .text("business_type", self.business_type.as_str())
            .text("operational_status", self.operational_status.as_str())
            .real("parent_ownership_percentage", self.parent_ownership_percentage.as_f64())
            .text("consolidation_status", self.consolidation_status.as_str())
            .real("capital_investment", self.capital_investment)
            .text("functional_currency", self.functional_currency.as_str())
            .boolean("material_subsidiary", self.material_subsidiary)
            .text("risk_classification", self.risk_classification.as_str())
            .text("regulatory_status", self.regulatory_status.as_str())
            .json("local_licenses", json!(self.local_licenses))
            .text("integration_status", self.integration_status.as_str())
            .json(
                "financial_metrics",
                json!({
                    "revenue": self.financial_metrics.revenue,
                    "profit_margin": self.financial_metrics.profit_margin,
                    "asset_value": self.financial_metrics.asset_value,
                }),
            )
            .text("reporting_frequency", self.reporting_frequency.as_str())
            .boolean("requires_local_audit", self.requires_local_audit)
            .text("corporate_governance_model", self.corporate_governance_model.as_str())
            .boolean("is_regulated", self.is_regulated)
            .json("industry_codes", json!(self.industry_codes))
            .boolean("is_customer", self.is_customer())
            .opt_text(
                "customer_id",
                customer.map(|c| c.customer_id.to_string()).as_deref(),
            )
            .opt_date("customer_onboarding_date", customer.map(|c| c.onboarding_date))
            .opt_text("customer_risk_rating", customer.map(|c| c.risk_rating.as_str()))
            .opt_text("customer_status", customer.map(|c| c.status.as_str()))
    }
}

impl Address {
    pub fn to_row(&self) -> Row {
        owned_row("address_id", self.address_id, &self.entity)
            .text("address_type", self.address_type.as_str())
            .text("address_line1", self.address_line1.as_str())
            .opt_text("address_line2", self.address_line2.as_deref())
            .text("city", self.city.as_str())
            .text("state_province", self.state_province.as_str())
            .text("postal_code", self.postal_code.as_str())
            .text("country", self.country.as_str())
            .text("status", self.status.as_str())
            .date("effective_from", self.effective_from)
            .opt_date("effective_to", self.effective_to)
            .boolean("primary_address", self.primary_address)
            .text("validation_status", self.validation_status.as_str())
            .date("last_verified", self.last_verified)
            .json(
                "geo_coordinates",
                json!({
                    "latitude": self.geo_coordinates.latitude,
                    "longitude": self.geo_coordinates.longitude,
                }),
            )
            .text("timezone", self.timezone.as_str())
    }
}

impl BeneficialOwner {
    pub fn to_row(&self) -> Row {
        owned_row("owner_id", self.owner_id, &self.entity)
            .text("name", self.name.as_str())
            .text("nationality", self.nationality.as_str())
            .text("country_of_residence", self.country_of_residence.as_str())
            .real("ownership_percentage", self.ownership_percentage.as_f64())
            .date("dob", self.dob)
            .date("verification_date", self.verification_date)
            .boolean("pep_status", self.pep_status)
            .boolean("sanctions_status", self.sanctions_status)
            .boolean("adverse_media_status", self.adverse_media_status)
            .text("verification_source", self.verification_source.as_str())
            .opt_text("notes", self.notes.as_deref())
    }
}

impl RiskAssessment {
    pub fn to_row(&self) -> Row {
        let f = &self.risk_factors;
        owned_row("assessment_id", self.assessment_id, &self.entity)
            .date("assessment_date", self.assessment_date)
            .text("risk_rating", self.risk_rating.as_str())
            .real("risk_score", self.risk_score)
            .text("assessment_type", self.assessment_type.as_str())
            .json(
                "risk_factors",
                json!({
                    "geographic": f.geographic,
                    "product": f.product,
                    "client": f.client,
                    "transaction": f.transaction,
                    "delivery_channel": f.delivery_channel,
                }),
            )
            .text("conducted_by", self.conducted_by.as_str())
            .text("approved_by", self.approved_by.as_str())
            .text("findings", self.findings.as_str())
            .text("assessor", self.assessor.as_str())
            .date("next_review_date", self.next_review_date)
            .opt_text("notes", self.notes.as_deref())
    }
}

impl AuthorizedPerson {
    pub fn to_row(&self) -> Row {
        owned_row("person_id", self.person_id, &self.entity)
            .text("name", self.name.as_str())
            .text("title", self.title.as_str())
            .text("authorization_level", self.authorization_level.as_str())
            .text("authorization_type", self.authorization_type.as_str())
            .date("authorization_start", self.authorization_start)
            .opt_date("authorization_end", self.authorization_end)
            .json(
                "contact_info",
                json!({
                    "email": self.contact_info.email,
                    "phone": self.contact_info.phone,
                    "office": self.contact_info.office,
                }),
            )
            .boolean("is_active", self.is_active)
            .date("last_verification_date", self.last_verification_date)
    }
}

impl Document {
    pub fn to_row(&self) -> Row {
        owned_row("document_id", self.document_id, &self.entity)
            .text("document_type", self.document_type.as_str())
            .text("document_number", self.document_number.as_str())
            .text("issuing_authority", self.issuing_authority.as_str())
            .text("issuing_country", self.issuing_country.as_str())
            .date("issue_date", self.issue_date)
            .date("expiry_date", self.expiry_date)
            .text("verification_status", self.verification_status.as_str())
            .date("verification_date", self.verification_date)
            .text("document_category", self.document_category.as_str())
            .opt_text("notes", self.notes.as_deref())
    }
}

impl JurisdictionPresence {
    pub fn to_row(&self) -> Row {
        owned_row("presence_id", self.presence_id, &self.entity)
            .text("jurisdiction", self.jurisdiction.as_str())
            .date("registration_date", self.registration_date)
            .date("effective_from", self.effective_from)
            .opt_date("effective_to", self.effective_to)
            .text("status", self.status.as_str())
            .text("local_registration_id", self.local_registration_id.as_str())
            .date("local_registration_date", self.local_registration_date)
            .text(
                "local_registration_authority",
                self.local_registration_authority.as_str(),
            )
            .opt_text("notes", self.notes.as_deref())
    }
}

impl Account {
    pub fn to_row(&self) -> Row {
        owned_row("account_id", self.account_id, &self.entity)
            .text("account_type", self.account_type.as_str())
            .text("account_number", self.account_number.as_str())
            .text("currency", self.currency.as_str())
            .text("status", self.status.as_str())
            .date("opening_date", self.opening_date)
            .real("balance", self.balance)
            .text("risk_rating", self.risk_rating.as_str())
            .date("last_activity_date", self.last_activity_date)
            .text("purpose", self.purpose.as_str())
            .real("average_monthly_balance", self.average_monthly_balance)
            .text("custodian_bank", self.custodian_bank.as_str())
            .text("account_officer", self.account_officer.as_str())
            .text("custodian_country", self.custodian_country.as_str())
    }
}

impl Transaction {
    pub fn to_row(&self) -> Row {
        Row::new()
            .text("transaction_id", self.transaction_id.to_string())
            .text("transaction_type", self.transaction_type.as_str())
            .date("transaction_date", self.transaction_date)
            .date("value_date", self.value_date)
            .real("amount", self.amount)
            .text("currency", self.currency.as_str())
            .text("transaction_status", self.transaction_status.as_str())
            .boolean("is_debit", self.is_debit)
            .text("account_id", self.account_id.to_string())
            .text("debit_account_id", self.debit_account_id.to_string())
            .text("credit_account_id", self.credit_account_id.to_string())
            .text("entity_id", self.entity.id.to_string())
            .text("entity_type", self.entity.owner_type.as_str())
            .text("counterparty_account", self.counterparty_account.as_str())
            .text("counterparty_name", self.counterparty_name.as_str())
            .text("counterparty_bank", self.counterparty_bank.as_str())
            .text("originating_country", self.originating_country.as_str())
            .text("destination_country", self.destination_country.as_str())
            .text("purpose", self.purpose.as_str())
            .text("reference_number", self.reference_number.as_str())
            .boolean("screening_alert", self.screening_alert)
            .opt_integer("risk_score", self.risk_score)
            .real("processing_fee", self.processing_fee)
            .real("exchange_rate", self.exchange_rate)
            .opt_text("batch_id", self.batch_id.map(|id| id.to_string()).as_deref())
            .opt_text("check_number", self.check_number.as_deref())
            .opt_text("wire_reference", self.wire_reference.as_deref())
    }
}

impl ComplianceEvent {
    pub fn to_row(&self) -> Row {
        owned_row("event_id", self.event_id, &self.entity)
            .date("event_date", self.event_date)
            .text("event_type", self.event_type.as_str())
            .text("event_description", self.event_description.as_str())
            .opt_text("old_state", self.old_state.as_deref())
            .text("new_state", self.new_state.as_str())
            .opt_text("decision", self.decision.as_deref())
            .opt_date("decision_date", self.decision_date)
            .text("decision_maker", self.decision_maker.as_str())
            .date("next_review_date", self.next_review_date)
            .text("related_account_id", self.related_account_id.to_string())
            .opt_text("notes", self.notes.as_deref())
    }
}
