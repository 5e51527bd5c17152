//! Record factory
//!
//! Produces one record of a requested kind with realistic field values. All
//! randomness comes from the injected RNG, including record ids, so a seeded
//! factory is fully reproducible.
//!
//! Dates are sampled from bounded windows ([`dates::DateWindow`]). When a window
//! is empty the factory returns [`ConstraintError`] and the caller skips the
//! record instead of emitting an invalid one.

pub mod dates;
pub mod ownership;
pub mod vocab;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{CountRange, GeneratorConfig};
use crate::model::{
    Account, AccountType, Address, AuthorizedPerson, BeneficialOwner, BusinessType,
    ComplianceEvent, ComplianceEventType, ContactInfo, CustomerInfo, Document, Entity,
    EntityKind, EntityRef, FinancialMetrics, GeoCoordinates, Institution, JurisdictionPresence,
    OperationalStatus, OwnerType, Percentage, Record, RiskAssessment, RiskFactors, RiskRating,
    Subsidiary, Transaction, TransactionStatus, TransactionType,
};

use dates::{days_after, days_before, years_before, DateWindow};
pub use ownership::split_ownership;

/// A record could not be produced without violating a generation constraint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    /// Date window with no room to sample
    #[error("empty window for {field}: {start} .. {end}")]
    EmptyWindow {
        field: &'static str,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Ownership cannot be split with the requested minimum share
    #[error("cannot split 100% across {owners} owners with a {min_share}% minimum")]
    InfeasibleSplit { owners: usize, min_share: Percentage },

    /// The produce context lacks a parent the kind depends on
    #[error("{kind} requires {missing}")]
    MissingContext {
        kind: EntityKind,
        missing: &'static str,
    },
}

const CURRENCIES: [&str; 6] = ["USD", "EUR", "GBP", "CHF", "JPY", "SGD"];

const REGULATORS: [&str; 8] = ["SEC", "FINRA", "FCA", "BaFin", "FINMA", "MAS", "OCC", "FED"];

const LICENSES: [&str; 6] = [
    "banking",
    "securities",
    "insurance",
    "investment_advisor",
    "money_transmitter",
    "custody",
];

const EXCHANGES: [&str; 5] = ["NYSE", "NASDAQ", "LSE", "TSE", "SIX"];

const TITLES: [&str; 5] = ["Director", "CFO", "CEO", "Treasurer", "Controller"];

/// Eighteen years in days
const ADULT_DAYS: i64 = 18 * 365;

/// Run-wide inputs of the factory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorySettings {
    /// The run's "today"; nothing before incorporation, most things before this
    pub as_of: NaiveDate,
    /// Earliest incorporation date
    pub date_start: NaiveDate,
    pub high_risk_percentage: f64,
    pub min_owner_share: Percentage,
    pub transaction_lookback_days: i64,
}

impl FactorySettings {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        FactorySettings {
            as_of: config.date_range.end,
            date_start: config.date_range.start,
            high_risk_percentage: config.high_risk_percentage.clamp(0.0, 1.0),
            min_owner_share: config.min_owner_share(),
            transaction_lookback_days: config.transaction_lookback_days,
        }
    }
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Owning entity as seen by satellite records
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerContext {
    pub entity: EntityRef,
    /// Date the entity became part of the dataset; satellite dates start here
    pub established: NaiveDate,
    pub currency: String,
    /// Mail domain for generated contacts
    pub domain: String,
}

impl OwnerContext {
    pub fn for_institution(institution: &Institution) -> Self {
        OwnerContext {
            entity: EntityRef {
                id: institution.institution_id,
                owner_type: OwnerType::Institution,
            },
            established: institution.incorporation_date,
            currency: institution.primary_currency.clone(),
            domain: domain_for(&institution.legal_name),
        }
    }

    pub fn for_subsidiary(subsidiary: &Subsidiary) -> Self {
        OwnerContext {
            entity: EntityRef {
                id: subsidiary.subsidiary_id,
                owner_type: OwnerType::Subsidiary,
            },
            established: subsidiary.acquisition_date,
            currency: subsidiary.functional_currency.clone(),
            domain: domain_for(&subsidiary.legal_name),
        }
    }
}

/// Already-produced parents a record may depend on
#[derive(Debug, Clone, Copy, Default)]
pub struct ProduceContext<'a> {
    pub owner: Option<&'a OwnerContext>,
    pub institution: Option<&'a Institution>,
    pub subsidiary: Option<&'a Subsidiary>,
    pub account: Option<&'a Account>,
    /// Share for a single beneficial owner; defaults to 100%
    pub ownership_share: Option<Percentage>,
    /// Marks the first address of an entity
    pub primary: bool,
}

impl<'a> ProduceContext<'a> {
    pub fn for_owner(owner: &'a OwnerContext) -> Self {
        ProduceContext {
            owner: Some(owner),
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account: &'a Account) -> Self {
        self.account = Some(account);
        self
    }
}

/// Produces individual records from an injected RNG
pub struct RecordFactory<R: Rng> {
    rng: R,
    settings: FactorySettings,
}

impl<R: Rng> RecordFactory<R> {
    pub fn new(rng: R, settings: FactorySettings) -> Self {
        RecordFactory { rng, settings }
    }

    pub fn settings(&self) -> &FactorySettings {
        &self.settings
    }

    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Uniform draw from an inclusive count range
    pub fn count(&mut self, range: CountRange) -> usize {
        if range.max <= range.min {
            return range.min;
        }
        self.rng.gen_range(range.min..=range.max)
    }

    /// Produce one record of `kind` from the parents in `ctx`
    pub fn produce(
        &mut self,
        kind: EntityKind,
        ctx: &ProduceContext<'_>,
    ) -> Result<Record, ConstraintError> {
        let owner = || {
            ctx.owner.ok_or(ConstraintError::MissingContext {
                kind,
                missing: "an owning entity",
            })
        };
        let account = || {
            ctx.account.ok_or(ConstraintError::MissingContext {
                kind,
                missing: "an account",
            })
        };

        let record = match kind {
            EntityKind::Entity => match (ctx.subsidiary, ctx.institution) {
                (Some(subsidiary), _) => Record::Entity(self.subsidiary_entity(subsidiary)),
                (None, Some(institution)) => Record::Entity(self.institution_entity(institution)),
                (None, None) => {
                    return Err(ConstraintError::MissingContext {
                        kind,
                        missing: "an institution or subsidiary",
                    })
                }
            },
            EntityKind::Institution => Record::Institution(self.institution()?),
            EntityKind::Subsidiary => {
                let parent = ctx.institution.ok_or(ConstraintError::MissingContext {
                    kind,
                    missing: "a parent institution",
                })?;
                Record::Subsidiary(self.subsidiary(parent)?)
            }
            EntityKind::Address => Record::Address(self.address(owner()?, ctx.primary)),
            EntityKind::BeneficialOwner => Record::BeneficialOwner(self.beneficial_owner(
                owner()?,
                ctx.ownership_share.unwrap_or(Percentage::FULL),
            )),
            EntityKind::RiskAssessment => Record::RiskAssessment(self.risk_assessment(owner()?)),
            EntityKind::AuthorizedPerson => {
                Record::AuthorizedPerson(self.authorized_person(owner()?))
            }
            EntityKind::Document => Record::Document(self.document(owner()?)),
            EntityKind::JurisdictionPresence => {
                Record::JurisdictionPresence(self.jurisdiction_presence(owner()?))
            }
            EntityKind::Account => Record::Account(self.account(owner()?)?),
            EntityKind::Transaction => Record::Transaction(self.transaction(owner()?, account()?)?),
            EntityKind::ComplianceEvent => {
                Record::ComplianceEvent(self.compliance_event(owner()?, account()?)?)
            }
        };
        Ok(record)
    }

    pub fn institution(&mut self) -> Result<Institution, ConstraintError> {
        let settings = self.settings;
        let as_of = settings.as_of;
        let rng = &mut self.rng;

        let incorporation_date = DateWindow::new(settings.date_start, days_before(as_of, 365))
            .sample(rng, "incorporation_date")?;
        let onboarding_date = DateWindow::new(incorporation_date, days_before(as_of, 30))
            .sample(rng, "onboarding_date")?;
        let since_onboarding = DateWindow::new(onboarding_date, as_of);
        let kyc_refresh_date = since_onboarding.sample_or_start(rng);
        let last_audit_date = since_onboarding.sample_or_start(rng);
        let last_review_date = since_onboarding.sample_or_start(rng);
        let next_audit_date = DateWindow::new(as_of, days_after(as_of, 365)).sample_or_start(rng);

        let legal_name = vocab::company_name(rng);
        let domain = domain_for(&legal_name);
        let country = vocab::country_code(rng);
        let contact = vocab::person_name(rng);
        let risk_rating = if rng.gen_bool(settings.high_risk_percentage) {
            RiskRating::High
        } else {
            pick_of(rng, &[RiskRating::Low, RiskRating::Medium])
        };
        let public_company = rng.gen_bool(0.3);

        Ok(Institution {
            institution_id: new_id(rng),
            business_type: pick_of(rng, BusinessType::ALL),
            incorporation_country: country.to_string(),
            incorporation_date,
            onboarding_date,
            risk_rating,
            operational_status: pick_weighted_status(rng),
            primary_currency: vocab::pick(rng, &CURRENCIES).to_string(),
            regulatory_status: vocab::pick(rng, &["regulated", "exempt", "registered"]).to_string(),
            primary_business_activity: vocab::pick(
                rng,
                &["lending", "trading", "custody", "asset_management", "payments"],
            )
            .to_string(),
            primary_regulator: vocab::pick(rng, &REGULATORS).to_string(),
            licenses: pick_several(rng, &LICENSES, 1, 3),
            aml_program_status: vocab::pick(rng, &["effective", "needs_improvement", "under_review"])
                .to_string(),
            kyc_refresh_date,
            last_audit_date,
            next_audit_date,
            relationship_manager: vocab::person_name(rng),
            relationship_status: vocab::pick(rng, &["active", "active", "watchlist"]).to_string(),
            swift_code: format!("{}{}{}", vocab::bothify(rng, "????"), country, vocab::bothify(rng, "??")),
            lei_code: vocab::bothify(rng, "####00????????????##"),
            tax_id: vocab::bothify(rng, "##-#######"),
            website: format!("https://www.{}", domain),
            primary_contact_email: vocab::email(&contact, &domain),
            primary_contact_name: contact,
            primary_contact_phone: vocab::phone_number(rng),
            annual_revenue: round2(rng.gen_range(1.0e6..1.0e10)),
            employee_count: rng.gen_range(10..=50_000),
            year_established: incorporation_date.year(),
            customer_status: vocab::pick(rng, &["active", "active", "pending_review"]).to_string(),
            last_review_date,
            industry_codes: industry_codes(rng),
            public_company,
            stock_symbol: public_company.then(|| vocab::bothify(rng, "????")),
            stock_exchange: public_company.then(|| vocab::pick(rng, &EXCHANGES).to_string()),
            legal_name,
        })
    }

    /// Subsidiary of `parent`; acquired no earlier than either incorporation
    pub fn subsidiary(&mut self, parent: &Institution) -> Result<Subsidiary, ConstraintError> {
        let settings = self.settings;
        let as_of = settings.as_of;
        let rng = &mut self.rng;

        let incorporation_date = DateWindow::new(settings.date_start, days_before(as_of, 365))
            .sample(rng, "incorporation_date")?;
        let acquisition_date =
            DateWindow::after(incorporation_date, parent.incorporation_date, as_of)
                .sample(rng, "acquisition_date")?;

        // A subsidiary acquired today cannot have been onboarded as a customer yet
        let customer = if rng.gen_bool(0.5) {
            DateWindow::new(acquisition_date, as_of)
                .sample(rng, "customer_onboarding_date")
                .ok()
                .map(|onboarding_date| CustomerInfo {
                    customer_id: new_id(rng),
                    onboarding_date,
                    risk_rating: pick_of(rng, RiskRating::ALL),
                    status: vocab::pick(rng, &["active", "pending", "under_review"]).to_string(),
                })
        } else {
            None
        };

        let ownership = Percentage::from_hundredths(rng.gen_range(5_100..=10_000));
        let consolidation_status = if ownership == Percentage::FULL {
            "full"
        } else {
            vocab::pick(rng, &["full", "proportional"])
        };
        let local_licenses = pick_several(rng, &LICENSES, 0, 2);
        let is_regulated = !local_licenses.is_empty();

        Ok(Subsidiary {
            subsidiary_id: new_id(rng),
            parent_institution_id: parent.institution_id,
            legal_name: vocab::company_name(rng),
            tax_id: vocab::bothify(rng, "##-#######"),
            incorporation_country: vocab::country_code(rng).to_string(),
            incorporation_date,
            acquisition_date,
            business_type: pick_of(rng, BusinessType::ALL),
            operational_status: pick_weighted_status(rng),
            parent_ownership_percentage: ownership,
            consolidation_status: consolidation_status.to_string(),
            capital_investment: round2(rng.gen_range(1.0e5..1.0e9)),
            functional_currency: vocab::pick(rng, &CURRENCIES).to_string(),
            material_subsidiary: rng.gen_bool(0.3),
            risk_classification: pick_of(rng, RiskRating::ALL),
            regulatory_status: vocab::pick(rng, &["regulated", "exempt", "registered"]).to_string(),
            local_licenses,
            integration_status: vocab::pick(rng, &["integrated", "in_progress", "standalone"])
                .to_string(),
            financial_metrics: FinancialMetrics {
                revenue: round2(rng.gen_range(1.0e5..1.0e9)),
                profit_margin: round2(rng.gen_range(0.01..0.35)),
                asset_value: round2(rng.gen_range(1.0e6..1.0e10)),
            },
            reporting_frequency: vocab::pick(rng, &["monthly", "quarterly", "annual"]).to_string(),
            requires_local_audit: rng.gen_bool(0.5),
            corporate_governance_model: vocab::pick(rng, &["board", "sole_director", "management_committee"])
                .to_string(),
            is_regulated,
            industry_codes: industry_codes(rng),
            customer,
        })
    }

    pub fn institution_entity(&mut self, institution: &Institution) -> Entity {
        let (created_at, updated_at) = self.audit_timestamps(institution.onboarding_date);
        Entity {
            entity_id: institution.institution_id,
            entity_type: OwnerType::Institution,
            parent_entity_id: None,
            created_at,
            updated_at,
            deleted_at: None,
        }
    }

    pub fn subsidiary_entity(&mut self, subsidiary: &Subsidiary) -> Entity {
        let (created_at, updated_at) = self.audit_timestamps(subsidiary.acquisition_date);
        Entity {
            entity_id: subsidiary.subsidiary_id,
            entity_type: OwnerType::Subsidiary,
            parent_entity_id: Some(subsidiary.parent_institution_id),
            created_at,
            updated_at,
            deleted_at: None,
        }
    }

    pub fn address(&mut self, owner: &OwnerContext, primary: bool) -> Address {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let effective_from = DateWindow::new(owner.established, as_of).sample_or_start(rng);
        let effective_to = if !primary && rng.gen_bool(0.2) {
            Some(
                DateWindow::new(days_after(effective_from, 1), days_after(as_of, 365))
                    .sample_or_start(rng),
            )
        } else {
            None
        };
        let status = match effective_to {
            Some(end) if end <= as_of => "inactive",
            _ => "active",
        };
        let country = vocab::country_code(rng);

        Address {
            address_id: new_id(rng),
            entity: owner.entity,
            address_type: if primary {
                "registered".to_string()
            } else {
                vocab::pick(rng, &["mailing", "operational", "branch"]).to_string()
            },
            address_line1: vocab::street_address(rng),
            address_line2: rng.gen_bool(0.4).then(|| vocab::secondary_address(rng)),
            city: vocab::city(rng).to_string(),
            state_province: vocab::region(rng).to_string(),
            postal_code: vocab::bothify(rng, "#####"),
            country: country.to_string(),
            status: status.to_string(),
            effective_from,
            effective_to,
            primary_address: primary,
            validation_status: vocab::pick(rng, &["validated", "validated", "pending"]).to_string(),
            last_verified: DateWindow::new(effective_from, as_of).sample_or_start(rng),
            geo_coordinates: GeoCoordinates {
                latitude: round6(rng.gen_range(-90.0..90.0)),
                longitude: round6(rng.gen_range(-180.0..180.0)),
            },
            timezone: vocab::timezone_for(country).to_string(),
        }
    }

    pub fn beneficial_owner(&mut self, owner: &OwnerContext, share: Percentage) -> BeneficialOwner {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let nationality = vocab::country_code(rng);
        let dob =
            DateWindow::new(years_before(as_of, 80), years_before(as_of, 25)).sample_or_start(rng);
        // Verified as an adult, and never before the entity existed
        let verification_date =
            DateWindow::after(owner.established, days_after(dob, ADULT_DAYS), as_of)
                .sample_or_start(rng);
        BeneficialOwner {
            owner_id: new_id(rng),
            entity: owner.entity,
            name: vocab::person_name(rng),
            nationality: nationality.to_string(),
            country_of_residence: if rng.gen_bool(0.8) {
                nationality.to_string()
            } else {
                vocab::country_code(rng).to_string()
            },
            ownership_percentage: share,
            dob,
            verification_date,
            pep_status: rng.gen_bool(0.05),
            sanctions_status: rng.gen_bool(0.01),
            adverse_media_status: rng.gen_bool(0.05),
            verification_source: vocab::pick(
                rng,
                &["registry", "passport", "corporate_filing", "third_party"],
            )
            .to_string(),
            notes: rng.gen_bool(0.3).then(|| vocab::sentence(rng, "ownership of")),
        }
    }

    /// `n` beneficial owners of one entity whose shares sum to exactly 100%
    pub fn beneficial_owners(
        &mut self,
        owner: &OwnerContext,
        n: usize,
    ) -> Result<Vec<BeneficialOwner>, ConstraintError> {
        let shares = split_ownership(&mut self.rng, n, self.settings.min_owner_share)?;
        Ok(shares
            .into_iter()
            .map(|share| self.beneficial_owner(owner, share))
            .collect())
    }

    pub fn risk_assessment(&mut self, owner: &OwnerContext) -> RiskAssessment {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let assessment_date = DateWindow::new(owner.established, as_of).sample_or_start(rng);
        let risk_factors = RiskFactors {
            geographic: rng.gen_range(1..=5),
            product: rng.gen_range(1..=5),
            client: rng.gen_range(1..=5),
            transaction: rng.gen_range(1..=5),
            delivery_channel: rng.gen_range(1..=5),
        };
        let mean = risk_factors.mean();

        RiskAssessment {
            assessment_id: new_id(rng),
            entity: owner.entity,
            assessment_date,
            risk_rating: RiskRating::from_score(mean),
            risk_score: round2(mean),
            assessment_type: vocab::pick(rng, &["initial", "periodic", "event_driven"]).to_string(),
            risk_factors,
            conducted_by: vocab::person_name(rng),
            approved_by: vocab::person_name(rng),
            findings: vocab::sentence(rng, "the"),
            assessor: vocab::person_name(rng),
            next_review_date: DateWindow::new(
                days_after(assessment_date, 30),
                days_after(assessment_date, 365),
            )
            .sample_or_start(rng),
            notes: rng.gen_bool(0.3).then(|| vocab::sentence(rng, "risk in")),
        }
    }

    pub fn authorized_person(&mut self, owner: &OwnerContext) -> AuthorizedPerson {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let name = vocab::person_name(rng);
        let authorization_start = DateWindow::new(owner.established, as_of).sample_or_start(rng);
        let authorization_end = rng.gen_bool(0.3).then(|| {
            DateWindow::new(days_after(authorization_start, 1), days_after(as_of, 730))
                .sample_or_start(rng)
        });

        AuthorizedPerson {
            person_id: new_id(rng),
            entity: owner.entity,
            title: vocab::pick(rng, &TITLES).to_string(),
            authorization_level: vocab::pick(rng, &["full", "limited", "view_only"]).to_string(),
            authorization_type: vocab::pick(rng, &["signatory", "trader", "approver"]).to_string(),
            authorization_start,
            authorization_end,
            contact_info: ContactInfo {
                email: vocab::email(&name, &owner.domain),
                phone: vocab::phone_number(rng),
                office: vocab::city(rng).to_string(),
            },
            is_active: authorization_end.map_or(true, |end| end > as_of),
            last_verification_date: DateWindow::new(authorization_start, as_of)
                .sample_or_start(rng),
            name,
        }
    }

    pub fn document(&mut self, owner: &OwnerContext) -> Document {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let (document_type, document_category) = *[
            ("certificate_of_incorporation", "corporate"),
            ("articles_of_association", "corporate"),
            ("operating_license", "regulatory"),
            ("tax_certificate", "regulatory"),
            ("passport", "identity"),
            ("proof_of_address", "identity"),
        ]
        .choose(rng)
        .unwrap_or(&("certificate_of_incorporation", "corporate"));

        let issue_date = DateWindow::new(owner.established, as_of).sample_or_start(rng);
        let expiry_date = DateWindow::new(days_after(issue_date, 1), days_after(as_of, 5 * 365))
            .sample_or_start(rng);

        Document {
            document_id: new_id(rng),
            entity: owner.entity,
            document_type: document_type.to_string(),
            document_number: vocab::bothify(rng, "??########"),
            issuing_authority: vocab::pick(rng, &REGULATORS).to_string(),
            issuing_country: vocab::country_code(rng).to_string(),
            issue_date,
            expiry_date,
            verification_status: vocab::pick(rng, &["verified", "verified", "pending", "rejected"])
                .to_string(),
            verification_date: DateWindow::new(issue_date, as_of).sample_or_start(rng),
            document_category: document_category.to_string(),
            notes: rng.gen_bool(0.2).then(|| vocab::sentence(rng, "copy of")),
        }
    }

    pub fn jurisdiction_presence(&mut self, owner: &OwnerContext) -> JurisdictionPresence {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let registration_date = DateWindow::new(owner.established, as_of).sample_or_start(rng);
        let effective_to = rng.gen_bool(0.2).then(|| {
            DateWindow::new(days_after(registration_date, 1), days_after(as_of, 365))
                .sample_or_start(rng)
        });

        JurisdictionPresence {
            presence_id: new_id(rng),
            entity: owner.entity,
            jurisdiction: vocab::country_code(rng).to_string(),
            registration_date,
            effective_from: registration_date,
            effective_to,
            status: (if effective_to.is_some() { "inactive" } else { "active" }).to_string(),
            local_registration_id: vocab::bothify(rng, "REG-########"),
            local_registration_date: DateWindow::new(registration_date, as_of)
                .sample_or_start(rng),
            local_registration_authority: vocab::pick(rng, &REGULATORS).to_string(),
            notes: rng.gen_bool(0.2).then(|| vocab::sentence(rng, "registration of")),
        }
    }

    /// Account opened after the owner was established and before today
    pub fn account(&mut self, owner: &OwnerContext) -> Result<Account, ConstraintError> {
        let settings = self.settings;
        let as_of = settings.as_of;
        let rng = &mut self.rng;

        let opening_date =
            DateWindow::after(owner.established, settings.date_start, days_before(as_of, 1))
                .sample(rng, "opening_date")?;
        let balance = round2(rng.gen_range(1_000.0..10_000_000.0));

        Ok(Account {
            account_id: new_id(rng),
            entity: owner.entity,
            account_type: pick_of(rng, AccountType::ALL),
            account_number: vocab::bothify(rng, "##########"),
            currency: owner.currency.clone(),
            status: vocab::pick(rng, &["active", "active", "active", "dormant", "frozen"])
                .to_string(),
            opening_date,
            balance,
            risk_rating: pick_of(rng, RiskRating::ALL),
            last_activity_date: DateWindow::new(opening_date, as_of).sample_or_start(rng),
            purpose: vocab::pick(rng, &["operating", "settlement", "custody", "escrow", "payroll"])
                .to_string(),
            average_monthly_balance: round2(balance * rng.gen_range(0.5..1.5)),
            custodian_bank: vocab::company_name(rng),
            account_officer: vocab::person_name(rng),
            custodian_country: vocab::country_code(rng).to_string(),
        })
    }

    /// Transaction on `account` within the lookback window; the counterparty is synthetic
    pub fn transaction(
        &mut self,
        owner: &OwnerContext,
        account: &Account,
    ) -> Result<Transaction, ConstraintError> {
        let settings = self.settings;
        let as_of = settings.as_of;
        let rng = &mut self.rng;

        let transaction_date = DateWindow::after(
            account.opening_date,
            days_before(as_of, settings.transaction_lookback_days),
            as_of,
        )
        .sample(rng, "transaction_date")?;
        let value_date = days_after(transaction_date, rng.gen_range(0..=2));

        let is_debit = rng.gen_bool(0.5);
        let counterparty = new_id(rng);
        let (debit_account_id, credit_account_id) = if is_debit {
            (account.account_id, counterparty)
        } else {
            (counterparty, account.account_id)
        };

        let transaction_type = pick_of(rng, TransactionType::ALL);
        let transaction_status = if rng.gen_bool(0.85) {
            TransactionStatus::Completed
        } else {
            pick_of(
                rng,
                &[
                    TransactionStatus::Pending,
                    TransactionStatus::Failed,
                    TransactionStatus::Reversed,
                ],
            )
        };
        let foreign = rng.gen_bool(0.2);

        Ok(Transaction {
            transaction_id: new_id(rng),
            transaction_type,
            transaction_date,
            value_date,
            amount: round2(rng.gen_range(100.0..100_000.0)),
            currency: account.currency.clone(),
            transaction_status,
            is_debit,
            account_id: account.account_id,
            debit_account_id,
            credit_account_id,
            entity: owner.entity,
            counterparty_account: vocab::bothify(rng, "##########"),
            counterparty_name: vocab::company_name(rng),
            counterparty_bank: vocab::company_name(rng),
            originating_country: vocab::country_code(rng).to_string(),
            destination_country: vocab::country_code(rng).to_string(),
            purpose: vocab::pick(rng, &["invoice", "payroll", "settlement", "dividend", "fee"])
                .to_string(),
            reference_number: vocab::bothify(rng, "TX##########"),
            screening_alert: rng.gen_bool(0.02),
            risk_score: rng.gen_bool(0.5).then(|| rng.gen_range(0..=100)),
            processing_fee: round2(rng.gen_range(0.0..50.0)),
            exchange_rate: if foreign {
                round4(rng.gen_range(0.5..1.5))
            } else {
                1.0
            },
            batch_id: rng.gen_bool(0.3).then(|| new_id(rng)),
            check_number: (transaction_type == TransactionType::Check)
                .then(|| vocab::bothify(rng, "######")),
            wire_reference: (transaction_type == TransactionType::Wire)
                .then(|| vocab::bothify(rng, "WIRE-????######")),
        })
    }

    /// Compliance event on `account` within the past year
    pub fn compliance_event(
        &mut self,
        owner: &OwnerContext,
        account: &Account,
    ) -> Result<ComplianceEvent, ConstraintError> {
        let as_of = self.settings.as_of;
        let rng = &mut self.rng;

        let event_date = DateWindow::after(account.opening_date, days_before(as_of, 365), as_of)
            .sample(rng, "event_date")?;
        let event_type = pick_of(rng, ComplianceEventType::ALL);

        let (old_state, new_state) = match event_type {
            ComplianceEventType::RiskLevelChange => {
                let old = pick_of(rng, RiskRating::ALL);
                let choices: Vec<RiskRating> =
                    RiskRating::ALL.iter().copied().filter(|r| *r != old).collect();
                let new = pick_of(rng, &choices);
                (Some(old.to_string()), new.to_string())
            }
            ComplianceEventType::AccountOpened => (None, "active".to_string()),
            ComplianceEventType::AccountClosed => {
                (Some("active".to_string()), "closed".to_string())
            }
            _ => (
                None,
                vocab::pick(rng, &["completed", "pending", "flagged"]).to_string(),
            ),
        };

        // Decided 1..=10 days after the event, never after today
        let latest_decision = (as_of - event_date).num_days().min(10);
        let (decision, decision_date) = if latest_decision >= 1 && rng.gen_bool(0.7) {
            let decision = vocab::pick(rng, &["approved", "rejected", "escalated"]).to_string();
            (Some(decision), Some(days_after(event_date, rng.gen_range(1..=latest_decision))))
        } else {
            (None, None)
        };

        Ok(ComplianceEvent {
            event_id: new_id(rng),
            entity: owner.entity,
            event_date,
            event_type,
            event_description: format!(
                "{} on account {}",
                event_type.as_str().replace('_', " "),
                account.account_number
            ),
            old_state,
            new_state,
            decision,
            decision_date,
            decision_maker: vocab::person_name(rng),
            next_review_date: days_after(event_date, rng.gen_range(30..=365)),
            related_account_id: account.account_id,
            notes: rng.gen_bool(0.3).then(|| vocab::sentence(rng, "the")),
        })
    }

    /// `created_at` on `date` at a random time, `updated_at` no earlier, neither past today
    fn audit_timestamps(&mut self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let as_of = self.settings.as_of;
        let created_at =
            NaiveDateTime::from(date) + Duration::seconds(self.rng.gen_range(0..86_400));
        let days = (as_of - date).num_days().max(0);
        let updated_at = created_at + Duration::days(self.rng.gen_range(0..=days));
        (created_at, updated_at)
    }
}

/// Version-4 uuid drawn from the factory RNG
pub fn new_id<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

fn domain_for(legal_name: &str) -> String {
    format!("{}.example", vocab::slug(legal_name))
}

fn pick_of<R: Rng + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> T {
    // Callers only pass non-empty vocabularies
    *items.choose(rng).unwrap_or(&items[0])
}

fn pick_weighted_status<R: Rng + ?Sized>(rng: &mut R) -> OperationalStatus {
    if rng.gen_bool(0.9) {
        OperationalStatus::Active
    } else {
        pick_of(rng, &[OperationalStatus::Dormant, OperationalStatus::Liquidating])
    }
}

fn pick_several<R: Rng + ?Sized>(rng: &mut R, items: &[&str], min: usize, max: usize) -> Vec<String> {
    let n = rng.gen_range(min..=max.min(items.len()));
    items
        .choose_multiple(rng, n)
        .map(|s| s.to_string())
        .collect()
}

fn industry_codes<R: Rng + ?Sized>(rng: &mut R) -> Vec<String> {
    let n = rng.gen_range(1..=3);
    (0..n).map(|_| vocab::bothify(rng, "52####")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn factory(seed: u64) -> RecordFactory<StdRng> {
        let settings = FactorySettings {
            as_of: date(2024, 6, 30),
            date_start: date(1995, 1, 1),
            high_risk_percentage: 0.1,
            min_owner_share: Percentage::from_f64(5.0),
            transaction_lookback_days: 730,
        };
        RecordFactory::new(StdRng::seed_from_u64(seed), settings)
    }

    #[test]
    fn test_institution_date_order() {
        let mut f = factory(1);
        for _ in 0..50 {
            let inst = f.institution().unwrap();
            assert!(inst.incorporation_date <= inst.onboarding_date);
            assert!(inst.onboarding_date <= date(2024, 6, 30));
            assert!(inst.kyc_refresh_date >= inst.onboarding_date);
            assert!(inst.next_audit_date >= date(2024, 6, 30));
            assert_eq!(inst.year_established, inst.incorporation_date.year());
            assert_eq!(inst.public_company, inst.stock_symbol.is_some());
        }
    }

    #[test]
    fn test_subsidiary_acquired_after_both_incorporations() {
        let mut f = factory(2);
        let parent = f.institution().unwrap();
        for _ in 0..50 {
            let sub = f.subsidiary(&parent).unwrap();
            assert_eq!(sub.parent_institution_id, parent.institution_id);
            assert!(sub.acquisition_date >= sub.incorporation_date);
            assert!(sub.acquisition_date >= parent.incorporation_date);
            let pct = sub.parent_ownership_percentage.hundredths();
            assert!((5_100..=10_000).contains(&pct));
            if let Some(customer) = &sub.customer {
                assert!(customer.onboarding_date >= sub.acquisition_date);
            }
        }
    }

    #[test]
    fn test_entity_mirrors_institution() {
        let mut f = factory(3);
        let inst = f.institution().unwrap();
        let entity = f.institution_entity(&inst);
        assert_eq!(entity.entity_id, inst.institution_id);
        assert!(entity.parent_entity_id.is_none());
        assert!(entity.created_at <= entity.updated_at);

        let sub = f.subsidiary(&inst).unwrap();
        let entity = f.subsidiary_entity(&sub);
        assert_eq!(entity.parent_entity_id, Some(inst.institution_id));
        assert_eq!(entity.entity_type, OwnerType::Subsidiary);
    }

    #[test]
    fn test_beneficial_owners_sum_to_full() {
        let mut f = factory(4);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        for n in 1..=6 {
            let owners = f.beneficial_owners(&owner, n).unwrap();
            let total: u32 = owners.iter().map(|o| o.ownership_percentage.hundredths()).sum();
            assert_eq!(total, 10_000);
            assert!(owners.iter().all(|o| o.entity == owner.entity));
        }
    }

    #[test]
    fn test_transactions_respect_account_window() {
        let mut f = factory(5);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        let account = f.account(&owner).unwrap();
        assert!(account.opening_date >= owner.established);
        assert!(account.opening_date < date(2024, 6, 30));

        for _ in 0..200 {
            let tx = f.transaction(&owner, &account).unwrap();
            assert!(tx.transaction_date >= account.opening_date);
            assert!(tx.transaction_date <= date(2024, 6, 30));
            assert!(tx.value_date >= tx.transaction_date);
            assert!(tx.amount > 0.0);
            assert_eq!(tx.currency, account.currency);
            let own_side = if tx.is_debit { tx.debit_account_id } else { tx.credit_account_id };
            assert_eq!(own_side, account.account_id);
            assert_ne!(tx.counterparty_side(), account.account_id);
            assert_eq!(tx.check_number.is_some(), tx.transaction_type == TransactionType::Check);
            assert_eq!(tx.wire_reference.is_some(), tx.transaction_type == TransactionType::Wire);
        }
    }

    #[test]
    fn test_account_opened_today_has_no_transaction_window() {
        let mut f = factory(6);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        let mut account = f.account(&owner).unwrap();
        account.opening_date = date(2024, 6, 30);
        let err = f.transaction(&owner, &account).unwrap_err();
        assert!(matches!(err, ConstraintError::EmptyWindow { field: "transaction_date", .. }));
    }

    #[test]
    fn test_compliance_event_states() {
        let mut f = factory(7);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        let account = f.account(&owner).unwrap();
        for _ in 0..200 {
            let event = f.compliance_event(&owner, &account).unwrap();
            assert_eq!(event.related_account_id, account.account_id);
            assert!(event.event_date >= account.opening_date);
            assert!(event.next_review_date > event.event_date);
            if let Some(decided) = event.decision_date {
                assert!(decided > event.event_date);
            }
            assert_eq!(event.decision.is_some(), event.decision_date.is_some());
            match event.event_type {
                ComplianceEventType::RiskLevelChange => {
                    assert_ne!(event.old_state.as_deref(), Some(event.new_state.as_str()));
                }
                ComplianceEventType::AccountClosed => assert_eq!(event.new_state, "closed"),
                ComplianceEventType::AccountOpened => assert!(event.old_state.is_none()),
                _ => {}
            }
        }
    }

    #[test]
    fn test_owner_verified_after_birth_for_old_entities() {
        let mut f = factory(10);
        let inst = f.institution().unwrap();
        let mut owner = OwnerContext::for_institution(&inst);
        owner.established = date(1995, 1, 1);
        for _ in 0..500 {
            let bo = f.beneficial_owner(&owner, Percentage::FULL);
            assert!(bo.verification_date > bo.dob, "{} vs {}", bo.verification_date, bo.dob);
            assert!(bo.verification_date >= owner.established);
            assert!(bo.verification_date <= date(2024, 6, 30));
        }
    }

    #[test]
    fn test_decision_never_dated_after_today() {
        let mut f = factory(11);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        let mut account = f.account(&owner).unwrap();
        account.opening_date = date(2024, 6, 28);
        for _ in 0..200 {
            let event = f.compliance_event(&owner, &account).unwrap();
            if let Some(decided) = event.decision_date {
                assert!(decided > event.event_date);
                assert!(decided <= date(2024, 6, 30), "decision on {}", decided);
            }
            if event.event_date == date(2024, 6, 30) {
                assert!(event.decision.is_none());
            }
        }
    }

    #[test]
    fn test_satellite_date_order() {
        let mut f = factory(8);
        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        for _ in 0..100 {
            let doc = f.document(&owner);
            assert!(doc.expiry_date > doc.issue_date);

            let person = f.authorized_person(&owner);
            if let Some(end) = person.authorization_end {
                assert!(end > person.authorization_start);
            }
            assert_eq!(
                person.is_active,
                person.authorization_end.map_or(true, |e| e > date(2024, 6, 30))
            );

            let presence = f.jurisdiction_presence(&owner);
            assert_eq!(presence.status == "inactive", presence.effective_to.is_some());

            let assessment = f.risk_assessment(&owner);
            assert_eq!(
                assessment.risk_rating,
                RiskRating::from_score(assessment.risk_factors.mean())
            );
        }
    }

    #[test]
    fn test_produce_requires_context() {
        let mut f = factory(9);
        let err = f
            .produce(EntityKind::Transaction, &ProduceContext::default())
            .unwrap_err();
        assert!(matches!(err, ConstraintError::MissingContext { kind: EntityKind::Transaction, .. }));

        let inst = f.institution().unwrap();
        let owner = OwnerContext::for_institution(&inst);
        let ctx = ProduceContext::for_owner(&owner);
        let record = f.produce(EntityKind::Address, &ctx).unwrap();
        assert_eq!(record.kind(), EntityKind::Address);
        assert_eq!(record.owner(), Some(owner.entity));
    }

    #[test]
    fn test_seeded_factories_agree() {
        let a = factory(42).institution().unwrap();
        let b = factory(42).institution().unwrap();
        assert_eq!(a, b);
        assert_ne!(a.institution_id, factory(43).institution().unwrap().institution_id);
    }
}
