//! Table layout of every kind and the SQL derived from it

use std::fmt::Write as _;

use crate::model::EntityKind;

/// Storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    /// TEXT holding a JSON document
    Json,
}

impl SqlType {
    fn ddl(&self) -> &'static str {
        match self {
            SqlType::Text | SqlType::Json => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub not_null: bool,
    pub check: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub table: &'static str,
    pub references: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub kind: EntityKind,
    pub table: &'static str,
    pub key: &'static str,
    pub columns: Vec<ColumnSpec>,
    pub foreign_keys: Vec<ForeignKey>,
}

use SqlType::{Integer, Json, Real, Text};

/// Column shorthand: `(name, type, not_null)`
type Col = (&'static str, SqlType, bool);

fn columns(cols: &[Col]) -> Vec<ColumnSpec> {
    cols.iter()
        .map(|&(name, sql_type, not_null)| ColumnSpec {
            name,
            sql_type,
            not_null,
            check: None,
        })
        .collect()
}

fn fk(column: &'static str, table: &'static str, references: &'static str) -> ForeignKey {
    ForeignKey {
        column,
        table,
        references,
    }
}

fn entity_fk() -> ForeignKey {
    fk("entity_id", "entities", "entity_id")
}

const OWNED: [Col; 2] = [("entity_id", Text, true), ("entity_type", Text, true)];

impl TableSpec {
    fn new(kind: EntityKind, cols: Vec<ColumnSpec>, foreign_keys: Vec<ForeignKey>) -> Self {
        TableSpec {
            kind,
            table: kind.table_name(),
            key: kind.key_field(),
            columns: cols,
            foreign_keys,
        }
    }

    /// Satellite layout: key, owning entity, then the kind's own columns
    fn owned(kind: EntityKind, cols: &[Col], mut foreign_keys: Vec<ForeignKey>) -> Self {
        let mut all = columns(&[(kind.key_field(), Text, true)]);
        all.extend(columns(&OWNED));
        all.extend(columns(cols));
        foreign_keys.insert(0, entity_fk());
        Self::new(kind, all, foreign_keys)
    }

    fn check(mut self, column: &str, expr: &'static str) -> Self {
        if let Some(c) = self.columns.iter_mut().find(|c| c.name == column) {
            c.check = Some(expr);
        }
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    pub fn create_table_sql(&self) -> String {
        let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", self.table);
        for column in &self.columns {
            let _ = write!(sql, "    {} {}", column.name, column.sql_type.ddl());
            if column.not_null {
                sql.push_str(" NOT NULL");
            }
            if let Some(check) = column.check {
                let _ = write!(sql, " CHECK ({})", check);
            }
            sql.push_str(",\n");
        }
        let _ = write!(sql, "    PRIMARY KEY ({})", self.key);
        for key in &self.foreign_keys {
            let _ = write!(
                sql,
                ",\n    FOREIGN KEY ({}) REFERENCES {}({})",
                key.column, key.table, key.references
            );
        }
        sql.push_str("\n)");
        sql
    }

    /// Indexes on every foreign-key column
    pub fn create_index_sql(&self) -> Vec<String> {
        self.foreign_keys
            .iter()
            .filter(|key| key.column != self.key)
            .map(|key| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                    self.table, key.column, self.table, key.column
                )
            })
            .collect()
    }

    /// `INSERT .. ON CONFLICT(key) DO UPDATE` over every column
    pub fn upsert_sql(&self) -> String {
        let names: Vec<&str> = self.column_names().collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let updates: Vec<String> = names
            .iter()
            .filter(|name| **name != self.key)
            .map(|name| format!("{} = excluded.{}", name, name))
            .collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) DO UPDATE SET {}",
            self.table,
            names.join(", "),
            placeholders,
            self.key,
            updates.join(", ")
        )
    }
}

/// Tables in write order
pub fn tables() -> Vec<TableSpec> {
    EntityKind::WRITE_ORDER.iter().map(|kind| table(*kind)).collect()
}

pub fn table(kind: EntityKind) -> TableSpec {
    match kind {
        EntityKind::Entity => TableSpec::new(
            kind,
            columns(&[
                ("entity_id", Text, true),
                ("entity_type", Text, true),
                ("parent_entity_id", Text, false),
                ("created_at", Text, true),
                ("updated_at", Text, true),
                ("deleted_at", Text, false),
            ]),
            vec![],
        ),
        EntityKind::Institution => TableSpec::new(
            kind,
            columns(&[
                ("institution_id", Text, true),
                ("legal_name", Text, true),
                ("business_type", Text, true),
                ("incorporation_country", Text, true),
                ("incorporation_date", Text, true),
                ("onboarding_date", Text, true),
                ("risk_rating", Text, true),
                ("operational_status", Text, true),
                ("primary_currency", Text, true),
                ("regulatory_status", Text, false),
                ("primary_business_activity", Text, false),
                ("primary_regulator", Text, false),
                ("licenses", Json, false),
                ("aml_program_status", Text, false),
                ("kyc_refresh_date", Text, false),
                ("last_audit_date", Text, false),
                ("next_audit_date", Text, false),
                ("relationship_manager", Text, false),
                ("relationship_status", Text, false),
                ("swift_code", Text, false),
                ("lei_code", Text, false),
                ("tax_id", Text, false),
                ("website", Text, false),
                ("primary_contact_name", Text, false),
                ("primary_contact_email", Text, false),
                ("primary_contact_phone", Text, false),
                ("annual_revenue", Real, false),
                ("employee_count", Integer, false),
                ("year_established", Integer, false),
                ("customer_status", Text, false),
                ("last_review_date", Text, false),
                ("industry_codes", Json, false),
                ("public_company", Integer, false),
                ("stock_symbol", Text, false),
                ("stock_exchange", Text, false),
            ]),
            vec![fk("institution_id", "entities", "entity_id")],
        ),
        EntityKind::Subsidiary => TableSpec::new(
            kind,
            columns(&[
                ("subsidiary_id", Text, true),
                ("parent_institution_id", Text, true),
                ("legal_name", Text, true),
                ("tax_id", Text, false),
                ("incorporation_country", Text, false),
                ("incorporation_date", Text, true),
                ("acquisition_date", Text, true),
                ("business_type", Text, true),
                ("operational_status", Text, true),
                ("parent_ownership_percentage", Real, true),
                ("consolidation_status", Text, false),
                ("capital_investment", Real, false),
                ("functional_currency", Text, false),
                ("material_subsidiary", Integer, false),
                ("risk_classification", Text, true),
                ("regulatory_status", Text, false),
                ("local_licenses", Json, false),
                ("integration_status", Text, false),
                ("financial_metrics", Json, false),
                ("reporting_frequency", Text, false),
                ("requires_local_audit", Integer, false),
                ("corporate_governance_model", Text, false),
                ("is_regulated", Integer, false),
                ("industry_codes", Json, false),
                ("is_customer", Integer, true),
                ("customer_id", Text, false),
                ("customer_onboarding_date", Text, false),
                ("customer_risk_rating", Text, false),
                ("customer_status", Text, false),
            ]),
            vec![
                fk("subsidiary_id", "entities", "entity_id"),
                fk("parent_institution_id", "institutions", "institution_id"),
            ],
        )
        .check(
            "parent_ownership_percentage",
            "parent_ownership_percentage > 0 AND parent_ownership_percentage <= 100",
        ),
        EntityKind::Address => TableSpec::owned(
            kind,
            &[
                ("address_type", Text, false),
                ("address_line1", Text, true),
                ("address_line2", Text, false),
                ("city", Text, true),
                ("state_province", Text, false),
                ("postal_code", Text, false),
                ("country", Text, true),
                ("status", Text, false),
                ("effective_from", Text, true),
                ("effective_to", Text, false),
                ("primary_address", Integer, false),
                ("validation_status", Text, false),
                ("last_verified", Text, false),
                ("geo_coordinates", Json, false),
                ("timezone", Text, false),
            ],
            vec![],
        ),
        EntityKind::BeneficialOwner => TableSpec::owned(
            kind,
            &[
                ("name", Text, true),
                ("nationality", Text, false),
                ("country_of_residence", Text, false),
                ("ownership_percentage", Real, true),
                ("dob", Text, true),
                ("verification_date", Text, false),
                ("pep_status", Integer, false),
                ("sanctions_status", Integer, false),
                ("adverse_media_status", Integer, false),
                ("verification_source", Text, false),
                ("notes", Text, false),
            ],
            vec![],
        )
        .check(
            "ownership_percentage",
            "ownership_percentage > 0 AND ownership_percentage <= 100",
        ),
        EntityKind::RiskAssessment => TableSpec::owned(
            kind,
            &[
                ("assessment_date", Text, true),
                ("risk_rating", Text, true),
                ("risk_score", Real, true),
                ("assessment_type", Text, false),
                ("risk_factors", Json, true),
                ("conducted_by", Text, false),
                ("approved_by", Text, false),
                ("findings", Text, false),
                ("assessor", Text, false),
                ("next_review_date", Text, false),
                ("notes", Text, false),
            ],
            vec![],
        ),
        EntityKind::AuthorizedPerson => TableSpec::owned(
            kind,
            &[
                ("name", Text, true),
                ("title", Text, true),
                ("authorization_level", Text, false),
                ("authorization_type", Text, false),
                ("authorization_start", Text, true),
                ("authorization_end", Text, false),
                ("contact_info", Json, false),
                ("is_active", Integer, false),
                ("last_verification_date", Text, false),
            ],
            vec![],
        ),
        EntityKind::Document => TableSpec::owned(
            kind,
            &[
                ("document_type", Text, true),
                ("document_number", Text, true),
                ("issuing_authority", Text, false),
                ("issuing_country", Text, false),
                ("issue_date", Text, true),
                ("expiry_date", Text, true),
                ("verification_status", Text, false),
                ("verification_date", Text, false),
                ("document_category", Text, false),
                ("notes", Text, false),
            ],
            vec![],
        ),
        EntityKind::JurisdictionPresence => TableSpec::owned(
            kind,
            &[
                ("jurisdiction", Text, true),
                ("registration_date", Text, true),
                ("effective_from", Text, true),
                ("effective_to", Text, false),
                ("status", Text, true),
                ("local_registration_id", Text, false),
                ("local_registration_date", Text, false),
                ("local_registration_authority", Text, false),
                ("notes", Text, false),
            ],
            vec![],
        ),
        EntityKind::Account => TableSpec::owned(
            kind,
            &[
                ("account_type", Text, true),
                ("account_number", Text, true),
                ("currency", Text, true),
                ("status", Text, false),
                ("opening_date", Text, true),
                ("balance", Real, true),
                ("risk_rating", Text, true),
                ("last_activity_date", Text, false),
                ("purpose", Text, false),
                ("average_monthly_balance", Real, false),
                ("custodian_bank", Text, false),
                ("account_officer", Text, false),
                ("custodian_country", Text, false),
            ],
            vec![],
        )
        .check("balance", "balance >= 0"),
        EntityKind::Transaction => TableSpec::new(
            kind,
            columns(&[
                ("transaction_id", Text, true),
                ("transaction_type", Text, true),
                ("transaction_date", Text, true),
                ("value_date", Text, true),
                ("amount", Real, true),
                ("currency", Text, true),
                ("transaction_status", Text, true),
                ("is_debit", Integer, true),
                ("account_id", Text, true),
                ("debit_account_id", Text, true),
                ("credit_account_id", Text, true),
                ("entity_id", Text, true),
                ("entity_type", Text, true),
                ("counterparty_account", Text, false),
                ("counterparty_name", Text, false),
                ("counterparty_bank", Text, false),
                ("originating_country", Text, false),
                ("destination_country", Text, false),
                ("purpose", Text, false),
                ("reference_number", Text, false),
                ("screening_alert", Integer, false),
                ("risk_score", Integer, false),
                ("processing_fee", Real, false),
                ("exchange_rate", Real, false),
                ("batch_id", Text, false),
                ("check_number", Text, false),
                ("wire_reference", Text, false),
            ]),
            vec![
                fk("account_id", "accounts", "account_id"),
                entity_fk(),
            ],
        )
        .check("amount", "amount > 0"),
        EntityKind::ComplianceEvent => TableSpec::owned(
            kind,
            &[
                ("event_date", Text, true),
                ("event_type", Text, true),
                ("event_description", Text, false),
                ("old_state", Text, false),
                ("new_state", Text, true),
                ("decision", Text, false),
                ("decision_date", Text, false),
                ("decision_maker", Text, false),
                ("next_review_date", Text, true),
                ("related_account_id", Text, true),
                ("notes", Text, false),
            ],
            vec![fk("related_account_id", "accounts", "account_id")],
        ),
    }
}
