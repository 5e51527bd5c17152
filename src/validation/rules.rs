//! Per-kind rule table

use chrono::NaiveDateTime;
use std::collections::HashMap;

use crate::model::{
    AccountType, BusinessType, ComplianceEventType, EntityKind, FieldValue, OperationalStatus,
    OwnerType, RiskRating, Row, TransactionStatus, TransactionType,
};

/// A single check against a record's row view
#[derive(Debug, Clone)]
pub enum Rule {
    /// Present, non-null and not blank
    Required(&'static str),
    /// Value, when present, is one of the listed strings
    OneOf(&'static str, Vec<&'static str>),
    /// `field >= reference` when both are set
    NotBefore {
        field: &'static str,
        reference: &'static str,
    },
    /// `field > reference` when both are set
    After {
        field: &'static str,
        reference: &'static str,
    },
    /// Numeric bounds; `None` leaves a side open
    Range {
        field: &'static str,
        min: Option<Bound>,
        max: Option<Bound>,
    },
    /// Either every column is set or none is
    AllOrNothing(&'static [&'static str]),
    /// Every number inside a JSON object lies in `min..=max`
    JsonScores {
        field: &'static str,
        min: i64,
        max: i64,
    },
    /// Owning account is the debit side iff `is_debit`
    DebitCreditPairing,
}

#[derive(Debug, Clone, Copy)]
pub enum Bound {
    Inclusive(f64),
    Exclusive(f64),
}

fn vocabulary<T: Copy>(all: &[T], as_str: fn(&T) -> &'static str) -> Vec<&'static str> {
    all.iter().map(as_str).collect()
}

fn as_instant(value: &FieldValue) -> Option<NaiveDateTime> {
    match value {
        FieldValue::Date(d) => Some(NaiveDateTime::from(*d)),
        FieldValue::Timestamp(ts) => Some(*ts),
        _ => None,
    }
}

impl Rule {
    /// `Err(reason)` when the row breaks the rule
    pub fn check(&self, row: &Row) -> Result<(), String> {
        match self {
            Rule::Required(field) => match row.value(field) {
                FieldValue::Null => Err(format!("missing required field {}", field)),
                FieldValue::Text(s) if s.trim().is_empty() => {
                    Err(format!("required field {} is blank", field))
                }
                _ => Ok(()),
            },
            Rule::OneOf(field, allowed) => match row.value(field) {
                FieldValue::Null => Ok(()),
                FieldValue::Text(s) if allowed.iter().any(|a| *a == s.as_str()) => Ok(()),
                other => Err(format!("{} has invalid value '{}'", field, other)),
            },
            Rule::NotBefore { field, reference } => {
                match (as_instant(row.value(field)), as_instant(row.value(reference))) {
                    (Some(a), Some(b)) if a < b => {
                        Err(format!("{} ({}) is before {} ({})", field, a, reference, b))
                    }
                    _ => Ok(()),
                }
            }
            Rule::After { field, reference } => {
                match (as_instant(row.value(field)), as_instant(row.value(reference))) {
                    (Some(a), Some(b)) if a <= b => {
                        Err(format!("{} ({}) is not after {} ({})", field, a, reference, b))
                    }
                    _ => Ok(()),
                }
            }
            Rule::Range { field, min, max } => {
                let value = match row.value(field) {
                    FieldValue::Null => return Ok(()),
                    other => other
                        .as_f64()
                        .ok_or_else(|| format!("{} is not numeric", field))?,
                };
                if !value.is_finite() {
                    return Err(format!("{} is not a finite number", field));
                }
                let low_ok = match min {
                    None => true,
                    Some(Bound::Inclusive(m)) => value >= *m,
                    Some(Bound::Exclusive(m)) => value > *m,
                };
                let high_ok = match max {
                    None => true,
                    Some(Bound::Inclusive(m)) => value <= *m,
                    Some(Bound::Exclusive(m)) => value < *m,
                };
                if low_ok && high_ok {
                    Ok(())
                } else {
                    Err(format!("{} = {} is out of range", field, value))
                }
            }
            Rule::AllOrNothing(fields) => {
                let set = fields.iter().filter(|f| !row.value(f).is_null()).count();
                if set == 0 || set == fields.len() {
                    Ok(())
                } else {
                    Err(format!("fields {} must be all set or all empty", fields.join(", ")))
                }
            }
            Rule::JsonScores { field, min, max } => {
                let object = match row.value(field) {
                    FieldValue::Null => return Ok(()),
                    FieldValue::Json(v) => v
                        .as_object()
                        .ok_or_else(|| format!("{} is not a JSON object", field))?,
                    _ => return Err(format!("{} is not JSON", field)),
                };
                for (name, score) in object {
                    match score.as_i64() {
                        Some(s) if (*min..=*max).contains(&s) => {}
                        _ => {
                            return Err(format!(
                                "{}.{} = {} is outside {}..={}",
                                field, name, score, min, max
                            ))
                        }
                    }
                }
                Ok(())
            }
            Rule::DebitCreditPairing => {
                let is_debit = matches!(row.value("is_debit"), FieldValue::Bool(true));
                let own = row.value("account_id");
                let side = if is_debit {
                    row.value("debit_account_id")
                } else {
                    row.value("credit_account_id")
                };
                if own == side {
                    Ok(())
                } else {
                    Err("account_id does not match its debit/credit side".to_string())
                }
            }
        }
    }
}

fn positive(field: &'static str) -> Rule {
    Rule::Range {
        field,
        min: Some(Bound::Exclusive(0.0)),
        max: None,
    }
}

fn non_negative(field: &'static str) -> Rule {
    Rule::Range {
        field,
        min: Some(Bound::Inclusive(0.0)),
        max: None,
    }
}

fn percentage(field: &'static str) -> Rule {
    Rule::Range {
        field,
        min: Some(Bound::Exclusive(0.0)),
        max: Some(Bound::Inclusive(100.0)),
    }
}

fn required<'a>(fields: &'a [&'static str]) -> impl Iterator<Item = Rule> + 'a {
    fields.iter().copied().map(Rule::Required)
}

fn owned(id: &'static str) -> Vec<Rule> {
    vec![
        Rule::Required(id),
        Rule::Required("entity_id"),
        Rule::Required("entity_type"),
        Rule::OneOf("entity_type", vocabulary(OwnerType::ALL, OwnerType::as_str)),
    ]
}

/// Build the rule list of every kind
pub fn rule_table() -> HashMap<EntityKind, Vec<Rule>> {
    let ratings = vocabulary(RiskRating::ALL, RiskRating::as_str);
    let business_types = vocabulary(BusinessType::ALL, BusinessType::as_str);
    let operational = vocabulary(OperationalStatus::ALL, OperationalStatus::as_str);

    let mut table = HashMap::new();

    let mut rules: Vec<Rule> =
        required(&["entity_id", "entity_type", "created_at", "updated_at"]).collect();
    rules.push(Rule::OneOf("entity_type", vocabulary(OwnerType::ALL, OwnerType::as_str)));
    rules.push(Rule::NotBefore {
        field: "updated_at",
        reference: "created_at",
    });
    table.insert(EntityKind::Entity, rules);

    let mut rules: Vec<Rule> = required(&[
        "institution_id",
        "legal_name",
        "business_type",
        "incorporation_country",
        "incorporation_date",
        "onboarding_date",
        "risk_rating",
        "operational_status",
        "primary_currency",
    ])
    .collect();
    rules.extend([
        Rule::OneOf("business_type", business_types.clone()),
        Rule::OneOf("risk_rating", ratings.clone()),
        Rule::OneOf("operational_status", operational.clone()),
        Rule::NotBefore {
            field: "onboarding_date",
            reference: "incorporation_date",
        },
        Rule::NotBefore {
            field: "kyc_refresh_date",
            reference: "onboarding_date",
        },
        non_negative("annual_revenue"),
        non_negative("employee_count"),
        Rule::AllOrNothing(&["stock_symbol", "stock_exchange"]),
    ]);
    table.insert(EntityKind::Institution, rules);

    let mut rules: Vec<Rule> = required(&[
        "subsidiary_id",
        "parent_institution_id",
        "legal_name",
        "incorporation_date",
        "acquisition_date",
        "business_type",
        "operational_status",
        "parent_ownership_percentage",
        "risk_classification",
    ])
    .collect();
    rules.extend([
        Rule::OneOf("business_type", business_types),
        Rule::OneOf("operational_status", operational),
        Rule::OneOf("risk_classification", ratings.clone()),
        Rule::OneOf("customer_risk_rating", ratings.clone()),
        Rule::NotBefore {
            field: "acquisition_date",
            reference: "incorporation_date",
        },
        Rule::NotBefore {
            field: "customer_onboarding_date",
            reference: "acquisition_date",
        },
        percentage("parent_ownership_percentage"),
        non_negative("capital_investment"),
        Rule::AllOrNothing(&[
            "customer_id",
            "customer_onboarding_date",
            "customer_risk_rating",
            "customer_status",
        ]),
    ]);
    table.insert(EntityKind::Subsidiary, rules);

    let mut rules = owned("address_id");
    rules.extend(required(&["address_line1", "city", "country", "effective_from"]));
    rules.extend([
        Rule::After {
            field: "effective_to",
            reference: "effective_from",
        },
        Rule::NotBefore {
            field: "last_verified",
            reference: "effective_from",
        },
    ]);
    table.insert(EntityKind::Address, rules);

    let mut rules = owned("owner_id");
    rules.extend(required(&["name", "ownership_percentage", "dob"]));
    rules.extend([
        percentage("ownership_percentage"),
        Rule::After {
            field: "verification_date",
            reference: "dob",
        },
    ]);
    table.insert(EntityKind::BeneficialOwner, rules);

    let mut rules = owned("assessment_id");
    rules.extend(required(&[
        "assessment_date",
        "risk_rating",
        "risk_score",
        "risk_factors",
    ]));
    rules.extend([
        Rule::OneOf("risk_rating", ratings.clone()),
        Rule::Range {
            field: "risk_score",
            min: Some(Bound::Inclusive(1.0)),
            max: Some(Bound::Inclusive(5.0)),
        },
        Rule::JsonScores {
            field: "risk_factors",
            min: 1,
            max: 5,
        },
        Rule::After {
            field: "next_review_date",
            reference: "assessment_date",
        },
    ]);
    table.insert(EntityKind::RiskAssessment, rules);

    let mut rules = owned("person_id");
    rules.extend(required(&["name", "title", "authorization_start"]));
    rules.push(Rule::After {
        field: "authorization_end",
        reference: "authorization_start",
    });
    table.insert(EntityKind::AuthorizedPerson, rules);

    let mut rules = owned("document_id");
    rules.extend(required(&[
        "document_type",
        "document_number",
        "issue_date",
        "expiry_date",
    ]));
    rules.extend([
        Rule::After {
            field: "expiry_date",
            reference: "issue_date",
        },
        Rule::NotBefore {
            field: "verification_date",
            reference: "issue_date",
        },
    ]);
    table.insert(EntityKind::Document, rules);

    let mut rules = owned("presence_id");
    rules.extend(required(&[
        "jurisdiction",
        "registration_date",
        "effective_from",
        "status",
    ]));
    rules.extend([
        Rule::OneOf("status", vec!["active", "inactive"]),
        Rule::After {
            field: "effective_to",
            reference: "effective_from",
        },
    ]);
    table.insert(EntityKind::JurisdictionPresence, rules);

    let mut rules = owned("account_id");
    rules.extend(required(&[
        "account_type",
        "account_number",
        "currency",
        "opening_date",
        "balance",
        "risk_rating",
    ]));
    rules.extend([
        Rule::OneOf("account_type", vocabulary(AccountType::ALL, AccountType::as_str)),
        Rule::OneOf("risk_rating", ratings),
        non_negative("balance"),
        non_negative("average_monthly_balance"),
        Rule::NotBefore {
            field: "last_activity_date",
            reference: "opening_date",
        },
    ]);
    table.insert(EntityKind::Account, rules);

    let mut rules: Vec<Rule> = required(&[
        "transaction_id",
        "transaction_type",
        "transaction_date",
        "value_date",
        "amount",
        "currency",
        "transaction_status",
        "is_debit",
        "account_id",
        "debit_account_id",
        "credit_account_id",
        "entity_id",
    ])
    .collect();
    rules.extend([
        Rule::OneOf(
            "transaction_type",
            vocabulary(TransactionType::ALL, TransactionType::as_str),
        ),
        Rule::OneOf(
            "transaction_status",
            vocabulary(TransactionStatus::ALL, TransactionStatus::as_str),
        ),
        positive("amount"),
        non_negative("processing_fee"),
        positive("exchange_rate"),
        Rule::NotBefore {
            field: "value_date",
            reference: "transaction_date",
        },
        Rule::DebitCreditPairing,
    ]);
    table.insert(EntityKind::Transaction, rules);

    let mut rules = owned("event_id");
    rules.extend(required(&[
        "event_date",
        "event_type",
        "new_state",
        "related_account_id",
        "next_review_date",
    ]));
    rules.extend([
        Rule::OneOf(
            "event_type",
            vocabulary(ComplianceEventType::ALL, ComplianceEventType::as_str),
        ),
        Rule::AllOrNothing(&["decision", "decision_date"]),
        Rule::After {
            field: "decision_date",
            reference: "event_date",
        },
        Rule::After {
            field: "next_review_date",
            reference: "event_date",
        },
    ]);
    table.insert(EntityKind::ComplianceEvent, rules);

    table
}
