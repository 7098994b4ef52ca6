use crate::lifecycle::InfringementAction;
use chrono::{DateTime, Utc};
use rego_derive::api_model;
use rego_domain::status::InfringementStatus;
use rego_kernel::audit::{AuditTrail, StoredAudit};
use rego_kernel::reference::{RefField, RegistrationSummary, UserSummary};
use rego_kernel::time;
use rego_kernel::validation::FieldErrors;
use serde::Deserialize;

/// One offence on a notice.
#[api_model]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InfringementItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub fine_cents: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInfringement {
    pub status: InfringementStatus,
    #[serde(default)]
    pub registration_ref: RefField,
    #[serde(default)]
    pub issued_by_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub offence_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, with = "time::lenient")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<InfringementItem>,
    #[serde(default, with = "time::lenient")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default, with = "time::lenient")]
    pub voided_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub void_reason: Option<String>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

/// Sums over the item list. Never stored.
#[api_model]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_points: u32,
    pub total_fine_cents: u64,
}

impl Totals {
    #[must_use]
    pub fn of(items: &[InfringementItem]) -> Self {
        items.iter().fold(Self::default(), |acc, item| Self {
            total_points: acc.total_points.saturating_add(item.points),
            total_fine_cents: acc.total_fine_cents.saturating_add(item.fine_cents),
        })
    }
}

#[api_model]
#[derive(Clone)]
pub struct InfringementView {
    pub id: String,
    pub status: InfringementStatus,
    pub registration: Option<RegistrationSummary>,
    pub issued_by: Option<UserSummary>,
    pub offence_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub items: Vec<InfringementItem>,
    #[serde(flatten)]
    pub totals: Totals,
    pub issued_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserSummary>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_reference: Option<String>,
    pub voided_at: Option<DateTime<Utc>>,
    pub void_reason: Option<String>,
    #[serde(flatten)]
    pub audit: AuditTrail,
    pub actions: Vec<InfringementAction>,
}

#[api_model(deny_unknown_fields = true)]
pub struct CreateInfringementRequest {
    pub registration_id: String,
    pub offence_date: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// May stay empty until the notice is issued.
    #[serde(default)]
    pub items: Vec<InfringementItem>,
}

#[api_model(deny_unknown_fields = true)]
#[derive(Default)]
pub struct UpdateInfringementRequest {
    #[serde(default)]
    pub offence_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Replaces the whole list.
    #[serde(default)]
    pub items: Option<Vec<InfringementItem>>,
}

#[api_model(deny_unknown_fields = true)]
pub struct AppendItemsRequest {
    pub items: Vec<InfringementItem>,
}

#[api_model]
#[derive(Clone)]
#[serde(tag = "action")]
pub enum InfringementCommand {
    Issue,
    SubmitForReview,
    Approve,
    RecordPayment { reference: String },
    MarkOverdue,
    Void { reason: String },
}

impl InfringementCommand {
    #[must_use]
    pub const fn action(&self) -> InfringementAction {
        match self {
            Self::Issue => InfringementAction::Issue,
            Self::SubmitForReview => InfringementAction::SubmitForReview,
            Self::Approve => InfringementAction::Approve,
            Self::RecordPayment { .. } => InfringementAction::RecordPayment,
            Self::MarkOverdue => InfringementAction::MarkOverdue,
            Self::Void { .. } => InfringementAction::Void,
        }
    }
}

/// Checks each item, numbering fields from `offset`.
pub fn validate_items(items: &[InfringementItem], offset: usize, errors: &mut FieldErrors) {
    for (index, item) in items.iter().enumerate() {
        let index = index + offset;
        errors.require(Some(item.code.as_str()), format!("items[{index}].code"));
        errors.require(Some(item.description.as_str()), format!("items[{index}].description"));
    }
}
