use crate::lifecycle::InspectionAction;
use chrono::{DateTime, Utc};
use rego_derive::api_model;
use rego_domain::status::{ChecklistResult, InspectionStatus, InspectionType, OverallResult};
use rego_kernel::audit::{AuditTrail, StoredAudit};
use rego_kernel::reference::{RefField, RegistrationSummary, UserSummary};
use rego_kernel::time;
use serde::Deserialize;

#[api_model]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChecklistItem {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub description: String,
    /// Unset until the item is assessed.
    #[serde(default)]
    pub result: Option<ChecklistResult>,
    #[serde(default)]
    pub comments: Option<String>,
    /// Proposed by the suggestion service rather than typed in.
    #[serde(default)]
    pub suggested: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredInspection {
    pub status: InspectionStatus,
    #[serde(default)]
    pub registration_ref: RefField,
    #[serde(default)]
    pub inspector_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inspection_type: Option<InspectionType>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub overall_result: Option<OverallResult>,
    #[serde(default, with = "time::lenient")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

#[api_model]
#[derive(Clone)]
pub struct InspectionView {
    pub id: String,
    pub status: InspectionStatus,
    pub registration: Option<RegistrationSummary>,
    pub inspector: Option<UserSummary>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub inspection_type: Option<InspectionType>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub checklist: Vec<ChecklistItem>,
    pub overall_result: Option<OverallResult>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserSummary>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    #[serde(flatten)]
    pub audit: AuditTrail,
    pub actions: Vec<InspectionAction>,
}

#[api_model(deny_unknown_fields = true)]
pub struct CreateInspectionRequest {
    pub registration_id: String,
    pub inspector_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub inspection_type: InspectionType,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Every field is optional; absent fields keep their stored value.
#[api_model(deny_unknown_fields = true)]
#[derive(Default)]
pub struct UpdateScheduleRequest {
    #[serde(default)]
    pub inspector_id: Option<String>,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub inspection_type: Option<InspectionType>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[api_model(deny_unknown_fields = true)]
#[derive(Clone)]
pub struct NewChecklistItem {
    /// Generated when omitted.
    #[serde(default)]
    pub item_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub suggested: bool,
}

#[api_model(deny_unknown_fields = true)]
pub struct AppendChecklistRequest {
    pub items: Vec<NewChecklistItem>,
}

/// Overwrites the item's assessment. There is no history.
#[api_model(deny_unknown_fields = true)]
pub struct AssessItemRequest {
    #[serde(default)]
    pub result: Option<ChecklistResult>,
    #[serde(default)]
    pub comments: Option<String>,
}

#[api_model(deny_unknown_fields = true)]
pub struct OverallResultRequest {
    #[serde(default)]
    pub overall_result: Option<OverallResult>,
}

#[api_model]
#[derive(Clone)]
#[serde(tag = "action")]
pub enum InspectionCommand {
    Start,
    Complete,
    Pass,
    Fail,
    Cancel { reason: String },
}

impl InspectionCommand {
    #[must_use]
    pub const fn action(&self) -> InspectionAction {
        match self {
            Self::Start => InspectionAction::Start,
            Self::Complete => InspectionAction::Complete,
            Self::Pass => InspectionAction::Pass,
            Self::Fail => InspectionAction::Fail,
            Self::Cancel { .. } => InspectionAction::Cancel,
        }
    }
}
