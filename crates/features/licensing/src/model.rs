use crate::lifecycle::LicenseAction;
use chrono::{DateTime, Utc};
use rego_derive::api_model;
use rego_domain::status::{LicenseClass, LicenseStatus, TestResult};
use rego_kernel::audit::{AuditTrail, StoredAudit};
use rego_kernel::reference::{RefField, TestSummary, UserSummary};
use rego_kernel::time;
use rego_kernel::validation::FieldErrors;
use serde::Deserialize;

#[api_model]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Applicant {
    #[serde(default)]
    pub full_name: String,
    #[serde(default, with = "time::lenient", skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLicense {
    pub status: LicenseStatus,
    #[serde(default)]
    pub operator_ref: RefField,
    #[serde(default)]
    pub applicant: Applicant,
    #[serde(default)]
    pub license_class: Option<LicenseClass>,
    #[serde(default)]
    pub assigned_license_number: Option<String>,
    #[serde(default)]
    pub test_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub revocation_reason: Option<String>,
    #[serde(default, with = "time::lenient")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

/// A `competencyTests` document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTest {
    #[serde(default)]
    pub application_ref: RefField,
    #[serde(default)]
    pub examiner_ref: RefField,
    #[serde(default, with = "time::lenient")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub result: Option<TestResult>,
    #[serde(default)]
    pub score: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

#[api_model]
#[derive(Clone)]
pub struct LicenseView {
    pub id: String,
    pub status: LicenseStatus,
    pub operator: Option<UserSummary>,
    pub applicant: Applicant,
    pub license_class: Option<LicenseClass>,
    pub assigned_license_number: Option<String>,
    pub test: Option<TestSummary>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub rejection_reason: Option<String>,
    pub revocation_reason: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserSummary>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub audit: AuditTrail,
    pub actions: Vec<LicenseAction>,
}

#[api_model(deny_unknown_fields = true)]
pub struct CreateLicenseRequest {
    /// Links the application to an existing user.
    #[serde(default)]
    pub operator_id: Option<String>,
    pub applicant: Applicant,
    pub license_class: LicenseClass,
}

#[api_model(deny_unknown_fields = true)]
pub struct UpdateLicenseRequest {
    #[serde(default)]
    pub applicant: Option<Applicant>,
    #[serde(default)]
    pub license_class: Option<LicenseClass>,
}

/// Body of `POST /api/operator-licenses/{id}/transitions`.
#[api_model]
#[derive(Clone)]
#[serde(tag = "action")]
pub enum LicenseCommand {
    Submit,
    BeginReview,
    RequestInfo {
        note: String,
    },
    Resubmit,
    RequireTest,
    ScheduleTest {
        #[serde(rename = "examinerId")]
        examiner_id: String,
        #[serde(rename = "scheduledDate")]
        scheduled_date: DateTime<Utc>,
        location: String,
    },
    RecordTestPass {
        #[serde(default)]
        score: Option<u32>,
        #[serde(default)]
        notes: Option<String>,
    },
    RecordTestFail {
        #[serde(default)]
        score: Option<u32>,
        #[serde(default)]
        notes: Option<String>,
    },
    Approve {
        #[serde(default, rename = "effectiveDate")]
        effective_date: Option<DateTime<Utc>>,
        #[serde(default, rename = "termMonths")]
        term_months: Option<u32>,
    },
    Reject {
        reason: String,
    },
    Revoke {
        reason: String,
    },
    Expire,
}

impl LicenseCommand {
    #[must_use]
    pub const fn action(&self) -> LicenseAction {
        match self {
            Self::Submit => LicenseAction::Submit,
            Self::BeginReview => LicenseAction::BeginReview,
            Self::RequestInfo { .. } => LicenseAction::RequestInfo,
            Self::Resubmit => LicenseAction::Resubmit,
            Self::RequireTest => LicenseAction::RequireTest,
            Self::ScheduleTest { .. } => LicenseAction::ScheduleTest,
            Self::RecordTestPass { .. } => LicenseAction::RecordTestPass,
            Self::RecordTestFail { .. } => LicenseAction::RecordTestFail,
            Self::Approve { .. } => LicenseAction::Approve,
            Self::Reject { .. } => LicenseAction::Reject,
            Self::Revoke { .. } => LicenseAction::Revoke,
            Self::Expire => LicenseAction::Expire,
        }
    }
}

pub fn validate(applicant: &Applicant, errors: &mut FieldErrors) {
    errors.require(Some(applicant.full_name.as_str()), "applicant.fullName");
    if let Some(email) = &applicant.email {
        errors.check(email.contains('@'), "applicant.email", "must be an email address");
    }
    if let Some(born) = applicant.date_of_birth {
        errors.check(born < time::now(), "applicant.dateOfBirth", "must be in the past");
    }
}
