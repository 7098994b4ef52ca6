use crate::lifecycle::RegistrationAction;
use chrono::{DateTime, Utc};
use rego_derive::api_model;
use rego_domain::status::{OwnerType, RegistrationStatus};
use rego_kernel::audit::{AuditTrail, StoredAudit};
use rego_kernel::reference::{RefField, UserSummary};
use rego_kernel::time;
use rego_kernel::validation::FieldErrors;
use serde::Deserialize;

#[api_model]
#[derive(Clone, Default, PartialEq)]
pub struct Craft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hull_identification_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propulsion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hull_material: Option<String>,
}

#[api_model]
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Owner {
    #[serde(default)]
    pub owner_type: Option<OwnerType>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A registration document as stored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRegistration {
    pub status: RegistrationStatus,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub craft: Craft,
    #[serde(default)]
    pub owners: Vec<Owner>,
    #[serde(default, with = "time::lenient")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, with = "time::lenient")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub approved_by_ref: RefField,
    #[serde(default)]
    pub review_note: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub audit: StoredAudit,
}

impl StoredRegistration {
    #[must_use]
    pub fn primary_owner(&self) -> Option<&Owner> {
        self.owners.iter().find(|owner| owner.owner_type == Some(OwnerType::Primary))
    }
}

#[api_model]
#[derive(Clone)]
pub struct RegistrationView {
    pub id: String,
    pub status: RegistrationStatus,
    pub registration_number: Option<String>,
    pub craft: Craft,
    pub owners: Vec<Owner>,
    pub effective_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserSummary>,
    pub review_note: Option<String>,
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub audit: AuditTrail,
    /// Actions the caller may take now.
    pub actions: Vec<RegistrationAction>,
}

#[api_model(deny_unknown_fields = true)]
pub struct CreateRegistrationRequest {
    pub craft: Craft,
    pub owners: Vec<Owner>,
}

#[api_model(deny_unknown_fields = true)]
pub struct UpdateRegistrationRequest {
    #[serde(default)]
    pub craft: Option<Craft>,
    #[serde(default)]
    pub owners: Option<Vec<Owner>>,
}

/// Body of `POST /api/registrations/{id}/transitions`.
#[api_model]
#[derive(Clone)]
#[serde(tag = "action")]
pub enum RegistrationCommand {
    Submit,
    BeginReview,
    Approve {
        #[serde(default, rename = "effectiveDate")]
        effective_date: Option<DateTime<Utc>>,
        #[serde(default, rename = "termMonths")]
        term_months: Option<u32>,
    },
    Reject {
        reason: String,
    },
    RequestInfo {
        note: String,
    },
    Resubmit,
    Expire,
}

impl RegistrationCommand {
    #[must_use]
    pub const fn action(&self) -> RegistrationAction {
        match self {
            Self::Submit => RegistrationAction::Submit,
            Self::BeginReview => RegistrationAction::BeginReview,
            Self::Approve { .. } => RegistrationAction::Approve,
            Self::Reject { .. } => RegistrationAction::Reject,
            Self::RequestInfo { .. } => RegistrationAction::RequestInfo,
            Self::Resubmit => RegistrationAction::Resubmit,
            Self::Expire => RegistrationAction::Expire,
        }
    }
}

/// Checks craft details and the owner list, recording every problem.
pub fn validate(craft: &Craft, owners: &[Owner], errors: &mut FieldErrors) {
    errors.require(Some(craft.name.as_str()), "craft.name");
    errors.require(
        Some(craft.hull_identification_number.as_str()),
        "craft.hullIdentificationNumber",
    );
    if let Some(length) = craft.length_meters {
        errors.check(length.is_finite() && length > 0.0, "craft.lengthMeters", "must be positive");
    }

    errors.check(!owners.is_empty(), "owners", "at least one owner is required");
    let primaries =
        owners.iter().filter(|owner| owner.owner_type == Some(OwnerType::Primary)).count();
    if !owners.is_empty() {
        errors.check(primaries == 1, "owners", "exactly one owner must be Primary");
    }
    for (index, owner) in owners.iter().enumerate() {
        errors.require(Some(owner.name.as_str()), format!("owners[{index}].name"));
        errors.check(
            owner.owner_type.is_some(),
            format!("owners[{index}].ownerType"),
            "is required",
        );
        if let Some(email) = &owner.email {
            errors.check(
                email.contains('@'),
                format!("owners[{index}].email"),
                "must be an email address",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner(owner_type: OwnerType, name: &str) -> Owner {
        Owner { owner_type: Some(owner_type), name: name.into(), ..Owner::default() }
    }

    fn craft() -> Craft {
        Craft {
            name: "Gull".into(),
            hull_identification_number: "HIN-1".into(),
            ..Craft::default()
        }
    }

    #[test]
    fn exactly_one_primary_owner() {
        let mut errors = FieldErrors::new();
        validate(
            &craft(),
            &[owner(OwnerType::Primary, "A"), owner(OwnerType::CoOwner, "B")],
            &mut errors,
        );
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        validate(
            &craft(),
            &[owner(OwnerType::Primary, "A"), owner(OwnerType::Primary, "B")],
            &mut errors,
        );
        assert_eq!(errors.as_slice()[0].field, "owners");

        let mut errors = FieldErrors::new();
        validate(&craft(), &[owner(OwnerType::CoOwner, "B")], &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn every_problem_is_reported() {
        let mut errors = FieldErrors::new();
        validate(&Craft::default(), &[Owner::default()], &mut errors);
        let fields: Vec<&str> = errors.as_slice().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            [
                "craft.name",
                "craft.hullIdentificationNumber",
                "owners",
                "owners[0].name",
                "owners[0].ownerType"
            ]
        );
    }

    #[test]
    fn commands_are_tagged_by_action() {
        let command: RegistrationCommand =
            serde_json::from_value(json!({ "action": "Approve", "termMonths": 24 })).unwrap();
        assert_eq!(command.action(), RegistrationAction::Approve);
        assert!(matches!(command, RegistrationCommand::Approve { term_months: Some(24), .. }));

        let command: RegistrationCommand =
            serde_json::from_value(json!({ "action": "Reject", "reason": "Bad HIN" })).unwrap();
        assert_eq!(command.action(), RegistrationAction::Reject);
    }

    #[test]
    fn stored_documents_tolerate_odd_shapes() {
        let stored: StoredRegistration = serde_json::from_value(json!({
            "status": "Approved",
            "craft": { "name": "Gull", "hullIdentificationNumber": "HIN-1" },
            "owners": [{ "ownerType": "Primary", "name": "A" }],
            "expiryDate": { "_seconds": 1_800_000_000, "_nanoseconds": 0 },
            "approvedAt": "garbage",
            "approvedByRef": "users/sup",
        }))
        .unwrap();
        assert!(stored.expiry_date.is_some());
        assert!(stored.approved_at.is_none());
        assert_eq!(stored.approved_by_ref.id(), Some("sup"));
        assert_eq!(stored.primary_owner().map(|o| o.name.as_str()), Some("A"));
    }
}
