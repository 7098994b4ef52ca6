//! Report kinds, their fixed column sets and caller column selection.

use rego_derive::api_model;
use rego_kernel::ServiceError;
use rego_kernel::validation::FieldErrors;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[api_model]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Report {
    CurrentRegistrations,
    Inspections,
    Infringements,
    OperatorLicenses,
}

const CURRENT_REGISTRATIONS: &[&str] = &[
    "registrationNumber",
    "craftName",
    "hullIdentificationNumber",
    "make",
    "model",
    "lengthMeters",
    "propulsion",
    "primaryOwnerName",
    "primaryOwnerEmail",
    "primaryOwnerPhone",
    "status",
    "effectiveDate",
    "expiryDate",
];

const INSPECTIONS: &[&str] = &[
    "id",
    "registrationNumber",
    "craftName",
    "inspectorName",
    "inspectionType",
    "scheduledDate",
    "status",
    "overallResult",
    "completedAt",
];

const INFRINGEMENTS: &[&str] = &[
    "id",
    "registrationNumber",
    "craftName",
    "issuedByName",
    "offenceDate",
    "status",
    "totalPoints",
    "totalFineCents",
    "dueDate",
];

const OPERATOR_LICENSES: &[&str] = &[
    "id",
    "applicantName",
    "licenseClass",
    "status",
    "assignedLicenseNumber",
    "effectiveDate",
    "expiryDate",
];

impl Report {
    /// Every column, in default order.
    #[must_use]
    pub const fn columns(self) -> &'static [&'static str] {
        match self {
            Self::CurrentRegistrations => CURRENT_REGISTRATIONS,
            Self::Inspections => INSPECTIONS,
            Self::Infringements => INFRINGEMENTS,
            Self::OperatorLicenses => OPERATOR_LICENSES,
        }
    }

    /// Resolves a `columns=a,b,c` selection. Blank or absent means every column.
    pub fn select(self, requested: Option<&str>) -> Result<Vec<&'static str>, ServiceError> {
        let names: Vec<&str> =
            requested
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect();
        if names.is_empty() {
            return Ok(self.columns().to_vec());
        }

        let mut errors = FieldErrors::new();
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match self.columns().iter().find(|column| **column == name) {
                Some(column) => selected.push(*column),
                None => {
                    errors.push("columns", format!("unknown column '{name}' for report '{self}'"));
                }
            }
        }
        errors.finish()?;
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_are_kebab_case() {
        assert_eq!(
            Report::from_str("current-registrations").ok(),
            Some(Report::CurrentRegistrations)
        );
        assert_eq!(Report::OperatorLicenses.to_string(), "operator-licenses");
        assert!(Report::from_str("CurrentRegistrations").is_err());
    }

    #[test]
    fn current_registrations_has_thirteen_columns() {
        assert_eq!(Report::CurrentRegistrations.columns().len(), 13);
    }

    #[test]
    fn selection_keeps_caller_order() {
        let selected = Report::Inspections.select(Some("status, id,craftName")).unwrap();
        assert_eq!(selected, ["status", "id", "craftName"]);
        assert_eq!(Report::Inspections.select(None).unwrap(), INSPECTIONS);
        assert_eq!(Report::Inspections.select(Some(" , ")).unwrap(), INSPECTIONS);
    }

    #[test]
    fn unknown_columns_are_all_reported() {
        let err = Report::Infringements.select(Some("id,bogus,alsoBogus")).unwrap_err();
        let ServiceError::Validation { fields, .. } = err else {
            panic!("expected validation error, got {err:?}");
        };
        let messages: Vec<&str> = fields.as_slice().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, [
            "unknown column 'bogus' for report 'infringements'",
            "unknown column 'alsoBogus' for report 'infringements'"
        ]);
        assert!(fields.as_slice().iter().all(|e| e.field == "columns"));
    }

    #[test]
    fn columns_are_unique_per_report() {
        for report in Report::iter() {
            let mut columns = report.columns().to_vec();
            columns.sort_unstable();
            columns.dedup();
            assert_eq!(columns.len(), report.columns().len(), "{report}");
        }
    }
}
