//! Closed status sets and the small enumerations records carry.
//!
//! Variant names are persisted verbatim, so renaming one is a data migration.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

macro_rules! record_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            Display,
            AsRefStr,
            EnumIter,
            EnumString,
        )]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub enum $name {
            $($variant),+
        }
    };
}

record_enum! {
    /// Registration lifecycle. A new record starts at `Draft`.
    RegistrationStatus {
        Draft,
        Submitted,
        PendingReview,
        Approved,
        Rejected,
        Expired,
        RequiresInfo,
    }
}

record_enum! {
    /// Inspection lifecycle. A new record starts at `Scheduled`.
    InspectionStatus {
        Scheduled,
        InProgress,
        PendingReview,
        Passed,
        Failed,
        Cancelled,
    }
}

record_enum! {
    /// Operator licence application lifecycle. A new record starts at `Draft`.
    LicenseStatus {
        Draft,
        Submitted,
        PendingReview,
        RequiresInfo,
        AwaitingTest,
        TestScheduled,
        TestPassed,
        TestFailed,
        Approved,
        Rejected,
        Expired,
        Revoked,
    }
}

record_enum! {
    /// Infringement notice lifecycle. A new record starts at `Draft`.
    InfringementStatus {
        Draft,
        Issued,
        PendingReview,
        Approved,
        Paid,
        Voided,
        Overdue,
    }
}

record_enum! {
    InspectionType { Initial, Annual, Renewal, Compliance }
}

record_enum! {
    /// Set by the inspector by hand. Nothing derives it from checklist items.
    OverallResult { Pass, Fail, Conditional }
}

record_enum! {
    LicenseClass { General, Commercial, PersonalWatercraft }
}

record_enum! {
    TestResult { Pass, Fail }
}

record_enum! {
    OwnerType { Primary, CoOwner }
}

/// Assessment of a single checklist item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ChecklistResult {
    Yes,
    No,
    #[serde(rename = "N/A")]
    #[strum(serialize = "N/A")]
    NotApplicable,
}

/// The first value of every status set, used on create.
pub trait InitialStatus: Sized {
    const INITIAL: Self;
}

impl InitialStatus for RegistrationStatus {
    const INITIAL: Self = Self::Draft;
}

impl InitialStatus for InspectionStatus {
    const INITIAL: Self = Self::Scheduled;
}

impl InitialStatus for LicenseStatus {
    const INITIAL: Self = Self::Draft;
}

impl InitialStatus for InfringementStatus {
    const INITIAL: Self = Self::Draft;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn initial_status_is_first_variant() {
        assert_eq!(RegistrationStatus::iter().next(), Some(RegistrationStatus::INITIAL));
        assert_eq!(InspectionStatus::iter().next(), Some(InspectionStatus::INITIAL));
        assert_eq!(LicenseStatus::iter().next(), Some(LicenseStatus::INITIAL));
        assert_eq!(InfringementStatus::iter().next(), Some(InfringementStatus::INITIAL));
    }

    #[test]
    fn not_applicable_uses_slash_form() {
        assert_eq!(ChecklistResult::NotApplicable.to_string(), "N/A");
        assert_eq!(ChecklistResult::from_str("N/A").ok(), Some(ChecklistResult::NotApplicable));
    }

    #[test]
    fn status_strings_match_display() {
        for status in LicenseStatus::iter() {
            assert_eq!(status.as_ref(), status.to_string());
        }
    }
}
