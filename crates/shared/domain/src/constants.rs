//! Collection names and OpenAPI tags.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

pub const USERS: &str = "users";
pub const REGISTRATIONS: &str = "registrations";
pub const INSPECTIONS: &str = "inspections";
pub const INFRINGEMENTS: &str = "infringements";
pub const OPERATOR_LICENSE_APPLICATIONS: &str = "operatorLicenseApplications";
pub const COMPETENCY_TESTS: &str = "competencyTests";

pub const SYSTEM_TAG: &str = "System";
pub const IDENTITY_TAG: &str = "Identity";
pub const REGISTRATION_TAG: &str = "Registrations";
pub const INSPECTION_TAG: &str = "Inspections";
pub const LICENSING_TAG: &str = "Operator Licences";
pub const INFRINGEMENT_TAG: &str = "Infringements";
pub const REPORT_TAG: &str = "Reports";

/// Every collection the application reads or writes.
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
    IntoStaticStr,
    EnumIter,
    EnumString,
)]
pub enum Collection {
    #[serde(rename = "users")]
    #[strum(serialize = "users")]
    Users,
    #[serde(rename = "registrations")]
    #[strum(serialize = "registrations")]
    Registrations,
    #[serde(rename = "inspections")]
    #[strum(serialize = "inspections")]
    Inspections,
    #[serde(rename = "infringements")]
    #[strum(serialize = "infringements")]
    Infringements,
    #[serde(rename = "operatorLicenseApplications")]
    #[strum(serialize = "operatorLicenseApplications")]
    OperatorLicenseApplications,
    #[serde(rename = "competencyTests")]
    #[strum(serialize = "competencyTests")]
    CompetencyTests,
}

impl Collection {
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}
