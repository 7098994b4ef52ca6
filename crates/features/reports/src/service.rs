use crate::report::Report;
use chrono::{DateTime, Utc};
use futures::join;
use fxhash::FxHashMap;
use rego_database::Filter;
use rego_derive::api_model;
use rego_domain::constants::Collection;
use rego_domain::roles::RoleSet;
use rego_domain::status::RegistrationStatus;
use rego_infringement::Totals;
use rego_infringement::model::StoredInfringement;
use rego_inspection::model::StoredInspection;
use rego_kernel::ServiceError;
use rego_kernel::context::RequestContext;
use rego_kernel::csv::CsvWriter;
use rego_kernel::reference::{RegistrationSummary, UserSummary, resolve_many};
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::time;
use rego_licensing::model::StoredLicense;
use rego_registration::model::StoredRegistration;
use std::fmt::Display;
use tracing::{info, instrument};

type Row = FxHashMap<&'static str, String>;

/// What an export produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutput {
    Csv { filename: String, body: String, rows: usize },
    Empty(EmptyReport),
}

/// Returned in place of a file when nothing matched.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct EmptyReport {
    pub notice: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct ReportService {
    repo: Repository,
}

impl ReportService {
    #[must_use]
    pub const fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Builds `report` with the requested columns, in the requested order.
    #[instrument(skip(self, ctx), fields(user = ctx.user_id(), report = %report), err)]
    pub async fn export(
        &self,
        ctx: &RequestContext,
        report: Report,
        columns: Option<&str>,
    ) -> Result<ReportOutput, ServiceError> {
        ctx.require(RoleSet::OFFICE, "export reports")?;
        let columns = report.select(columns)?;

        let rows = match report {
            Report::CurrentRegistrations => self.current_registrations(time::now()).await?,
            Report::Inspections => self.inspections().await?,
            Report::Infringements => self.infringements().await?,
            Report::OperatorLicenses => self.operator_licenses().await?,
        };

        if rows.is_empty() {
            info!("No records to export");
            return Ok(ReportOutput::Empty(EmptyReport {
                notice: format!("No records match the {report} report."),
                rows: 0,
            }));
        }

        let mut csv = CsvWriter::with_header(columns.iter().copied());
        for row in &rows {
            csv.row(columns.iter().map(|column| row.get(column).map_or("", String::as_str)));
        }
        let count = csv.rows();
        info!(rows = count, columns = columns.len(), "Report exported");
        Ok(ReportOutput::Csv {
            filename: format!("{report}-{}.csv", time::now().format("%Y%m%d")),
            body: csv.finish(),
            rows: count,
        })
    }

    /// Approved registrations whose term has not run out at `now`.
    async fn current_registrations(&self, now: DateTime<Utc>) -> Result<Vec<Row>, ServiceError> {
        let filter = Filter::all().eq("status", RegistrationStatus::Approved.as_ref());
        let records = self.repo
            .list::<StoredRegistration>(Collection::Registrations, &filter)
            .await?;

        Ok(records
            .into_iter()
            .filter(|stored| stored.record.expiry_date.is_none_or(|expiry| expiry >= now))
            .map(|Stored { record, .. }| {
                let owner = record
                    .primary_owner()
                    .or_else(|| record.owners.first())
                    .cloned()
                    .unwrap_or_default();
                let craft = record.craft;
                let mut row = Row::default();
                put(&mut row, "registrationNumber", record.registration_number);
                row.insert("craftName", craft.name);
                row.insert("hullIdentificationNumber", craft.hull_identification_number);
                put(&mut row, "make", craft.make);
                put(&mut row, "model", craft.model);
                put(&mut row, "lengthMeters", craft.length_meters);
                put(&mut row, "propulsion", craft.propulsion);
                row.insert("primaryOwnerName", owner.name);
                put(&mut row, "primaryOwnerEmail", owner.email);
                put(&mut row, "primaryOwnerPhone", owner.phone);
                row.insert("status", record.status.to_string());
                put_date(&mut row, "effectiveDate", record.effective_date);
                put_date(&mut row, "expiryDate", record.expiry_date);
                row
            })
            .collect())
    }

    async fn inspections(&self) -> Result<Vec<Row>, ServiceError> {
        let records = self.repo
            .list::<StoredInspection>(Collection::Inspections, &Filter::all())
            .await?;
        let store = self.repo.store();
        let registration_refs: Vec<_> = records
            .iter()
            .map(|r| &r.record.registration_ref)
            .collect();
        let inspector_refs: Vec<_> = records.iter().map(|r| &r.record.inspector_ref).collect();
        let (registrations, inspectors) = join!(
            resolve_many::<RegistrationSummary>(store, &registration_refs),
            resolve_many::<UserSummary>(store, &inspector_refs),
        );

        Ok(records
            .into_iter()
            .zip(registrations.into_iter().zip(inspectors))
            .map(|(Stored { id, record }, (registration, inspector))| {
                let mut row = Row::default();
                row.insert("id", id);
                put_registration(&mut row, registration);
                put(&mut row, "inspectorName", display_name(inspector));
                put(&mut row, "inspectionType", record.inspection_type);
                put_date(&mut row, "scheduledDate", record.scheduled_date);
                row.insert("status", record.status.to_string());
                put(&mut row, "overallResult", record.overall_result);
                put_date(&mut row, "completedAt", record.completed_at);
                row
            })
            .collect())
    }

    async fn infringements(&self) -> Result<Vec<Row>, ServiceError> {
        let records = self.repo
            .list::<StoredInfringement>(Collection::Infringements, &Filter::all())
            .await?;
        let store = self.repo.store();
        let registration_refs: Vec<_> = records
            .iter()
            .map(|r| &r.record.registration_ref)
            .collect();
        let issuer_refs: Vec<_> = records.iter().map(|r| &r.record.issued_by_ref).collect();
        let (registrations, issuers) = join!(
            resolve_many::<RegistrationSummary>(store, &registration_refs),
            resolve_many::<UserSummary>(store, &issuer_refs),
        );

        Ok(records
            .into_iter()
            .zip(registrations.into_iter().zip(issuers))
            .map(|(Stored { id, record }, (registration, issuer))| {
                let totals = Totals::of(&record.items);
                let mut row = Row::default();
                row.insert("id", id);
                put_registration(&mut row, registration);
                put(&mut row, "issuedByName", display_name(issuer));
                put_date(&mut row, "offenceDate", record.offence_date);
                row.insert("status", record.status.to_string());
                row.insert("totalPoints", totals.total_points.to_string());
                row.insert("totalFineCents", totals.total_fine_cents.to_string());
                put_date(&mut row, "dueDate", record.due_date);
                row
            })
            .collect())
    }

    async fn operator_licenses(&self) -> Result<Vec<Row>, ServiceError> {
        let records = self
            .repo
            .list::<StoredLicense>(Collection::OperatorLicenseApplications, &Filter::all())
            .await?;

        Ok(records
            .into_iter()
            .map(|Stored { id, record }| {
                let mut row = Row::default();
                row.insert("id", id);
                row.insert("applicantName", record.applicant.full_name);
                put(&mut row, "licenseClass", record.license_class);
                row.insert("status", record.status.to_string());
                put(&mut row, "assignedLicenseNumber", record.assigned_license_number);
                put_date(&mut row, "effectiveDate", record.effective_date);
                put_date(&mut row, "expiryDate", record.expiry_date);
                row
            })
            .collect())
    }
}

fn put<T: Display>(row: &mut Row, column: &'static str, value: Option<T>) {
    if let Some(value) = value {
        row.insert(column, value.to_string());
    }
}

fn put_date(row: &mut Row, column: &'static str, value: Option<DateTime<Utc>>) {
    if let Some(Some(text)) = value.map(|at| time::to_value(at).as_str().map(str::to_owned)) {
        row.insert(column, text);
    }
}

fn put_registration(row: &mut Row, registration: Option<RegistrationSummary>) {
    if let Some(registration) = registration {
        put(row, "registrationNumber", registration.registration_number);
        put(row, "craftName", registration.craft_name);
    }
}

fn display_name(user: Option<UserSummary>) -> Option<String> {
    user.map(|user| user.display_name.unwrap_or(user.id))
}
