use crate::lifecycle::{LicenseAction, LicenseLifecycle};
use crate::model::{
    CreateLicenseRequest, LicenseCommand, LicenseView, StoredLicense, StoredTest,
    UpdateLicenseRequest, validate,
};
use chrono::{DateTime, Datelike, Utc};
use futures::join;
use rego_database::{Body, DocumentStore, Filter};
use rego_domain::config::RecordsConfig;
use rego_domain::constants::Collection;
use rego_domain::roles::RoleSet;
use rego_domain::status::{InitialStatus, LicenseStatus, TestResult};
use rego_kernel::context::RequestContext;
use rego_kernel::lifecycle::{Actor, Lifecycle};
use rego_kernel::reference::{RefField, TestSummary, UserSummary, resolve, resolve_many};
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::security::resource::ResourceGuard;
use rego_kernel::validation::{self, FieldErrors};
use rego_kernel::{ServiceError, audit, record_number, time};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

const COLLECTION: Collection = Collection::OperatorLicenseApplications;

#[derive(Debug, Clone)]
pub struct LicenseService {
    repo: Repository,
    default_term_months: u32,
}

impl LicenseService {
    #[must_use]
    pub const fn new(repo: Repository, records: &RecordsConfig) -> Self {
        Self { repo, default_term_months: records.license_term_months }
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateLicenseRequest,
    ) -> Result<LicenseView, ServiceError> {
        ctx.require(RoleSet::OFFICE, "create licence applications")?;
        let mut errors = FieldErrors::new();
        validate(&request.applicant, &mut errors);
        let operator_id = match request.operator_id {
            Some(id) => {
                let id = ResourceGuard::verify(id, Collection::Users)?;
                let known = self.repo.store().get(Collection::Users, &id).await?.is_some();
                errors.check(known, "operatorId", format!("no users record with id '{id}'"));
                Some(id)
            }
            None => None,
        };
        errors.finish()?;

        let mut body = Body::new();
        body.insert("status".to_owned(), json!(LicenseStatus::INITIAL));
        body.insert("applicant".to_owned(), serde_json::to_value(&request.applicant)?);
        body.insert("licenseClass".to_owned(), json!(request.license_class));
        if let Some(id) = operator_id {
            body.insert(
                "operatorRef".to_owned(),
                RefField::pointer(Collection::Users, id).to_value(),
            );
        }
        let doc = self.repo.insert(COLLECTION, ctx, body).await?;
        self.get(ctx, &doc.id).await
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str) -> Result<LicenseView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredLicense>(COLLECTION, &id).await?;
        let record = &stored.record;
        let store = self.repo.store();
        let (operator, test, approved_by) = join!(
            resolve::<UserSummary>(store, &record.operator_ref),
            resolve::<TestSummary>(store, &record.test_ref),
            resolve::<UserSummary>(store, &record.approved_by_ref),
        );
        Ok(view(ctx, stored, operator, test, approved_by))
    }

    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<LicenseStatus>,
    ) -> Result<Vec<LicenseView>, ServiceError> {
        let filter = status.map_or_else(Filter::all, |s| Filter::all().eq("status", s.as_ref()));
        let records = self.repo.list::<StoredLicense>(COLLECTION, &filter).await?;
        let store = self.repo.store();

        let operator_refs: Vec<_> = records.iter().map(|r| &r.record.operator_ref).collect();
        let test_refs: Vec<_> = records.iter().map(|r| &r.record.test_ref).collect();
        let approver_refs: Vec<_> = records.iter().map(|r| &r.record.approved_by_ref).collect();
        let (operators, tests, approvers) = join!(
            resolve_many::<UserSummary>(store, &operator_refs),
            resolve_many::<TestSummary>(store, &test_refs),
            resolve_many::<UserSummary>(store, &approver_refs),
        );

        Ok(records
            .into_iter()
            .zip(operators)
            .zip(tests.into_iter().zip(approvers))
            .map(|((stored, operator), (test, approved_by))| {
                view(ctx, stored, operator, test, approved_by)
            })
            .collect())
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateLicenseRequest,
    ) -> Result<LicenseView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredLicense>(COLLECTION, &id).await?;
        let step = LicenseLifecycle::authorize(
            stored.record.status,
            LicenseAction::Edit,
            &Actor::new(ctx.role()),
        )?;

        let applicant = request.applicant.unwrap_or(stored.record.applicant);
        let mut errors = FieldErrors::new();
        validate(&applicant, &mut errors);
        errors.finish()?;

        let mut patch = Body::new();
        patch.insert("applicant".to_owned(), serde_json::to_value(&applicant)?);
        if let Some(class) = request.license_class {
            patch.insert("licenseClass".to_owned(), json!(class));
        }
        self.repo.apply(COLLECTION, &id, ctx, &step, time::now(), patch).await?;
        self.get(ctx, &id).await
    }

    #[instrument(
        skip(self, ctx, command),
        fields(user = ctx.user_id(), action = %command.action()),
        err
    )]
    pub async fn transition(
        &self,
        ctx: &RequestContext,
        id: &str,
        command: LicenseCommand,
    ) -> Result<LicenseView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredLicense>(COLLECTION, &id).await?;
        let record = &stored.record;
        let step = LicenseLifecycle::authorize(
            record.status,
            command.action(),
            &Actor::new(ctx.role()),
        )?;
        let now = time::now();

        let mut patch = Body::new();
        let mut test_result = None;
        let mut scheduled_test = None;
        match command {
            LicenseCommand::Submit | LicenseCommand::Resubmit => {
                let mut errors = FieldErrors::new();
                validate(&record.applicant, &mut errors);
                errors.check(record.license_class.is_some(), "licenseClass", "is required");
                errors.finish()?;
                patch.insert("submittedAt".to_owned(), time::to_value(now));
            }
            LicenseCommand::BeginReview | LicenseCommand::RequireTest | LicenseCommand::Expire => {}
            LicenseCommand::RequestInfo { note } => {
                patch.insert(
                    "reviewNote".to_owned(),
                    Value::String(validation::required(&note, "note")?),
                );
            }
            LicenseCommand::ScheduleTest { examiner_id, scheduled_date, location } => {
                let test_id = self
                    .schedule_test(ctx, &id, &examiner_id, scheduled_date, &location)
                    .await?;
                patch.insert(
                    "testRef".to_owned(),
                    RefField::pointer(Collection::CompetencyTests, test_id.as_str()).to_value(),
                );
                scheduled_test = Some(test_id);
            }
            LicenseCommand::RecordTestPass { score, notes } => {
                let recorded = self.test_patch(ctx, record, TestResult::Pass, score, notes).await?;
                test_result = Some(recorded);
            }
            LicenseCommand::RecordTestFail { score, notes } => {
                let recorded = self.test_patch(ctx, record, TestResult::Fail, score, notes).await?;
                test_result = Some(recorded);
            }
            LicenseCommand::Approve { effective_date, term_months } => {
                let effective = effective_date.unwrap_or(now);
                let expiry = expiry_after(
                    effective,
                    term_months.unwrap_or(self.default_term_months),
                )?;
                audit::stamp_action(&mut patch, ctx, now, "approved");
                patch.insert("effectiveDate".to_owned(), time::to_value(effective));
                patch.insert("expiryDate".to_owned(), time::to_value(expiry));
                if record.assigned_license_number.is_none() {
                    let number = record_number!("OL", effective.year());
                    info!(%id, %number, "Licence number assigned");
                    patch.insert("assignedLicenseNumber".to_owned(), Value::String(number));
                }
            }
            LicenseCommand::Reject { reason } => {
                patch.insert(
                    "rejectionReason".to_owned(),
                    Value::String(validation::required(&reason, "reason")?),
                );
            }
            LicenseCommand::Revoke { reason } => {
                audit::stamp_action(&mut patch, ctx, now, "revoked");
                patch.insert(
                    "revocationReason".to_owned(),
                    Value::String(validation::required(&reason, "reason")?),
                );
            }
        }

        if let Err(err) = self.repo.apply(COLLECTION, &id, ctx, &step, now, patch).await {
            if let Some(test_id) = scheduled_test {
                self.discard_test(&test_id).await;
            }
            return Err(err);
        }
        if let Some((test_id, result)) = test_result {
            self.repo.patch(Collection::CompetencyTests, &test_id, result).await?;
            info!(%id, %test_id, "Competency test result recorded");
        }
        self.get(ctx, &id).await
    }

    /// Creates the `competencyTests` document for a ScheduleTest action.
    async fn schedule_test(
        &self,
        ctx: &RequestContext,
        application_id: &str,
        examiner_id: &str,
        scheduled_date: DateTime<Utc>,
        location: &str,
    ) -> Result<String, ServiceError> {
        let mut errors = FieldErrors::new();
        errors.require(Some(examiner_id), "examinerId");
        errors.require(Some(location), "location");
        errors.finish()?;
        let examiner_id = ResourceGuard::verify(examiner_id.trim(), Collection::Users)?;
        if self.repo.store().get(Collection::Users, &examiner_id).await?.is_none() {
            return Err(FieldErrors::single(
                "examinerId",
                format!("no users record with id '{examiner_id}'"),
            ));
        }

        let mut body = Body::new();
        body.insert(
            "applicationRef".to_owned(),
            RefField::pointer(COLLECTION, application_id).to_value(),
        );
        body.insert(
            "examinerRef".to_owned(),
            RefField::pointer(Collection::Users, examiner_id).to_value(),
        );
        body.insert("scheduledDate".to_owned(), time::to_value(scheduled_date));
        body.insert("location".to_owned(), Value::String(location.trim().to_owned()));
        let doc = self.repo.insert(Collection::CompetencyTests, ctx, body).await?;
        Ok(doc.id)
    }

    /// Drops a test document whose application write did not land.
    async fn discard_test(&self, test_id: &str) {
        match self.repo.store().delete(Collection::CompetencyTests, test_id).await {
            Ok(()) => info!(%test_id, "Unlinked competency test discarded"),
            Err(error) => warn!(%test_id, %error, "Unlinked competency test left behind"),
        }
    }

    /// The write that records a result on the application's current test.
    async fn test_patch(
        &self,
        ctx: &RequestContext,
        record: &StoredLicense,
        result: TestResult,
        score: Option<u32>,
        notes: Option<String>,
    ) -> Result<(String, Body), ServiceError> {
        let Some(test_id) = record.test_ref.id_in(Collection::CompetencyTests) else {
            return Err(ServiceError::Conflict {
                message: "The application has no scheduled competency test".into(),
                context: None,
            });
        };
        let test = self.repo.fetch::<StoredTest>(Collection::CompetencyTests, test_id).await?;
        if let Some(previous) = test.record.result {
            return Err(ServiceError::Conflict {
                message: format!("Competency test {test_id} already recorded as {previous}").into(),
                context: None,
            });
        }

        let mut patch = Body::new();
        patch.insert("result".to_owned(), json!(result));
        patch.insert("score".to_owned(), json!(score));
        patch.insert("notes".to_owned(), notes.map_or(Value::Null, Value::String));
        audit::stamp_action(&mut patch, ctx, time::now(), "recorded");
        audit::stamp_updated(&mut patch, ctx, time::now());
        Ok((test.id, patch))
    }
}

fn expiry_after(effective: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, ServiceError> {
    if months == 0 {
        return Err(FieldErrors::single("termMonths", "must be at least 1"));
    }
    time::add_months(effective, months)
        .ok_or_else(|| FieldErrors::single("termMonths", "is out of range"))
}

fn view(
    ctx: &RequestContext,
    stored: Stored<StoredLicense>,
    operator: Option<UserSummary>,
    test: Option<TestSummary>,
    approved_by: Option<UserSummary>,
) -> LicenseView {
    let Stored { id, record } = stored;
    LicenseView {
        actions: LicenseLifecycle::permitted_actions(record.status, &Actor::new(ctx.role())),
        id,
        status: record.status,
        operator,
        applicant: record.applicant,
        license_class: record.license_class,
        assigned_license_number: record.assigned_license_number,
        test,
        submitted_at: record.submitted_at,
        review_note: record.review_note,
        rejection_reason: record.rejection_reason,
        revocation_reason: record.revocation_reason,
        approved_at: record.approved_at,
        approved_by,
        effective_date: record.effective_date,
        expiry_date: record.expiry_date,
        audit: (&record.audit).into(),
    }
}
