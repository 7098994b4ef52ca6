use crate::lifecycle::{RegistrationAction, RegistrationLifecycle};
use crate::model::{
    CreateRegistrationRequest, RegistrationCommand, RegistrationView, StoredRegistration,
    UpdateRegistrationRequest, validate,
};
use chrono::{DateTime, Datelike, Utc};
use rego_database::{Body, Filter};
use rego_domain::config::RecordsConfig;
use rego_domain::constants::Collection;
use rego_domain::roles::RoleSet;
use rego_domain::status::{InitialStatus, RegistrationStatus};
use rego_kernel::context::RequestContext;
use rego_kernel::lifecycle::{Actor, Lifecycle};
use rego_kernel::reference::{UserSummary, resolve, resolve_many};
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::security::resource::ResourceGuard;
use rego_kernel::validation::{self, FieldErrors};
use rego_kernel::{ServiceError, audit, record_number, time};
use serde_json::{Value, json};
use tracing::{info, instrument};

const COLLECTION: Collection = Collection::Registrations;

#[derive(Debug, Clone)]
pub struct RegistrationService {
    repo: Repository,
    default_term_months: u32,
}

impl RegistrationService {
    #[must_use]
    pub const fn new(repo: Repository, records: &RecordsConfig) -> Self {
        Self { repo, default_term_months: records.registration_term_months }
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateRegistrationRequest,
    ) -> Result<RegistrationView, ServiceError> {
        ctx.require(RoleSet::OFFICE, "create registrations")?;
        let mut errors = FieldErrors::new();
        validate(&request.craft, &request.owners, &mut errors);
        errors.finish()?;

        let mut body = Body::new();
        body.insert("status".to_owned(), json!(RegistrationStatus::INITIAL));
        body.insert("craft".to_owned(), serde_json::to_value(&request.craft)?);
        body.insert("owners".to_owned(), serde_json::to_value(&request.owners)?);
        let doc = self.repo.insert(COLLECTION, ctx, body).await?;
        self.get(ctx, &doc.id).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<RegistrationView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredRegistration>(COLLECTION, &id).await?;
        let approved_by =
            resolve::<UserSummary>(self.repo.store(), &stored.record.approved_by_ref).await;
        Ok(view(ctx, stored, approved_by))
    }

    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<RegistrationView>, ServiceError> {
        let filter = status.map_or_else(Filter::all, |s| Filter::all().eq("status", s.as_ref()));
        let records = self.repo.list::<StoredRegistration>(COLLECTION, &filter).await?;
        let refs: Vec<_> = records.iter().map(|r| &r.record.approved_by_ref).collect();
        let approvers = resolve_many::<UserSummary>(self.repo.store(), &refs).await;
        Ok(records
            .into_iter()
            .zip(approvers)
            .map(|(stored, approved_by)| view(ctx, stored, approved_by))
            .collect())
    }

    /// Replaces craft details and/or owners while the record is editable.
    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateRegistrationRequest,
    ) -> Result<RegistrationView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredRegistration>(COLLECTION, &id).await?;
        let step = RegistrationLifecycle::authorize(
            stored.record.status,
            RegistrationAction::Edit,
            &Actor::new(ctx.role()),
        )?;

        let craft = request.craft.unwrap_or(stored.record.craft);
        let owners = request.owners.unwrap_or(stored.record.owners);
        let mut errors = FieldErrors::new();
        validate(&craft, &owners, &mut errors);
        errors.finish()?;

        let mut patch = Body::new();
        patch.insert("craft".to_owned(), serde_json::to_value(&craft)?);
        patch.insert("owners".to_owned(), serde_json::to_value(&owners)?);
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
        command: RegistrationCommand,
    ) -> Result<RegistrationView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredRegistration>(COLLECTION, &id).await?;
        let record = &stored.record;
        let step = RegistrationLifecycle::authorize(
            record.status,
            command.action(),
            &Actor::new(ctx.role()),
        )?;
        let now = time::now();

        let mut patch = Body::new();
        match command {
            RegistrationCommand::Submit | RegistrationCommand::Resubmit => {
                let mut errors = FieldErrors::new();
                validate(&record.craft, &record.owners, &mut errors);
                errors.finish()?;
                patch.insert("submittedAt".to_owned(), time::to_value(now));
            }
            RegistrationCommand::BeginReview | RegistrationCommand::Expire => {}
            RegistrationCommand::Approve { effective_date, term_months } => {
                let effective = effective_date.unwrap_or(now);
                let expiry = expiry_after(
                    effective,
                    term_months.unwrap_or(self.default_term_months),
                )?;
                audit::stamp_action(&mut patch, ctx, now, "approved");
                patch.insert("effectiveDate".to_owned(), time::to_value(effective));
                patch.insert("expiryDate".to_owned(), time::to_value(expiry));
                if record.registration_number.is_none() {
                    let number = record_number!("RC", effective.year());
                    info!(%id, %number, "Registration number assigned");
                    patch.insert("registrationNumber".to_owned(), Value::String(number));
                }
            }
            RegistrationCommand::Reject { reason } => {
                patch.insert(
                    "rejectionReason".to_owned(),
                    Value::String(validation::required(&reason, "reason")?),
                );
            }
            RegistrationCommand::RequestInfo { note } => {
                patch.insert(
                    "reviewNote".to_owned(),
                    Value::String(validation::required(&note, "note")?),
                );
            }
        }

        self.repo.apply(COLLECTION, &id, ctx, &step, now, patch).await?;
        self.get(ctx, &id).await
    }
}

/// End of a term of `months` starting at `effective`.
fn expiry_after(effective: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, ServiceError> {
    if months == 0 {
        return Err(FieldErrors::single("termMonths", "must be at least 1"));
    }
    time::add_months(effective, months)
        .ok_or_else(|| FieldErrors::single("termMonths", "is out of range"))
}

fn view(
    ctx: &RequestContext,
    stored: Stored<StoredRegistration>,
    approved_by: Option<UserSummary>,
) -> RegistrationView {
    let Stored { id, record } = stored;
    RegistrationView {
        actions: RegistrationLifecycle::permitted_actions(record.status, &Actor::new(ctx.role())),
        id,
        status: record.status,
        registration_number: record.registration_number,
        craft: record.craft,
        owners: record.owners,
        effective_date: record.effective_date,
        expiry_date: record.expiry_date,
        submitted_at: record.submitted_at,
        approved_at: record.approved_at,
        approved_by,
        review_note: record.review_note,
        rejection_reason: record.rejection_reason,
        audit: (&record.audit).into(),
    }
}
