use crate::lifecycle::{InfringementAction, InfringementLifecycle};
use crate::model::{
    AppendItemsRequest, CreateInfringementRequest, InfringementCommand, InfringementItem,
    InfringementView, StoredInfringement, Totals, UpdateInfringementRequest, validate_items,
};
use chrono::{DateTime, Utc};
use futures::join;
use rego_database::{Body, DocumentStore, Filter};
use rego_domain::constants::Collection;
use rego_domain::roles::{Role, RoleSet};
use rego_domain::status::{InfringementStatus, InitialStatus};
use rego_kernel::context::RequestContext;
use rego_kernel::lifecycle::{Lifecycle, Step};
use rego_kernel::reference::{RefField, RegistrationSummary, UserSummary, resolve, resolve_many};
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::security::resource::ResourceGuard;
use rego_kernel::validation::{self, FieldErrors};
use rego_kernel::{ServiceError, audit, time};
use serde_json::{Value, json};
use tracing::{info, instrument};

const COLLECTION: Collection = Collection::Infringements;
const ISSUERS: RoleSet = RoleSet::of(&[Role::Officer, Role::Supervisor, Role::Admin]);

#[derive(Debug, Clone)]
pub struct InfringementService {
    repo: Repository,
}

impl InfringementService {
    #[must_use]
    pub const fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Opens a draft notice. The caller becomes the issuing officer.
    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateInfringementRequest,
    ) -> Result<InfringementView, ServiceError> {
        ctx.require(ISSUERS, "issue infringements")?;
        let registration_id = ResourceGuard::verify(
            &request.registration_id,
            Collection::Registrations,
        )?;

        let mut errors = FieldErrors::new();
        let known = self.repo
            .store()
            .get(Collection::Registrations, &registration_id)
            .await?
            .is_some();
        errors.check(
            known,
            "registrationId",
            format!("no registrations record with id '{registration_id}'"),
        );
        check_due_date(Some(request.offence_date), request.due_date, &mut errors);
        validate_items(&request.items, 0, &mut errors);
        errors.finish()?;

        let mut body = Body::new();
        body.insert("status".to_owned(), json!(InfringementStatus::INITIAL));
        body.insert(
            "registrationRef".to_owned(),
            RefField::pointer(Collection::Registrations, registration_id).to_value(),
        );
        body.insert("issuedByRef".to_owned(), ctx.user_ref().to_value());
        body.insert("offenceDate".to_owned(), time::to_value(request.offence_date));
        body.insert("items".to_owned(), serde_json::to_value(&request.items)?);
        if let Some(location) = request.location {
            body.insert("location".to_owned(), Value::String(location));
        }
        if let Some(due) = request.due_date {
            body.insert("dueDate".to_owned(), time::to_value(due));
        }
        let doc = self.repo.insert(COLLECTION, ctx, body).await?;
        self.get(ctx, &doc.id).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<InfringementView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredInfringement>(COLLECTION, &id).await?;
        let record = &stored.record;
        let store = self.repo.store();
        let (registration, issued_by, approved_by) = join!(
            resolve::<RegistrationSummary>(store, &record.registration_ref),
            resolve::<UserSummary>(store, &record.issued_by_ref),
            resolve::<UserSummary>(store, &record.approved_by_ref),
        );
        Ok(view(ctx, stored, registration, issued_by, approved_by))
    }

    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<InfringementStatus>,
    ) -> Result<Vec<InfringementView>, ServiceError> {
        let filter = status.map_or_else(Filter::all, |s| Filter::all().eq("status", s.as_ref()));
        let records = self.repo.list::<StoredInfringement>(COLLECTION, &filter).await?;
        let store = self.repo.store();

        let registration_refs: Vec<_> = records
            .iter()
            .map(|r| &r.record.registration_ref)
            .collect();
        let issuer_refs: Vec<_> = records.iter().map(|r| &r.record.issued_by_ref).collect();
        let approver_refs: Vec<_> = records.iter().map(|r| &r.record.approved_by_ref).collect();
        let (registrations, issuers, approvers) = join!(
            resolve_many::<RegistrationSummary>(store, &registration_refs),
            resolve_many::<UserSummary>(store, &issuer_refs),
            resolve_many::<UserSummary>(store, &approver_refs),
        );

        Ok(records
            .into_iter()
            .zip(registrations)
            .zip(issuers.into_iter().zip(approvers))
            .map(|((stored, registration), (issued_by, approved_by))| {
                view(ctx, stored, registration, issued_by, approved_by)
            })
            .collect())
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateInfringementRequest,
    ) -> Result<InfringementView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let record = &stored.record;
        let step = authorize(ctx, record, InfringementAction::Edit)?;

        let mut errors = FieldErrors::new();
        check_due_date(
            request.offence_date.or(record.offence_date),
            request.due_date.or(record.due_date),
            &mut errors,
        );
        if let Some(items) = &request.items {
            validate_items(items, 0, &mut errors);
        }
        errors.finish()?;

        let mut patch = Body::new();
        if let Some(date) = request.offence_date {
            patch.insert("offenceDate".to_owned(), time::to_value(date));
        }
        if let Some(location) = request.location {
            patch.insert("location".to_owned(), Value::String(location));
        }
        if let Some(due) = request.due_date {
            patch.insert("dueDate".to_owned(), time::to_value(due));
        }
        if let Some(items) = request.items {
            patch.insert("items".to_owned(), serde_json::to_value(&items)?);
        }
        self.repo.apply(COLLECTION, &id, ctx, &step, time::now(), patch).await?;
        self.get(ctx, &id).await
    }

    /// Adds offences to a notice that is still editable.
    #[instrument(
        skip(self, ctx, request),
        fields(user = ctx.user_id(), items = request.items.len()),
        err
    )]
    pub async fn append_items(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: AppendItemsRequest,
    ) -> Result<InfringementView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, InfringementAction::Edit)?;

        let mut items: Vec<InfringementItem> = stored.record.items;
        let mut errors = FieldErrors::new();
        errors.check(!request.items.is_empty(), "items", "at least one item is required");
        validate_items(&request.items, items.len(), &mut errors);
        errors.finish()?;

        items.extend(request.items);
        let mut patch = Body::new();
        patch.insert("items".to_owned(), serde_json::to_value(&items)?);
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
        command: InfringementCommand,
    ) -> Result<InfringementView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let record = &stored.record;
        let step = authorize(ctx, record, command.action())?;
        let now = time::now();

        let mut patch = Body::new();
        match command {
            InfringementCommand::Issue => {
                if record.items.is_empty() {
                    return Err(FieldErrors::single(
                        "items",
                        "a notice needs at least one item to be issued",
                    ));
                }
                patch.insert("issuedAt".to_owned(), time::to_value(now));
            }
            InfringementCommand::SubmitForReview => {}
            InfringementCommand::Approve => audit::stamp_action(&mut patch, ctx, now, "approved"),
            InfringementCommand::RecordPayment { reference } => {
                let reference = validation::required(&reference, "reference")?;
                patch.insert("paidAt".to_owned(), time::to_value(now));
                patch.insert("paymentReference".to_owned(), Value::String(reference));
            }
            InfringementCommand::MarkOverdue => {
                if !record.due_date.is_some_and(|due| due < now) {
                    return Err(FieldErrors::single(
                        "dueDate",
                        "must be in the past to mark a notice overdue",
                    ));
                }
            }
            InfringementCommand::Void { reason } => {
                let reason = validation::required(&reason, "reason")?;
                patch.insert("voidedAt".to_owned(), time::to_value(now));
                patch.insert("voidReason".to_owned(), Value::String(reason));
            }
        }

        self.repo.apply(COLLECTION, &id, ctx, &step, now, patch).await?;
        if step.to == Some(InfringementStatus::Paid) {
            info!(
                %id,
                total_fine_cents = Totals::of(&record.items).total_fine_cents,
                "Infringement paid"
            );
        }
        self.get(ctx, &id).await
    }

    async fn load(&self, id: &str) -> Result<(String, Stored<StoredInfringement>), ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredInfringement>(COLLECTION, &id).await?;
        Ok((id, stored))
    }
}

/// Officers are judged against the notice's issuer.
fn authorize(
    ctx: &RequestContext,
    record: &StoredInfringement,
    action: InfringementAction,
) -> Result<Step<InfringementStatus>, ServiceError> {
    Ok(InfringementLifecycle::authorize(record.status, action, &ctx.actor(&record.issued_by_ref))?)
}

fn check_due_date(
    offence: Option<DateTime<Utc>>,
    due: Option<DateTime<Utc>>,
    errors: &mut FieldErrors,
) {
    if let (Some(offence), Some(due)) = (offence, due) {
        errors.check(due >= offence, "dueDate", "must not precede the offence date");
    }
}

fn view(
    ctx: &RequestContext,
    stored: Stored<StoredInfringement>,
    registration: Option<RegistrationSummary>,
    issued_by: Option<UserSummary>,
    approved_by: Option<UserSummary>,
) -> InfringementView {
    let Stored { id, record } = stored;
    InfringementView {
        actions: InfringementLifecycle::permitted_actions(
            record.status,
            &ctx.actor(&record.issued_by_ref),
        ),
        totals: Totals::of(&record.items),
        id,
        status: record.status,
        registration,
        issued_by,
        offence_date: record.offence_date,
        location: record.location,
        due_date: record.due_date,
        items: record.items,
        issued_at: record.issued_at,
        approved_at: record.approved_at,
        approved_by,
        paid_at: record.paid_at,
        payment_reference: record.payment_reference,
        voided_at: record.voided_at,
        void_reason: record.void_reason,
        audit: (&record.audit).into(),
    }
}
