use crate::lifecycle::{InspectionAction, InspectionLifecycle};
use crate::model::{
    AppendChecklistRequest, AssessItemRequest, ChecklistItem, CreateInspectionRequest,
    InspectionCommand, InspectionView, OverallResultRequest, StoredInspection,
    UpdateScheduleRequest,
};
use crate::suggest::{ChecklistSuggester, CraftContext, SuggestedItem};
use futures::join;
use rego_database::{Body, DocumentStore, Filter};
use rego_domain::constants::Collection;
use rego_domain::roles::RoleSet;
use rego_domain::status::{InitialStatus, InspectionStatus};
use rego_kernel::context::RequestContext;
use rego_kernel::lifecycle::{Lifecycle, Step};
use rego_kernel::reference::{RefField, RegistrationSummary, UserSummary, resolve, resolve_many};
use rego_kernel::repository::{Repository, Stored};
use rego_kernel::security::resource::ResourceGuard;
use rego_kernel::validation::{self, FieldErrors};
use rego_kernel::{ServiceError, audit, safe_nanoid, time};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const COLLECTION: Collection = Collection::Inspections;

#[derive(Debug, Clone)]
pub struct InspectionService {
    repo: Repository,
    suggester: Option<Arc<dyn ChecklistSuggester>>,
}

impl InspectionService {
    #[must_use]
    pub const fn new(repo: Repository) -> Self {
        Self { repo, suggester: None }
    }

    #[must_use]
    pub fn with_suggester(mut self, suggester: Arc<dyn ChecklistSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateInspectionRequest,
    ) -> Result<InspectionView, ServiceError> {
        ctx.require(RoleSet::OFFICE, "schedule inspections")?;
        let registration_id = ResourceGuard::verify(
            &request.registration_id,
            Collection::Registrations,
        )?;
        let inspector_id = ResourceGuard::verify(&request.inspector_id, Collection::Users)?;

        let mut errors = FieldErrors::new();
        self.check_exists(
            Collection::Registrations,
            &registration_id,
            "registrationId",
            &mut errors,
        )
        .await?;
        self.check_exists(Collection::Users, &inspector_id, "inspectorId", &mut errors).await?;
        errors.finish()?;

        let mut body = Body::new();
        body.insert("status".to_owned(), json!(InspectionStatus::INITIAL));
        body.insert(
            "registrationRef".to_owned(),
            RefField::pointer(Collection::Registrations, registration_id).to_value(),
        );
        body.insert(
            "inspectorRef".to_owned(),
            RefField::pointer(Collection::Users, inspector_id).to_value(),
        );
        body.insert("scheduledDate".to_owned(), time::to_value(request.scheduled_date));
        body.insert("inspectionType".to_owned(), json!(request.inspection_type));
        body.insert("checklist".to_owned(), Value::Array(Vec::new()));
        if let Some(location) = request.location {
            body.insert("location".to_owned(), Value::String(location));
        }
        if let Some(notes) = request.notes {
            body.insert("notes".to_owned(), Value::String(notes));
        }
        let doc = self.repo.insert(COLLECTION, ctx, body).await?;
        self.get(ctx, &doc.id).await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<InspectionView, ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredInspection>(COLLECTION, &id).await?;
        let record = &stored.record;
        let store = self.repo.store();
        let (registration, inspector, reviewed_by) = join!(
            resolve::<RegistrationSummary>(store, &record.registration_ref),
            resolve::<UserSummary>(store, &record.inspector_ref),
            resolve::<UserSummary>(store, &record.reviewed_by_ref),
        );
        Ok(view(ctx, stored, registration, inspector, reviewed_by))
    }

    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        status: Option<InspectionStatus>,
    ) -> Result<Vec<InspectionView>, ServiceError> {
        let filter = status.map_or_else(Filter::all, |s| Filter::all().eq("status", s.as_ref()));
        let records = self.repo.list::<StoredInspection>(COLLECTION, &filter).await?;
        let store = self.repo.store();

        let registration_refs: Vec<_> = records
            .iter()
            .map(|r| &r.record.registration_ref)
            .collect();
        let inspector_refs: Vec<_> = records.iter().map(|r| &r.record.inspector_ref).collect();
        let reviewer_refs: Vec<_> = records.iter().map(|r| &r.record.reviewed_by_ref).collect();
        let (registrations, inspectors, reviewers) = join!(
            resolve_many::<RegistrationSummary>(store, &registration_refs),
            resolve_many::<UserSummary>(store, &inspector_refs),
            resolve_many::<UserSummary>(store, &reviewer_refs),
        );

        Ok(records
            .into_iter()
            .zip(registrations)
            .zip(inspectors.into_iter().zip(reviewers))
            .map(|((stored, registration), (inspector, reviewed_by))| {
                view(ctx, stored, registration, inspector, reviewed_by)
            })
            .collect())
    }

    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn update_schedule(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: UpdateScheduleRequest,
    ) -> Result<InspectionView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, InspectionAction::EditSchedule)?;

        let mut patch = Body::new();
        if let Some(inspector_id) = request.inspector_id {
            let inspector_id = ResourceGuard::verify(&inspector_id, Collection::Users)?;
            let mut errors = FieldErrors::new();
            self.check_exists(Collection::Users, &inspector_id, "inspectorId", &mut errors).await?;
            errors.finish()?;
            patch.insert(
                "inspectorRef".to_owned(),
                RefField::pointer(Collection::Users, inspector_id).to_value(),
            );
        }
        if let Some(date) = request.scheduled_date {
            patch.insert("scheduledDate".to_owned(), time::to_value(date));
        }
        if let Some(kind) = request.inspection_type {
            patch.insert("inspectionType".to_owned(), json!(kind));
        }
        if let Some(location) = request.location {
            patch.insert("location".to_owned(), Value::String(location));
        }
        if let Some(notes) = request.notes {
            patch.insert("notes".to_owned(), Value::String(notes));
        }

        self.repo.apply(COLLECTION, &id, ctx, &step, time::now(), patch).await?;
        self.get(ctx, &id).await
    }

    /// Appends items to the checklist, generating ids for those without one.
    #[instrument(
        skip(self, ctx, request),
        fields(user = ctx.user_id(), items = request.items.len()),
        err
    )]
    pub async fn append_checklist(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: AppendChecklistRequest,
    ) -> Result<InspectionView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, InspectionAction::EditChecklist)?;

        let mut checklist = stored.record.checklist;
        let mut taken: HashSet<String> = checklist
            .iter()
            .map(|item| item.item_id.clone())
            .collect();
        let mut errors = FieldErrors::new();
        errors.check(!request.items.is_empty(), "items", "at least one item is required");
        for (index, item) in request.items.into_iter().enumerate() {
            let description = item.description.trim();
            errors.check(
                !description.is_empty(),
                format!("items[{index}].description"),
                "is required",
            );
            let item_id = match item.item_id.as_deref().map(str::trim) {
                Some(given) if !given.is_empty() => given.to_owned(),
                _ => safe_nanoid!(),
            };
            errors.check(
                taken.insert(item_id.clone()),
                format!("items[{index}].itemId"),
                "is already on the checklist",
            );
            checklist.push(ChecklistItem {
                item_id,
                description: description.to_owned(),
                result: None,
                comments: None,
                suggested: item.suggested,
            });
        }
        errors.finish()?;

        self.write_checklist(ctx, &id, &step, &checklist).await?;
        self.get(ctx, &id).await
    }

    /// Overwrites one item's result and comments.
    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn assess_item(
        &self,
        ctx: &RequestContext,
        id: &str,
        item_id: &str,
        request: AssessItemRequest,
    ) -> Result<InspectionView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, InspectionAction::EditChecklist)?;

        let mut checklist = stored.record.checklist;
        let item = checklist
            .iter_mut()
            .find(|item| item.item_id == item_id)
            .ok_or_else(|| ServiceError::not_found("checklist item", item_id))?;
        item.result = request.result;
        item.comments = request.comments.filter(|c| !c.trim().is_empty());
        debug!(%id, item_id, result = ?item.result, "Checklist item assessed");

        self.write_checklist(ctx, &id, &step, &checklist).await?;
        self.get(ctx, &id).await
    }

    /// Sets or clears the overall result. Item results play no part.
    #[instrument(skip(self, ctx, request), fields(user = ctx.user_id()), err)]
    pub async fn set_overall_result(
        &self,
        ctx: &RequestContext,
        id: &str,
        request: OverallResultRequest,
    ) -> Result<InspectionView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, InspectionAction::EditChecklist)?;

        let mut patch = Body::new();
        patch.insert("overallResult".to_owned(), json!(request.overall_result));
        self.repo.apply(COLLECTION, &id, ctx, &step, time::now(), patch).await?;
        self.get(ctx, &id).await
    }

    /// Asks the configured model for checklist items. Nothing is written.
    #[instrument(skip(self, ctx), fields(user = ctx.user_id()), err)]
    pub async fn suggest(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<Vec<SuggestedItem>, ServiceError> {
        let (_, stored) = self.load(id).await?;
        authorize(ctx, &stored.record, InspectionAction::EditChecklist)?;
        let Some(suggester) = &self.suggester else {
            return Err(ServiceError::unavailable("Checklist suggestions are not configured"));
        };

        let context = self.craft_context(&stored.record).await;
        let items = suggester.suggest(&context).await?;
        info!(count = items.len(), "Checklist suggestions received");
        Ok(items)
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
        command: InspectionCommand,
    ) -> Result<InspectionView, ServiceError> {
        let (id, stored) = self.load(id).await?;
        let step = authorize(ctx, &stored.record, command.action())?;
        let now = time::now();

        let mut patch = Body::new();
        match command {
            InspectionCommand::Start => {
                patch.insert("startedAt".to_owned(), time::to_value(now));
            }
            InspectionCommand::Complete => {
                patch.insert("completedAt".to_owned(), time::to_value(now));
            }
            InspectionCommand::Pass | InspectionCommand::Fail => {
                audit::stamp_action(&mut patch, ctx, now, "reviewed");
            }
            InspectionCommand::Cancel { reason } => {
                let reason = validation::required(&reason, "reason")?;
                patch.insert("cancelledAt".to_owned(), time::to_value(now));
                patch.insert("cancellationReason".to_owned(), Value::String(reason));
            }
        }

        self.repo.apply(COLLECTION, &id, ctx, &step, now, patch).await?;
        self.get(ctx, &id).await
    }

    async fn load(&self, id: &str) -> Result<(String, Stored<StoredInspection>), ServiceError> {
        let id = ResourceGuard::verify(id, COLLECTION)?;
        let stored = self.repo.fetch::<StoredInspection>(COLLECTION, &id).await?;
        Ok((id, stored))
    }

    async fn write_checklist(
        &self,
        ctx: &RequestContext,
        id: &str,
        step: &Step<InspectionStatus>,
        checklist: &[ChecklistItem],
    ) -> Result<(), ServiceError> {
        let mut patch = Body::new();
        patch.insert("checklist".to_owned(), serde_json::to_value(checklist)?);
        self.repo.apply(COLLECTION, id, ctx, step, time::now(), patch).await?;
        Ok(())
    }

    async fn check_exists(
        &self,
        collection: Collection,
        id: &str,
        field: &str,
        errors: &mut FieldErrors,
    ) -> Result<(), ServiceError> {
        let found = self.repo.store().get(collection, id).await?.is_some();
        errors.check(found, field, format!("no {} record with id '{id}'", collection.name()));
        Ok(())
    }

    /// Craft details for the prompt. A missing registration leaves them blank.
    async fn craft_context(&self, record: &StoredInspection) -> CraftContext {
        let mut context = CraftContext {
            inspection_type: record.inspection_type,
            craft_name: None,
            make: None,
            model: None,
            length_meters: None,
            propulsion: None,
            hull_material: None,
            existing: record.checklist.iter().map(|item| item.description.clone()).collect(),
        };
        let Some(registration_id) = record.registration_ref.id() else {
            return context;
        };
        let craft = match self.repo.store().get(Collection::Registrations, registration_id).await {
            Ok(Some(doc)) => doc.data.get("craft").and_then(Value::as_object).cloned(),
            Ok(None) => None,
            Err(err) => {
                warn!(
                    %registration_id,
                    error = %err,
                    "Registration unavailable for suggestion prompt"
                );
                None
            }
        };
        if let Some(craft) = craft {
            let text = |key: &str| craft.get(key).and_then(Value::as_str).map(str::to_owned);
            context.craft_name = text("name");
            context.make = text("make");
            context.model = text("model");
            context.propulsion = text("propulsion");
            context.hull_material = text("hullMaterial");
            context.length_meters = craft.get("lengthMeters").and_then(Value::as_f64);
        }
        context
    }
}

/// Inspectors are judged against the record's assignee.
fn authorize(
    ctx: &RequestContext,
    record: &StoredInspection,
    action: InspectionAction,
) -> Result<Step<InspectionStatus>, ServiceError> {
    Ok(InspectionLifecycle::authorize(record.status, action, &ctx.actor(&record.inspector_ref))?)
}

fn view(
    ctx: &RequestContext,
    stored: Stored<StoredInspection>,
    registration: Option<RegistrationSummary>,
    inspector: Option<UserSummary>,
    reviewed_by: Option<UserSummary>,
) -> InspectionView {
    let Stored { id, record } = stored;
    InspectionView {
        actions: InspectionLifecycle::permitted_actions(
            record.status,
            &ctx.actor(&record.inspector_ref),
        ),
        id,
        status: record.status,
        registration,
        inspector,
        scheduled_date: record.scheduled_date,
        inspection_type: record.inspection_type,
        location: record.location,
        notes: record.notes,
        checklist: record.checklist,
        overall_result: record.overall_result,
        started_at: record.started_at,
        completed_at: record.completed_at,
        reviewed_at: record.reviewed_at,
        reviewed_by,
        cancelled_at: record.cancelled_at,
        cancellation_reason: record.cancellation_reason,
        audit: (&record.audit).into(),
    }
}
